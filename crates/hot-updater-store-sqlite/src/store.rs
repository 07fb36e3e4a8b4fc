// crates/hot-updater-store-sqlite/src/store.rs
// ============================================================================
// Module: SQLite Bundle Repository
// Description: Durable BundleRepository backed by SQLite WAL.
// Purpose: Store bundles and resolve updates with set-based queries.
// Dependencies: hot-updater-core, rusqlite, serde, serde_json, thiserror, tracing
// ============================================================================

//! ## Overview
//! This module implements a durable [`BundleRepository`] using `SQLite`. The
//! candidate filter and decision table run inside one CTE statement; app
//! version compatibility is evaluated in Rust first and bound as a JSON
//! array. Stored rows are untrusted: malformed platforms or JSON columns are
//! reported as corruption rather than silently dropped.

// ============================================================================//
// SECTION: Imports
// ============================================================================//

use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

use hot_updater_core::Bundle;
use hot_updater_core::BundleId;
use hot_updater_core::BundlePage;
use hot_updater_core::BundleQuery;
use hot_updater_core::BundleRepository;
use hot_updater_core::Channel;
use hot_updater_core::NIL_BUNDLE_ID;
use hot_updater_core::Pagination;
use hot_updater_core::Platform;
use hot_updater_core::RepositoryError;
use hot_updater_core::ResolutionRequest;
use hot_updater_core::UpdateInfo;
use hot_updater_core::UpdateStatus;
use hot_updater_core::UpdateStrategy;
use hot_updater_core::apply_rollout_gate;
use hot_updater_core::parse_target_device_ids;
use hot_updater_core::runtime::filter_compatible_app_versions;
use rusqlite::Connection;
use rusqlite::OpenFlags;
use rusqlite::OptionalExtension;
use rusqlite::Row;
use rusqlite::params;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::query::APP_VERSION_UPDATE_SQL;
use crate::query::CHANNELS_SQL;
use crate::query::COUNT_BUNDLES_SQL;
use crate::query::DELETE_BUNDLE_SQL;
use crate::query::FINGERPRINT_UPDATE_SQL;
use crate::query::GET_BUNDLE_SQL;
use crate::query::LIST_BUNDLES_SQL;
use crate::query::SCHEMA_SQL;
use crate::query::TARGET_APP_VERSIONS_SQL;
use crate::query::UPSERT_BUNDLE_SQL;

// ============================================================================//
// SECTION: Constants
// ============================================================================//

/// `SQLite` schema version for the store.
const SCHEMA_VERSION: i64 = 1;
/// Default busy timeout (ms).
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;

// ============================================================================//
// SECTION: Config
// ============================================================================//

/// `SQLite` journal mode configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteStoreMode {
    /// WAL journal mode (recommended).
    #[default]
    Wal,
    /// Delete journal mode (legacy).
    Delete,
}

impl SqliteStoreMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Wal => "wal",
            Self::Delete => "delete",
        }
    }
}

/// `SQLite` sync mode configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteSyncMode {
    /// Full synchronous mode (safest).
    #[default]
    Full,
    /// Normal synchronous mode (balanced).
    Normal,
}

impl SqliteSyncMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Normal => "normal",
        }
    }
}

/// Configuration for the `SQLite` bundle repository.
#[derive(Debug, Clone, Deserialize)]
pub struct SqliteStoreConfig {
    /// Path to the `SQLite` database file.
    pub path: PathBuf,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteStoreMode,
    /// `SQLite` sync mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
}

impl SqliteStoreConfig {
    /// Creates a config with default pragmas for a database path.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            journal_mode: SqliteStoreMode::default(),
            sync_mode: SqliteSyncMode::default(),
        }
    }
}

/// Returns the default busy timeout for `SQLite` connections.
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

// ============================================================================//
// SECTION: Errors
// ============================================================================//

/// `SQLite` store errors.
#[derive(Debug, Error)]
pub enum SqliteStoreError {
    /// Store I/O error.
    #[error("sqlite store io error: {0}")]
    Io(String),
    /// `SQLite` engine error.
    #[error("sqlite store db error: {0}")]
    Db(String),
    /// Stored row is malformed.
    #[error("sqlite store corruption: {0}")]
    Corrupt(String),
    /// Store schema version mismatch.
    #[error("sqlite store version mismatch: {0}")]
    VersionMismatch(String),
    /// Invalid store data.
    #[error("sqlite store invalid data: {0}")]
    Invalid(String),
}

impl From<SqliteStoreError> for RepositoryError {
    fn from(error: SqliteStoreError) -> Self {
        match error {
            SqliteStoreError::VersionMismatch(message) => Self::VersionMismatch(message),
            SqliteStoreError::Invalid(message) => Self::Invalid(message),
            other @ (SqliteStoreError::Io(_)
            | SqliteStoreError::Db(_)
            | SqliteStoreError::Corrupt(_)) => Self::Store(other.to_string()),
        }
    }
}

// ============================================================================//
// SECTION: Rows
// ============================================================================//

/// Raw `bundles` row before validation.
struct BundleRow {
    /// Bundle id.
    id: String,
    /// Platform label.
    platform: String,
    /// Channel name.
    channel: String,
    /// Enabled flag.
    enabled: bool,
    /// Stored force flag.
    should_force_update: bool,
    /// Content hash.
    file_hash: String,
    /// Source commit.
    git_commit_hash: Option<String>,
    /// Release note.
    message: Option<String>,
    /// Target version range.
    target_app_version: Option<String>,
    /// Native fingerprint.
    fingerprint_hash: Option<String>,
    /// Storage location.
    storage_uri: Option<String>,
    /// Rollout percentage.
    rollout_percentage: i64,
    /// Device allow-list JSON text.
    target_device_ids: Option<String>,
    /// Metadata JSON text.
    metadata: Option<String>,
}

impl BundleRow {
    /// Reads a row selected with the bundle column list.
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            platform: row.get(1)?,
            channel: row.get(2)?,
            enabled: row.get(3)?,
            should_force_update: row.get(4)?,
            file_hash: row.get(5)?,
            git_commit_hash: row.get(6)?,
            message: row.get(7)?,
            target_app_version: row.get(8)?,
            fingerprint_hash: row.get(9)?,
            storage_uri: row.get(10)?,
            rollout_percentage: row.get(11)?,
            target_device_ids: row.get(12)?,
            metadata: row.get(13)?,
        })
    }

    /// Converts the row into a bundle.
    fn into_bundle(self) -> Result<Bundle, SqliteStoreError> {
        let platform = self
            .platform
            .parse::<Platform>()
            .map_err(|err| SqliteStoreError::Corrupt(format!("bundle {}: {err}", self.id)))?;
        let metadata = self
            .metadata
            .as_deref()
            .map(serde_json::from_str::<Value>)
            .transpose()
            .map_err(|err| SqliteStoreError::Corrupt(format!("bundle {} metadata: {err}", self.id)))?;
        Ok(Bundle {
            id: BundleId::new(self.id),
            platform,
            channel: Channel::new(self.channel),
            enabled: self.enabled,
            should_force_update: self.should_force_update,
            file_hash: self.file_hash,
            git_commit_hash: self.git_commit_hash,
            message: self.message,
            target_app_version: self.target_app_version,
            fingerprint_hash: self.fingerprint_hash,
            storage_uri: self.storage_uri,
            rollout_percentage: clamp_percentage(self.rollout_percentage),
            target_device_ids: self.target_device_ids.as_deref().and_then(parse_device_ids),
            metadata,
        })
    }
}

/// Row produced by the resolution statement.
struct ResolvedRow {
    /// Chosen id or NIL.
    id: String,
    /// Effective force flag.
    should_force_update: bool,
    /// Release note.
    message: Option<String>,
    /// `UPDATE` or `ROLLBACK`.
    status: String,
    /// Storage location.
    storage_uri: Option<String>,
    /// Content hash.
    file_hash: Option<String>,
    /// Rollout percentage of the chosen bundle.
    rollout_percentage: i64,
    /// Device allow-list JSON text.
    target_device_ids: Option<String>,
}

impl ResolvedRow {
    /// Reads a resolution row.
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            should_force_update: row.get(1)?,
            message: row.get(2)?,
            status: row.get(3)?,
            storage_uri: row.get(4)?,
            file_hash: row.get(5)?,
            rollout_percentage: row.get(6)?,
            target_device_ids: row.get(7)?,
        })
    }

    /// Applies the rollout gate and produces the wire result.
    fn into_update_info(
        self,
        device_id: Option<&str>,
    ) -> Result<Option<UpdateInfo>, SqliteStoreError> {
        let status = match self.status.as_str() {
            "UPDATE" => UpdateStatus::Update,
            "ROLLBACK" => UpdateStatus::Rollback,
            other => {
                return Err(SqliteStoreError::Corrupt(format!("unknown resolution status: {other}")));
            }
        };
        let target_device_ids = self.target_device_ids.as_deref().and_then(parse_device_ids);
        let info = UpdateInfo {
            id: BundleId::new(self.id),
            should_force_update: self.should_force_update,
            message: self.message,
            status,
            storage_uri: self.storage_uri,
            file_hash: self.file_hash,
        };
        Ok(apply_rollout_gate(
            info,
            clamp_percentage(self.rollout_percentage),
            target_device_ids.as_deref(),
            device_id,
        ))
    }
}

/// Clamps a stored percentage into `0..=100`.
fn clamp_percentage(value: i64) -> u8 {
    u8::try_from(value.clamp(0, 100)).unwrap_or(100)
}

/// Parses a stored device allow-list leniently.
fn parse_device_ids(text: &str) -> Option<Vec<String>> {
    parse_target_device_ids(&Value::String(text.to_string()))
}

// ============================================================================//
// SECTION: Store
// ============================================================================//

/// `SQLite`-backed bundle repository with WAL support.
#[derive(Clone)]
pub struct SqliteBundleRepository {
    /// Shared `SQLite` connection guarded by a mutex.
    connection: Arc<Mutex<Connection>>,
}

impl SqliteBundleRepository {
    /// Opens an `SQLite`-backed bundle repository.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the database cannot be opened or
    /// initialized.
    pub fn new(config: &SqliteStoreConfig) -> Result<Self, SqliteStoreError> {
        validate_store_path(&config.path)?;
        ensure_parent_dir(&config.path)?;
        let mut connection = open_connection(config)?;
        initialize_schema(&mut connection)?;
        tracing::debug!(path = %config.path.display(), "opened sqlite bundle repository");
        Ok(Self {
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    /// Locks the shared connection.
    fn lock(&self) -> Result<MutexGuard<'_, Connection>, SqliteStoreError> {
        self.connection.lock().map_err(|_| SqliteStoreError::Db("mutex poisoned".to_string()))
    }

    /// Resolves an update with the CTE statement.
    fn resolve(&self, request: &ResolutionRequest) -> Result<Option<UpdateInfo>, SqliteStoreError> {
        let guard = self.lock()?;
        let (sql, strategy_value) = match &request.strategy {
            UpdateStrategy::AppVersion {
                app_version,
            } => {
                let groups = target_app_versions(&guard, request.platform)?;
                let compatible = filter_compatible_app_versions(&groups, app_version);
                let encoded = serde_json::to_string(&compatible)
                    .map_err(|err| SqliteStoreError::Invalid(err.to_string()))?;
                (APP_VERSION_UPDATE_SQL, encoded)
            }
            UpdateStrategy::Fingerprint {
                fingerprint_hash,
            } => (FINGERPRINT_UPDATE_SQL, fingerprint_hash.clone()),
        };
        let row = guard
            .query_row(
                sql,
                params![
                    request.platform.as_str(),
                    request.bundle_id.as_str(),
                    request.min_bundle_id.as_str(),
                    request.channel.as_str(),
                    NIL_BUNDLE_ID,
                    strategy_value
                ],
                ResolvedRow::from_row,
            )
            .optional()
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        drop(guard);
        match row {
            Some(row) => row.into_update_info(request.device_id.as_deref()),
            None => Ok(None),
        }
    }

    /// Lists bundles with filters and paging.
    fn list(&self, query: &BundleQuery) -> Result<BundlePage, SqliteStoreError> {
        let channel = query.channel.as_ref().map(Channel::as_str);
        let platform = query.platform.map(Platform::as_str);
        let limit = query.effective_limit();
        let guard = self.lock()?;
        let total: i64 = guard
            .query_row(COUNT_BUNDLES_SQL, params![channel, platform], |row| row.get(0))
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        let mut statement =
            guard.prepare(LIST_BUNDLES_SQL).map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        let rows = statement
            .query_map(
                params![channel, platform, i64::from(limit), i64::from(query.offset)],
                BundleRow::from_row,
            )
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        drop(statement);
        drop(guard);
        let data = rows.into_iter().map(BundleRow::into_bundle).collect::<Result<Vec<_>, _>>()?;
        let total = u64::try_from(total)
            .map_err(|_| SqliteStoreError::Corrupt("negative bundle count".to_string()))?;
        Ok(BundlePage {
            data,
            pagination: Pagination::new(total, limit, query.offset),
        })
    }

    /// Fetches one bundle.
    fn fetch(&self, id: &BundleId) -> Result<Option<Bundle>, SqliteStoreError> {
        let row = self
            .lock()?
            .query_row(GET_BUNDLE_SQL, params![id.as_str()], BundleRow::from_row)
            .optional()
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        row.map(BundleRow::into_bundle).transpose()
    }

    /// Writes bundles in one transaction.
    fn upsert(&self, bundles: &[Bundle]) -> Result<(), SqliteStoreError> {
        let mut encoded = Vec::with_capacity(bundles.len());
        for bundle in bundles {
            bundle.validate().map_err(|err| SqliteStoreError::Invalid(err.to_string()))?;
            let device_ids = bundle
                .target_device_ids
                .as_ref()
                .map(serde_json::to_string)
                .transpose()
                .map_err(|err| SqliteStoreError::Invalid(err.to_string()))?;
            let metadata = bundle
                .metadata
                .as_ref()
                .map(serde_json::to_string)
                .transpose()
                .map_err(|err| SqliteStoreError::Invalid(err.to_string()))?;
            encoded.push((bundle, device_ids, metadata));
        }
        let mut guard = self.lock()?;
        let tx = guard.transaction().map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        for (bundle, device_ids, metadata) in &encoded {
            tx.execute(
                UPSERT_BUNDLE_SQL,
                params![
                    bundle.id.as_str(),
                    bundle.platform.as_str(),
                    bundle.channel.as_str(),
                    bundle.enabled,
                    bundle.should_force_update,
                    bundle.file_hash,
                    bundle.git_commit_hash,
                    bundle.message,
                    bundle.target_app_version,
                    bundle.fingerprint_hash,
                    bundle.storage_uri,
                    i64::from(bundle.rollout_percentage),
                    device_ids,
                    metadata
                ],
            )
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        }
        tx.commit().map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        drop(guard);
        tracing::info!(count = bundles.len(), "upserted bundles");
        Ok(())
    }

    /// Deletes one bundle.
    fn remove(&self, id: &BundleId) -> Result<bool, SqliteStoreError> {
        let changed = self
            .lock()?
            .execute(DELETE_BUNDLE_SQL, params![id.as_str()])
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        Ok(changed > 0)
    }

    /// Lists distinct channels.
    fn list_channels(&self) -> Result<Vec<Channel>, SqliteStoreError> {
        let guard = self.lock()?;
        let mut statement =
            guard.prepare(CHANNELS_SQL).map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        let channels = statement
            .query_map(params![], |row| row.get::<_, String>(0))
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?
            .map(|row| row.map(Channel::new))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        Ok(channels)
    }
}

impl BundleRepository for SqliteBundleRepository {
    fn get_update_info(
        &self,
        request: &ResolutionRequest,
    ) -> Result<Option<UpdateInfo>, RepositoryError> {
        self.resolve(request).map_err(RepositoryError::from)
    }

    fn target_app_versions(&self, platform: Platform) -> Result<Vec<String>, RepositoryError> {
        let guard = self.lock()?;
        Ok(target_app_versions(&guard, platform)?)
    }

    fn list_bundles(&self, query: &BundleQuery) -> Result<BundlePage, RepositoryError> {
        self.list(query).map_err(RepositoryError::from)
    }

    fn get_bundle(&self, id: &BundleId) -> Result<Option<Bundle>, RepositoryError> {
        self.fetch(id).map_err(RepositoryError::from)
    }

    fn upsert_bundles(&self, bundles: &[Bundle]) -> Result<(), RepositoryError> {
        self.upsert(bundles).map_err(RepositoryError::from)
    }

    fn delete_bundle(&self, id: &BundleId) -> Result<bool, RepositoryError> {
        self.remove(id).map_err(RepositoryError::from)
    }

    fn channels(&self) -> Result<Vec<Channel>, RepositoryError> {
        self.list_channels().map_err(RepositoryError::from)
    }
}

// ============================================================================//
// SECTION: Helpers
// ============================================================================//

/// Reads the distinct target-version groups for a platform.
fn target_app_versions(
    connection: &Connection,
    platform: Platform,
) -> Result<Vec<String>, SqliteStoreError> {
    let mut statement = connection
        .prepare(TARGET_APP_VERSIONS_SQL)
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    let groups = statement
        .query_map(params![platform.as_str()], |row| row.get::<_, String>(0))
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    Ok(groups)
}

/// Ensures the parent directory for the store exists.
fn ensure_parent_dir(path: &Path) -> Result<(), SqliteStoreError> {
    let Some(parent) = path.parent() else {
        return Err(SqliteStoreError::Io("store path missing parent directory".to_string()));
    };
    std::fs::create_dir_all(parent).map_err(|err| SqliteStoreError::Io(err.to_string()))
}

/// Validates store paths for safety limits.
fn validate_store_path(path: &Path) -> Result<(), SqliteStoreError> {
    let path_string = path.display().to_string();
    if path_string.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(SqliteStoreError::Invalid("store path exceeds length limit".to_string()));
    }
    for component in path.components() {
        let name = component.as_os_str().to_string_lossy();
        if name.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(SqliteStoreError::Invalid(
                "store path contains an overlong component".to_string(),
            ));
        }
    }
    if path.exists() && path.is_dir() {
        return Err(SqliteStoreError::Invalid(
            "store path must be a file, not a directory".to_string(),
        ));
    }
    Ok(())
}

/// Opens an `SQLite` connection with secure defaults.
fn open_connection(config: &SqliteStoreConfig) -> Result<Connection, SqliteStoreError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
    let connection = Connection::open_with_flags(&config.path, flags)
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    apply_pragmas(&connection, config)?;
    Ok(connection)
}

/// Applies `SQLite` pragmas required for durability.
fn apply_pragmas(
    connection: &Connection,
    config: &SqliteStoreConfig,
) -> Result<(), SqliteStoreError> {
    connection
        .execute_batch(&format!("PRAGMA journal_mode = {};", config.journal_mode.pragma_value()))
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    connection
        .execute_batch(&format!("PRAGMA synchronous = {};", config.sync_mode.pragma_value()))
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    connection
        .busy_timeout(std::time::Duration::from_millis(config.busy_timeout_ms))
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    Ok(())
}

/// Initializes the `SQLite` schema or validates existing version.
fn initialize_schema(connection: &mut Connection) -> Result<(), SqliteStoreError> {
    let tx = connection.transaction().map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    tx.execute_batch("CREATE TABLE IF NOT EXISTS store_meta (version INTEGER NOT NULL);")
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    let version: Option<i64> = tx
        .query_row("SELECT version FROM store_meta LIMIT 1", params![], |row| row.get(0))
        .optional()
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    match version {
        None => {
            tx.execute("INSERT INTO store_meta (version) VALUES (?1)", params![SCHEMA_VERSION])
                .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
            tx.execute_batch(SCHEMA_SQL).map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        }
        Some(value) if value == SCHEMA_VERSION => {}
        Some(value) => {
            return Err(SqliteStoreError::VersionMismatch(format!(
                "unsupported schema version: {value}"
            )));
        }
    }
    tx.commit().map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    Ok(())
}
