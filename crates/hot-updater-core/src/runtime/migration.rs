// crates/hot-updater-core/src/runtime/migration.rs
// ============================================================================
// Module: Hot Updater Storage Migrations
// Description: Recorded, reversible migrations over an object store.
// Purpose: Evolve storage layouts without leaving partial migrations applied.
// Dependencies: serde, serde_json, thiserror, time, tracing, crate::interfaces
// ============================================================================

//! ## Overview
//! A [`Migrator`] applies named [`Migration`]s in order and records each
//! success in `migrate.json` as `[{name, appliedAt}]`. Names already recorded
//! are skipped.
//!
//! Migrations mutate storage only through a [`MigrationContext`]. Every update
//! or move first copies the original object to `backup/<migration>/<key>`. When
//! a migration fails, the context restores every backup and deletes the
//! objects it created, and the migration is not recorded. When a migration
//! succeeds its backups are deleted before the record is written. In dry-run
//! mode the context performs reads only.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::core::DEFAULT_CHANNEL;
use crate::interfaces::ObjectStore;
use crate::interfaces::ObjectStoreError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Object key holding applied-migration records.
pub const MIGRATION_RECORD_KEY: &str = "migrate.json";
/// Prefix under which originals are backed up.
const BACKUP_PREFIX: &str = "backup";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Migration errors.
#[derive(Debug, Error)]
pub enum MigrationError {
    /// Object store failure.
    #[error("migration store error: {0}")]
    Store(String),
    /// Stored data is not in the expected shape.
    #[error("migration invalid data: {0}")]
    Invalid(String),
    /// A migration failed and was rolled back.
    #[error("migration {name} failed: {message}")]
    Failed {
        /// Name of the failed migration.
        name: String,
        /// Underlying failure.
        message: String,
    },
}

impl From<ObjectStoreError> for MigrationError {
    fn from(error: ObjectStoreError) -> Self {
        Self::Store(error.to_string())
    }
}

// ============================================================================
// SECTION: Records
// ============================================================================

/// Applied-migration record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationRecord {
    /// Migration name.
    pub name: String,
    /// RFC 3339 application time.
    pub applied_at: String,
}

/// Summary of a migrator run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationReport {
    /// Migrations applied (or simulated in dry-run mode).
    pub applied: Vec<String>,
    /// Migrations skipped because they were already recorded.
    pub skipped: Vec<String>,
    /// Whether the run was a dry run.
    pub dry_run: bool,
}

// ============================================================================
// SECTION: Migration Context
// ============================================================================

/// A single storage migration.
pub trait Migration: Send + Sync {
    /// Unique migration name used in the record file.
    fn name(&self) -> &str;

    /// Applies the migration through the context.
    ///
    /// # Errors
    ///
    /// Returns [`MigrationError`] when the migration cannot complete.
    fn migrate(&self, context: &mut MigrationContext<'_>) -> Result<(), MigrationError>;
}

/// Storage handle given to a running migration.
pub struct MigrationContext<'a> {
    /// Backing object store.
    store: &'a dyn ObjectStore,
    /// Name of the running migration.
    name: String,
    /// Whether writes are suppressed.
    dry_run: bool,
    /// Original key to backup key.
    backups: BTreeMap<String, String>,
    /// Keys that did not exist before this migration wrote them.
    created: BTreeSet<String>,
}

impl<'a> MigrationContext<'a> {
    /// Creates a context for one migration.
    fn new(store: &'a dyn ObjectStore, name: &str, dry_run: bool) -> Self {
        Self {
            store,
            name: name.to_string(),
            dry_run,
            backups: BTreeMap::new(),
            created: BTreeSet::new(),
        }
    }

    /// Returns true when writes are suppressed.
    #[must_use]
    pub const fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Lists keys under a prefix.
    ///
    /// # Errors
    ///
    /// Returns [`MigrationError::Store`] when listing fails.
    pub fn keys(&self, prefix: &str) -> Result<Vec<String>, MigrationError> {
        Ok(self.store.list(normalize_key(prefix))?)
    }

    /// Reads an object's bytes.
    ///
    /// # Errors
    ///
    /// Returns [`MigrationError::Store`] when the read fails.
    pub fn read_file(&self, key: &str) -> Result<Option<Vec<u8>>, MigrationError> {
        Ok(self.store.get(normalize_key(key))?.map(|object| object.bytes))
    }

    /// Reads and parses a JSON object.
    ///
    /// # Errors
    ///
    /// Returns [`MigrationError`] when the read fails or the JSON is invalid.
    pub fn read_json(&self, key: &str) -> Result<Option<Value>, MigrationError> {
        self.read_file(key)?
            .map(|bytes| {
                serde_json::from_slice(&bytes)
                    .map_err(|err| MigrationError::Invalid(format!("{key}: {err}")))
            })
            .transpose()
    }

    /// Writes an object, backing up any existing original first.
    ///
    /// # Errors
    ///
    /// Returns [`MigrationError::Store`] when the backup or write fails.
    pub fn update_file(&mut self, key: &str, content: Vec<u8>) -> Result<(), MigrationError> {
        let key = normalize_key(key).to_string();
        if self.dry_run {
            tracing::info!(migration = %self.name, key = %key, "dry run: would update file");
            return Ok(());
        }
        let content_type = self.backup(&key)?;
        if !self.backups.contains_key(&key) {
            self.created.insert(key.clone());
        }
        self.store.put(&key, content, content_type.as_deref())?;
        tracing::info!(migration = %self.name, key = %key, "updated file");
        Ok(())
    }

    /// Moves an object, backing up the source first. Moving a key onto itself
    /// is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`MigrationError`] when the source is missing or a store call fails.
    pub fn move_file(&mut self, from: &str, to: &str) -> Result<(), MigrationError> {
        let from = normalize_key(from).to_string();
        let to = normalize_key(to).to_string();
        if from == to {
            return Ok(());
        }
        if self.dry_run {
            tracing::info!(migration = %self.name, from = %from, to = %to, "dry run: would move file");
            return Ok(());
        }
        self.backup(&from)?;
        let object = self
            .store
            .get(&from)?
            .ok_or_else(|| MigrationError::Invalid(format!("missing move source: {from}")))?;
        if self.store.get(&to)?.is_none() {
            self.created.insert(to.clone());
        } else {
            self.backup(&to)?;
        }
        self.store.put(&to, object.bytes, object.content_type.as_deref())?;
        self.store.delete(&from)?;
        tracing::info!(migration = %self.name, from = %from, to = %to, "moved file");
        Ok(())
    }

    /// Copies a pre-existing object to its backup key once, returning its
    /// content type.
    fn backup(&mut self, key: &str) -> Result<Option<String>, MigrationError> {
        let Some(object) = self.store.get(key)? else {
            return Ok(None);
        };
        if !self.backups.contains_key(key) && !self.created.contains(key) {
            let backup_key = format!("{BACKUP_PREFIX}/{}/{key}", self.name);
            self.store.put(&backup_key, object.bytes, object.content_type.as_deref())?;
            tracing::debug!(migration = %self.name, key = %key, backup = %backup_key, "backed up file");
            self.backups.insert(key.to_string(), backup_key);
        }
        Ok(object.content_type)
    }

    /// Deletes the backups of a committed migration.
    ///
    /// Failures are logged; the migration stays applied.
    fn cleanup_backups(&mut self) {
        for backup_key in std::mem::take(&mut self.backups).into_values() {
            match self.store.delete(&backup_key) {
                Ok(()) => tracing::debug!(migration = %self.name, backup = %backup_key, "removed backup"),
                Err(err) => {
                    tracing::warn!(migration = %self.name, backup = %backup_key, error = %err, "failed to remove backup");
                }
            }
        }
    }

    /// Restores every backup and removes created objects.
    ///
    /// Failures are logged and restoration continues with the next key.
    fn rollback(&self) {
        tracing::warn!(migration = %self.name, "rolling back migration");
        for key in &self.created {
            if let Err(err) = self.store.delete(key) {
                tracing::warn!(migration = %self.name, key = %key, error = %err, "failed to remove created file");
            }
        }
        for (key, backup_key) in &self.backups {
            let restored = self.store.get(backup_key).and_then(|object| match object {
                Some(object) => self.store.put(key, object.bytes, object.content_type.as_deref()),
                None => Err(ObjectStoreError::Io(format!("backup missing: {backup_key}"))),
            });
            if let Err(err) = restored {
                tracing::warn!(migration = %self.name, key = %key, error = %err, "failed to restore backup");
            }
        }
    }
}

/// Strips a leading slash from a key or prefix.
fn normalize_key(key: &str) -> &str {
    key.strip_prefix('/').unwrap_or(key)
}

// ============================================================================
// SECTION: Migrator
// ============================================================================

/// Applies migrations and maintains the record file.
pub struct Migrator<'a> {
    /// Backing object store.
    store: &'a dyn ObjectStore,
    /// Whether writes are suppressed.
    dry_run: bool,
}

impl<'a> Migrator<'a> {
    /// Creates a migrator over an object store.
    #[must_use]
    pub fn new(store: &'a dyn ObjectStore) -> Self {
        Self {
            store,
            dry_run: false,
        }
    }

    /// Enables or disables dry-run mode.
    #[must_use]
    pub const fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Loads the applied-migration records.
    ///
    /// A malformed record file is treated as empty.
    ///
    /// # Errors
    ///
    /// Returns [`MigrationError::Store`] when the read fails.
    pub fn records(&self) -> Result<Vec<MigrationRecord>, MigrationError> {
        let Some(object) = self.store.get(MIGRATION_RECORD_KEY)? else {
            return Ok(Vec::new());
        };
        match serde_json::from_slice(&object.bytes) {
            Ok(records) => Ok(records),
            Err(err) => {
                tracing::warn!(error = %err, "failed to parse migration records; treating as empty");
                Ok(Vec::new())
            }
        }
    }

    /// Runs migrations in order.
    ///
    /// # Errors
    ///
    /// Returns [`MigrationError::Failed`] after rolling back the failed
    /// migration, or [`MigrationError::Store`] when records cannot be read or
    /// written.
    pub fn run(&self, migrations: &[&dyn Migration]) -> Result<MigrationReport, MigrationError> {
        let mut records = self.records()?;
        let mut report = MigrationReport {
            dry_run: self.dry_run,
            ..MigrationReport::default()
        };
        for migration in migrations {
            let name = migration.name();
            if records.iter().any(|record| record.name == name) {
                tracing::info!(migration = %name, "migration already applied, skipping");
                report.skipped.push(name.to_string());
                continue;
            }
            tracing::info!(migration = %name, dry_run = self.dry_run, "applying migration");
            let mut context = MigrationContext::new(self.store, name, self.dry_run);
            if let Err(err) = migration.migrate(&mut context) {
                context.rollback();
                return Err(MigrationError::Failed {
                    name: name.to_string(),
                    message: err.to_string(),
                });
            }
            context.cleanup_backups();
            report.applied.push(name.to_string());
            if !self.dry_run {
                records.push(MigrationRecord {
                    name: name.to_string(),
                    applied_at: now_rfc3339()?,
                });
                self.save_records(&records)?;
            }
        }
        Ok(report)
    }

    /// Writes the record file.
    fn save_records(&self, records: &[MigrationRecord]) -> Result<(), MigrationError> {
        let body = serde_json::to_vec_pretty(records)
            .map_err(|err| MigrationError::Invalid(err.to_string()))?;
        self.store.put(MIGRATION_RECORD_KEY, body, Some("application/json"))?;
        Ok(())
    }
}

/// Returns the current UTC time in RFC 3339 form.
fn now_rfc3339() -> Result<String, MigrationError> {
    OffsetDateTime::now_utc().format(&Rfc3339).map_err(|err| MigrationError::Invalid(err.to_string()))
}

// ============================================================================
// SECTION: Built-in Migrations
// ============================================================================

/// Moves legacy platform-rooted storage under the default channel.
///
/// Rewrites `update.json` entries to drop `fileUrl` and set `channel`, then
/// moves `ios/...` and `android/...` objects to `production/...`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChannelLayoutMigration;

/// Legacy manifest key rewritten by [`ChannelLayoutMigration`].
const LEGACY_MANIFEST_KEY: &str = "update.json";

impl Migration for ChannelLayoutMigration {
    fn name(&self) -> &str {
        "hot-updater_0.13.0"
    }

    fn migrate(&self, context: &mut MigrationContext<'_>) -> Result<(), MigrationError> {
        let keys = context.keys("")?;
        if keys.iter().any(|key| key == LEGACY_MANIFEST_KEY)
            && let Some(Value::Array(entries)) = context.read_json(LEGACY_MANIFEST_KEY)?
        {
            let rewritten: Vec<Value> = entries
                .into_iter()
                .map(|mut entry| {
                    if let Value::Object(fields) = &mut entry {
                        fields.remove("fileUrl");
                        fields.insert("channel".to_string(), Value::from(DEFAULT_CHANNEL));
                    }
                    entry
                })
                .collect();
            let body = serde_json::to_vec_pretty(&rewritten)
                .map_err(|err| MigrationError::Invalid(err.to_string()))?;
            context.update_file(LEGACY_MANIFEST_KEY, body)?;
        }
        let production_prefix = format!("{DEFAULT_CHANNEL}/");
        for key in &keys {
            if key == LEGACY_MANIFEST_KEY || key.starts_with(&production_prefix) {
                continue;
            }
            if key.starts_with("ios/") || key.starts_with("android/") {
                context.move_file(key, &format!("{production_prefix}{key}"))?;
            }
        }
        Ok(())
    }
}
