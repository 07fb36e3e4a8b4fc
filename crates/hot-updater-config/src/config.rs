// crates/hot-updater-config/src/config.rs
// ============================================================================
// Module: Hot Updater Configuration
// Description: Configuration loading and validation for the update server.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: hot-updater-store-sqlite, hot-updater-store-postgres, serde, toml, url
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! Every section has defaults, so an empty file yields a runnable in-memory
//! server bound to loopback. Secrets may be read from the environment through
//! `*_env` indirections so they stay out of the file.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::path::PathBuf;

use hot_updater_store_postgres::PostgresStoreConfig;
use hot_updater_store_sqlite::SqliteStoreConfig;
use hot_updater_store_sqlite::SqliteStoreMode;
use hot_updater_store_sqlite::SqliteSyncMode;
use serde::Deserialize;
use thiserror::Error;
use url::Url;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "hot-updater.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "HOT_UPDATER_CONFIG";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum length of the admin bearer token.
pub(crate) const MAX_ADMIN_TOKEN_LENGTH: usize = 256;
/// Maximum delivery token lifetime in seconds.
pub(crate) const MAX_TOKEN_TTL_SECS: u64 = 3_600;
/// Default delivery token lifetime in seconds.
pub(crate) const DEFAULT_TOKEN_TTL_SECS: u64 = 60;
/// Default bind address.
pub(crate) const DEFAULT_BIND: &str = "127.0.0.1:3000";
/// Default API base path.
pub(crate) const DEFAULT_BASE_PATH: &str = "/api";
/// Default maximum request body size in bytes.
pub(crate) const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;
/// Default busy timeout for `SQLite` connections.
pub(crate) const DEFAULT_STORE_BUSY_TIMEOUT_MS: u64 = 5_000;

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// Hot Updater server configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HotUpdaterConfig {
    /// HTTP server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Bundle repository configuration.
    #[serde(default)]
    pub store: StoreConfig,
    /// Bundle signature policy.
    #[serde(default)]
    pub signing: SigningConfig,
    /// Delivery token and file serving configuration.
    #[serde(default)]
    pub delivery: DeliveryConfig,
    /// Storage adapters, one per URI scheme.
    #[serde(default)]
    pub storage: Vec<StorageAdapterConfig>,
    /// Log output configuration.
    #[serde(default)]
    pub log: LogConfig,
    /// Audit journal configuration.
    #[serde(default)]
    pub audit: AuditConfig,
}

impl HotUpdaterConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        Self::from_toml(content)
    }

    /// Parses and validates configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate()?;
        self.store.validate()?;
        self.signing.validate()?;
        self.delivery.validate()?;
        self.log.validate()?;
        self.audit.validate()?;
        let mut schemes = BTreeSet::new();
        for adapter in &self.storage {
            adapter.validate()?;
            if !schemes.insert(adapter.scheme.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "storage scheme {} is configured more than once",
                    adapter.scheme
                )));
            }
        }
        if !self.storage.is_empty() && self.server.public_base_url.is_none() {
            return Err(ConfigError::Invalid(
                "storage adapters require server.public_base_url".to_string(),
            ));
        }
        if !self.storage.is_empty()
            && self.delivery.jwt_secret.is_none()
            && self.delivery.jwt_secret_env.is_none()
        {
            return Err(ConfigError::Invalid(
                "storage adapters require a delivery jwt secret".to_string(),
            ));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Server
// ============================================================================

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Socket address to bind.
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Path prefix for API routes.
    #[serde(default = "default_base_path")]
    pub base_path: String,
    /// External base URL used when building file download links.
    #[serde(default)]
    pub public_base_url: Option<String>,
    /// Bearer token guarding bundle management routes.
    #[serde(default)]
    pub admin_token: Option<String>,
    /// Environment variable holding the admin token.
    #[serde(default)]
    pub admin_token_env: Option<String>,
    /// Maximum request body size in bytes.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            base_path: default_base_path(),
            public_base_url: None,
            admin_token: None,
            admin_token_env: None,
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

impl ServerConfig {
    /// Validates server configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        self.bind
            .trim()
            .parse::<SocketAddr>()
            .map_err(|_| ConfigError::Invalid("server.bind must be a socket address".to_string()))?;
        let base = self.base_path.trim();
        if !base.starts_with('/') || (base.len() > 1 && base.ends_with('/')) {
            return Err(ConfigError::Invalid(
                "server.base_path must start with / and not end with /".to_string(),
            ));
        }
        if self.max_body_bytes == 0 {
            return Err(ConfigError::Invalid(
                "server.max_body_bytes must be greater than zero".to_string(),
            ));
        }
        if let Some(url) = &self.public_base_url {
            let parsed = Url::parse(url).map_err(|err| {
                ConfigError::Invalid(format!("server.public_base_url is invalid: {err}"))
            })?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(ConfigError::Invalid(
                    "server.public_base_url must use http or https".to_string(),
                ));
            }
        }
        if self.admin_token.is_some() && self.admin_token_env.is_some() {
            return Err(ConfigError::Invalid(
                "server.admin_token and server.admin_token_env are mutually exclusive".to_string(),
            ));
        }
        if let Some(token) = &self.admin_token {
            validate_token("server.admin_token", token)?;
        }
        Ok(())
    }

    /// Returns the parsed bind address.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the address does not parse.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.bind
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid("server.bind must be a socket address".to_string()))
    }

    /// Resolves the admin token from the file or the environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the named variable is unset or empty.
    pub fn resolve_admin_token(&self) -> Result<Option<String>, ConfigError> {
        match (&self.admin_token, &self.admin_token_env) {
            (Some(token), _) => Ok(Some(token.clone())),
            (None, Some(var)) => {
                let token = read_env_secret(var)?;
                validate_token("server.admin_token_env", &token)?;
                Ok(Some(token))
            }
            (None, None) => Ok(None),
        }
    }
}

/// Returns the default bind address.
fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}

/// Returns the default API base path.
fn default_base_path() -> String {
    DEFAULT_BASE_PATH.to_string()
}

/// Returns the default body limit.
const fn default_max_body_bytes() -> usize {
    DEFAULT_MAX_BODY_BYTES
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// Bundle repository backend type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StoreType {
    /// In-memory repository (lost on restart).
    #[default]
    Memory,
    /// `SQLite` database file.
    Sqlite,
    /// Postgres server.
    Postgres,
}

impl StoreType {
    /// Returns the config label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Sqlite => "sqlite",
            Self::Postgres => "postgres",
        }
    }
}

/// Bundle repository configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Store backend type.
    #[serde(rename = "type", default)]
    pub store_type: StoreType,
    /// `SQLite` database path.
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// `SQLite` busy timeout in milliseconds.
    #[serde(default = "default_store_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteStoreMode,
    /// `SQLite` synchronous mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
    /// Postgres connection string.
    #[serde(default)]
    pub connection: Option<String>,
    /// Environment variable holding the Postgres connection string.
    #[serde(default)]
    pub connection_env: Option<String>,
    /// Postgres pool size.
    #[serde(default)]
    pub max_connections: Option<u32>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            store_type: StoreType::default(),
            path: None,
            busy_timeout_ms: default_store_busy_timeout_ms(),
            journal_mode: SqliteStoreMode::default(),
            sync_mode: SqliteSyncMode::default(),
            connection: None,
            connection_env: None,
            max_connections: None,
        }
    }
}

impl StoreConfig {
    /// Validates store configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        match self.store_type {
            StoreType::Memory => {
                if self.path.is_some() || self.connection.is_some() {
                    return Err(ConfigError::Invalid(
                        "memory store must not set path or connection".to_string(),
                    ));
                }
                Ok(())
            }
            StoreType::Sqlite => {
                let path = self.path.as_ref().ok_or_else(|| {
                    ConfigError::Invalid("sqlite store requires path".to_string())
                })?;
                validate_path_string("store.path", &path.to_string_lossy())?;
                Ok(())
            }
            StoreType::Postgres => {
                match (&self.connection, &self.connection_env) {
                    (Some(_), Some(_)) => {
                        return Err(ConfigError::Invalid(
                            "store.connection and store.connection_env are mutually exclusive"
                                .to_string(),
                        ));
                    }
                    (None, None) => {
                        return Err(ConfigError::Invalid(
                            "postgres store requires connection or connection_env".to_string(),
                        ));
                    }
                    _ => {}
                }
                if self.max_connections == Some(0) {
                    return Err(ConfigError::Invalid(
                        "store.max_connections must be greater than zero".to_string(),
                    ));
                }
                Ok(())
            }
        }
    }

    /// Builds the `SQLite` store configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when no path is configured.
    pub fn sqlite_config(&self) -> Result<SqliteStoreConfig, ConfigError> {
        let path = self
            .path
            .clone()
            .ok_or_else(|| ConfigError::Invalid("sqlite store requires path".to_string()))?;
        Ok(SqliteStoreConfig {
            path,
            busy_timeout_ms: self.busy_timeout_ms,
            journal_mode: self.journal_mode,
            sync_mode: self.sync_mode,
        })
    }

    /// Builds the Postgres store configuration, reading env indirections.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when no connection string is available.
    pub fn postgres_config(&self) -> Result<PostgresStoreConfig, ConfigError> {
        let connection = match (&self.connection, &self.connection_env) {
            (Some(connection), _) => connection.clone(),
            (None, Some(var)) => read_env_secret(var)?,
            (None, None) => {
                return Err(ConfigError::Invalid(
                    "postgres store requires connection or connection_env".to_string(),
                ));
            }
        };
        let defaults = PostgresStoreConfig::default();
        Ok(PostgresStoreConfig {
            connection,
            max_connections: self.max_connections.unwrap_or(defaults.max_connections),
            ..defaults
        })
    }
}

/// Returns the default busy timeout for `SQLite` connections.
const fn default_store_busy_timeout_ms() -> u64 {
    DEFAULT_STORE_BUSY_TIMEOUT_MS
}

// ============================================================================
// SECTION: Signing
// ============================================================================

/// Bundle signature policy applied when bundles are published.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SigningConfig {
    /// SPKI PEM public key used to verify inline signed file hashes.
    #[serde(default)]
    pub public_key_path: Option<PathBuf>,
    /// Reject bundles without a valid signature.
    #[serde(default)]
    pub require_signature: bool,
}

impl SigningConfig {
    /// Validates signing configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(path) = &self.public_key_path {
            validate_path_string("signing.public_key_path", &path.to_string_lossy())?;
        }
        if self.require_signature && self.public_key_path.is_none() {
            return Err(ConfigError::Invalid(
                "signing.require_signature requires signing.public_key_path".to_string(),
            ));
        }
        Ok(())
    }

    /// Reads the configured public key PEM.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] when the key file cannot be read.
    pub fn load_public_key(&self) -> Result<Option<String>, ConfigError> {
        self.public_key_path
            .as_ref()
            .map(|path| fs::read_to_string(path).map_err(|err| ConfigError::Io(err.to_string())))
            .transpose()
    }
}

// ============================================================================
// SECTION: Delivery
// ============================================================================

/// Delivery token and file serving configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DeliveryConfig {
    /// HMAC secret for delivery tokens.
    #[serde(default)]
    pub jwt_secret: Option<String>,
    /// Environment variable holding the HMAC secret.
    #[serde(default)]
    pub jwt_secret_env: Option<String>,
    /// Token lifetime in seconds.
    #[serde(default = "default_token_ttl_secs")]
    pub token_ttl_secs: u64,
    /// Directory served by the `/files` route.
    #[serde(default)]
    pub files_root: Option<PathBuf>,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            jwt_secret: None,
            jwt_secret_env: None,
            token_ttl_secs: default_token_ttl_secs(),
            files_root: None,
        }
    }
}

impl DeliveryConfig {
    /// Validates delivery configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.token_ttl_secs == 0 || self.token_ttl_secs > MAX_TOKEN_TTL_SECS {
            return Err(ConfigError::Invalid(format!(
                "delivery.token_ttl_secs must be between 1 and {MAX_TOKEN_TTL_SECS}"
            )));
        }
        if self.jwt_secret.is_some() && self.jwt_secret_env.is_some() {
            return Err(ConfigError::Invalid(
                "delivery.jwt_secret and delivery.jwt_secret_env are mutually exclusive"
                    .to_string(),
            ));
        }
        if let Some(secret) = &self.jwt_secret
            && secret.is_empty()
        {
            return Err(ConfigError::Invalid("delivery.jwt_secret must be non-empty".to_string()));
        }
        if let Some(root) = &self.files_root {
            validate_path_string("delivery.files_root", &root.to_string_lossy())?;
            if self.jwt_secret.is_none() && self.jwt_secret_env.is_none() {
                return Err(ConfigError::Invalid(
                    "delivery.files_root requires a jwt secret".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Resolves the token secret from the file or the environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the named variable is unset or empty.
    pub fn resolve_secret(&self) -> Result<Option<String>, ConfigError> {
        match (&self.jwt_secret, &self.jwt_secret_env) {
            (Some(secret), _) => Ok(Some(secret.clone())),
            (None, Some(var)) => read_env_secret(var).map(Some),
            (None, None) => Ok(None),
        }
    }
}

/// Returns the default delivery token lifetime.
const fn default_token_ttl_secs() -> u64 {
    DEFAULT_TOKEN_TTL_SECS
}

// ============================================================================
// SECTION: Storage Adapters
// ============================================================================

/// Storage adapter bound to one URI scheme.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageAdapterConfig {
    /// URI scheme handled by the adapter (for example `s3`).
    pub scheme: String,
    /// Restricts the adapter to one bucket (URI host) when set.
    #[serde(default)]
    pub bucket: Option<String>,
}

impl StorageAdapterConfig {
    /// Validates one adapter entry.
    fn validate(&self) -> Result<(), ConfigError> {
        let scheme = self.scheme.as_str();
        let valid = scheme.chars().next().is_some_and(|ch| ch.is_ascii_lowercase())
            && scheme
                .chars()
                .all(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit() || matches!(ch, '+' | '-' | '.'));
        if !valid {
            return Err(ConfigError::Invalid(format!("storage scheme {scheme} is invalid")));
        }
        if matches!(scheme, "http" | "https") {
            return Err(ConfigError::Invalid(format!(
                "storage scheme {scheme} is served directly and cannot be mapped"
            )));
        }
        if let Some(bucket) = &self.bucket
            && bucket.trim().is_empty()
        {
            return Err(ConfigError::Invalid(format!(
                "storage adapter {scheme} bucket must be non-empty"
            )));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Logging
// ============================================================================

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

/// Log output configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// Default filter directive, overridden by `RUST_LOG`.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

impl LogConfig {
    /// Validates log configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.level.trim().is_empty() {
            return Err(ConfigError::Invalid("log.level must be non-empty".to_string()));
        }
        Ok(())
    }
}

/// Returns the default log level.
fn default_log_level() -> String {
    "info".to_string()
}

// ============================================================================
// SECTION: Audit
// ============================================================================

/// Audit sink selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AuditSinkKind {
    /// JSON lines on stderr.
    #[default]
    Stderr,
    /// Append-only JSON lines file.
    File,
    /// Discard audit events.
    None,
}

/// Audit journal configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuditConfig {
    /// Sink selection.
    #[serde(default)]
    pub sink: AuditSinkKind,
    /// Audit log path for the file sink.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl AuditConfig {
    /// Validates audit configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        match (self.sink, &self.path) {
            (AuditSinkKind::File, None) => {
                Err(ConfigError::Invalid("file audit sink requires audit.path".to_string()))
            }
            (AuditSinkKind::File, Some(path)) => {
                validate_path_string("audit.path", &path.to_string_lossy())
            }
            (_, Some(_)) => {
                Err(ConfigError::Invalid("audit.path is only valid for the file sink".to_string()))
            }
            (_, None) => Ok(()),
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from CLI or environment defaults.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates the resolved path against security limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a path string against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    for component in Path::new(trimmed).components() {
        let component_value = component.as_os_str().to_string_lossy();
        if component_value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}

/// Validates a bearer token value.
fn validate_token(field: &str, token: &str) -> Result<(), ConfigError> {
    if token.trim().is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if token.len() > MAX_ADMIN_TOKEN_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    if token.chars().any(char::is_whitespace) {
        return Err(ConfigError::Invalid(format!("{field} must not contain whitespace")));
    }
    Ok(())
}

/// Reads a secret from a named environment variable.
fn read_env_secret(var: &str) -> Result<String, ConfigError> {
    match env::var(var) {
        Ok(value) if !value.is_empty() => Ok(value),
        _ => Err(ConfigError::Invalid(format!("environment variable {var} is not set"))),
    }
}
