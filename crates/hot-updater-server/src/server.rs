// crates/hot-updater-server/src/server.rs
// ============================================================================
// Module: Hot Updater Server
// Description: Server state assembly and the HTTP listener.
// Purpose: Build every dependency from configuration and serve the router.
// Dependencies: hot-updater-config, hot-updater-store-*, axum, tokio
// ============================================================================

//! ## Overview
//! [`ServerState`] holds the injected collaborators shared by all handlers.
//! [`HotUpdaterServer::from_config`] builds them from a validated
//! [`HotUpdaterConfig`]; tests and embedders can assemble a state by hand
//! and pass it to [`crate::routes::router`].
//!
//! Store construction may block (Postgres pools connect eagerly), so callers
//! inside an async runtime should build the server on a blocking thread.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::net::SocketAddr;
use std::sync::Arc;

use hot_updater_config::HotUpdaterConfig;
use hot_updater_config::StoreType;
use hot_updater_core::BundleRepository;
use hot_updater_core::InMemoryBundleRepository;
use hot_updater_core::ObjectStore;
use hot_updater_core::is_signed_file_hash;
use hot_updater_signing::DeliveryTokenSigner;
use hot_updater_signing::verify_signed_file_hash;
use hot_updater_store_postgres::PostgresBundleRepository;
use hot_updater_store_sqlite::SqliteBundleRepository;

use crate::audit::AuditSink;
use crate::audit::StderrAuditSink;
use crate::audit::build_audit_sink;
use crate::files::FsObjectStore;
use crate::routes::router;
use crate::storage::StorageAdapterRegistry;

// ============================================================================
// SECTION: Collaborators
// ============================================================================

/// Publish-time signature policy.
#[derive(Debug, Clone, Default)]
pub struct SignaturePolicy {
    /// SPKI PEM used to verify inline signed hashes.
    pub public_key_pem: Option<String>,
    /// Reject bundles whose hash is unsigned.
    pub require_signature: bool,
}

impl SignaturePolicy {
    /// Checks one published file hash, returning a rejection message.
    ///
    /// Signed hashes must verify when a key is configured; unsigned hashes
    /// are rejected only when signatures are required.
    #[must_use]
    pub fn check(&self, file_hash: &str) -> Option<&'static str> {
        let signed = is_signed_file_hash(file_hash);
        match &self.public_key_pem {
            Some(pem) if signed && !verify_signed_file_hash(file_hash, pem) => {
                Some("Invalid bundle signature")
            }
            _ if !signed && self.require_signature => Some("Bundle signature required"),
            _ => None,
        }
    }
}

/// Token-verified artifact delivery.
#[derive(Clone)]
pub struct FileDelivery {
    /// Token verifier.
    pub signer: DeliveryTokenSigner,
    /// Artifact bytes.
    pub objects: Arc<dyn ObjectStore>,
}

/// Collaborators shared by every handler.
pub struct ServerState {
    /// Bundle catalog and resolver.
    pub(crate) repository: Arc<dyn BundleRepository>,
    /// Storage URI adapters.
    pub(crate) storage: StorageAdapterRegistry,
    /// File delivery, when enabled.
    pub(crate) delivery: Option<FileDelivery>,
    /// Decision journal.
    pub(crate) audit: Arc<dyn AuditSink>,
    /// Admin bearer token for management routes.
    pub(crate) admin_token: Option<String>,
    /// Publish-time signature policy.
    pub(crate) signature: SignaturePolicy,
    /// Request body limit.
    pub(crate) max_body_bytes: usize,
}

impl ServerState {
    /// Creates a state around a repository with no adapters, no delivery,
    /// open management routes, and stderr auditing.
    #[must_use]
    pub fn new(repository: Arc<dyn BundleRepository>) -> Self {
        Self {
            repository,
            storage: StorageAdapterRegistry::new(),
            delivery: None,
            audit: Arc::new(StderrAuditSink),
            admin_token: None,
            signature: SignaturePolicy::default(),
            max_body_bytes: 1024 * 1024,
        }
    }

    /// Sets the storage adapter registry.
    #[must_use]
    pub fn with_storage(mut self, storage: StorageAdapterRegistry) -> Self {
        self.storage = storage;
        self
    }

    /// Enables the `/files` route.
    #[must_use]
    pub fn with_delivery(mut self, delivery: FileDelivery) -> Self {
        self.delivery = Some(delivery);
        self
    }

    /// Sets the audit sink.
    #[must_use]
    pub fn with_audit(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = audit;
        self
    }

    /// Guards management routes with a bearer token.
    #[must_use]
    pub fn with_admin_token(mut self, token: Option<String>) -> Self {
        self.admin_token = token;
        self
    }

    /// Sets the publish-time signature policy.
    #[must_use]
    pub fn with_signature_policy(mut self, policy: SignaturePolicy) -> Self {
        self.signature = policy;
        self
    }

    /// Sets the request body limit.
    #[must_use]
    pub const fn with_max_body_bytes(mut self, max_body_bytes: usize) -> Self {
        self.max_body_bytes = max_body_bytes;
        self
    }
}

// ============================================================================
// SECTION: Server
// ============================================================================

/// HTTP server instance.
pub struct HotUpdaterServer {
    /// Listen address.
    bind: SocketAddr,
    /// API route prefix.
    base_path: String,
    /// Shared handler state.
    state: Arc<ServerState>,
}

impl HotUpdaterServer {
    /// Builds a server and its collaborators from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError`] when configuration is invalid or a backend
    /// cannot be opened.
    pub fn from_config(config: &HotUpdaterConfig) -> Result<Self, ServerError> {
        config.validate().map_err(|err| ServerError::Config(err.to_string()))?;
        let bind = config.server.bind_addr().map_err(|err| ServerError::Config(err.to_string()))?;
        let repository = build_repository(config)?;
        let signer = config
            .delivery
            .resolve_secret()
            .map_err(|err| ServerError::Config(err.to_string()))?
            .map(|secret| DeliveryTokenSigner::new(secret.as_bytes(), config.delivery.token_ttl_secs))
            .transpose()
            .map_err(|err| ServerError::Init(err.to_string()))?;
        let storage = StorageAdapterRegistry::from_config(
            &config.storage,
            config.server.public_base_url.as_deref(),
            signer.as_ref(),
        )
        .map_err(|err| ServerError::Config(err.to_string()))?;
        let audit =
            build_audit_sink(&config.audit).map_err(|err| ServerError::Init(err.to_string()))?;
        let admin_token = config
            .server
            .resolve_admin_token()
            .map_err(|err| ServerError::Config(err.to_string()))?;
        let public_key_pem =
            config.signing.load_public_key().map_err(|err| ServerError::Init(err.to_string()))?;
        let mut state = ServerState::new(repository)
            .with_storage(storage)
            .with_audit(audit)
            .with_admin_token(admin_token)
            .with_signature_policy(SignaturePolicy {
                public_key_pem,
                require_signature: config.signing.require_signature,
            })
            .with_max_body_bytes(config.server.max_body_bytes);
        if let (Some(root), Some(signer)) = (&config.delivery.files_root, signer) {
            let objects =
                FsObjectStore::new(root).map_err(|err| ServerError::Init(err.to_string()))?;
            state = state.with_delivery(FileDelivery {
                signer,
                objects: Arc::new(objects),
            });
        }
        if state.admin_token.is_none() {
            tracing::warn!("bundle management routes are running without an admin token");
        }
        tracing::info!(
            store = config.store.store_type.as_str(),
            adapters = %state.storage.schemes().join(","),
            delivery = state.delivery.is_some(),
            "hot-updater server initialized"
        );
        Ok(Self {
            bind,
            base_path: config.server.base_path.clone(),
            state: Arc::new(state),
        })
    }

    /// Returns the configured listen address.
    #[must_use]
    pub const fn bind_addr(&self) -> SocketAddr {
        self.bind
    }

    /// Builds the axum router for this server.
    #[must_use]
    pub fn router(&self) -> axum::Router {
        router(&self.base_path, Arc::clone(&self.state))
    }

    /// Serves requests until interrupted.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Transport`] when binding or serving fails.
    pub async fn serve(self) -> Result<(), ServerError> {
        let app = self.router();
        let listener = tokio::net::TcpListener::bind(self.bind)
            .await
            .map_err(|err| ServerError::Transport(format!("http bind failed: {err}")))?;
        tracing::info!(bind = %self.bind, base_path = %self.base_path, "hot-updater server listening");
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = tokio::signal::ctrl_c().await;
                tracing::info!("shutdown signal received");
            })
            .await
            .map_err(|err| ServerError::Transport(format!("http server failed: {err}")))
    }
}

/// Builds the bundle repository for the configured store.
fn build_repository(config: &HotUpdaterConfig) -> Result<Arc<dyn BundleRepository>, ServerError> {
    let repository: Arc<dyn BundleRepository> = match config.store.store_type {
        StoreType::Memory => Arc::new(InMemoryBundleRepository::new()),
        StoreType::Sqlite => {
            let sqlite =
                config.store.sqlite_config().map_err(|err| ServerError::Config(err.to_string()))?;
            Arc::new(
                SqliteBundleRepository::new(&sqlite)
                    .map_err(|err| ServerError::Init(err.to_string()))?,
            )
        }
        StoreType::Postgres => {
            let postgres =
                config.store.postgres_config().map_err(|err| ServerError::Config(err.to_string()))?;
            Arc::new(
                PostgresBundleRepository::new(&postgres)
                    .map_err(|err| ServerError::Init(err.to_string()))?,
            )
        }
    };
    Ok(repository)
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Server errors.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Configuration errors.
    #[error("config error: {0}")]
    Config(String),
    /// Initialization errors.
    #[error("init error: {0}")]
    Init(String),
    /// Transport errors.
    #[error("transport error: {0}")]
    Transport(String),
}

// ============================================================================
// SECTION: Tests
// ============================================================================
