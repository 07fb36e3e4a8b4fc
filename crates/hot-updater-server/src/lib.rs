// crates/hot-updater-server/src/lib.rs
// ============================================================================
// Module: Hot Updater Server Library
// Description: HTTP gateway for update checks, bundle management, and delivery.
// Purpose: Expose the resolution engine over axum with injected configuration.
// Dependencies: axum, tokio, hot-updater-core, hot-updater-signing
// ============================================================================

//! ## Overview
//! The server wraps a [`hot_updater_core::BundleRepository`] in an axum router.
//! Check-update routes resolve a device request and attach a download URL
//! produced by the [`storage::StorageAdapterRegistry`]; management routes
//! publish and inspect bundles; the `/files` route serves artifacts after
//! delivery token verification. Every dependency is constructed by the caller
//! or by [`HotUpdaterServer::from_config`] and passed in explicitly.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod audit;
pub mod auth;
pub mod files;
pub mod routes;
pub mod server;
pub mod storage;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use audit::AuditSink;
pub use audit::CheckUpdateAuditEvent;
pub use audit::DeliveryAuditEvent;
pub use audit::FileAuditSink;
pub use audit::NoopAuditSink;
pub use audit::StderrAuditSink;
pub use files::FsObjectStore;
pub use routes::router;
pub use server::FileDelivery;
pub use server::HotUpdaterServer;
pub use server::ServerError;
pub use server::ServerState;
pub use server::SignaturePolicy;
pub use storage::StorageAdapter;
pub use storage::StorageAdapterRegistry;
pub use storage::StorageError;
pub use storage::TokenStorageAdapter;
