// crates/hot-updater-store-sqlite/src/lib.rs
// ============================================================================
// Module: Hot Updater SQLite Store
// Description: Durable BundleRepository backend using SQLite WAL.
// Purpose: Persist bundles and resolve updates with a single SQL statement.
// Dependencies: hot-updater-core, rusqlite
// ============================================================================

//! ## Overview
//! This crate provides a SQLite-backed [`BundleRepository`] whose update
//! resolution is one CTE query per request. The query reproduces the
//! in-memory decision table exactly; the rollout gate runs on the returned
//! row afterwards.
//!
//! [`BundleRepository`]: hot_updater_core::BundleRepository

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod query;
pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use store::SqliteBundleRepository;
pub use store::SqliteStoreConfig;
pub use store::SqliteStoreError;
pub use store::SqliteStoreMode;
pub use store::SqliteSyncMode;
