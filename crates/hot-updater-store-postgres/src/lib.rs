// crates/hot-updater-store-postgres/src/lib.rs
// ============================================================================
// Module: Hot Updater Postgres Store
// Description: Pooled Postgres BundleRepository backend.
// Purpose: Persist bundles and resolve updates for shared deployments.
// Dependencies: hot-updater-core, postgres, r2d2
// ============================================================================

//! ## Overview
//! Postgres counterpart of the `SQLite` store. The resolution statement has
//! the same CTE shape; identifier comparisons use `COLLATE "C"` so ordering is
//! bytewise like the in-memory engine, and the compatible version list is bound
//! as a `text[]` parameter.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod query;
pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use store::PostgresBundleRepository;
pub use store::PostgresStoreConfig;
pub use store::PostgresStoreError;
