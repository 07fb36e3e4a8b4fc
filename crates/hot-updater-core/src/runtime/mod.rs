// crates/hot-updater-core/src/runtime/mod.rs
// ============================================================================
// Module: Hot Updater Runtime
// Description: Resolution engine, rollout gate, and in-memory backends.
// Purpose: Provide the deterministic decision pipeline and storage helpers.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! The runtime evaluates a request in four steps: version matching narrows the
//! target-version groups, the candidate filter selects eligible bundles, the
//! decision engine picks one bundle and a status, and the rollout gate may
//! veto delivery. Everything here is pure and lock-free except the in-memory
//! backends and the storage migrator.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod filter;
pub mod memory;
pub mod migration;
pub mod resolver;
pub mod rollout;
pub mod version;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use filter::filter_candidates;
pub use filter::target_version_groups;
pub use memory::InMemoryBundleRepository;
pub use memory::InMemoryObjectStore;
pub use migration::ChannelLayoutMigration;
pub use migration::MIGRATION_RECORD_KEY;
pub use migration::Migration;
pub use migration::MigrationContext;
pub use migration::MigrationError;
pub use migration::MigrationRecord;
pub use migration::MigrationReport;
pub use migration::Migrator;
pub use resolver::Decision;
pub use resolver::decide;
pub use resolver::resolve_update;
pub use rollout::apply_rollout_gate;
pub use rollout::check_eligibility;
pub use rollout::rollout_bucket;
pub use version::RangeError;
pub use version::VersionRange;
pub use version::coerce_version;
pub use version::filter_compatible_app_versions;
pub use version::is_compatible;
pub use version::semver_satisfies;
