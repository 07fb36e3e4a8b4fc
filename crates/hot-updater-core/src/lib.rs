// crates/hot-updater-core/src/lib.rs
// ============================================================================
// Module: Hot Updater Core Library
// Description: Public API surface for the Hot Updater resolution core.
// Purpose: Expose bundle types, repository interfaces, and resolution helpers.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! Hot Updater core decides which JavaScript bundle an installed app should run.
//! Resolution is a pure function of the published bundle set and a single
//! device request; storage backends integrate through explicit interfaces and
//! must reproduce the in-memory decision exactly.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use core::*;

pub use interfaces::BundleRepository;
pub use interfaces::ObjectStore;
pub use interfaces::ObjectStoreError;
pub use interfaces::RepositoryError;
pub use interfaces::StoredObject;
pub use interfaces::validate_object_key;
pub use runtime::ChannelLayoutMigration;
pub use runtime::Decision;
pub use runtime::InMemoryBundleRepository;
pub use runtime::InMemoryObjectStore;
pub use runtime::Migration;
pub use runtime::MigrationContext;
pub use runtime::MigrationError;
pub use runtime::MigrationRecord;
pub use runtime::MigrationReport;
pub use runtime::Migrator;
pub use runtime::apply_rollout_gate;
pub use runtime::check_eligibility;
pub use runtime::decide;
pub use runtime::filter_candidates;
pub use runtime::resolve_update;
