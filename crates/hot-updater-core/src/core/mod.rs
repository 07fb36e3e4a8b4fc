// crates/hot-updater-core/src/core/mod.rs
// ============================================================================
// Module: Hot Updater Core Types
// Description: Canonical bundle, request, and update result structures.
// Purpose: Provide stable, serializable types shared by every backend.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Core types define published bundles, per-request resolution inputs, and the
//! update decision returned to devices. These types are the canonical source
//! of truth for the HTTP wire contract and for every storage encoding.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod bundle;
pub mod hashing;
pub mod identifiers;
pub mod request;
pub mod signed_hash;
pub mod update;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use bundle::Bundle;
pub use bundle::BundlePage;
pub use bundle::BundleQuery;
pub use bundle::DEFAULT_PAGE_LIMIT;
pub use bundle::DEFAULT_ROLLOUT_PERCENTAGE;
pub use bundle::MAX_PAGE_LIMIT;
pub use bundle::Pagination;
pub use bundle::parse_target_device_ids;
pub use hashing::sha256_file_hash;
pub use identifiers::BundleId;
pub use identifiers::Channel;
pub use identifiers::DEFAULT_CHANNEL;
pub use identifiers::NIL_BUNDLE_ID;
pub use identifiers::Platform;
pub use identifiers::generate_bundle_id;
pub use request::RequestParts;
pub use request::ResolutionRequest;
pub use request::ResolveError;
pub use request::UpdateStrategy;
pub use signed_hash::SignedFileHash;
pub use signed_hash::SignedHashError;
pub use signed_hash::create_signed_file_hash;
pub use signed_hash::is_signed_file_hash;
pub use signed_hash::parse_signed_file_hash;
pub use signed_hash::parse_signed_file_hash_safe;
pub use update::UpdateInfo;
pub use update::UpdateStatus;
