// crates/hot-updater-core/src/core/update.rs
// ============================================================================
// Module: Hot Updater Update Results
// Description: Resolution result returned to devices.
// Purpose: Define the UPDATE / ROLLBACK decision payload.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! [`UpdateInfo`] is computed fresh per request and never persisted. Absence of
//! a result (`None`, JSON `null`) means "no change". Every rollback is forced.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::bundle::Bundle;
use crate::core::identifiers::BundleId;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Resolution outcome kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum UpdateStatus {
    /// Serve a newer bundle.
    Update,
    /// Force the device back to an older bundle or to the native bundle.
    Rollback,
}

impl UpdateStatus {
    /// Returns the wire label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Update => "UPDATE",
            Self::Rollback => "ROLLBACK",
        }
    }
}

/// Bundle selected for a device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateInfo {
    /// Chosen bundle, or NIL to revert to the native bundle.
    pub id: BundleId,
    /// Whether the client must apply immediately.
    pub should_force_update: bool,
    /// Release note.
    pub message: Option<String>,
    /// Outcome kind.
    pub status: UpdateStatus,
    /// Storage location of the chosen bundle.
    pub storage_uri: Option<String>,
    /// Content hash of the chosen bundle.
    pub file_hash: Option<String>,
}

impl UpdateInfo {
    /// Builds an UPDATE result for a bundle.
    #[must_use]
    pub fn update(bundle: &Bundle) -> Self {
        Self {
            id: bundle.id.clone(),
            should_force_update: bundle.should_force_update,
            message: bundle.message.clone(),
            status: UpdateStatus::Update,
            storage_uri: bundle.storage_uri.clone(),
            file_hash: Some(bundle.file_hash.clone()),
        }
    }

    /// Builds a forced ROLLBACK result for a bundle.
    #[must_use]
    pub fn rollback(bundle: &Bundle) -> Self {
        Self {
            id: bundle.id.clone(),
            should_force_update: true,
            message: bundle.message.clone(),
            status: UpdateStatus::Rollback,
            storage_uri: bundle.storage_uri.clone(),
            file_hash: Some(bundle.file_hash.clone()),
        }
    }

    /// Builds the terminal rollback to the embedded native bundle.
    #[must_use]
    pub fn nil_rollback() -> Self {
        Self {
            id: BundleId::nil(),
            should_force_update: true,
            message: None,
            status: UpdateStatus::Rollback,
            storage_uri: None,
            file_hash: None,
        }
    }
}
