// crates/hot-updater-core/src/runtime/resolver.rs
// ============================================================================
// Module: Hot Updater Resolution Engine
// Description: Decision table over filtered candidates.
// Purpose: Choose UPDATE, ROLLBACK, or no change for a device.
// Dependencies: crate::core, crate::runtime::{filter, rollout}
// ============================================================================

//! ## Overview
//! The decision table compares candidate ids against the installed bundle id
//! `B`. Ids are time-ordered, so plain string comparison orders them.
//!
//! - `B` is NIL: update to the newest candidate.
//! - `B` is a candidate: update to the newest candidate when it is newer.
//! - `B` is not a candidate: prefer the newest candidate above `B`, otherwise
//!   roll back to the newest candidate below `B`.
//! - No candidates: roll back to the native bundle unless `B` is NIL or at or
//!   below the floor.
//!
//! Rollbacks are always forced. The rollout gate only sees updates.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::core::Bundle;
use crate::core::ResolutionRequest;
use crate::core::UpdateInfo;
use crate::core::UpdateStatus;
use crate::runtime::filter::filter_candidates;
use crate::runtime::rollout::apply_rollout_gate;

// ============================================================================
// SECTION: Decision
// ============================================================================

/// Outcome of the decision table before rollout gating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision<'a> {
    /// Outcome kind.
    pub status: UpdateStatus,
    /// Chosen bundle; `None` is the rollback to the native bundle.
    pub bundle: Option<&'a Bundle>,
}

impl<'a> Decision<'a> {
    /// Update to a bundle.
    const fn update(bundle: &'a Bundle) -> Self {
        Self {
            status: UpdateStatus::Update,
            bundle: Some(bundle),
        }
    }

    /// Roll back to an older bundle.
    const fn rollback(bundle: &'a Bundle) -> Self {
        Self {
            status: UpdateStatus::Rollback,
            bundle: Some(bundle),
        }
    }

    /// Roll back to the native bundle.
    const fn native_rollback() -> Self {
        Self {
            status: UpdateStatus::Rollback,
            bundle: None,
        }
    }

    /// Converts the decision into its wire result.
    #[must_use]
    pub fn into_update_info(self) -> UpdateInfo {
        match (self.status, self.bundle) {
            (UpdateStatus::Update, Some(bundle)) => UpdateInfo::update(bundle),
            (_, Some(bundle)) => UpdateInfo::rollback(bundle),
            (_, None) => UpdateInfo::nil_rollback(),
        }
    }
}

/// Applies the decision table to already-filtered candidates.
#[must_use]
pub fn decide<'a>(candidates: &[&'a Bundle], request: &ResolutionRequest) -> Option<Decision<'a>> {
    let installed = &request.bundle_id;
    let latest = candidates.iter().copied().max_by(|left, right| left.id.cmp(&right.id));
    let Some(latest) = latest else {
        if installed.is_nil() || *installed <= request.min_bundle_id {
            return None;
        }
        return Some(Decision::native_rollback());
    };
    if installed.is_nil() {
        return Some(Decision::update(latest));
    }
    if candidates.iter().any(|bundle| bundle.id == *installed) {
        return (latest.id > *installed).then(|| Decision::update(latest));
    }
    if latest.id > *installed {
        return Some(Decision::update(latest));
    }
    candidates
        .iter()
        .copied()
        .filter(|bundle| bundle.id < *installed)
        .max_by(|left, right| left.id.cmp(&right.id))
        .map(Decision::rollback)
}

/// Resolves the update for a device from a full bundle set.
///
/// Runs the candidate filter, the decision table, and the rollout gate.
#[must_use]
pub fn resolve_update(bundles: &[Bundle], request: &ResolutionRequest) -> Option<UpdateInfo> {
    let candidates = filter_candidates(bundles, request);
    let decision = decide(&candidates, request)?;
    let (rollout_percentage, target_device_ids) = decision.bundle.map_or((100, None), |bundle| {
        (bundle.rollout_percentage, bundle.target_device_ids.as_deref())
    });
    apply_rollout_gate(
        decision.into_update_info(),
        rollout_percentage,
        target_device_ids,
        request.device_id.as_deref(),
    )
}

// ============================================================================
// SECTION: Tests
// ============================================================================
