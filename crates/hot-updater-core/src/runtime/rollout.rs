// crates/hot-updater-core/src/runtime/rollout.rs
// ============================================================================
// Module: Hot Updater Rollout Gate
// Description: Deterministic per-device admission for staged rollouts.
// Purpose: Throttle bundle exposure by percentage or explicit device list.
// Dependencies: sha2, crate::core
// ============================================================================

//! ## Overview
//! Each (bundle, device) pair maps to a stable bucket in `[0, 100)`:
//! SHA-256 over `"{bundle_id}:{device_id}"`, first eight bytes read as a
//! big-endian integer, modulo 100. A device is admitted when its bucket is
//! below the bundle's rollout percentage. A non-empty device list replaces
//! percentage gating with plain membership.
//!
//! The gate only applies to UPDATE results for requests that carry a device
//! id. Rejected devices get no change.

// ============================================================================
// SECTION: Imports
// ============================================================================

use sha2::Digest;
use sha2::Sha256;

use crate::core::BundleId;
use crate::core::UpdateInfo;
use crate::core::UpdateStatus;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Number of rollout buckets.
const BUCKET_COUNT: u64 = 100;

// ============================================================================
// SECTION: Eligibility
// ============================================================================

/// Returns the stable rollout bucket for a device and bundle.
#[must_use]
pub fn rollout_bucket(bundle_id: &BundleId, device_id: &str) -> u8 {
    let digest = Sha256::digest(format!("{bundle_id}:{device_id}").as_bytes());
    let mut prefix = [0_u8; 8];
    prefix.copy_from_slice(&digest[.. 8]);
    let bucket = u64::from_be_bytes(prefix) % BUCKET_COUNT;
    u8::try_from(bucket).unwrap_or(u8::MAX)
}

/// Returns true when a device may receive a bundle.
#[must_use]
pub fn check_eligibility(
    bundle_id: &BundleId,
    device_id: &str,
    rollout_percentage: Option<u8>,
    target_device_ids: Option<&[String]>,
) -> bool {
    if let Some(targets) = target_device_ids
        && !targets.is_empty()
    {
        return targets.iter().any(|target| target == device_id);
    }
    match rollout_percentage {
        None => true,
        Some(percentage) if percentage >= 100 => true,
        Some(0) => false,
        Some(percentage) => rollout_bucket(bundle_id, device_id) < percentage,
    }
}

/// Applies the rollout gate to a resolved result.
///
/// Rollbacks and requests without a device id pass through unchanged.
#[must_use]
pub fn apply_rollout_gate(
    info: UpdateInfo,
    rollout_percentage: u8,
    target_device_ids: Option<&[String]>,
    device_id: Option<&str>,
) -> Option<UpdateInfo> {
    let Some(device_id) = device_id else {
        return Some(info);
    };
    if info.status != UpdateStatus::Update {
        return Some(info);
    }
    check_eligibility(&info.id, device_id, Some(rollout_percentage), target_device_ids)
        .then_some(info)
}

// ============================================================================
// SECTION: Tests
// ============================================================================
