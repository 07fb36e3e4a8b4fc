// crates/hot-updater-core/src/runtime/filter.rs
// ============================================================================
// Module: Hot Updater Candidate Filter
// Description: Eligibility filter over a bundle set.
// Purpose: Select bundles a device may receive before the decision table runs.
// Dependencies: crate::core, crate::runtime::version
// ============================================================================

//! ## Overview
//! A bundle is a candidate when it is enabled, matches the request's platform
//! and channel, has an id at or above `minBundleId`, and satisfies the
//! request's strategy: an exact fingerprint match, or a target app version in
//! the compatible set for the device's app version.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use crate::core::Bundle;
use crate::core::Platform;
use crate::core::ResolutionRequest;
use crate::core::UpdateStrategy;
use crate::runtime::version::filter_compatible_app_versions;

// ============================================================================
// SECTION: Filtering
// ============================================================================

/// Returns the distinct target app versions used by a platform's bundles.
#[must_use]
pub fn target_version_groups(bundles: &[Bundle], platform: Platform) -> Vec<String> {
    let groups: BTreeSet<&str> = bundles
        .iter()
        .filter(|bundle| bundle.platform == platform)
        .filter_map(|bundle| bundle.target_app_version.as_deref())
        .collect();
    groups.into_iter().map(str::to_string).collect()
}

/// Returns the bundles eligible for a request, in input order.
#[must_use]
pub fn filter_candidates<'a>(bundles: &'a [Bundle], request: &ResolutionRequest) -> Vec<&'a Bundle> {
    let compatible = match &request.strategy {
        UpdateStrategy::AppVersion {
            app_version,
        } => {
            let groups = target_version_groups(bundles, request.platform);
            Some(filter_compatible_app_versions(&groups, app_version))
        }
        UpdateStrategy::Fingerprint {
            ..
        } => None,
    };
    bundles
        .iter()
        .filter(|bundle| {
            bundle.enabled
                && bundle.platform == request.platform
                && bundle.channel == request.channel
                && bundle.id >= request.min_bundle_id
        })
        .filter(|bundle| match (&request.strategy, &compatible) {
            (
                UpdateStrategy::Fingerprint {
                    fingerprint_hash,
                },
                _,
            ) => bundle.fingerprint_hash.as_deref() == Some(fingerprint_hash.as_str()),
            (_, Some(versions)) => bundle
                .target_app_version
                .as_ref()
                .is_some_and(|target| versions.iter().any(|version| version == target)),
            (_, None) => false,
        })
        .collect()
}
