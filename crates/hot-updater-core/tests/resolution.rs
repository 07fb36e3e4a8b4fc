// crates/hot-updater-core/tests/resolution.rs
// ============================================================================
// Module: Update Resolution Tests
// Description: Decision table, filter, and rollout behavior end to end.
// ============================================================================
//! ## Overview
//! Exercises `resolve_update` against small bundle sets covering each branch
//! of the decision table.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

use hot_updater_core::Bundle;
use hot_updater_core::BundleId;
use hot_updater_core::Channel;
use hot_updater_core::NIL_BUNDLE_ID;
use hot_updater_core::Platform;
use hot_updater_core::RequestParts;
use hot_updater_core::ResolutionRequest;
use hot_updater_core::ResolveError;
use hot_updater_core::UpdateStatus;
use hot_updater_core::resolve_update;

// ============================================================================
// SECTION: Helpers
// ============================================================================

const ID_01: &str = "00000000-0000-0000-0000-000000000001";
const ID_02: &str = "00000000-0000-0000-0000-000000000002";
const ID_03: &str = "00000000-0000-0000-0000-000000000003";

fn app_bundle(id: &str, target: &str) -> Bundle {
    Bundle {
        id: BundleId::new(id),
        platform: Platform::Ios,
        channel: Channel::default(),
        enabled: true,
        should_force_update: false,
        file_hash: format!("hash-{id}"),
        git_commit_hash: None,
        message: Some(format!("bundle {id}")),
        target_app_version: Some(target.to_string()),
        fingerprint_hash: None,
        storage_uri: Some(format!("s3://bucket/{id}/bundle.zip")),
        rollout_percentage: 100,
        target_device_ids: None,
        metadata: None,
    }
}

fn fingerprint_bundle(id: &str, fingerprint: &str) -> Bundle {
    Bundle {
        target_app_version: None,
        fingerprint_hash: Some(fingerprint.to_string()),
        ..app_bundle(id, "")
    }
}

fn two_bundles() -> Vec<Bundle> {
    vec![app_bundle(ID_01, "1.x"), app_bundle(ID_02, "1.x")]
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn older_installed_bundle_updates_to_latest() {
    let request = ResolutionRequest::app_version(Platform::Ios, ID_01, "1.0.0");
    let info = resolve_update(&two_bundles(), &request).unwrap();
    assert_eq!(info.id.as_str(), ID_02);
    assert_eq!(info.status, UpdateStatus::Update);
    assert!(!info.should_force_update);
    assert_eq!(info.file_hash.as_deref(), Some("hash-00000000-0000-0000-0000-000000000002"));
}

#[test]
fn latest_installed_bundle_gets_no_change() {
    let request = ResolutionRequest::app_version(Platform::Ios, ID_02, "1.0.0");
    assert_eq!(resolve_update(&two_bundles(), &request), None);
}

#[test]
fn unknown_newer_installed_bundle_rolls_back() {
    let request = ResolutionRequest::app_version(Platform::Ios, ID_03, "1.0.0");
    let info = resolve_update(&two_bundles(), &request).unwrap();
    assert_eq!(info.id.as_str(), ID_02);
    assert_eq!(info.status, UpdateStatus::Rollback);
    assert!(info.should_force_update);
}

#[test]
fn empty_set_rolls_back_to_native() {
    let request = ResolutionRequest::app_version(Platform::Ios, ID_03, "1.0.0");
    let info = resolve_update(&[], &request).unwrap();
    assert!(info.id.is_nil());
    assert_eq!(info.status, UpdateStatus::Rollback);
    assert!(info.should_force_update);
    assert_eq!(info.message, None);
    assert_eq!(info.storage_uri, None);
    assert_eq!(info.file_hash, None);
}

#[test]
fn empty_set_with_nil_or_floor_bundle_gets_no_change() {
    let nil = ResolutionRequest::app_version(Platform::Ios, NIL_BUNDLE_ID, "1.0.0");
    assert_eq!(resolve_update(&[], &nil), None);
    let at_floor =
        ResolutionRequest::app_version(Platform::Ios, ID_02, "1.0.0").with_min_bundle_id(ID_02);
    assert_eq!(resolve_update(&[], &at_floor), None);
    let below_floor =
        ResolutionRequest::app_version(Platform::Ios, ID_01, "1.0.0").with_min_bundle_id(ID_02);
    assert_eq!(resolve_update(&[], &below_floor), None);
}

#[test]
fn fresh_install_updates_to_latest() {
    let request = ResolutionRequest::app_version(Platform::Ios, NIL_BUNDLE_ID, "1.2");
    let info = resolve_update(&two_bundles(), &request).unwrap();
    assert_eq!(info.id.as_str(), ID_02);
    assert_eq!(info.status, UpdateStatus::Update);
}

#[test]
fn rollback_forces_even_when_stored_flag_is_false() {
    let mut bundles = two_bundles();
    bundles[1].enabled = false;
    let request = ResolutionRequest::app_version(Platform::Ios, ID_02, "1.0.0");
    let info = resolve_update(&bundles, &request).unwrap();
    assert_eq!(info.id.as_str(), ID_01);
    assert_eq!(info.status, UpdateStatus::Rollback);
    assert!(info.should_force_update);
}

#[test]
fn stored_force_flag_carries_through_updates() {
    let mut bundles = two_bundles();
    bundles[1].should_force_update = true;
    let request = ResolutionRequest::app_version(Platform::Ios, ID_01, "1.0.0");
    assert!(resolve_update(&bundles, &request).unwrap().should_force_update);
}

#[test]
fn floor_excludes_older_candidates() {
    let request = ResolutionRequest::app_version(Platform::Ios, ID_03, "1.0.0")
        .with_min_bundle_id(ID_02);
    let bundles = vec![app_bundle(ID_01, "1.x")];
    let info = resolve_update(&bundles, &request).unwrap();
    assert!(info.id.is_nil());
}

#[test]
fn incompatible_app_version_sees_no_bundles() {
    let request = ResolutionRequest::app_version(Platform::Ios, NIL_BUNDLE_ID, "2.0.0");
    assert_eq!(resolve_update(&two_bundles(), &request), None);
}

#[test]
fn platform_and_channel_must_match() {
    let mut bundles = two_bundles();
    bundles[1].platform = Platform::Android;
    bundles[0].channel = Channel::new("beta");
    let request = ResolutionRequest::app_version(Platform::Ios, NIL_BUNDLE_ID, "1.0.0");
    assert_eq!(resolve_update(&bundles, &request), None);
    let beta = request.with_channel("beta");
    assert_eq!(resolve_update(&bundles, &beta).unwrap().id.as_str(), ID_01);
}

#[test]
fn fingerprint_strategy_matches_exact_hash() {
    let bundles = vec![fingerprint_bundle(ID_01, "fp-a"), fingerprint_bundle(ID_02, "fp-b")];
    let request = ResolutionRequest::fingerprint(Platform::Ios, NIL_BUNDLE_ID, "fp-a");
    assert_eq!(resolve_update(&bundles, &request).unwrap().id.as_str(), ID_01);
    let none = ResolutionRequest::fingerprint(Platform::Ios, NIL_BUNDLE_ID, "fp-c");
    assert_eq!(resolve_update(&bundles, &none), None);
}

#[test]
fn rollout_gate_vetoes_updates_for_excluded_devices() {
    let mut bundles = two_bundles();
    bundles[1].rollout_percentage = 8;
    let admitted = ResolutionRequest::app_version(Platform::Ios, ID_01, "1.0.0")
        .with_device_id("device-1");
    assert_eq!(resolve_update(&bundles, &admitted).unwrap().id.as_str(), ID_02);
    let rejected = ResolutionRequest::app_version(Platform::Ios, ID_01, "1.0.0")
        .with_device_id("device-3");
    assert_eq!(resolve_update(&bundles, &rejected), None);
}

#[test]
fn device_allow_list_overrides_percentage() {
    let mut bundles = two_bundles();
    bundles[1].rollout_percentage = 0;
    bundles[1].target_device_ids = Some(vec!["device-3".to_string()]);
    let listed = ResolutionRequest::app_version(Platform::Ios, ID_01, "1.0.0")
        .with_device_id("device-3");
    assert_eq!(resolve_update(&bundles, &listed).unwrap().id.as_str(), ID_02);
    let unlisted = ResolutionRequest::app_version(Platform::Ios, ID_01, "1.0.0")
        .with_device_id("device-1");
    assert_eq!(resolve_update(&bundles, &unlisted), None);
}

#[test]
fn rollbacks_bypass_the_rollout_gate() {
    let mut bundles = two_bundles();
    bundles[1].rollout_percentage = 0;
    let request = ResolutionRequest::app_version(Platform::Ios, ID_03, "1.0.0")
        .with_device_id("device-3");
    let info = resolve_update(&bundles, &request).unwrap();
    assert_eq!(info.status, UpdateStatus::Rollback);
    assert_eq!(info.id.as_str(), ID_02);
}

#[test]
fn request_parts_require_a_strategy() {
    let parts = RequestParts {
        platform: Some("ios"),
        bundle_id: Some(ID_01),
        ..RequestParts::default()
    };
    let err = ResolutionRequest::from_parts(&parts).unwrap_err();
    assert!(matches!(err, ResolveError::InvalidInput(_)));

    let parts = RequestParts {
        app_version: Some("1.0.0"),
        ..parts
    };
    let request = ResolutionRequest::from_parts(&parts).unwrap();
    assert_eq!(request.channel.as_str(), "production");
    assert!(request.min_bundle_id.is_nil());
}
