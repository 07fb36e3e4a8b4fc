// crates/hot-updater-core/tests/memory_repository.rs
// ============================================================================
// Module: In-Memory Repository Tests
// Description: Listing, pagination, validation, and channel queries.
// ============================================================================
//! ## Overview
//! Validates the in-memory bundle repository used by the `memory` store type.

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
use hot_updater_core::BundleQuery;
use hot_updater_core::BundleRepository;
use hot_updater_core::Channel;
use hot_updater_core::InMemoryBundleRepository;
use hot_updater_core::Platform;
use hot_updater_core::RepositoryError;
use hot_updater_core::ResolutionRequest;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn bundle(id: &str, platform: Platform, channel: &str) -> Bundle {
    Bundle {
        id: BundleId::new(id),
        platform,
        channel: Channel::new(channel),
        enabled: true,
        should_force_update: false,
        file_hash: "abc".to_string(),
        git_commit_hash: None,
        message: None,
        target_app_version: Some("1.x".to_string()),
        fingerprint_hash: None,
        storage_uri: None,
        rollout_percentage: 100,
        target_device_ids: None,
        metadata: None,
    }
}

fn seeded() -> InMemoryBundleRepository {
    InMemoryBundleRepository::with_bundles(&[
        bundle("b1", Platform::Ios, "production"),
        bundle("b2", Platform::Android, "production"),
        bundle("b3", Platform::Ios, "beta"),
        bundle("b4", Platform::Ios, "production"),
    ])
    .unwrap()
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn lists_by_id_descending_with_pagination() {
    let repository = seeded();
    let query = BundleQuery {
        limit: 2,
        ..BundleQuery::default()
    };
    let page = repository.list_bundles(&query).unwrap();
    let ids: Vec<&str> = page.data.iter().map(|b| b.id.as_str()).collect();
    assert_eq!(ids, vec!["b4", "b3"]);
    assert_eq!(page.pagination.total, 4);
    assert!(page.pagination.has_next_page);
    assert!(!page.pagination.has_previous_page);
    assert_eq!(page.pagination.total_pages, 2);

    let second = repository.list_bundles(&BundleQuery { offset: 2, ..query }).unwrap();
    assert_eq!(second.data.len(), 2);
    assert_eq!(second.pagination.current_page, 2);
    assert!(!second.pagination.has_next_page);
}

#[test]
fn list_filters_by_channel_and_platform() {
    let repository = seeded();
    let query = BundleQuery {
        channel: Some(Channel::new("production")),
        platform: Some(Platform::Ios),
        ..BundleQuery::default()
    };
    let page = repository.list_bundles(&query).unwrap();
    let ids: Vec<&str> = page.data.iter().map(|b| b.id.as_str()).collect();
    assert_eq!(ids, vec!["b4", "b1"]);
}

#[test]
fn upsert_replaces_and_delete_reports_presence() {
    let repository = seeded();
    let mut updated = bundle("b1", Platform::Ios, "production");
    updated.message = Some("patched".to_string());
    repository.upsert_bundles(&[updated]).unwrap();
    let fetched = repository.get_bundle(&BundleId::new("b1")).unwrap().unwrap();
    assert_eq!(fetched.message.as_deref(), Some("patched"));
    assert!(repository.delete_bundle(&BundleId::new("b1")).unwrap());
    assert!(!repository.delete_bundle(&BundleId::new("b1")).unwrap());
    assert_eq!(repository.get_bundle(&BundleId::new("b1")).unwrap(), None);
}

#[test]
fn upsert_rejects_invalid_bundles_atomically() {
    let repository = InMemoryBundleRepository::new();
    let mut invalid = bundle("b2", Platform::Ios, "production");
    invalid.fingerprint_hash = Some("fp".to_string());
    let err = repository.upsert_bundles(&[bundle("b1", Platform::Ios, "production"), invalid]).unwrap_err();
    assert!(matches!(err, RepositoryError::Invalid(_)));
    assert_eq!(repository.get_bundle(&BundleId::new("b1")).unwrap(), None);
}

#[test]
fn channels_are_distinct_and_sorted() {
    let channels = seeded().channels().unwrap();
    let names: Vec<&str> = channels.iter().map(Channel::as_str).collect();
    assert_eq!(names, vec!["beta", "production"]);
}

#[test]
fn update_info_runs_the_reference_engine() {
    let repository = seeded();
    let request = ResolutionRequest::app_version(Platform::Ios, "b1", "1.4.0");
    let info = repository.get_update_info(&request).unwrap().unwrap();
    assert_eq!(info.id.as_str(), "b4");
    assert_eq!(repository.target_app_versions(Platform::Ios).unwrap(), vec!["1.x".to_string()]);
}
