// crates/hot-updater-store-sqlite/tests/sqlite_store.rs
// ============================================================================
// Module: SQLite Store Tests
// Description: Validate the SQLite BundleRepository.
// Purpose: Ensure durable persistence and resolution parity with memory.
// Dependencies: hot-updater-store-sqlite, hot-updater-core, rusqlite, tempfile, proptest
// ============================================================================

//! ## Overview
//! Conformance tests for the SQLite-backed bundle repository. Exercises CRUD,
//! schema versioning, corrupted rows, and randomized equivalence of the
//! resolution query against the in-memory engine.

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

// ============================================================================
// SECTION: Imports
// ============================================================================

use hot_updater_core::Bundle;
use hot_updater_core::BundleId;
use hot_updater_core::BundleQuery;
use hot_updater_core::BundleRepository;
use hot_updater_core::Channel;
use hot_updater_core::InMemoryBundleRepository;
use hot_updater_core::NIL_BUNDLE_ID;
use hot_updater_core::Platform;
use hot_updater_core::RepositoryError;
use hot_updater_core::ResolutionRequest;
use hot_updater_core::UpdateStatus;
use hot_updater_store_sqlite::SqliteBundleRepository;
use hot_updater_store_sqlite::SqliteStoreConfig;
use proptest::prelude::*;
use tempfile::TempDir;

// ============================================================================
// SECTION: Helpers
// ============================================================================

const ID_01: &str = "00000000-0000-0000-0000-000000000001";
const ID_02: &str = "00000000-0000-0000-0000-000000000002";
const ID_03: &str = "00000000-0000-0000-0000-000000000003";

fn open_store(dir: &TempDir) -> SqliteBundleRepository {
    SqliteBundleRepository::new(&SqliteStoreConfig::new(dir.path().join("bundles.sqlite")))
        .expect("open store")
}

fn bundle(id: &str, target: &str) -> Bundle {
    Bundle {
        id: BundleId::new(id),
        platform: Platform::Ios,
        channel: Channel::default(),
        enabled: true,
        should_force_update: false,
        file_hash: format!("hash-{id}"),
        git_commit_hash: Some("deadbeef".to_string()),
        message: Some(format!("bundle {id}")),
        target_app_version: Some(target.to_string()),
        fingerprint_hash: None,
        storage_uri: Some(format!("s3://bucket/{id}/bundle.zip")),
        rollout_percentage: 100,
        target_device_ids: None,
        metadata: None,
    }
}

// ============================================================================
// SECTION: Persistence
// ============================================================================

#[test]
fn sqlite_store_round_trip() {
    let temp = TempDir::new().unwrap();
    let store = open_store(&temp);
    let mut stored = bundle(ID_01, "1.x");
    stored.target_device_ids = Some(vec!["device-1".to_string()]);
    stored.metadata = Some(serde_json::json!({ "app_version": "1.0.0" }));
    store.upsert_bundles(std::slice::from_ref(&stored)).unwrap();
    let loaded = store.get_bundle(&BundleId::new(ID_01)).unwrap().expect("bundle");
    assert_eq!(loaded, stored);
    assert_eq!(store.get_bundle(&BundleId::new(ID_02)).unwrap(), None);
}

#[test]
fn sqlite_store_persists_across_reopen() {
    let temp = TempDir::new().unwrap();
    open_store(&temp).upsert_bundles(&[bundle(ID_01, "1.x")]).unwrap();
    let reopened = open_store(&temp);
    assert!(reopened.get_bundle(&BundleId::new(ID_01)).unwrap().is_some());
}

#[test]
fn sqlite_store_upsert_replaces_existing() {
    let temp = TempDir::new().unwrap();
    let store = open_store(&temp);
    store.upsert_bundles(&[bundle(ID_01, "1.x")]).unwrap();
    let mut changed = bundle(ID_01, "2.x");
    changed.enabled = false;
    store.upsert_bundles(std::slice::from_ref(&changed)).unwrap();
    assert_eq!(store.get_bundle(&BundleId::new(ID_01)).unwrap(), Some(changed));
}

#[test]
fn sqlite_store_rejects_invalid_batch_atomically() {
    let temp = TempDir::new().unwrap();
    let store = open_store(&temp);
    let mut invalid = bundle(ID_02, "1.x");
    invalid.fingerprint_hash = Some("fp".to_string());
    let result = store.upsert_bundles(&[bundle(ID_01, "1.x"), invalid]);
    assert!(matches!(result, Err(RepositoryError::Invalid(_))));
    assert_eq!(store.get_bundle(&BundleId::new(ID_01)).unwrap(), None);
}

#[test]
fn sqlite_store_delete_reports_existence() {
    let temp = TempDir::new().unwrap();
    let store = open_store(&temp);
    store.upsert_bundles(&[bundle(ID_01, "1.x")]).unwrap();
    assert!(store.delete_bundle(&BundleId::new(ID_01)).unwrap());
    assert!(!store.delete_bundle(&BundleId::new(ID_01)).unwrap());
}

#[test]
fn sqlite_store_lists_with_filters_and_pages() {
    let temp = TempDir::new().unwrap();
    let store = open_store(&temp);
    let mut beta = bundle(ID_02, "1.x");
    beta.channel = Channel::new("beta");
    let mut android = bundle(ID_03, "1.x");
    android.platform = Platform::Android;
    store.upsert_bundles(&[bundle(ID_01, "1.x"), beta, android]).unwrap();

    let all = store.list_bundles(&BundleQuery::default()).unwrap();
    let ids: Vec<&str> = all.data.iter().map(|bundle| bundle.id.as_str()).collect();
    assert_eq!(ids, vec![ID_03, ID_02, ID_01]);
    assert_eq!(all.pagination.total, 3);

    let page = store
        .list_bundles(&BundleQuery {
            limit: 1,
            offset: 1,
            ..BundleQuery::default()
        })
        .unwrap();
    assert_eq!(page.data.len(), 1);
    assert_eq!(page.data[0].id.as_str(), ID_02);
    assert!(page.pagination.has_next_page);
    assert!(page.pagination.has_previous_page);

    let ios_production = store
        .list_bundles(&BundleQuery {
            channel: Some(Channel::default()),
            platform: Some(Platform::Ios),
            ..BundleQuery::default()
        })
        .unwrap();
    assert_eq!(ios_production.data.len(), 1);
    assert_eq!(ios_production.pagination.total, 1);

    let channels = store.channels().unwrap();
    assert_eq!(channels, vec![Channel::new("beta"), Channel::new("production")]);
}

#[test]
fn sqlite_store_reports_target_versions_per_platform() {
    let temp = TempDir::new().unwrap();
    let store = open_store(&temp);
    let mut android = bundle(ID_03, "3.x");
    android.platform = Platform::Android;
    store.upsert_bundles(&[bundle(ID_01, "1.x"), bundle(ID_02, "1.x"), android]).unwrap();
    assert_eq!(store.target_app_versions(Platform::Ios).unwrap(), vec!["1.x".to_string()]);
    assert_eq!(store.target_app_versions(Platform::Android).unwrap(), vec!["3.x".to_string()]);
}

#[test]
fn sqlite_store_rejects_unknown_schema_version() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("bundles.sqlite");
    drop(open_store(&temp));
    let connection = rusqlite::Connection::open(&path).unwrap();
    connection.execute("UPDATE store_meta SET version = 99", []).unwrap();
    drop(connection);
    let result = SqliteBundleRepository::new(&SqliteStoreConfig::new(&path));
    assert!(result.is_err());
}

#[test]
fn sqlite_store_rejects_directory_path() {
    let temp = TempDir::new().unwrap();
    let result = SqliteBundleRepository::new(&SqliteStoreConfig::new(temp.path()));
    assert!(result.is_err());
}

#[test]
fn sqlite_store_tolerates_malformed_device_list() {
    let temp = TempDir::new().unwrap();
    let store = open_store(&temp);
    store.upsert_bundles(&[bundle(ID_01, "1.x")]).unwrap();
    let connection = rusqlite::Connection::open(temp.path().join("bundles.sqlite")).unwrap();
    connection
        .execute(
            "UPDATE bundles SET target_device_ids = 'not json', rollout_percentage = 0",
            [],
        )
        .unwrap();
    drop(connection);
    let loaded = store.get_bundle(&BundleId::new(ID_01)).unwrap().expect("bundle");
    assert_eq!(loaded.target_device_ids, None);
    let request = ResolutionRequest::app_version(Platform::Ios, NIL_BUNDLE_ID, "1.0.0")
        .with_device_id("device-1");
    assert_eq!(store.get_update_info(&request).unwrap(), None);
}

// ============================================================================
// SECTION: Resolution
// ============================================================================

#[test]
fn sqlite_resolution_follows_decision_table() {
    let temp = TempDir::new().unwrap();
    let store = open_store(&temp);
    store.upsert_bundles(&[bundle(ID_01, "1.x"), bundle(ID_02, "1.x")]).unwrap();

    let update = ResolutionRequest::app_version(Platform::Ios, ID_01, "1.0.0");
    let info = store.get_update_info(&update).unwrap().expect("update");
    assert_eq!(info.id.as_str(), ID_02);
    assert_eq!(info.status, UpdateStatus::Update);
    assert!(!info.should_force_update);
    assert_eq!(info.message.as_deref(), Some("bundle 00000000-0000-0000-0000-000000000002"));

    let current = ResolutionRequest::app_version(Platform::Ios, ID_02, "1.0.0");
    assert_eq!(store.get_update_info(&current).unwrap(), None);

    let newer = ResolutionRequest::app_version(Platform::Ios, ID_03, "1.0.0");
    let info = store.get_update_info(&newer).unwrap().expect("rollback");
    assert_eq!(info.id.as_str(), ID_02);
    assert_eq!(info.status, UpdateStatus::Rollback);
    assert!(info.should_force_update);

    let other_version = ResolutionRequest::app_version(Platform::Ios, ID_03, "2.0.0");
    let info = store.get_update_info(&other_version).unwrap().expect("native rollback");
    assert!(info.id.is_nil());
    assert_eq!(info.status, UpdateStatus::Rollback);
    assert_eq!(info.file_hash, None);
}

#[test]
fn sqlite_resolution_honors_floor_and_fingerprint() {
    let temp = TempDir::new().unwrap();
    let store = open_store(&temp);
    let mut fingerprinted = bundle(ID_02, "");
    fingerprinted.target_app_version = None;
    fingerprinted.fingerprint_hash = Some("fp-1".to_string());
    store.upsert_bundles(&[bundle(ID_01, "1.x"), fingerprinted]).unwrap();

    let matching = ResolutionRequest::fingerprint(Platform::Ios, NIL_BUNDLE_ID, "fp-1");
    assert_eq!(store.get_update_info(&matching).unwrap().unwrap().id.as_str(), ID_02);
    let other = ResolutionRequest::fingerprint(Platform::Ios, NIL_BUNDLE_ID, "fp-2");
    assert_eq!(store.get_update_info(&other).unwrap(), None);

    let floored =
        ResolutionRequest::app_version(Platform::Ios, ID_03, "1.0.0").with_min_bundle_id(ID_02);
    let info = store.get_update_info(&floored).unwrap().expect("native rollback");
    assert!(info.id.is_nil());
    let at_floor =
        ResolutionRequest::app_version(Platform::Ios, ID_02, "1.0.0").with_min_bundle_id(ID_02);
    assert_eq!(store.get_update_info(&at_floor).unwrap(), None);
}

#[test]
fn sqlite_resolution_applies_rollout_gate() {
    let temp = TempDir::new().unwrap();
    let store = open_store(&temp);
    let mut staged = bundle(ID_02, "1.x");
    staged.rollout_percentage = 8;
    store.upsert_bundles(&[bundle(ID_01, "1.x"), staged]).unwrap();
    let admitted =
        ResolutionRequest::app_version(Platform::Ios, ID_01, "1.0.0").with_device_id("device-1");
    assert_eq!(store.get_update_info(&admitted).unwrap().unwrap().id.as_str(), ID_02);
    let rejected =
        ResolutionRequest::app_version(Platform::Ios, ID_01, "1.0.0").with_device_id("device-3");
    assert_eq!(store.get_update_info(&rejected).unwrap(), None);
    let anonymous = ResolutionRequest::app_version(Platform::Ios, ID_01, "1.0.0");
    assert_eq!(store.get_update_info(&anonymous).unwrap().unwrap().id.as_str(), ID_02);
}

// ============================================================================
// SECTION: Equivalence
// ============================================================================

fn bundle_id(n: u8) -> String {
    format!("00000000-0000-0000-0000-0000000000{n:02}")
}

fn arb_bundle() -> impl Strategy<Value = Bundle> {
    (
        1_u8..12,
        any::<bool>(),
        any::<bool>(),
        prop::sample::select(vec![Platform::Ios, Platform::Android]),
        prop::sample::select(vec!["production", "beta"]),
        prop::sample::select(vec!["1.x", "1.2.x", "2.0.0", "*", "fp:a", "fp:b"]),
        prop::sample::select(vec![0_u8, 40, 100]),
        any::<bool>(),
    )
        .prop_map(|(n, enabled, force, platform, channel, target, rollout, allow_list)| {
            let (target_app_version, fingerprint_hash) = match target.strip_prefix("fp:") {
                Some(fingerprint) => (None, Some(fingerprint.to_string())),
                None => (Some(target.to_string()), None),
            };
            Bundle {
                id: BundleId::new(bundle_id(n)),
                platform,
                channel: Channel::new(channel),
                enabled,
                should_force_update: force,
                file_hash: format!("hash-{n}"),
                git_commit_hash: None,
                message: Some(format!("message-{n}")),
                target_app_version,
                fingerprint_hash,
                storage_uri: Some(format!("s3://bucket/{n}")),
                rollout_percentage: rollout,
                target_device_ids: allow_list.then(|| vec!["device-1".to_string()]),
                metadata: None,
            }
        })
}

fn arb_request() -> impl Strategy<Value = ResolutionRequest> {
    (
        prop::sample::select(vec![Platform::Ios, Platform::Android]),
        0_u8..14,
        0_u8..14,
        prop::sample::select(vec!["production", "beta"]),
        prop::sample::select(vec!["1.0.0", "1.2.3", "2.0.0", "fp:a", "fp:b"]),
        prop::sample::select(vec![None, Some("device-1"), Some("device-2"), Some("device-3")]),
    )
        .prop_map(|(platform, installed, floor, channel, strategy, device)| {
            let request = match strategy.strip_prefix("fp:") {
                Some(fingerprint) => {
                    ResolutionRequest::fingerprint(platform, bundle_id(installed), fingerprint)
                }
                None => ResolutionRequest::app_version(platform, bundle_id(installed), strategy),
            }
            .with_channel(channel)
            .with_min_bundle_id(bundle_id(floor));
            match device {
                Some(device) => request.with_device_id(device),
                None => request,
            }
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn sqlite_resolution_matches_in_memory(
        bundles in prop::collection::vec(arb_bundle(), 0..8),
        requests in prop::collection::vec(arb_request(), 1..6),
    ) {
        let temp = TempDir::new().unwrap();
        let store = open_store(&temp);
        store.upsert_bundles(&bundles).unwrap();
        let memory = InMemoryBundleRepository::with_bundles(&bundles).unwrap();
        for request in &requests {
            let expected = memory.get_update_info(request).unwrap();
            let actual = store.get_update_info(request).unwrap();
            prop_assert_eq!(actual, expected);
        }
    }
}
