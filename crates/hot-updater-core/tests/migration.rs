// crates/hot-updater-core/tests/migration.rs
// ============================================================================
// Module: Storage Migration Tests
// Description: Record keeping, backups, rollback, and dry runs.
// ============================================================================
//! ## Overview
//! Runs migrations against the in-memory object store and inspects the
//! resulting keys.

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

use hot_updater_core::InMemoryObjectStore;
use hot_updater_core::Migration;
use hot_updater_core::MigrationContext;
use hot_updater_core::MigrationError;
use hot_updater_core::Migrator;
use hot_updater_core::ObjectStore;
use hot_updater_core::runtime::ChannelLayoutMigration;
use hot_updater_core::runtime::MIGRATION_RECORD_KEY;
use serde_json::Value;
use serde_json::json;

// ============================================================================
// SECTION: Helpers
// ============================================================================

struct RenameMigration {
    fail: bool,
}

impl Migration for RenameMigration {
    fn name(&self) -> &str {
        "rename"
    }

    fn migrate(&self, context: &mut MigrationContext<'_>) -> Result<(), MigrationError> {
        context.update_file("/config.json", b"{\"v\":2}".to_vec())?;
        context.move_file("ios/a.zip", "production/ios/a.zip")?;
        if self.fail {
            return Err(MigrationError::Invalid("boom".to_string()));
        }
        Ok(())
    }
}

struct SelfMoveMigration;

impl Migration for SelfMoveMigration {
    fn name(&self) -> &str {
        "self-move"
    }

    fn migrate(&self, context: &mut MigrationContext<'_>) -> Result<(), MigrationError> {
        context.move_file("ios/a.zip", "/ios/a.zip")
    }
}

fn seeded_store() -> InMemoryObjectStore {
    let store = InMemoryObjectStore::new();
    store.put("config.json", b"{\"v\":1}".to_vec(), Some("application/json")).unwrap();
    store.put("ios/a.zip", b"zip".to_vec(), None).unwrap();
    store
}

fn read(store: &InMemoryObjectStore, key: &str) -> Option<Vec<u8>> {
    store.get(key).unwrap().map(|object| object.bytes)
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn successful_migration_records_and_removes_backups() {
    let store = seeded_store();
    let report = Migrator::new(&store).run(&[&RenameMigration { fail: false }]).unwrap();
    assert_eq!(report.applied, vec!["rename".to_string()]);
    assert_eq!(read(&store, "config.json").unwrap(), b"{\"v\":2}");
    assert_eq!(store.get("config.json").unwrap().unwrap().content_type.as_deref(), Some("application/json"));
    assert_eq!(read(&store, "production/ios/a.zip").unwrap(), b"zip");
    assert_eq!(read(&store, "ios/a.zip"), None);
    assert_eq!(store.list("backup/").unwrap(), Vec::<String>::new());

    let records: Value = serde_json::from_slice(&read(&store, MIGRATION_RECORD_KEY).unwrap()).unwrap();
    assert_eq!(records[0]["name"], "rename");
    assert!(records[0]["appliedAt"].as_str().unwrap().contains('T'));
}

#[test]
fn applied_migrations_are_skipped() {
    let store = seeded_store();
    let migrator = Migrator::new(&store);
    migrator.run(&[&RenameMigration { fail: false }]).unwrap();
    let report = migrator.run(&[&RenameMigration { fail: true }]).unwrap();
    assert!(report.applied.is_empty());
    assert_eq!(report.skipped, vec!["rename".to_string()]);
}

#[test]
fn failed_migration_restores_backups_and_is_not_recorded() {
    let store = seeded_store();
    let err = Migrator::new(&store).run(&[&RenameMigration { fail: true }]).unwrap_err();
    assert!(matches!(err, MigrationError::Failed { ref name, .. } if name == "rename"));
    assert_eq!(read(&store, "config.json").unwrap(), b"{\"v\":1}");
    assert_eq!(read(&store, "ios/a.zip").unwrap(), b"zip");
    assert_eq!(read(&store, "production/ios/a.zip"), None);
    assert_eq!(read(&store, MIGRATION_RECORD_KEY), None);
}

#[test]
fn moving_a_key_onto_itself_keeps_the_object() {
    let store = seeded_store();
    let report = Migrator::new(&store).run(&[&SelfMoveMigration]).unwrap();
    assert_eq!(report.applied, vec!["self-move".to_string()]);
    assert_eq!(read(&store, "ios/a.zip").unwrap(), b"zip");
    assert_eq!(store.list("backup/").unwrap(), Vec::<String>::new());
}

#[test]
fn dry_run_changes_nothing() {
    let store = seeded_store();
    let report = Migrator::new(&store).dry_run(true).run(&[&RenameMigration { fail: false }]).unwrap();
    assert!(report.dry_run);
    assert_eq!(report.applied, vec!["rename".to_string()]);
    assert_eq!(read(&store, "config.json").unwrap(), b"{\"v\":1}");
    assert_eq!(read(&store, "ios/a.zip").unwrap(), b"zip");
    assert_eq!(store.list("backup/").unwrap(), Vec::<String>::new());
    assert_eq!(read(&store, MIGRATION_RECORD_KEY), None);
}

#[test]
fn malformed_records_are_treated_as_empty() {
    let store = seeded_store();
    store.put(MIGRATION_RECORD_KEY, b"not json".to_vec(), None).unwrap();
    let migrator = Migrator::new(&store);
    assert!(migrator.records().unwrap().is_empty());
    let report = migrator.run(&[&RenameMigration { fail: false }]).unwrap();
    assert_eq!(report.applied.len(), 1);
}

#[test]
fn channel_layout_migration_moves_platform_roots() {
    let store = InMemoryObjectStore::new();
    let manifest = json!([{ "id": "b1", "fileUrl": "https://old/b1.zip", "platform": "ios" }]);
    store.put("update.json", serde_json::to_vec(&manifest).unwrap(), None).unwrap();
    store.put("ios/b1/bundle.zip", b"ios".to_vec(), None).unwrap();
    store.put("android/b2/bundle.zip", b"android".to_vec(), None).unwrap();
    store.put("production/ios/b0/bundle.zip", b"kept".to_vec(), None).unwrap();

    Migrator::new(&store).run(&[&ChannelLayoutMigration]).unwrap();

    let rewritten: Value = serde_json::from_slice(&read(&store, "update.json").unwrap()).unwrap();
    assert_eq!(rewritten, json!([{ "id": "b1", "platform": "ios", "channel": "production" }]));
    assert_eq!(read(&store, "production/ios/b1/bundle.zip").unwrap(), b"ios");
    assert_eq!(read(&store, "production/android/b2/bundle.zip").unwrap(), b"android");
    assert_eq!(read(&store, "production/ios/b0/bundle.zip").unwrap(), b"kept");
    assert_eq!(read(&store, "ios/b1/bundle.zip"), None);
}
