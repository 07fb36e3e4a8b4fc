// crates/hot-updater-store-sqlite/src/query.rs
// ============================================================================
// Module: SQLite Resolution Queries
// Description: Static SQL for schema, resolution, and bundle management.
// Purpose: Keep every statement parameterized and free of data-built text.
// Dependencies: none
// ============================================================================

//! ## Overview
//! The resolution statement is assembled at compile time from a shared CTE
//! skeleton and one strategy predicate. Parameters:
//!
//! - `?1` platform, `?2` installed bundle id, `?3` floor bundle id
//! - `?4` channel, `?5` the NIL id
//! - `?6` the strategy value: a JSON array of compatible target versions
//!   (consumed with `json_each`) or a fingerprint hash
//!
//! Output columns: `id`, `should_force_update`, `message`, `status`,
//! `storage_uri`, `file_hash`, `rollout_percentage`, `target_device_ids`.

// ============================================================================
// SECTION: Resolution
// ============================================================================

/// Builds the resolution statement around a strategy predicate.
macro_rules! update_info_sql {
    ($predicate:literal) => {
        concat!(
            "WITH input AS (
                SELECT ?1 AS app_platform, ?2 AS bundle_id, ?3 AS min_bundle_id,
                       ?4 AS channel, ?5 AS nil_uuid
            ),
            candidates AS (
                SELECT b.id, b.should_force_update, b.message, b.storage_uri, b.file_hash,
                       b.rollout_percentage, b.target_device_ids
                FROM bundles b, input
                WHERE b.enabled = 1
                  AND b.platform = input.app_platform
                  AND b.channel = input.channel
                  AND b.id >= input.min_bundle_id
                  AND ",
            $predicate,
            "
            ),
            update_candidate AS (
                SELECT c.id, c.should_force_update, c.message, 'UPDATE' AS status,
                       c.storage_uri, c.file_hash, c.rollout_percentage, c.target_device_ids
                FROM candidates c, input
                WHERE input.bundle_id = input.nil_uuid OR c.id >= input.bundle_id
                ORDER BY c.id DESC
                LIMIT 1
            ),
            rollback_candidate AS (
                SELECT c.id, 1 AS should_force_update, c.message, 'ROLLBACK' AS status,
                       c.storage_uri, c.file_hash, c.rollout_percentage, c.target_device_ids
                FROM candidates c, input
                WHERE input.bundle_id <> input.nil_uuid AND c.id < input.bundle_id
                ORDER BY c.id DESC
                LIMIT 1
            ),
            final_result AS (
                SELECT * FROM update_candidate
                UNION ALL
                SELECT * FROM rollback_candidate
                WHERE NOT EXISTS (SELECT 1 FROM update_candidate)
            )
            SELECT final_result.id, final_result.should_force_update, final_result.message,
                   final_result.status, final_result.storage_uri, final_result.file_hash,
                   final_result.rollout_percentage, final_result.target_device_ids
            FROM final_result, input
            WHERE final_result.id <> input.bundle_id
            UNION ALL
            SELECT input.nil_uuid, 1, NULL, 'ROLLBACK', NULL, NULL, 100, NULL
            FROM input
            WHERE (SELECT COUNT(*) FROM final_result) = 0
              AND input.bundle_id <> input.nil_uuid
              AND input.bundle_id > input.min_bundle_id"
        )
    };
}

/// Resolution statement for the app-version strategy.
pub const APP_VERSION_UPDATE_SQL: &str =
    update_info_sql!("b.target_app_version IN (SELECT value FROM json_each(?6))");

/// Resolution statement for the fingerprint strategy.
pub const FINGERPRINT_UPDATE_SQL: &str = update_info_sql!("b.fingerprint_hash = ?6");

/// Distinct target-version groups per platform.
pub const TARGET_APP_VERSIONS_SQL: &str = "SELECT target_app_version FROM bundles
     WHERE platform = ?1 AND target_app_version IS NOT NULL
     GROUP BY target_app_version
     ORDER BY target_app_version";

// ============================================================================
// SECTION: Bundle Management
// ============================================================================

/// Bundle columns in row-mapping order.
macro_rules! bundle_columns {
    () => {
        "id, platform, channel, enabled, should_force_update, file_hash, git_commit_hash, \
         message, target_app_version, fingerprint_hash, storage_uri, rollout_percentage, \
         target_device_ids, metadata"
    };
}

/// Inserts or replaces one bundle.
pub const UPSERT_BUNDLE_SQL: &str = concat!(
    "INSERT INTO bundles (",
    bundle_columns!(),
    ") VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
     ON CONFLICT(id) DO UPDATE SET
        platform = excluded.platform,
        channel = excluded.channel,
        enabled = excluded.enabled,
        should_force_update = excluded.should_force_update,
        file_hash = excluded.file_hash,
        git_commit_hash = excluded.git_commit_hash,
        message = excluded.message,
        target_app_version = excluded.target_app_version,
        fingerprint_hash = excluded.fingerprint_hash,
        storage_uri = excluded.storage_uri,
        rollout_percentage = excluded.rollout_percentage,
        target_device_ids = excluded.target_device_ids,
        metadata = excluded.metadata"
);

/// Fetches one bundle by id.
pub const GET_BUNDLE_SQL: &str = concat!("SELECT ", bundle_columns!(), " FROM bundles WHERE id = ?1");

/// Lists bundles with optional channel and platform filters.
pub const LIST_BUNDLES_SQL: &str = concat!(
    "SELECT ",
    bundle_columns!(),
    " FROM bundles
     WHERE (?1 IS NULL OR channel = ?1) AND (?2 IS NULL OR platform = ?2)
     ORDER BY id DESC
     LIMIT ?3 OFFSET ?4"
);

/// Counts bundles matching the list filters.
pub const COUNT_BUNDLES_SQL: &str = "SELECT COUNT(*) FROM bundles
     WHERE (?1 IS NULL OR channel = ?1) AND (?2 IS NULL OR platform = ?2)";

/// Deletes one bundle.
pub const DELETE_BUNDLE_SQL: &str = "DELETE FROM bundles WHERE id = ?1";

/// Distinct channels.
pub const CHANNELS_SQL: &str = "SELECT DISTINCT channel FROM bundles ORDER BY channel";

// ============================================================================
// SECTION: Schema
// ============================================================================

/// Bundle table and indexes.
pub const SCHEMA_SQL: &str = "CREATE TABLE IF NOT EXISTS bundles (
        id TEXT PRIMARY KEY,
        platform TEXT NOT NULL CHECK (platform IN ('ios', 'android')),
        channel TEXT NOT NULL DEFAULT 'production',
        enabled INTEGER NOT NULL,
        should_force_update INTEGER NOT NULL,
        file_hash TEXT NOT NULL,
        git_commit_hash TEXT,
        message TEXT,
        target_app_version TEXT,
        fingerprint_hash TEXT,
        storage_uri TEXT,
        rollout_percentage INTEGER NOT NULL DEFAULT 100
            CHECK (rollout_percentage BETWEEN 0 AND 100),
        target_device_ids TEXT,
        metadata TEXT
    );
    CREATE INDEX IF NOT EXISTS idx_bundles_platform_channel_enabled
        ON bundles (platform, channel, enabled);
    CREATE INDEX IF NOT EXISTS idx_bundles_target_app_version
        ON bundles (target_app_version);
    CREATE INDEX IF NOT EXISTS idx_bundles_fingerprint_hash
        ON bundles (fingerprint_hash);";
