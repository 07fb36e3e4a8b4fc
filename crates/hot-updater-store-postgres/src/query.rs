// crates/hot-updater-store-postgres/src/query.rs
// ============================================================================
// Module: Postgres Resolution Queries
// Description: Static SQL for schema, resolution, and bundle management.
// Purpose: Keep every statement parameterized and free of data-built text.
// Dependencies: none
// ============================================================================

//! ## Overview
//! Parameters of the resolution statement:
//!
//! - `$1` platform, `$2` installed bundle id, `$3` floor bundle id
//! - `$4` channel, `$5` the NIL id
//! - `$6` a `text[]` of compatible target versions, or a fingerprint hash
//!
//! Identifier comparisons are forced to the `"C"` collation.

// ============================================================================
// SECTION: Resolution
// ============================================================================

/// Builds the resolution statement around a strategy predicate.
macro_rules! update_info_sql {
    ($predicate:literal) => {
        concat!(
            "WITH input AS (
                SELECT $1::text AS app_platform, $2::text AS bundle_id,
                       $3::text AS min_bundle_id, $4::text AS channel, $5::text AS nil_uuid
            ),
            candidates AS (
                SELECT b.id, b.should_force_update, b.message, b.storage_uri, b.file_hash,
                       b.rollout_percentage, b.target_device_ids
                FROM bundles b, input
                WHERE b.enabled = TRUE
                  AND b.platform = input.app_platform
                  AND b.channel = input.channel
                  AND b.id COLLATE \"C\" >= input.min_bundle_id COLLATE \"C\"
                  AND ",
            $predicate,
            "
            ),
            update_candidate AS (
                SELECT c.id, c.should_force_update, c.message, 'UPDATE'::text AS status,
                       c.storage_uri, c.file_hash, c.rollout_percentage, c.target_device_ids
                FROM candidates c, input
                WHERE input.bundle_id = input.nil_uuid
                   OR c.id COLLATE \"C\" >= input.bundle_id COLLATE \"C\"
                ORDER BY c.id COLLATE \"C\" DESC
                LIMIT 1
            ),
            rollback_candidate AS (
                SELECT c.id, TRUE AS should_force_update, c.message, 'ROLLBACK'::text AS status,
                       c.storage_uri, c.file_hash, c.rollout_percentage, c.target_device_ids
                FROM candidates c, input
                WHERE input.bundle_id <> input.nil_uuid
                  AND c.id COLLATE \"C\" < input.bundle_id COLLATE \"C\"
                ORDER BY c.id COLLATE \"C\" DESC
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
            SELECT input.nil_uuid, TRUE, NULL::text, 'ROLLBACK'::text, NULL::text, NULL::text,
                   100, NULL::text
            FROM input
            WHERE (SELECT COUNT(*) FROM final_result) = 0
              AND input.bundle_id <> input.nil_uuid
              AND input.bundle_id COLLATE \"C\" > input.min_bundle_id COLLATE \"C\""
        )
    };
}

/// Resolution statement for the app-version strategy.
pub const APP_VERSION_UPDATE_SQL: &str =
    update_info_sql!("b.target_app_version = ANY($6::text[])");

/// Resolution statement for the fingerprint strategy.
pub const FINGERPRINT_UPDATE_SQL: &str = update_info_sql!("b.fingerprint_hash = $6::text");

/// Distinct target-version groups per platform.
pub const TARGET_APP_VERSIONS_SQL: &str = "SELECT target_app_version FROM bundles
     WHERE platform = $1 AND target_app_version IS NOT NULL
     GROUP BY target_app_version
     ORDER BY target_app_version COLLATE \"C\"";

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
    ") VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
     ON CONFLICT (id) DO UPDATE SET
        platform = EXCLUDED.platform,
        channel = EXCLUDED.channel,
        enabled = EXCLUDED.enabled,
        should_force_update = EXCLUDED.should_force_update,
        file_hash = EXCLUDED.file_hash,
        git_commit_hash = EXCLUDED.git_commit_hash,
        message = EXCLUDED.message,
        target_app_version = EXCLUDED.target_app_version,
        fingerprint_hash = EXCLUDED.fingerprint_hash,
        storage_uri = EXCLUDED.storage_uri,
        rollout_percentage = EXCLUDED.rollout_percentage,
        target_device_ids = EXCLUDED.target_device_ids,
        metadata = EXCLUDED.metadata"
);

/// Fetches one bundle by id.
pub const GET_BUNDLE_SQL: &str = concat!("SELECT ", bundle_columns!(), " FROM bundles WHERE id = $1");

/// Lists bundles with optional channel and platform filters.
pub const LIST_BUNDLES_SQL: &str = concat!(
    "SELECT ",
    bundle_columns!(),
    " FROM bundles
     WHERE ($1::text IS NULL OR channel = $1::text)
       AND ($2::text IS NULL OR platform = $2::text)
     ORDER BY id COLLATE \"C\" DESC
     LIMIT $3 OFFSET $4"
);

/// Counts bundles matching the list filters.
pub const COUNT_BUNDLES_SQL: &str = "SELECT COUNT(*) FROM bundles
     WHERE ($1::text IS NULL OR channel = $1::text)
       AND ($2::text IS NULL OR platform = $2::text)";

/// Deletes one bundle.
pub const DELETE_BUNDLE_SQL: &str = "DELETE FROM bundles WHERE id = $1";

/// Distinct channels.
pub const CHANNELS_SQL: &str =
    "SELECT DISTINCT channel COLLATE \"C\" AS channel FROM bundles ORDER BY 1";

// ============================================================================
// SECTION: Schema
// ============================================================================

/// Schema version table.
pub const META_SQL: &str = "CREATE TABLE IF NOT EXISTS store_meta (version BIGINT NOT NULL)";

/// Bundle table and indexes.
pub const SCHEMA_SQL: &str = "CREATE TABLE IF NOT EXISTS bundles (
        id TEXT PRIMARY KEY,
        platform TEXT NOT NULL CHECK (platform IN ('ios', 'android')),
        channel TEXT NOT NULL DEFAULT 'production',
        enabled BOOLEAN NOT NULL,
        should_force_update BOOLEAN NOT NULL,
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
