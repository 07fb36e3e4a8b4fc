// crates/hot-updater-core/src/core/bundle.rs
// ============================================================================
// Module: Hot Updater Bundle Records
// Description: Published bundle metadata and listing pages.
// Purpose: Define the persisted bundle record shared by every repository.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! A [`Bundle`] is one published update artifact. Field names serialize in
//! camelCase to match the wire contract. Exactly one targeting field is set per
//! bundle: `target_app_version` for the app-version strategy or
//! `fingerprint_hash` for the fingerprint strategy.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde_json::Value;

use crate::core::identifiers::BundleId;
use crate::core::identifiers::Channel;
use crate::core::identifiers::Platform;
use crate::core::request::ResolveError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Rollout percentage applied when a bundle does not specify one.
pub const DEFAULT_ROLLOUT_PERCENTAGE: u8 = 100;
/// Default page size for bundle listings.
pub const DEFAULT_PAGE_LIMIT: u32 = 50;
/// Maximum page size for bundle listings.
pub const MAX_PAGE_LIMIT: u32 = 500;

// ============================================================================
// SECTION: Bundle
// ============================================================================

/// Published update artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bundle {
    /// Time-ordered bundle identifier.
    pub id: BundleId,
    /// Target platform.
    pub platform: Platform,
    /// Release channel.
    #[serde(default)]
    pub channel: Channel,
    /// Disabled bundles are retained but never resolved.
    pub enabled: bool,
    /// Advisory force flag surfaced to the client.
    pub should_force_update: bool,
    /// Artifact content hash, plain hex or signed form.
    pub file_hash: String,
    /// Source revision of the bundle.
    #[serde(default)]
    pub git_commit_hash: Option<String>,
    /// Release note shown to the client.
    #[serde(default)]
    pub message: Option<String>,
    /// Semver range for the app-version strategy.
    #[serde(default)]
    pub target_app_version: Option<String>,
    /// Native build fingerprint for the fingerprint strategy.
    #[serde(default)]
    pub fingerprint_hash: Option<String>,
    /// Storage location; the scheme selects the storage adapter.
    #[serde(default)]
    pub storage_uri: Option<String>,
    /// Share of devices admitted to this bundle.
    #[serde(default = "default_rollout_percentage", deserialize_with = "deserialize_rollout")]
    pub rollout_percentage: u8,
    /// Explicit device allow-list.
    #[serde(default)]
    pub target_device_ids: Option<Vec<String>>,
    /// Free-form metadata.
    #[serde(default)]
    pub metadata: Option<Value>,
}

impl Bundle {
    /// Validates publisher-supplied bundle data before it is stored.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::InvalidInput`] when the bundle is malformed.
    pub fn validate(&self) -> Result<(), ResolveError> {
        let id = self.id.as_str();
        if id.trim().is_empty() {
            return Err(ResolveError::InvalidInput("bundle id must be set".to_string()));
        }
        if self.id.is_nil() {
            return Err(ResolveError::InvalidInput(
                "bundle id must not be the reserved nil id".to_string(),
            ));
        }
        if self.channel.as_str().trim().is_empty() {
            return Err(ResolveError::InvalidInput(format!("bundle {id} channel must be set")));
        }
        if self.rollout_percentage > 100 {
            return Err(ResolveError::InvalidInput(format!(
                "bundle {id} rollout percentage must be between 0 and 100"
            )));
        }
        let has_version = self.target_app_version.as_deref().is_some_and(|v| !v.trim().is_empty());
        let has_fingerprint =
            self.fingerprint_hash.as_deref().is_some_and(|v| !v.trim().is_empty());
        if has_version == has_fingerprint {
            return Err(ResolveError::InvalidInput(format!(
                "bundle {id} must set exactly one of targetAppVersion or fingerprintHash"
            )));
        }
        Ok(())
    }
}

/// Returns the default rollout percentage.
const fn default_rollout_percentage() -> u8 {
    DEFAULT_ROLLOUT_PERCENTAGE
}

/// Treats an explicit `null` rollout percentage as the default.
fn deserialize_rollout<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<u8>::deserialize(deserializer)?.unwrap_or(DEFAULT_ROLLOUT_PERCENTAGE))
}

/// Parses a stored device allow-list.
///
/// Arrays keep their string entries; JSON text holding an array is decoded the
/// same way. Anything else means "no allow-list".
#[must_use]
pub fn parse_target_device_ids(value: &Value) -> Option<Vec<String>> {
    match value {
        Value::Array(items) => {
            Some(items.iter().filter_map(|item| item.as_str().map(str::to_string)).collect())
        }
        Value::String(text) => match serde_json::from_str::<Value>(text) {
            Ok(Value::Array(items)) => {
                Some(items.iter().filter_map(|item| item.as_str().map(str::to_string)).collect())
            }
            _ => None,
        },
        _ => None,
    }
}

// ============================================================================
// SECTION: Listing
// ============================================================================

/// Filters and paging for bundle listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleQuery {
    /// Restrict to one channel.
    #[serde(default)]
    pub channel: Option<Channel>,
    /// Restrict to one platform.
    #[serde(default)]
    pub platform: Option<Platform>,
    /// Page size.
    #[serde(default = "default_page_limit")]
    pub limit: u32,
    /// Rows to skip.
    #[serde(default)]
    pub offset: u32,
}

impl Default for BundleQuery {
    fn default() -> Self {
        Self {
            channel: None,
            platform: None,
            limit: DEFAULT_PAGE_LIMIT,
            offset: 0,
        }
    }
}

impl BundleQuery {
    /// Returns the page size clamped to `1..=MAX_PAGE_LIMIT`.
    #[must_use]
    pub fn effective_limit(&self) -> u32 {
        if self.limit == 0 { DEFAULT_PAGE_LIMIT } else { self.limit.min(MAX_PAGE_LIMIT) }
    }

    /// Returns true when a bundle passes the channel and platform filters.
    #[must_use]
    pub fn matches(&self, bundle: &Bundle) -> bool {
        self.channel.as_ref().is_none_or(|channel| *channel == bundle.channel)
            && self.platform.is_none_or(|platform| platform == bundle.platform)
    }
}

/// Returns the default page size.
const fn default_page_limit() -> u32 {
    DEFAULT_PAGE_LIMIT
}

/// Page position summary for bundle listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    /// Total matching bundles.
    pub total: u64,
    /// Whether more rows follow this page.
    pub has_next_page: bool,
    /// Whether rows precede this page.
    pub has_previous_page: bool,
    /// One-based page number.
    pub current_page: u64,
    /// Total page count.
    pub total_pages: u64,
}

impl Pagination {
    /// Computes page metadata from a total and the query window.
    #[must_use]
    pub fn new(total: u64, limit: u32, offset: u32) -> Self {
        let limit = u64::from(limit.max(1));
        let offset = u64::from(offset);
        Self {
            total,
            has_next_page: offset + limit < total,
            has_previous_page: offset > 0,
            current_page: offset / limit + 1,
            total_pages: total.div_ceil(limit),
        }
    }
}

/// One page of bundles ordered by id descending.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundlePage {
    /// Bundles on this page.
    pub data: Vec<Bundle>,
    /// Page metadata.
    pub pagination: Pagination,
}
