// crates/hot-updater-core/src/core/request.rs
// ============================================================================
// Module: Hot Updater Resolution Requests
// Description: Per-request inputs for update resolution.
// Purpose: Normalize raw check-update parameters into a validated request.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! A [`ResolutionRequest`] is built once per check-update call. Raw transport
//! values arrive through [`RequestParts`]; construction rejects a missing
//! strategy value before any bundle filtering takes place and fills the
//! documented defaults (NIL floor, `production` channel).

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::identifiers::BundleId;
use crate::core::identifiers::Channel;
use crate::core::identifiers::Platform;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Resolution input errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    /// Request or bundle data is malformed.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

// ============================================================================
// SECTION: Strategy
// ============================================================================

/// Method used to match a request against published bundles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "_updateStrategy", rename_all = "camelCase")]
pub enum UpdateStrategy {
    /// Semver matching against `targetAppVersion`.
    #[serde(rename_all = "camelCase")]
    AppVersion {
        /// Installed native app version.
        app_version: String,
    },
    /// Exact matching against `fingerprintHash`.
    #[serde(rename_all = "camelCase")]
    Fingerprint {
        /// Native build fingerprint.
        fingerprint_hash: String,
    },
}

impl UpdateStrategy {
    /// Returns the strategy label used in logs and audit events.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::AppVersion {
                ..
            } => "appVersion",
            Self::Fingerprint {
                ..
            } => "fingerprint",
        }
    }
}

// ============================================================================
// SECTION: Request
// ============================================================================

/// Validated resolution request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionRequest {
    /// Requesting platform.
    pub platform: Platform,
    /// Currently installed bundle, NIL for a fresh native install.
    pub bundle_id: BundleId,
    /// Native build floor.
    #[serde(default)]
    pub min_bundle_id: BundleId,
    /// Requested channel.
    #[serde(default)]
    pub channel: Channel,
    /// Strategy and its matcher value.
    #[serde(flatten)]
    pub strategy: UpdateStrategy,
    /// Stable device identifier for rollout gating.
    #[serde(default)]
    pub device_id: Option<String>,
}

impl ResolutionRequest {
    /// Creates a request with the default floor and channel.
    #[must_use]
    pub fn new(platform: Platform, bundle_id: BundleId, strategy: UpdateStrategy) -> Self {
        Self {
            platform,
            bundle_id,
            min_bundle_id: BundleId::nil(),
            channel: Channel::default(),
            strategy,
            device_id: None,
        }
    }

    /// Creates an app-version strategy request.
    #[must_use]
    pub fn app_version(
        platform: Platform,
        bundle_id: impl Into<BundleId>,
        app_version: impl Into<String>,
    ) -> Self {
        Self::new(
            platform,
            bundle_id.into(),
            UpdateStrategy::AppVersion {
                app_version: app_version.into(),
            },
        )
    }

    /// Creates a fingerprint strategy request.
    #[must_use]
    pub fn fingerprint(
        platform: Platform,
        bundle_id: impl Into<BundleId>,
        fingerprint_hash: impl Into<String>,
    ) -> Self {
        Self::new(
            platform,
            bundle_id.into(),
            UpdateStrategy::Fingerprint {
                fingerprint_hash: fingerprint_hash.into(),
            },
        )
    }

    /// Sets the release channel.
    #[must_use]
    pub fn with_channel(mut self, channel: impl Into<Channel>) -> Self {
        self.channel = channel.into();
        self
    }

    /// Sets the native build floor.
    #[must_use]
    pub fn with_min_bundle_id(mut self, min_bundle_id: impl Into<BundleId>) -> Self {
        self.min_bundle_id = min_bundle_id.into();
        self
    }

    /// Sets the device identifier.
    #[must_use]
    pub fn with_device_id(mut self, device_id: impl Into<String>) -> Self {
        self.device_id = Some(device_id.into());
        self
    }

    /// Builds a request from raw transport values.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::InvalidInput`] when the platform or bundle id is
    /// missing, the platform is unknown, or neither matcher value is present.
    pub fn from_parts(parts: &RequestParts<'_>) -> Result<Self, ResolveError> {
        let strategy = match (non_blank(parts.app_version), non_blank(parts.fingerprint_hash)) {
            (_, Some(fingerprint_hash)) => UpdateStrategy::Fingerprint {
                fingerprint_hash: fingerprint_hash.to_string(),
            },
            (Some(app_version), None) => UpdateStrategy::AppVersion {
                app_version: app_version.to_string(),
            },
            (None, None) => {
                return Err(ResolveError::InvalidInput(
                    "either appVersion or fingerprintHash is required".to_string(),
                ));
            }
        };
        let platform = non_blank(parts.platform)
            .ok_or_else(|| ResolveError::InvalidInput("platform is required".to_string()))?
            .parse::<Platform>()?;
        let bundle_id = non_blank(parts.bundle_id)
            .ok_or_else(|| ResolveError::InvalidInput("bundleId is required".to_string()))?;
        Ok(Self {
            platform,
            bundle_id: BundleId::new(bundle_id),
            min_bundle_id: non_blank(parts.min_bundle_id).map_or_else(BundleId::nil, BundleId::new),
            channel: non_blank(parts.channel).map_or_else(Channel::default, Channel::new),
            strategy,
            device_id: non_blank(parts.device_id).map(str::to_string),
        })
    }
}

/// Raw, unvalidated check-update values from a transport.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestParts<'a> {
    /// Platform label.
    pub platform: Option<&'a str>,
    /// Installed bundle id.
    pub bundle_id: Option<&'a str>,
    /// Native build floor.
    pub min_bundle_id: Option<&'a str>,
    /// Channel name.
    pub channel: Option<&'a str>,
    /// Installed app version.
    pub app_version: Option<&'a str>,
    /// Native build fingerprint.
    pub fingerprint_hash: Option<&'a str>,
    /// Device identifier.
    pub device_id: Option<&'a str>,
}

/// Returns the trimmed value when it is present and non-empty.
fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

// ============================================================================
// SECTION: Tests
// ============================================================================
