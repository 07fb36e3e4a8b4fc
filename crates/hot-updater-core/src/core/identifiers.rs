// crates/hot-updater-core/src/core/identifiers.rs
// ============================================================================
// Module: Hot Updater Identifiers
// Description: Bundle identifiers, platforms, and release channels.
// Purpose: Provide strongly typed, serializable IDs with stable string forms.
// Dependencies: serde, uuid
// ============================================================================

//! ## Overview
//! Bundle identifiers are time-ordered strings (`UUIDv7` in practice) and double
//! as the delivery order: comparisons are plain lexicographic byte order and no
//! numeric parsing ever happens. The reserved [`NIL_BUNDLE_ID`] means "no
//! bundle installed" on requests and "revert to the embedded native bundle" on
//! responses.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;
use uuid::Uuid;

use crate::core::request::ResolveError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Reserved bundle identifier for "no bundle" / "embedded native bundle".
pub const NIL_BUNDLE_ID: &str = "00000000-0000-0000-0000-000000000000";
/// Channel used when a request does not name one.
pub const DEFAULT_CHANNEL: &str = "production";

// ============================================================================
// SECTION: Bundle Identifier
// ============================================================================

/// Time-ordered bundle identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BundleId(String);

impl BundleId {
    /// Creates a new bundle identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the reserved NIL identifier.
    #[must_use]
    pub fn nil() -> Self {
        Self(NIL_BUNDLE_ID.to_string())
    }

    /// Returns true when this is the reserved NIL identifier.
    #[must_use]
    pub fn is_nil(&self) -> bool {
        self.0 == NIL_BUNDLE_ID
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for BundleId {
    fn default() -> Self {
        Self::nil()
    }
}

impl fmt::Display for BundleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for BundleId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for BundleId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Generates a fresh time-ordered bundle identifier for publishers.
#[must_use]
pub fn generate_bundle_id() -> BundleId {
    BundleId::new(Uuid::now_v7().to_string())
}

// ============================================================================
// SECTION: Platform
// ============================================================================

/// Target mobile platform for a bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// Apple iOS.
    Ios,
    /// Google Android.
    Android,
}

impl Platform {
    /// Returns the canonical lowercase label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ios => "ios",
            Self::Android => "android",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = ResolveError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "ios" => Ok(Self::Ios),
            "android" => Ok(Self::Android),
            other => Err(ResolveError::InvalidInput(format!("unsupported platform: {other}"))),
        }
    }
}

// ============================================================================
// SECTION: Channel
// ============================================================================

/// Named partition of the bundle space.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Channel(String);

impl Channel {
    /// Creates a new channel name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the channel name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Channel {
    fn default() -> Self {
        Self(DEFAULT_CHANNEL.to_string())
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for Channel {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Channel {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}
