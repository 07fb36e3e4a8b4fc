// crates/hot-updater-signing/src/token.rs
// ============================================================================
// Module: Hot Updater Delivery Tokens
// Description: Short-lived HS256 tokens bound to one storage key.
// Purpose: Authorize a single artifact download for a bounded time.
// Dependencies: jsonwebtoken, serde, hot-updater-core
// ============================================================================

//! ## Overview
//! A delivery token is a compact JWS with header `{"alg":"HS256"}` and payload
//! `{"key": "<bundleId>/bundle.zip", "exp": <unix seconds>}`. Verification
//! rejects a missing token, a bad signature, an expired token, and a token
//! whose key differs from the requested path. There is no clock leeway.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use hot_updater_core::BundleId;
use jsonwebtoken::Algorithm;
use jsonwebtoken::DecodingKey;
use jsonwebtoken::EncodingKey;
use jsonwebtoken::Header;
use jsonwebtoken::Validation;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default token lifetime.
pub const DEFAULT_TOKEN_TTL_SECS: u64 = 60;
/// Artifact file name under each bundle prefix.
const BUNDLE_ARCHIVE_NAME: &str = "bundle.zip";

// ============================================================================
// SECTION: Types
// ============================================================================

/// Delivery token payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryClaims {
    /// Storage key the token authorizes.
    pub key: String,
    /// Expiry in unix seconds.
    pub exp: u64,
}

/// Delivery token errors, each mapped to an HTTP status.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    /// No token was presented.
    #[error("Missing token")]
    Missing,
    /// Signature, structure, or expiry check failed.
    #[error("Invalid or expired token")]
    Invalid,
    /// Token is valid for a different key.
    #[error("Token does not match requested file")]
    KeyMismatch,
    /// Token is valid but the object is absent.
    #[error("File not found")]
    NotFound,
    /// Token could not be issued.
    #[error("token signing error: {0}")]
    Signing(String),
}

impl TokenError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::Missing => 400,
            Self::Invalid | Self::KeyMismatch => 403,
            Self::NotFound => 404,
            Self::Signing(_) => 500,
        }
    }
}

/// Returns the storage key for a bundle's archive.
#[must_use]
pub fn delivery_key(bundle_id: &BundleId) -> String {
    format!("{bundle_id}/{BUNDLE_ARCHIVE_NAME}")
}

// ============================================================================
// SECTION: Signer
// ============================================================================

/// Issues and verifies delivery tokens with a shared secret.
#[derive(Clone)]
pub struct DeliveryTokenSigner {
    /// HMAC signing key.
    encoding_key: EncodingKey,
    /// HMAC verification key.
    decoding_key: DecodingKey,
    /// Token lifetime in seconds.
    ttl_secs: u64,
}

impl DeliveryTokenSigner {
    /// Creates a signer from a shared secret.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Signing`] when the secret is empty or the TTL is zero.
    pub fn new(secret: &[u8], ttl_secs: u64) -> Result<Self, TokenError> {
        if secret.is_empty() {
            return Err(TokenError::Signing("delivery secret must be set".to_string()));
        }
        if ttl_secs == 0 {
            return Err(TokenError::Signing("token ttl must be greater than zero".to_string()));
        }
        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            ttl_secs,
        })
    }

    /// Returns the configured lifetime in seconds.
    #[must_use]
    pub const fn ttl_secs(&self) -> u64 {
        self.ttl_secs
    }

    /// Issues a token for a storage key, valid from now.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Signing`] when encoding fails.
    pub fn issue(&self, key: &str) -> Result<String, TokenError> {
        self.issue_at(key, unix_now_secs())
    }

    /// Issues a token as if the current time were `now_secs`.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Signing`] when encoding fails.
    pub fn issue_at(&self, key: &str, now_secs: u64) -> Result<String, TokenError> {
        let claims = DeliveryClaims {
            key: key.to_string(),
            exp: now_secs.saturating_add(self.ttl_secs),
        };
        let mut header = Header::new(Algorithm::HS256);
        header.typ = None;
        jsonwebtoken::encode(&header, &claims, &self.encoding_key)
            .map_err(|err| TokenError::Signing(err.to_string()))
    }

    /// Verifies a token against the requested path, returning the bound key.
    ///
    /// Leading slashes on the requested path are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Missing`], [`TokenError::Invalid`], or
    /// [`TokenError::KeyMismatch`].
    pub fn verify(&self, token: Option<&str>, requested_path: &str) -> Result<String, TokenError> {
        let token = token.map(str::trim).filter(|value| !value.is_empty()).ok_or(TokenError::Missing)?;
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);
        let data = jsonwebtoken::decode::<DeliveryClaims>(token, &self.decoding_key, &validation)
            .map_err(|_| TokenError::Invalid)?;
        if data.claims.key != requested_path.trim_start_matches('/') {
            return Err(TokenError::KeyMismatch);
        }
        Ok(data.claims.key)
    }
}

/// Returns the current unix time in seconds.
fn unix_now_secs() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs()
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Test-only assertions.")]

    use super::*;

    #[test]
    fn status_codes_follow_error_kind() {
        assert_eq!(TokenError::Missing.status_code(), 400);
        assert_eq!(TokenError::Invalid.status_code(), 403);
        assert_eq!(TokenError::KeyMismatch.status_code(), 403);
        assert_eq!(TokenError::NotFound.status_code(), 404);
    }

    #[test]
    fn delivery_key_uses_bundle_prefix() {
        assert_eq!(delivery_key(&BundleId::new("b1")), "b1/bundle.zip");
    }

    #[test]
    fn rejects_empty_secret() {
        assert!(DeliveryTokenSigner::new(b"", 60).is_err());
        assert!(DeliveryTokenSigner::new(b"secret", 0).is_err());
        assert_eq!(DeliveryTokenSigner::new(b"secret", 60).unwrap().ttl_secs(), 60);
    }
}
