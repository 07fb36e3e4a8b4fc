// crates/hot-updater-signing/tests/delivery_token.rs
// ============================================================================
// Module: Delivery Token Tests
// Description: Issue/verify behavior for signed download tokens.
// ============================================================================
//! ## Overview
//! Checks token binding, expiry, tamper detection, and the wire format.

#![allow(clippy::unwrap_used, reason = "Tests use unwrap on deterministic fixtures.")]

use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use hot_updater_core::BundleId;
use hot_updater_signing::DEFAULT_TOKEN_TTL_SECS;
use hot_updater_signing::DeliveryTokenSigner;
use hot_updater_signing::TokenError;
use hot_updater_signing::delivery_key;
use serde_json::Value;

fn signer() -> DeliveryTokenSigner {
    DeliveryTokenSigner::new(b"delivery-secret", DEFAULT_TOKEN_TTL_SECS).unwrap()
}

fn now() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_secs()
}

#[test]
fn token_verifies_for_its_key() {
    let key = delivery_key(&BundleId::new("b1"));
    let token = signer().issue(&key).unwrap();
    assert_eq!(signer().verify(Some(&token), "/b1/bundle.zip").unwrap(), "b1/bundle.zip");
    assert_eq!(signer().verify(Some(&token), "b1/bundle.zip").unwrap(), "b1/bundle.zip");
}

#[test]
fn token_for_other_key_is_rejected() {
    let token = signer().issue("b1/bundle.zip").unwrap();
    assert_eq!(signer().verify(Some(&token), "b2/bundle.zip"), Err(TokenError::KeyMismatch));
}

#[test]
fn missing_token_is_rejected() {
    assert_eq!(signer().verify(None, "b1/bundle.zip"), Err(TokenError::Missing));
    assert_eq!(signer().verify(Some(""), "b1/bundle.zip"), Err(TokenError::Missing));
}

#[test]
fn expired_token_is_rejected() {
    let token = signer().issue_at("b1/bundle.zip", now() - 2 * DEFAULT_TOKEN_TTL_SECS).unwrap();
    assert_eq!(signer().verify(Some(&token), "b1/bundle.zip"), Err(TokenError::Invalid));
}

#[test]
fn token_from_other_secret_is_rejected() {
    let other = DeliveryTokenSigner::new(b"other-secret", 60).unwrap();
    let token = other.issue("b1/bundle.zip").unwrap();
    assert_eq!(signer().verify(Some(&token), "b1/bundle.zip"), Err(TokenError::Invalid));
    assert_eq!(signer().verify(Some("a.b.c"), "b1/bundle.zip"), Err(TokenError::Invalid));
}

#[test]
fn token_wire_format_is_compact_hs256() {
    let issued_at = now();
    let token = signer().issue_at("b1/bundle.zip", issued_at).unwrap();
    let parts: Vec<&str> = token.split('.').collect();
    assert_eq!(parts.len(), 3);
    let header: Value = serde_json::from_slice(&URL_SAFE_NO_PAD.decode(parts[0]).unwrap()).unwrap();
    assert_eq!(header, serde_json::json!({ "alg": "HS256" }));
    let payload: Value = serde_json::from_slice(&URL_SAFE_NO_PAD.decode(parts[1]).unwrap()).unwrap();
    assert_eq!(payload["key"], "b1/bundle.zip");
    assert_eq!(payload["exp"], issued_at + 60);
}
