// crates/hot-updater-signing/src/lib.rs
// ============================================================================
// Module: Hot Updater Signing Library
// Description: Bundle integrity signatures and delivery tokens.
// Purpose: Sign and verify bundle hashes and authorize artifact downloads.
// Dependencies: base64, jsonwebtoken, rsa, sha2, hot-updater-core
// ============================================================================

//! ## Overview
//! Two independent security layers live here. [`integrity`] signs a bundle's
//! hex content hash with RSA-SHA256 at publish time and verifies it before a
//! client applies the artifact. [`token`] issues short-lived HS256 tokens that
//! bind one download request to one storage key.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod integrity;
pub mod token;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use integrity::KeyPair;
pub use integrity::KeySize;
pub use integrity::SigningError;
pub use integrity::generate_key_pair;
pub use integrity::sign_bundle;
pub use integrity::sign_file_hash;
pub use integrity::verify_file_hash;
pub use integrity::verify_signed_file_hash;
pub use token::DEFAULT_TOKEN_TTL_SECS;
pub use token::DeliveryClaims;
pub use token::DeliveryTokenSigner;
pub use token::TokenError;
pub use token::delivery_key;
