// crates/hot-updater-signing/src/integrity.rs
// ============================================================================
// Module: Hot Updater Bundle Integrity
// Description: RSA-SHA256 signatures over bundle content hashes.
// Purpose: Let clients refuse artifacts not signed by the publishing key.
// Dependencies: base64, rsa, sha2, hot-updater-core
// ============================================================================

//! ## Overview
//! The signed message is the UTF-8 bytes of the lowercase hex `fileHash`,
//! never the archive itself. Signatures are PKCS#1 v1.5 over SHA-256 and are
//! transported as standard base64. Private keys are PKCS#8 PEM and public keys
//! SPKI PEM; only 2048 and 4096 bit moduli are accepted.
//!
//! Verification fails closed: every failure path returns `false`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use hot_updater_core::create_signed_file_hash;
use hot_updater_core::parse_signed_file_hash;
use hot_updater_core::sha256_file_hash;
use rsa::RsaPrivateKey;
use rsa::RsaPublicKey;
use rsa::pkcs1v15::Signature;
use rsa::pkcs1v15::SigningKey;
use rsa::pkcs1v15::VerifyingKey;
use rsa::pkcs8::DecodePrivateKey;
use rsa::pkcs8::DecodePublicKey;
use rsa::pkcs8::EncodePrivateKey;
use rsa::pkcs8::EncodePublicKey;
use rsa::pkcs8::LineEnding;
use rsa::signature::SignatureEncoding;
use rsa::signature::Signer;
use rsa::signature::Verifier;
use rsa::traits::PublicKeyParts;
use sha2::Sha256;
use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Bundle signing errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SigningError {
    /// Key material could not be parsed or encoded.
    #[error("invalid signing key: {0}")]
    InvalidKey(String),
    /// Key modulus is not an accepted size.
    #[error("unsupported key size: {0} bits (expected 2048 or 4096)")]
    UnsupportedKeySize(usize),
    /// Signature could not be produced or decoded.
    #[error("signature error: {0}")]
    Signature(String),
    /// Hash or signed-hash input is malformed.
    #[error("signing input invalid: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Keys
// ============================================================================

/// Accepted RSA modulus sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySize {
    /// 2048-bit modulus.
    Rsa2048,
    /// 4096-bit modulus.
    Rsa4096,
}

impl KeySize {
    /// Returns the modulus size in bits.
    #[must_use]
    pub const fn bits(self) -> usize {
        match self {
            Self::Rsa2048 => 2048,
            Self::Rsa4096 => 4096,
        }
    }

    /// Maps a modulus size in bits to an accepted size.
    ///
    /// # Errors
    ///
    /// Returns [`SigningError::UnsupportedKeySize`] for any other size.
    pub const fn from_bits(bits: usize) -> Result<Self, SigningError> {
        match bits {
            2048 => Ok(Self::Rsa2048),
            4096 => Ok(Self::Rsa4096),
            other => Err(SigningError::UnsupportedKeySize(other)),
        }
    }
}

/// PEM-encoded key pair.
#[derive(Clone, PartialEq, Eq)]
pub struct KeyPair {
    /// PKCS#8 private key PEM.
    pub private_key_pem: String,
    /// SPKI public key PEM.
    pub public_key_pem: String,
}

/// Generates a fresh key pair.
///
/// # Errors
///
/// Returns [`SigningError::InvalidKey`] when generation or encoding fails.
pub fn generate_key_pair(size: KeySize) -> Result<KeyPair, SigningError> {
    let mut rng = rsa::rand_core::OsRng;
    let private_key = RsaPrivateKey::new(&mut rng, size.bits())
        .map_err(|err| SigningError::InvalidKey(err.to_string()))?;
    let public_key = RsaPublicKey::from(&private_key);
    let private_key_pem = private_key
        .to_pkcs8_pem(LineEnding::LF)
        .map_err(|err| SigningError::InvalidKey(err.to_string()))?
        .to_string();
    let public_key_pem = public_key
        .to_public_key_pem(LineEnding::LF)
        .map_err(|err| SigningError::InvalidKey(err.to_string()))?;
    Ok(KeyPair {
        private_key_pem,
        public_key_pem,
    })
}

/// Parses a PKCS#8 private key and checks its size.
fn load_private_key(pem: &str) -> Result<RsaPrivateKey, SigningError> {
    let key = RsaPrivateKey::from_pkcs8_pem(pem)
        .map_err(|err| SigningError::InvalidKey(err.to_string()))?;
    KeySize::from_bits(key.size() * 8)?;
    Ok(key)
}

/// Parses an SPKI public key and checks its size.
fn load_public_key(pem: &str) -> Result<RsaPublicKey, SigningError> {
    let key = RsaPublicKey::from_public_key_pem(pem)
        .map_err(|err| SigningError::InvalidKey(err.to_string()))?;
    KeySize::from_bits(key.size() * 8)?;
    Ok(key)
}

// ============================================================================
// SECTION: Signing
// ============================================================================

/// Signs a hex file hash, returning the base64 signature.
///
/// # Errors
///
/// Returns [`SigningError`] when the key is invalid or signing fails.
pub fn sign_file_hash(file_hash: &str, private_key_pem: &str) -> Result<String, SigningError> {
    if file_hash.is_empty() {
        return Err(SigningError::Invalid("file hash must be set".to_string()));
    }
    let signing_key = SigningKey::<Sha256>::new(load_private_key(private_key_pem)?);
    let signature = signing_key
        .try_sign(file_hash.as_bytes())
        .map_err(|err| SigningError::Signature(err.to_string()))?;
    Ok(STANDARD.encode(signature.to_bytes()))
}

/// Hashes artifact bytes and returns the inline `sig:<sig>;sha256:<hash>` form.
///
/// # Errors
///
/// Returns [`SigningError`] when signing fails.
pub fn sign_bundle(bytes: &[u8], private_key_pem: &str) -> Result<String, SigningError> {
    let file_hash = sha256_file_hash(bytes);
    let signature = sign_file_hash(&file_hash, private_key_pem)?;
    create_signed_file_hash(&file_hash, &signature)
        .map_err(|err| SigningError::Invalid(err.to_string()))
}

// ============================================================================
// SECTION: Verification
// ============================================================================

/// Verifies a base64 signature over a hex file hash.
///
/// Returns `false` for a wrong key, an altered hash, a corrupted signature, or
/// unparsable input.
#[must_use]
pub fn verify_file_hash(file_hash: &str, signature_b64: &str, public_key_pem: &str) -> bool {
    check_signature(file_hash, signature_b64, public_key_pem).is_ok()
}

/// Verifies an inline signed file hash.
///
/// Unsigned or malformed values verify as `false`.
#[must_use]
pub fn verify_signed_file_hash(signed_file_hash: &str, public_key_pem: &str) -> bool {
    let Ok(parsed) = parse_signed_file_hash(signed_file_hash) else {
        return false;
    };
    parsed
        .signature
        .as_deref()
        .is_some_and(|signature| verify_file_hash(&parsed.file_hash, signature, public_key_pem))
}

/// Runs verification, reporting the failure reason.
fn check_signature(
    file_hash: &str,
    signature_b64: &str,
    public_key_pem: &str,
) -> Result<(), SigningError> {
    let verifying_key = VerifyingKey::<Sha256>::new(load_public_key(public_key_pem)?);
    let raw = STANDARD
        .decode(signature_b64.trim())
        .map_err(|err| SigningError::Signature(err.to_string()))?;
    let signature = Signature::try_from(raw.as_slice())
        .map_err(|err| SigningError::Signature(err.to_string()))?;
    verifying_key
        .verify(file_hash.as_bytes(), &signature)
        .map_err(|err| SigningError::Signature(err.to_string()))
}
