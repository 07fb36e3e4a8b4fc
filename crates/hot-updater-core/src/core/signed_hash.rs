// crates/hot-updater-core/src/core/signed_hash.rs
// ============================================================================
// Module: Hot Updater Signed File Hashes
// Description: Inline signature format for bundle file hashes.
// Purpose: Parse and build `sig:<signature>;sha256:<hash>` values.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! A bundle's `fileHash` may carry its base64 signature inline as
//! `sig:<signature>;sha256:<hex>`. A bare hex string is an unsigned hash.
//! Parsing is strict; [`parse_signed_file_hash_safe`] is the non-failing
//! variant for untrusted callers.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Prefix of the signature component.
pub const SIGNED_HASH_PREFIX: &str = "sig:";
/// Prefix of the hash component.
pub const SHA256_PREFIX: &str = "sha256:";
/// Separator between signature and hash components.
pub const SIGNED_HASH_SEPARATOR: char = ';';
/// Number of input characters echoed back in error messages.
const ERROR_PREVIEW_CHARS: usize = 50;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Parsed file hash with its optional signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedFileHash {
    /// Hex SHA-256 hash.
    pub file_hash: String,
    /// Base64 signature when the input was signed.
    pub signature: Option<String>,
}

impl SignedFileHash {
    /// Returns true when a signature is present.
    #[must_use]
    pub const fn is_signed(&self) -> bool {
        self.signature.is_some()
    }
}

/// Signed hash format errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignedHashError {
    /// Input is empty or whitespace.
    #[error("invalid file hash: cannot be empty")]
    Empty,
    /// Hash component is not hexadecimal.
    #[error("invalid hash format: expected hexadecimal string, got \"{0}\"")]
    InvalidHash(String),
    /// Signature component is empty.
    #[error("invalid signature: signature cannot be empty")]
    EmptySignature,
    /// Signed form does not match `sig:<signature>;sha256:<hash>`.
    #[error("malformed signed hash format, expected \"sig:<signature>;sha256:<hash>\", got \"{0}\"")]
    Malformed(String),
}

// ============================================================================
// SECTION: Parsing
// ============================================================================

/// Parses a plain or signed file hash.
///
/// # Errors
///
/// Returns [`SignedHashError`] when the input is empty, the hash is not hex,
/// or the signed form is malformed.
pub fn parse_signed_file_hash(input: &str) -> Result<SignedFileHash, SignedHashError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(SignedHashError::Empty);
    }
    if let Some(rest) = trimmed.strip_prefix(SIGNED_HASH_PREFIX) {
        let malformed = || SignedHashError::Malformed(preview(trimmed));
        let (signature, hash_part) = rest.split_once(SIGNED_HASH_SEPARATOR).ok_or_else(malformed)?;
        let hash = hash_part.strip_prefix(SHA256_PREFIX).ok_or_else(malformed)?;
        if signature.is_empty() || !is_hex(hash) {
            return Err(malformed());
        }
        return Ok(SignedFileHash {
            file_hash: hash.to_string(),
            signature: Some(signature.to_string()),
        });
    }
    if !is_hex(trimmed) {
        return Err(SignedHashError::InvalidHash(preview(trimmed)));
    }
    Ok(SignedFileHash {
        file_hash: trimmed.to_string(),
        signature: None,
    })
}

/// Parses a file hash, returning `None` on any error.
#[must_use]
pub fn parse_signed_file_hash_safe(input: Option<&str>) -> Option<SignedFileHash> {
    input.and_then(|value| parse_signed_file_hash(value).ok())
}

/// Returns true when the input starts with the signature prefix.
///
/// This does not validate the rest of the format.
#[must_use]
pub fn is_signed_file_hash(input: &str) -> bool {
    input.starts_with(SIGNED_HASH_PREFIX)
}

/// Builds the inline signed form from a hex hash and a base64 signature.
///
/// # Errors
///
/// Returns [`SignedHashError`] when the hash is not hex or the signature is
/// empty.
pub fn create_signed_file_hash(hash: &str, signature: &str) -> Result<String, SignedHashError> {
    if !is_hex(hash) {
        return Err(SignedHashError::InvalidHash(preview(hash)));
    }
    if signature.trim().is_empty() {
        return Err(SignedHashError::EmptySignature);
    }
    Ok(format!("{SIGNED_HASH_PREFIX}{signature}{SIGNED_HASH_SEPARATOR}{SHA256_PREFIX}{hash}"))
}

/// Returns true for a non-empty ASCII hex string.
fn is_hex(value: &str) -> bool {
    !value.is_empty() && value.bytes().all(|byte| byte.is_ascii_hexdigit())
}

/// Truncates input for error messages.
fn preview(value: &str) -> String {
    let mut chars = value.chars();
    let head: String = chars.by_ref().take(ERROR_PREVIEW_CHARS).collect();
    if chars.next().is_some() { format!("{head}...") } else { head }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, reason = "Test-only assertions.")]

    use super::*;

    #[test]
    fn parses_signed_form() {
        let parsed = parse_signed_file_hash("sig:dGVzdA==;sha256:abc123DEF").unwrap();
        assert_eq!(parsed.file_hash, "abc123DEF");
        assert_eq!(parsed.signature.as_deref(), Some("dGVzdA=="));
        assert!(parsed.is_signed());
    }

    #[test]
    fn parses_plain_hex() {
        let parsed = parse_signed_file_hash("  abc123  ").unwrap();
        assert_eq!(parsed.file_hash, "abc123");
        assert!(!parsed.is_signed());
    }

    #[test]
    fn rejects_bad_inputs() {
        assert_eq!(parse_signed_file_hash(" "), Err(SignedHashError::Empty));
        assert!(matches!(parse_signed_file_hash("xyz"), Err(SignedHashError::InvalidHash(_))));
        assert!(matches!(
            parse_signed_file_hash("sig:abc;sha1:abc"),
            Err(SignedHashError::Malformed(_))
        ));
        assert!(matches!(
            parse_signed_file_hash("sig:;sha256:abc"),
            Err(SignedHashError::Malformed(_))
        ));
        assert!(matches!(
            parse_signed_file_hash("sig:abc;sha256:zz"),
            Err(SignedHashError::Malformed(_))
        ));
    }

    #[test]
    fn safe_parse_swallows_errors() {
        assert_eq!(parse_signed_file_hash_safe(None), None);
        assert_eq!(parse_signed_file_hash_safe(Some("")), None);
        assert_eq!(parse_signed_file_hash_safe(Some("invalid")), None);
        assert!(parse_signed_file_hash_safe(Some("abcdef")).is_some());
    }

    #[test]
    fn create_then_parse() {
        let signed = create_signed_file_hash("abcdef", "c2ln").unwrap();
        assert_eq!(signed, "sig:c2ln;sha256:abcdef");
        assert!(is_signed_file_hash(&signed));
        assert!(create_signed_file_hash("not-hex", "c2ln").is_err());
        assert_eq!(create_signed_file_hash("abcdef", " "), Err(SignedHashError::EmptySignature));
    }
}
