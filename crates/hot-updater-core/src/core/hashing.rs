// crates/hot-updater-core/src/core/hashing.rs
// ============================================================================
// Module: Hot Updater Content Hashing
// Description: SHA-256 content hashes for bundle artifacts.
// Purpose: Produce the hex `fileHash` recorded at publish time.
// Dependencies: hex, sha2
// ============================================================================

//! ## Overview
//! Artifact hashes are lowercase hex SHA-256 digests over the raw archive
//! bytes. The hex string itself is what gets signed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use sha2::Digest;
use sha2::Sha256;

// ============================================================================
// SECTION: Hashing
// ============================================================================

/// Returns the lowercase hex SHA-256 digest of an artifact.
#[must_use]
pub fn sha256_file_hash(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::sha256_file_hash;

    #[test]
    fn hashes_empty_input() {
        assert_eq!(
            sha256_file_hash(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
