// crates/hot-updater-core/src/interfaces/mod.rs
// ============================================================================
// Module: Hot Updater Interfaces
// Description: Backend-agnostic interfaces for bundle and object storage.
// Purpose: Define the contracts that storage backends must implement.
// Dependencies: crate::core, thiserror
// ============================================================================

//! ## Overview
//! Interfaces decouple resolution from persistence. A [`BundleRepository`]
//! answers check-update requests and manages bundle records; an
//! [`ObjectStore`] holds artifact bytes keyed by relative storage keys.
//! Every implementation must return the same decision as the in-memory
//! engine for the same bundle set.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Component;
use std::path::Path;

use thiserror::Error;

use crate::core::Bundle;
use crate::core::BundleId;
use crate::core::BundlePage;
use crate::core::BundleQuery;
use crate::core::Channel;
use crate::core::Platform;
use crate::core::ResolutionRequest;
use crate::core::ResolveError;
use crate::core::UpdateInfo;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum total length of an object key.
pub const MAX_OBJECT_KEY_LENGTH: usize = 1024;
/// Maximum length of a single object key segment.
pub const MAX_OBJECT_KEY_SEGMENT_LENGTH: usize = 255;

// ============================================================================
// SECTION: Bundle Repository
// ============================================================================

/// Bundle repository errors.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Request or record data is invalid.
    #[error("bundle repository invalid data: {0}")]
    Invalid(String),
    /// Stored schema version is incompatible.
    #[error("bundle repository version mismatch: {0}")]
    VersionMismatch(String),
    /// Backend reported an error.
    #[error("bundle repository error: {0}")]
    Store(String),
}

impl From<ResolveError> for RepositoryError {
    fn from(error: ResolveError) -> Self {
        match error {
            ResolveError::InvalidInput(message) => Self::Invalid(message),
        }
    }
}

/// Persistent bundle catalog and update resolver.
pub trait BundleRepository: Send + Sync {
    /// Resolves the update for a device, including the rollout gate.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError`] when the backend query fails.
    fn get_update_info(
        &self,
        request: &ResolutionRequest,
    ) -> Result<Option<UpdateInfo>, RepositoryError>;

    /// Returns the distinct `targetAppVersion` values stored for a platform.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError`] when the backend query fails.
    fn target_app_versions(&self, platform: Platform) -> Result<Vec<String>, RepositoryError>;

    /// Lists bundles by id descending.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError`] when the backend query fails.
    fn list_bundles(&self, query: &BundleQuery) -> Result<BundlePage, RepositoryError>;

    /// Fetches a bundle by id.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError`] when the backend query fails.
    fn get_bundle(&self, id: &BundleId) -> Result<Option<Bundle>, RepositoryError>;

    /// Inserts or replaces bundles.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError`] when a bundle is invalid or the write fails.
    fn upsert_bundles(&self, bundles: &[Bundle]) -> Result<(), RepositoryError>;

    /// Deletes a bundle, returning whether it existed.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError`] when the write fails.
    fn delete_bundle(&self, id: &BundleId) -> Result<bool, RepositoryError>;

    /// Returns the distinct channels, sorted.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError`] when the backend query fails.
    fn channels(&self) -> Result<Vec<Channel>, RepositoryError>;
}

// ============================================================================
// SECTION: Object Store
// ============================================================================

/// Object store errors.
#[derive(Debug, Error)]
pub enum ObjectStoreError {
    /// Invalid key input.
    #[error("object store invalid: {0}")]
    Invalid(String),
    /// Backend I/O failure.
    #[error("object store io error: {0}")]
    Io(String),
}

/// Object bytes with their declared content type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    /// Raw object bytes.
    pub bytes: Vec<u8>,
    /// Declared content type, when known.
    pub content_type: Option<String>,
}

/// Key-value artifact storage.
pub trait ObjectStore: Send + Sync {
    /// Reads an object, returning `None` when absent.
    ///
    /// # Errors
    ///
    /// Returns [`ObjectStoreError`] when the key is invalid or the read fails.
    fn get(&self, key: &str) -> Result<Option<StoredObject>, ObjectStoreError>;

    /// Writes an object.
    ///
    /// # Errors
    ///
    /// Returns [`ObjectStoreError`] when the key is invalid or the write fails.
    fn put(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: Option<&str>,
    ) -> Result<(), ObjectStoreError>;

    /// Deletes an object; deleting an absent key succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`ObjectStoreError`] when the key is invalid or the delete fails.
    fn delete(&self, key: &str) -> Result<(), ObjectStoreError>;

    /// Lists keys starting with a prefix, sorted.
    ///
    /// # Errors
    ///
    /// Returns [`ObjectStoreError`] when listing fails.
    fn list(&self, prefix: &str) -> Result<Vec<String>, ObjectStoreError>;
}

/// Validates a relative object key.
///
/// # Errors
///
/// Returns [`ObjectStoreError::Invalid`] for empty, absolute, traversing, or
/// overlong keys.
pub fn validate_object_key(key: &str) -> Result<(), ObjectStoreError> {
    if key.is_empty() {
        return Err(ObjectStoreError::Invalid("key must be set".to_string()));
    }
    if key.contains('\\') {
        return Err(ObjectStoreError::Invalid("key must not contain backslashes".to_string()));
    }
    if key.len() > MAX_OBJECT_KEY_LENGTH {
        return Err(ObjectStoreError::Invalid("key exceeds length limit".to_string()));
    }
    if key.starts_with('/') {
        return Err(ObjectStoreError::Invalid("key must be relative".to_string()));
    }
    for component in Path::new(key).components() {
        match component {
            Component::Normal(value) => {
                if value.len() > MAX_OBJECT_KEY_SEGMENT_LENGTH {
                    return Err(ObjectStoreError::Invalid(
                        "key segment exceeds length limit".to_string(),
                    ));
                }
            }
            _ => {
                return Err(ObjectStoreError::Invalid(
                    "key must be relative without traversal".to_string(),
                ));
            }
        }
    }
    if key.split('/').any(|segment| segment.is_empty() || segment == ".") {
        return Err(ObjectStoreError::Invalid("key segment is invalid".to_string()));
    }
    Ok(())
}

// ============================================================================
// SECTION: Tests
// ============================================================================
