// crates/hot-updater-server/src/storage.rs
// ============================================================================
// Module: Storage Adapters
// Description: Scheme-keyed adapters that turn storage URIs into download URLs.
// Purpose: Resolve a chosen bundle's storageUri without silently dropping it.
// Dependencies: hot-updater-config, hot-updater-signing, url
// ============================================================================

//! ## Overview
//! Each [`StorageAdapter`] owns one URI scheme. The registry is built once at
//! startup; `http` and `https` URIs pass through untouched, and a scheme with
//! no adapter is a hard [`StorageError::NoMatchingAdapter`] failure.
//!
//! Token URLs are always issued for the chosen bundle's
//! [`delivery_key`](hot_updater_signing::delivery_key), so a URL never
//! authorizes an archive other than the one the resolver picked.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;

use hot_updater_config::StorageAdapterConfig;
use hot_updater_core::BundleId;
use hot_updater_core::validate_object_key;
use hot_updater_signing::DeliveryTokenSigner;
use hot_updater_signing::delivery_key;
use thiserror::Error;
use url::Url;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Storage adapter errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    /// No adapter handles the URI scheme.
    #[error("No storage adapter registered for scheme: {0}")]
    NoMatchingAdapter(String),
    /// URI could not be mapped to a storage key.
    #[error("invalid storage uri: {0}")]
    InvalidUri(String),
    /// Registry configuration is inconsistent.
    #[error("storage config error: {0}")]
    Config(String),
    /// Download token could not be issued.
    #[error("storage token error: {0}")]
    Token(String),
}

// ============================================================================
// SECTION: Adapter Trait
// ============================================================================

/// Maps storage URIs of one scheme to client download URLs.
pub trait StorageAdapter: Send + Sync {
    /// URI scheme handled by this adapter.
    fn scheme(&self) -> &str;

    /// Builds the download URL for the archive of `bundle_id` stored at
    /// `storage_uri`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] when the URI cannot be served.
    fn download_url(&self, bundle_id: &BundleId, storage_uri: &Url)
    -> Result<String, StorageError>;
}

// ============================================================================
// SECTION: Token Adapter
// ============================================================================

/// Serves `<scheme>://<bucket>/[<prefix>/]<bundleId>/bundle.zip` objects
/// through the token-verified `/files/<bundleId>/bundle.zip` route.
///
/// The URI must address the chosen bundle's archive. Leading prefix segments
/// locate the object inside the bucket and are not part of the token key.
pub struct TokenStorageAdapter {
    /// Handled scheme.
    scheme: String,
    /// Required bucket, when restricted.
    bucket: Option<String>,
    /// Public base URL without a trailing slash.
    public_base_url: String,
    /// Token issuer.
    signer: DeliveryTokenSigner,
}

impl TokenStorageAdapter {
    /// Creates an adapter for one scheme.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Config`] when the base URL is not http(s).
    pub fn new(
        scheme: impl Into<String>,
        bucket: Option<String>,
        public_base_url: &str,
        signer: DeliveryTokenSigner,
    ) -> Result<Self, StorageError> {
        let parsed =
            Url::parse(public_base_url).map_err(|err| StorageError::Config(err.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(StorageError::Config("public base url must use http or https".to_string()));
        }
        Ok(Self {
            scheme: scheme.into(),
            bucket,
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
            signer,
        })
    }

    /// Extracts the object key from a storage URI.
    fn object_key(&self, storage_uri: &Url) -> Result<String, StorageError> {
        if let Some(bucket) = &self.bucket
            && storage_uri.host_str() != Some(bucket.as_str())
        {
            return Err(StorageError::InvalidUri(format!(
                "{storage_uri} is outside bucket {bucket}"
            )));
        }
        let key = storage_uri.path().trim_start_matches('/');
        if key.contains('%') {
            return Err(StorageError::InvalidUri(format!("{storage_uri} has an encoded key")));
        }
        validate_object_key(key)
            .map_err(|err| StorageError::InvalidUri(format!("{storage_uri}: {err}")))?;
        Ok(key.to_string())
    }
}

impl StorageAdapter for TokenStorageAdapter {
    fn scheme(&self) -> &str {
        &self.scheme
    }

    fn download_url(
        &self,
        bundle_id: &BundleId,
        storage_uri: &Url,
    ) -> Result<String, StorageError> {
        let object_key = self.object_key(storage_uri)?;
        let key = delivery_key(bundle_id);
        let addresses_bundle = object_key
            .strip_suffix(key.as_str())
            .is_some_and(|prefix| prefix.is_empty() || prefix.ends_with('/'));
        if !addresses_bundle {
            return Err(StorageError::InvalidUri(format!(
                "{storage_uri} does not address bundle {bundle_id}"
            )));
        }
        let token = self.signer.issue(&key).map_err(|err| StorageError::Token(err.to_string()))?;
        Ok(format!("{}/files/{key}?token={token}", self.public_base_url))
    }
}

// ============================================================================
// SECTION: Registry
// ============================================================================

/// Adapters keyed by scheme.
#[derive(Clone, Default)]
pub struct StorageAdapterRegistry {
    /// Scheme to adapter.
    adapters: BTreeMap<String, Arc<dyn StorageAdapter>>,
}

impl StorageAdapterRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds token adapters for every configured scheme.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Config`] when adapters are configured without a
    /// base URL or signer, or a scheme repeats.
    pub fn from_config(
        adapters: &[StorageAdapterConfig],
        public_base_url: Option<&str>,
        signer: Option<&DeliveryTokenSigner>,
    ) -> Result<Self, StorageError> {
        let mut registry = Self::new();
        if adapters.is_empty() {
            return Ok(registry);
        }
        let base = public_base_url.ok_or_else(|| {
            StorageError::Config("storage adapters require a public base url".to_string())
        })?;
        let signer = signer.ok_or_else(|| {
            StorageError::Config("storage adapters require a delivery secret".to_string())
        })?;
        for adapter in adapters {
            registry.register(Arc::new(TokenStorageAdapter::new(
                adapter.scheme.clone(),
                adapter.bucket.clone(),
                base,
                signer.clone(),
            )?))?;
        }
        Ok(registry)
    }

    /// Adds an adapter.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Config`] when the scheme is already registered
    /// or is `http`/`https`.
    pub fn register(&mut self, adapter: Arc<dyn StorageAdapter>) -> Result<(), StorageError> {
        let scheme = adapter.scheme().to_string();
        if matches!(scheme.as_str(), "http" | "https") {
            return Err(StorageError::Config(format!("scheme {scheme} is served directly")));
        }
        if self.adapters.contains_key(&scheme) {
            return Err(StorageError::Config(format!("scheme {scheme} is registered twice")));
        }
        self.adapters.insert(scheme, adapter);
        Ok(())
    }

    /// Registered schemes, sorted.
    #[must_use]
    pub fn schemes(&self) -> Vec<&str> {
        self.adapters.keys().map(String::as_str).collect()
    }

    /// Resolves the client download URL for a bundle's storage URI.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NoMatchingAdapter`] for unregistered schemes and
    /// [`StorageError::InvalidUri`] for unparsable URIs or URIs that do not
    /// address `bundle_id`.
    pub fn resolve_file_url(
        &self,
        bundle_id: &BundleId,
        storage_uri: Option<&str>,
    ) -> Result<Option<String>, StorageError> {
        let Some(raw) = storage_uri else {
            return Ok(None);
        };
        let parsed =
            Url::parse(raw).map_err(|err| StorageError::InvalidUri(format!("{raw}: {err}")))?;
        match parsed.scheme() {
            "http" | "https" => Ok(Some(raw.to_string())),
            scheme => {
                let adapter = self
                    .adapters
                    .get(scheme)
                    .ok_or_else(|| StorageError::NoMatchingAdapter(scheme.to_string()))?;
                adapter.download_url(bundle_id, &parsed).map(Some)
            }
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
