// crates/hot-updater-core/src/runtime/memory.rs
// ============================================================================
// Module: Hot Updater In-Memory Backends
// Description: In-memory bundle repository and object store.
// Purpose: Provide deterministic backends without external dependencies.
// Dependencies: crate::core, crate::interfaces, crate::runtime
// ============================================================================

//! ## Overview
//! [`InMemoryBundleRepository`] runs the reference resolution engine directly
//! over its bundle map, so it defines the behavior SQL backends must match.
//! [`InMemoryObjectStore`] backs migration tests and local demos.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

use crate::core::Bundle;
use crate::core::BundleId;
use crate::core::BundlePage;
use crate::core::BundleQuery;
use crate::core::Channel;
use crate::core::Pagination;
use crate::core::Platform;
use crate::core::ResolutionRequest;
use crate::core::UpdateInfo;
use crate::interfaces::BundleRepository;
use crate::interfaces::ObjectStore;
use crate::interfaces::ObjectStoreError;
use crate::interfaces::RepositoryError;
use crate::interfaces::StoredObject;
use crate::interfaces::validate_object_key;
use crate::runtime::filter::target_version_groups;
use crate::runtime::resolver::resolve_update;

// ============================================================================
// SECTION: Bundle Repository
// ============================================================================

/// In-memory bundle repository for tests and the `memory` store type.
#[derive(Debug, Default, Clone)]
pub struct InMemoryBundleRepository {
    /// Bundles keyed by id, protected by a mutex.
    bundles: Arc<Mutex<BTreeMap<BundleId, Bundle>>>,
}

impl InMemoryBundleRepository {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a repository seeded with bundles.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::Invalid`] when a bundle fails validation.
    pub fn with_bundles(bundles: &[Bundle]) -> Result<Self, RepositoryError> {
        let repository = Self::new();
        repository.upsert_bundles(bundles)?;
        Ok(repository)
    }

    /// Locks the bundle map.
    fn lock(&self) -> Result<MutexGuard<'_, BTreeMap<BundleId, Bundle>>, RepositoryError> {
        self.bundles
            .lock()
            .map_err(|_| RepositoryError::Store("bundle repository mutex poisoned".to_string()))
    }

    /// Returns a snapshot of all bundles.
    fn snapshot(&self) -> Result<Vec<Bundle>, RepositoryError> {
        Ok(self.lock()?.values().cloned().collect())
    }
}

impl BundleRepository for InMemoryBundleRepository {
    fn get_update_info(
        &self,
        request: &ResolutionRequest,
    ) -> Result<Option<UpdateInfo>, RepositoryError> {
        let bundles = self.snapshot()?;
        Ok(resolve_update(&bundles, request))
    }

    fn target_app_versions(&self, platform: Platform) -> Result<Vec<String>, RepositoryError> {
        let bundles = self.snapshot()?;
        Ok(target_version_groups(&bundles, platform))
    }

    fn list_bundles(&self, query: &BundleQuery) -> Result<BundlePage, RepositoryError> {
        let guard = self.lock()?;
        let matching: Vec<&Bundle> =
            guard.values().rev().filter(|bundle| query.matches(bundle)).collect();
        let total = u64::try_from(matching.len())
            .map_err(|_| RepositoryError::Store("bundle count overflow".to_string()))?;
        let limit = query.effective_limit();
        let offset = usize::try_from(query.offset).unwrap_or(usize::MAX);
        let take = usize::try_from(limit).unwrap_or(usize::MAX);
        let data = matching.into_iter().skip(offset).take(take).cloned().collect();
        Ok(BundlePage {
            data,
            pagination: Pagination::new(total, limit, query.offset),
        })
    }

    fn get_bundle(&self, id: &BundleId) -> Result<Option<Bundle>, RepositoryError> {
        Ok(self.lock()?.get(id).cloned())
    }

    fn upsert_bundles(&self, bundles: &[Bundle]) -> Result<(), RepositoryError> {
        for bundle in bundles {
            bundle.validate()?;
        }
        let mut guard = self.lock()?;
        for bundle in bundles {
            guard.insert(bundle.id.clone(), bundle.clone());
        }
        Ok(())
    }

    fn delete_bundle(&self, id: &BundleId) -> Result<bool, RepositoryError> {
        Ok(self.lock()?.remove(id).is_some())
    }

    fn channels(&self) -> Result<Vec<Channel>, RepositoryError> {
        let guard = self.lock()?;
        let channels: BTreeSet<Channel> = guard.values().map(|bundle| bundle.channel.clone()).collect();
        Ok(channels.into_iter().collect())
    }
}

// ============================================================================
// SECTION: Object Store
// ============================================================================

/// In-memory object store.
#[derive(Debug, Default, Clone)]
pub struct InMemoryObjectStore {
    /// Objects keyed by storage key.
    objects: Arc<Mutex<BTreeMap<String, StoredObject>>>,
}

impl InMemoryObjectStore {
    /// Creates an empty object store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Locks the object map.
    fn lock(&self) -> Result<MutexGuard<'_, BTreeMap<String, StoredObject>>, ObjectStoreError> {
        self.objects.lock().map_err(|_| ObjectStoreError::Io("object store mutex poisoned".to_string()))
    }
}

impl ObjectStore for InMemoryObjectStore {
    fn get(&self, key: &str) -> Result<Option<StoredObject>, ObjectStoreError> {
        validate_object_key(key)?;
        Ok(self.lock()?.get(key).cloned())
    }

    fn put(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: Option<&str>,
    ) -> Result<(), ObjectStoreError> {
        validate_object_key(key)?;
        let object = StoredObject {
            bytes,
            content_type: content_type.map(str::to_string),
        };
        self.lock()?.insert(key.to_string(), object);
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), ObjectStoreError> {
        validate_object_key(key)?;
        self.lock()?.remove(key);
        Ok(())
    }

    fn list(&self, prefix: &str) -> Result<Vec<String>, ObjectStoreError> {
        Ok(self.lock()?.keys().filter(|key| key.starts_with(prefix)).cloned().collect())
    }
}
