// crates/hot-updater-server/src/files.rs
// ============================================================================
// Module: Filesystem Object Store
// Description: Directory-backed object store for delivered artifacts.
// Purpose: Serve and migrate bundle files rooted at one directory.
// Dependencies: hot-updater-core
// ============================================================================

//! ## Overview
//! [`FsObjectStore`] maps relative object keys onto files below a root
//! directory. Keys are validated before touching the filesystem and resolved
//! paths must stay inside the canonical root. Content types are derived from
//! the file extension.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::path::PathBuf;

use hot_updater_core::ObjectStore;
use hot_updater_core::ObjectStoreError;
use hot_updater_core::StoredObject;
use hot_updater_core::validate_object_key;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum total path length for the store root.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;

// ============================================================================
// SECTION: Store
// ============================================================================

/// Object store rooted at a directory.
#[derive(Debug, Clone)]
pub struct FsObjectStore {
    /// Canonical root directory.
    root: PathBuf,
}

impl FsObjectStore {
    /// Opens a store, creating the root directory when missing.
    ///
    /// # Errors
    ///
    /// Returns [`ObjectStoreError`] when the root is invalid or cannot be created.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, ObjectStoreError> {
        let root = root.into();
        if root.as_os_str().is_empty() || root.to_string_lossy().len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ObjectStoreError::Invalid("files root path is invalid".to_string()));
        }
        fs::create_dir_all(&root).map_err(|err| ObjectStoreError::Io(err.to_string()))?;
        let root = root.canonicalize().map_err(|err| ObjectStoreError::Io(err.to_string()))?;
        if !root.is_dir() {
            return Err(ObjectStoreError::Invalid("files root must be a directory".to_string()));
        }
        Ok(Self {
            root,
        })
    }

    /// Returns the canonical root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves a key to a path inside the root.
    fn resolve(&self, key: &str) -> Result<PathBuf, ObjectStoreError> {
        validate_object_key(key)?;
        let path = self.root.join(key);
        if let Ok(canonical) = path.canonicalize()
            && !canonical.starts_with(&self.root)
        {
            return Err(ObjectStoreError::Invalid("key escapes files root".to_string()));
        }
        Ok(path)
    }

    /// Collects file keys below `dir` into `keys`.
    fn collect(&self, dir: &Path, keys: &mut Vec<String>) -> Result<(), ObjectStoreError> {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(()),
            Err(err) => return Err(ObjectStoreError::Io(err.to_string())),
        };
        for entry in entries {
            let entry = entry.map_err(|err| ObjectStoreError::Io(err.to_string()))?;
            let file_type = entry.file_type().map_err(|err| ObjectStoreError::Io(err.to_string()))?;
            let path = entry.path();
            if file_type.is_dir() {
                self.collect(&path, keys)?;
            } else if file_type.is_file()
                && let Ok(relative) = path.strip_prefix(&self.root)
            {
                let key: Vec<String> = relative
                    .components()
                    .map(|component| component.as_os_str().to_string_lossy().into_owned())
                    .collect();
                keys.push(key.join("/"));
            }
        }
        Ok(())
    }
}

impl ObjectStore for FsObjectStore {
    fn get(&self, key: &str) -> Result<Option<StoredObject>, ObjectStoreError> {
        let path = self.resolve(key)?;
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(StoredObject {
                bytes,
                content_type: Some(content_type_for(key).to_string()),
            })),
            Err(err) if matches!(err.kind(), ErrorKind::NotFound | ErrorKind::IsADirectory) => {
                Ok(None)
            }
            Err(err) => Err(ObjectStoreError::Io(err.to_string())),
        }
    }

    fn put(
        &self,
        key: &str,
        bytes: Vec<u8>,
        _content_type: Option<&str>,
    ) -> Result<(), ObjectStoreError> {
        let path = self.resolve(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|err| ObjectStoreError::Io(err.to_string()))?;
        }
        fs::write(&path, bytes).map_err(|err| ObjectStoreError::Io(err.to_string()))
    }

    fn delete(&self, key: &str) -> Result<(), ObjectStoreError> {
        let path = self.resolve(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(ObjectStoreError::Io(err.to_string())),
        }
    }

    fn list(&self, prefix: &str) -> Result<Vec<String>, ObjectStoreError> {
        let mut keys = Vec::new();
        self.collect(&self.root, &mut keys)?;
        keys.retain(|key| key.starts_with(prefix));
        keys.sort();
        Ok(keys)
    }
}

/// Returns the content type for a key based on its extension.
#[must_use]
pub fn content_type_for(key: &str) -> &'static str {
    match Path::new(key).extension().and_then(|ext| ext.to_str()) {
        Some("zip") => "application/zip",
        Some("json" | "map") => "application/json",
        Some("js" | "bundle") => "application/javascript",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        _ => "application/octet-stream",
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Test-only assertions.")]

    use super::*;

    #[test]
    fn files_round_trip_under_root() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsObjectStore::new(dir.path().join("files")).unwrap();
        store.put("b1/bundle.zip", b"zip".to_vec(), None).unwrap();
        let object = store.get("b1/bundle.zip").unwrap().unwrap();
        assert_eq!(object.bytes, b"zip");
        assert_eq!(object.content_type.as_deref(), Some("application/zip"));
        assert_eq!(store.list("").unwrap(), vec!["b1/bundle.zip".to_string()]);
        store.delete("b1/bundle.zip").unwrap();
        store.delete("b1/bundle.zip").unwrap();
        assert_eq!(store.get("b1/bundle.zip").unwrap(), None);
    }

    #[test]
    fn list_filters_by_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsObjectStore::new(dir.path()).unwrap();
        store.put("ios/a.zip", Vec::new(), None).unwrap();
        store.put("android/b.zip", Vec::new(), None).unwrap();
        store.put("ios/nested/c.json", Vec::new(), None).unwrap();
        assert_eq!(
            store.list("ios/").unwrap(),
            vec!["ios/a.zip".to_string(), "ios/nested/c.json".to_string()]
        );
    }

    #[test]
    fn traversal_keys_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsObjectStore::new(dir.path()).unwrap();
        assert!(store.get("../secret").is_err());
        assert!(store.put("/abs", Vec::new(), None).is_err());
    }

    #[test]
    fn directory_keys_read_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsObjectStore::new(dir.path()).unwrap();
        store.put("b1/bundle.zip", Vec::new(), None).unwrap();
        assert_eq!(store.get("b1").unwrap(), None);
    }
}
