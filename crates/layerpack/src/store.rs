//! Resource stores that hand out raw bytes by id.
//!
//! This module provides a `ResourceStore` trait and implementations for
//! acquiring the bytes of layer descriptors, encoded buffers, and textures.
//!
//! # Implementations
//!
//! - [`MemoryStore`]: In-memory store, cheaply cloneable and shareable
//! - [`DirectoryStore`]: Files on disk, addressed through an id table

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use crate::error::FetchError;
use crate::types::ResourceId;

/// A source of raw resource bytes.
///
/// Fetches are synchronous; the loader calls them from its worker thread.
pub trait ResourceStore: Send + Sync {
    /// Fetch the full contents of a resource.
    fn fetch_bytes(&self, id: ResourceId) -> Result<Vec<u8>, FetchError>;
}

impl<T: ResourceStore + ?Sized> ResourceStore for &T {
    fn fetch_bytes(&self, id: ResourceId) -> Result<Vec<u8>, FetchError> {
        (**self).fetch_bytes(id)
    }
}

impl<T: ResourceStore + ?Sized> ResourceStore for Arc<T> {
    fn fetch_bytes(&self, id: ResourceId) -> Result<Vec<u8>, FetchError> {
        (**self).fetch_bytes(id)
    }
}

/// An in-memory resource store.
///
/// Data lives in a `HashMap` behind a `RwLock`; clones share the same
/// contents, so one clone can be handed to the loader while another keeps
/// inserting.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<RwLock<HashMap<ResourceId, Arc<[u8]>>>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `data` under `id`, replacing any previous contents.
    pub fn insert(&self, id: ResourceId, data: impl Into<Vec<u8>>) {
        let data: Vec<u8> = data.into();
        self.write().insert(id, data.into());
    }

    /// Remove a resource.
    pub fn remove(&self, id: ResourceId) {
        self.write().remove(&id);
    }

    /// Check whether a resource is present.
    #[must_use]
    pub fn contains(&self, id: ResourceId) -> bool {
        self.read().contains_key(&id)
    }

    /// Number of stored resources.
    #[must_use]
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Check if the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<ResourceId, Arc<[u8]>>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<ResourceId, Arc<[u8]>>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ResourceStore for MemoryStore {
    fn fetch_bytes(&self, id: ResourceId) -> Result<Vec<u8>, FetchError> {
        self.read()
            .get(&id)
            .map(|data| data.to_vec())
            .ok_or(FetchError::NotFound { id })
    }
}

/// A store reading files from disk.
///
/// Each id is mapped to a path; relative paths resolve against the root.
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    root: PathBuf,
    files: HashMap<ResourceId, PathBuf>,
}

impl DirectoryStore {
    /// Create a store rooted at `root` with no registered files.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            files: HashMap::new(),
        }
    }

    /// Register the file backing `id`.
    #[must_use]
    pub fn with_file(mut self, id: ResourceId, path: impl Into<PathBuf>) -> Self {
        self.insert(id, path);
        self
    }

    /// Register the file backing `id`, replacing any previous path.
    pub fn insert(&mut self, id: ResourceId, path: impl Into<PathBuf>) {
        self.files.insert(id, path.into());
    }

    /// The directory relative paths are resolved against.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The full path backing `id`, if registered.
    #[must_use]
    pub fn path_of(&self, id: ResourceId) -> Option<PathBuf> {
        self.files.get(&id).map(|path| self.root.join(path))
    }
}

impl ResourceStore for DirectoryStore {
    fn fetch_bytes(&self, id: ResourceId) -> Result<Vec<u8>, FetchError> {
        let path = self.path_of(id).ok_or(FetchError::NotFound { id })?;
        tracing::debug!(source = %id, path = %path.display(), "reading resource");

        std::fs::read(&path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => FetchError::NotFound { id },
            _ => FetchError::Io {
                id,
                message: format!("{}: {e}", path.display()),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_basic() {
        let store = MemoryStore::new();

        // Initially empty.
        assert!(store.is_empty());

        store.insert(ResourceId(1), vec![1, 2, 3]);
        assert_eq!(store.len(), 1);
        assert!(store.contains(ResourceId(1)));
        assert!(!store.contains(ResourceId(2)));

        assert_eq!(store.fetch_bytes(ResourceId(1)), Ok(vec![1, 2, 3]));
        assert_eq!(
            store.fetch_bytes(ResourceId(2)),
            Err(FetchError::NotFound { id: ResourceId(2) })
        );

        store.remove(ResourceId(1));
        assert!(store.is_empty());
    }

    #[test]
    fn test_memory_store_replace() {
        let store = MemoryStore::new();
        store.insert(ResourceId(1), vec![1, 2, 3]);
        store.insert(ResourceId(1), vec![1, 2, 3, 4, 5]);
        assert_eq!(store.len(), 1);
        assert_eq!(store.fetch_bytes(ResourceId(1)), Ok(vec![1, 2, 3, 4, 5]));
    }

    #[test]
    fn test_memory_store_clones_share_contents() {
        let store = MemoryStore::new();
        let handle = store.clone();
        store.insert(ResourceId(7), b"abc".to_vec());
        assert_eq!(handle.fetch_bytes(ResourceId(7)), Ok(b"abc".to_vec()));
    }

    #[test]
    fn test_directory_store() {
        let dir = std::env::temp_dir().join(format!("layerpack-store-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("layer.json"), b"{}").unwrap();

        let store = DirectoryStore::new(&dir)
            .with_file(ResourceId(1), "layer.json")
            .with_file(ResourceId(2), "missing.bin");

        assert_eq!(store.fetch_bytes(ResourceId(1)), Ok(b"{}".to_vec()));
        assert_eq!(
            store.fetch_bytes(ResourceId(2)),
            Err(FetchError::NotFound { id: ResourceId(2) })
        );
        assert_eq!(
            store.fetch_bytes(ResourceId(3)),
            Err(FetchError::NotFound { id: ResourceId(3) })
        );

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
