//! Resolution of symbolic buffer keys to file locators.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::types::FileLocator;

/// Maps the buffer keys used in layer descriptors to encoded spans.
pub trait LocatorTable {
    /// Look up the locator for `key`.
    fn locator(&self, key: &str) -> Option<FileLocator>;
}

impl<T: LocatorTable + ?Sized> LocatorTable for &T {
    fn locator(&self, key: &str) -> Option<FileLocator> {
        (**self).locator(key)
    }
}

impl<T: LocatorTable + ?Sized> LocatorTable for Arc<T> {
    fn locator(&self, key: &str) -> Option<FileLocator> {
        (**self).locator(key)
    }
}

impl LocatorTable for HashMap<String, FileLocator> {
    fn locator(&self, key: &str) -> Option<FileLocator> {
        self.get(key).copied()
    }
}

/// A locator table held in memory.
///
/// Serializes as a JSON object from key to locator:
///
/// ```json
/// { "skin_idx": { "source": 7, "offset": 0, "length": 4812 } }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocatorMap {
    entries: HashMap<String, FileLocator>,
}

impl LocatorMap {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a locator, returning the one it replaced.
    pub fn insert(&mut self, key: impl Into<String>, locator: FileLocator) -> Option<FileLocator> {
        self.entries.insert(key.into(), locator)
    }

    /// Number of keys in the table.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl LocatorTable for LocatorMap {
    fn locator(&self, key: &str) -> Option<FileLocator> {
        self.entries.get(key).copied()
    }
}

impl FromIterator<(String, FileLocator)> for LocatorMap {
    fn from_iter<T: IntoIterator<Item = (String, FileLocator)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}
