//! Process-local blob store.

use super::{ensure_valid_key, BlobStore, StorageResult};
use std::collections::HashMap;

/// Blob store kept in a hash map. Nothing survives the process.
#[derive(Debug, Clone, Default)]
pub struct MemoryBlobStore {
    blobs: HashMap<String, String>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with one blob.
    pub fn with_blob(key: impl Into<String>, value: impl Into<String>) -> Self {
        let mut blobs = HashMap::new();
        blobs.insert(key.into(), value.into());
        Self { blobs }
    }

    /// Borrow a stored blob without going through the trait.
    pub fn peek(&self, key: &str) -> Option<&str> {
        self.blobs.get(key).map(String::as_str)
    }
}

impl BlobStore for MemoryBlobStore {
    fn get_blob(&self, key: &str) -> StorageResult<Option<String>> {
        ensure_valid_key(key)?;
        Ok(self.blobs.get(key).cloned())
    }

    fn set_blob(&mut self, key: &str, value: &str) -> StorageResult<()> {
        ensure_valid_key(key)?;
        self.blobs.insert(key.to_string(), value.to_string());
        Ok(())
    }
}
