//! In-memory storage backend.
//!
//! Used by tests and local demos. Writes can be made to fail on demand so
//! callers can exercise their compensation paths.

use crate::traits::{Storage, StorageError, StorageResult};
use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Default, Debug)]
struct MemoryState {
    files: HashMap<String, Bytes>,
    fail_uploads: HashSet<String>,
    fail_after_uploads: Option<usize>,
    uploads: usize,
}

/// Storage implementation that keeps files in memory
#[derive(Clone, Default, Debug)]
pub struct MemoryStorage {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    // A poisoned lock only means another test thread panicked mid-write;
    // the map itself is still usable.
    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Make every upload whose key ends with `suffix` fail.
    pub fn fail_uploads_ending_with(&self, suffix: impl Into<String>) {
        self.state().fail_uploads.insert(suffix.into());
    }

    /// Let `count` more uploads succeed, then fail every later upload.
    pub fn fail_after_uploads(&self, count: usize) {
        let mut state = self.state();
        state.fail_after_uploads = Some(state.uploads + count);
    }

    /// Stop injecting failures.
    pub fn heal(&self) {
        let mut state = self.state();
        state.fail_uploads.clear();
        state.fail_after_uploads = None;
    }

    /// Check if a file exists
    pub fn has_file(&self, key: &str) -> bool {
        self.state().files.contains_key(key)
    }

    /// Get file data (for test assertions)
    pub fn get_file(&self, key: &str) -> Option<Bytes> {
        self.state().files.get(key).cloned()
    }

    /// All stored keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.state().files.keys().cloned().collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn upload_with_key(
        &self,
        storage_key: &str,
        data: Bytes,
        _content_type: &str,
    ) -> StorageResult<String> {
        let mut state = self.state();
        let budget_exhausted = state
            .fail_after_uploads
            .is_some_and(|limit| state.uploads >= limit);
        if budget_exhausted
            || state
                .fail_uploads
                .iter()
                .any(|suffix| storage_key.ends_with(suffix.as_str()))
        {
            return Err(StorageError::write(storage_key, "injected failure"));
        }
        state.uploads += 1;
        state.files.insert(storage_key.to_string(), data);
        Ok(format!("memory://{}", storage_key))
    }

    async fn download(&self, storage_key: &str) -> StorageResult<Vec<u8>> {
        self.state()
            .files
            .get(storage_key)
            .map(|data| data.to_vec())
            .ok_or_else(|| StorageError::NotFound(storage_key.to_string()))
    }

    async fn delete(&self, storage_key: &str) -> StorageResult<()> {
        self.state().files.remove(storage_key);
        Ok(())
    }

    async fn exists(&self, storage_key: &str) -> StorageResult<bool> {
        Ok(self.state().files.contains_key(storage_key))
    }

    fn public_url(&self, storage_key: &str) -> String {
        format!("memory://{}", storage_key)
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Memory
    }
}
