//! Physical files of a video in storage
//!
//! Every operation is scoped to one upload directory, the owning video's id,
//! so distinct videos never contend on file keys.

use catalog_storage::{storage_key, Storage, StorageResult};
use futures::stream::{self, StreamExt};
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use super::staging::StagedFile;

const DELETE_CONCURRENCY: usize = 8;

/// Names present before an update that no slot references afterwards.
pub fn diff_obsolete(previous: &HashSet<String>, current: &HashSet<String>) -> BTreeSet<String> {
    previous.difference(current).cloned().collect()
}

/// Stores and removes a video's files.
#[derive(Clone)]
pub struct FileLifecycle {
    storage: Arc<dyn Storage>,
}

impl FileLifecycle {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    /// Storage key of `name` inside `upload_dir`.
    pub fn relative_path(upload_dir: &str, name: &str) -> StorageResult<String> {
        storage_key(upload_dir, name)
    }

    /// Public URL of a stored file.
    pub fn file_url(&self, upload_dir: &str, name: &str) -> StorageResult<String> {
        Ok(self.storage.public_url(&storage_key(upload_dir, name)?))
    }

    /// Write every staged file under `upload_dir`.
    ///
    /// All or nothing: when one write fails, the files this call already
    /// wrote are removed before the error is returned.
    #[tracing::instrument(skip(self, files), fields(upload_dir = %upload_dir, file_count = files.len()))]
    pub async fn store(&self, upload_dir: &str, files: &[StagedFile]) -> StorageResult<()> {
        let mut written: Vec<String> = Vec::with_capacity(files.len());

        for staged in files {
            let result = match storage_key(upload_dir, staged.name()) {
                Ok(key) => self
                    .storage
                    .upload_with_key(&key, staged.file.bytes().clone(), staged.file.content_type())
                    .await
                    .map(|_| key),
                Err(e) => Err(e),
            };

            match result {
                Ok(key) => written.push(key),
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        slot = %staged.slot,
                        file_name = %staged.name(),
                        written = written.len(),
                        "Failed to store file, removing files already written by this batch"
                    );
                    self.delete_keys(written).await;
                    return Err(e);
                }
            }
        }

        tracing::info!(upload_dir = %upload_dir, file_count = written.len(), "Stored files");
        Ok(())
    }

    /// Delete `names` from `upload_dir`, best effort.
    ///
    /// Missing files are not errors. Returns how many files could not be
    /// deleted; each failure is logged.
    #[tracing::instrument(skip(self, names), fields(upload_dir = %upload_dir, file_count = names.len()))]
    pub async fn remove(&self, upload_dir: &str, names: &[String]) -> usize {
        let mut keys = Vec::with_capacity(names.len());
        let mut failed = 0;
        for name in names {
            match storage_key(upload_dir, name) {
                Ok(key) => keys.push(key),
                Err(e) => {
                    tracing::warn!(error = %e, file_name = %name, "Refusing to delete file with invalid name");
                    failed += 1;
                }
            }
        }
        failed + self.delete_keys(keys).await
    }

    async fn delete_keys(&self, keys: Vec<String>) -> usize {
        let failures = stream::iter(keys)
            .map(|key| {
                let storage = Arc::clone(&self.storage);
                async move {
                    match storage.delete(&key).await {
                        Ok(()) => 0usize,
                        Err(e) => {
                            tracing::error!(
                                error = %e,
                                storage_key = %key,
                                "Failed to delete file from storage"
                            );
                            1
                        }
                    }
                }
            })
            .buffer_unordered(DELETE_CONCURRENCY)
            .collect::<Vec<usize>>()
            .await;
        failures.into_iter().sum()
    }
}
