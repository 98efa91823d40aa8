use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Failed to write {key}: {reason}")]
    Write { key: String, reason: String },

    #[error("Failed to read {key}: {reason}")]
    Read { key: String, reason: String },

    #[error("Failed to delete {key}: {reason}")]
    Delete { key: String, reason: String },

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage misconfigured: {0}")]
    Config(String),
}

impl StorageError {
    pub(crate) fn write(key: &str, reason: impl ToString) -> Self {
        StorageError::Write {
            key: key.to_string(),
            reason: reason.to_string(),
        }
    }
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Backend holding the files of every video.
///
/// Keys are `{video_id}/{file_name}` (see [`crate::keys`]). Writes replace
/// whatever the key held before and deleting a missing key succeeds, so a
/// retried batch never fails on its own leftovers.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Write `data` at `storage_key` and return its public URL.
    async fn upload_with_key(
        &self,
        storage_key: &str,
        data: Bytes,
        content_type: &str,
    ) -> StorageResult<String>;

    async fn download(&self, storage_key: &str) -> StorageResult<Vec<u8>>;

    async fn delete(&self, storage_key: &str) -> StorageResult<()>;

    async fn exists(&self, storage_key: &str) -> StorageResult<bool>;

    fn public_url(&self, storage_key: &str) -> String;

    fn backend_type(&self) -> StorageBackend;
}
