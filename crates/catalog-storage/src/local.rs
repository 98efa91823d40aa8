//! Filesystem backend: one directory per video under `base_path`.

use crate::keys::split_key;
use crate::traits::{Storage, StorageError, StorageResult};
use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tokio::fs;
use tokio::io::AsyncWriteExt;

#[derive(Clone, Debug)]
pub struct LocalStorage {
    base_path: PathBuf,
    base_url: String,
}

impl LocalStorage {
    /// Open (and create if needed) the storage root.
    ///
    /// `base_url` is the prefix files are served under, e.g.
    /// `http://localhost:8000/storage`.
    pub async fn new(base_path: impl Into<PathBuf>, base_url: String) -> StorageResult<Self> {
        let base_path = base_path.into();
        fs::create_dir_all(&base_path).await.map_err(|e| {
            StorageError::Config(format!(
                "Cannot create storage directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        Ok(LocalStorage {
            base_path,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn path_of(&self, storage_key: &str) -> StorageResult<PathBuf> {
        let (upload_dir, file_name) = split_key(storage_key)?;
        Ok(self.base_path.join(upload_dir).join(file_name))
    }
}

#[async_trait]
impl Storage for LocalStorage {
    /// Writes to a sibling `.partial` file and renames it into place, so a
    /// reader never sees a half-written file under the final key.
    async fn upload_with_key(
        &self,
        storage_key: &str,
        data: Bytes,
        _content_type: &str,
    ) -> StorageResult<String> {
        let path = self.path_of(storage_key)?;
        let partial = path.with_extension("partial");
        let start = Instant::now();

        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .await
                .map_err(|e| StorageError::write(storage_key, e))?;
        }

        let written = async {
            let mut file = fs::File::create(&partial).await?;
            file.write_all(&data).await?;
            file.sync_all().await?;
            fs::rename(&partial, &path).await
        }
        .await;

        if let Err(e) = written {
            let _ = fs::remove_file(&partial).await;
            return Err(StorageError::write(storage_key, e));
        }

        tracing::debug!(
            storage_key = %storage_key,
            size_bytes = data.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Stored file on disk"
        );

        Ok(self.public_url(storage_key))
    }

    async fn download(&self, storage_key: &str) -> StorageResult<Vec<u8>> {
        let path = self.path_of(storage_key)?;
        fs::read(&path).await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => StorageError::NotFound(storage_key.to_string()),
            _ => StorageError::Read {
                key: storage_key.to_string(),
                reason: e.to_string(),
            },
        })
    }

    async fn delete(&self, storage_key: &str) -> StorageResult<()> {
        let path = self.path_of(storage_key)?;
        match fs::remove_file(&path).await {
            Ok(()) => {
                tracing::debug!(storage_key = %storage_key, "Deleted file from disk");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::Delete {
                key: storage_key.to_string(),
                reason: e.to_string(),
            }),
        }
    }

    async fn exists(&self, storage_key: &str) -> StorageResult<bool> {
        let path = self.path_of(storage_key)?;
        Ok(fs::try_exists(&path).await?)
    }

    fn public_url(&self, storage_key: &str) -> String {
        format!("{}/{}", self.base_url, storage_key)
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}
