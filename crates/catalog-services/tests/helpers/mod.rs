//! Shared fixtures for write-path tests.
//!
//! `FaultyStore` wraps the in-memory catalog and fails chosen transaction
//! steps on demand. `RecordingStorage` wraps the in-memory file store and
//! records the order of successful uploads and deletes.

#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use catalog_core::models::{fields, Attributes, RelationKind, UploadedFile, Video};
use catalog_core::AppError;
use catalog_services::{
    CatalogStore, CatalogTx, FileLifecycle, MemoryCatalogStore, MemoryStorage, Storage,
    VideoWriter,
};
use catalog_storage::{StorageBackend, StorageResult};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Transaction steps that can be made to fail.
#[derive(Default)]
pub struct Faults {
    pub fail_commit: AtomicBool,
    pub fail_update: AtomicBool,
    fail_attach: Mutex<Option<RelationKind>>,
}

impl Faults {
    pub fn fail_attach(&self, kind: RelationKind) {
        *self.fail_attach.lock().unwrap() = Some(kind);
    }

    fn attach_fails(&self, kind: RelationKind) -> bool {
        *self.fail_attach.lock().unwrap() == Some(kind)
    }
}

pub struct FaultyStore {
    inner: Arc<MemoryCatalogStore>,
    faults: Arc<Faults>,
}

#[async_trait]
impl CatalogStore for FaultyStore {
    async fn begin(&self) -> Result<Box<dyn CatalogTx>, AppError> {
        Ok(Box::new(FaultyTx {
            inner: self.inner.begin().await?,
            faults: Arc::clone(&self.faults),
        }))
    }

    async fn find_video(
        &self,
        id: Uuid,
        include_deleted: bool,
    ) -> Result<Option<Video>, AppError> {
        self.inner.find_video(id, include_deleted).await
    }

    async fn related_ids(
        &self,
        video_id: Uuid,
        kind: RelationKind,
    ) -> Result<Vec<Uuid>, AppError> {
        self.inner.related_ids(video_id, kind).await
    }

    async fn soft_delete_video(&self, id: Uuid) -> Result<bool, AppError> {
        self.inner.soft_delete_video(id).await
    }
}

struct FaultyTx {
    inner: Box<dyn CatalogTx>,
    faults: Arc<Faults>,
}

#[async_trait]
impl CatalogTx for FaultyTx {
    async fn lock_video(&mut self, id: Uuid) -> Result<Option<Video>, AppError> {
        self.inner.lock_video(id).await
    }

    async fn insert_video(&mut self, video: &Video) -> Result<(), AppError> {
        self.inner.insert_video(video).await
    }

    async fn update_video(&mut self, video: &Video) -> Result<(), AppError> {
        if self.faults.fail_update.load(Ordering::SeqCst) {
            return Err(AppError::Internal("injected update failure".to_string()));
        }
        self.inner.update_video(video).await
    }

    async fn related_ids(
        &mut self,
        video_id: Uuid,
        kind: RelationKind,
    ) -> Result<Vec<Uuid>, AppError> {
        self.inner.related_ids(video_id, kind).await
    }

    async fn attach(
        &mut self,
        video_id: Uuid,
        kind: RelationKind,
        tag_id: Uuid,
    ) -> Result<(), AppError> {
        if self.faults.attach_fails(kind) {
            return Err(AppError::Conflict("injected attach failure".to_string()));
        }
        self.inner.attach(video_id, kind, tag_id).await
    }

    async fn detach(
        &mut self,
        video_id: Uuid,
        kind: RelationKind,
        tag_id: Uuid,
    ) -> Result<(), AppError> {
        self.inner.detach(video_id, kind, tag_id).await
    }

    async fn commit(self: Box<Self>) -> Result<(), AppError> {
        let this = *self;
        if this.faults.fail_commit.load(Ordering::SeqCst) {
            this.inner.rollback().await?;
            return Err(AppError::Conflict("injected commit failure".to_string()));
        }
        this.inner.commit().await
    }

    async fn rollback(self: Box<Self>) -> Result<(), AppError> {
        let this = *self;
        this.inner.rollback().await
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageEvent {
    Uploaded(String),
    Deleted(String),
}

#[derive(Clone)]
pub struct RecordingStorage {
    inner: MemoryStorage,
    events: Arc<Mutex<Vec<StorageEvent>>>,
}

impl RecordingStorage {
    fn record(&self, event: StorageEvent) {
        self.events.lock().unwrap().push(event);
    }
}

#[async_trait]
impl Storage for RecordingStorage {
    async fn upload_with_key(
        &self,
        storage_key: &str,
        data: Bytes,
        content_type: &str,
    ) -> StorageResult<String> {
        let url = self
            .inner
            .upload_with_key(storage_key, data, content_type)
            .await?;
        self.record(StorageEvent::Uploaded(storage_key.to_string()));
        Ok(url)
    }

    async fn download(&self, storage_key: &str) -> StorageResult<Vec<u8>> {
        self.inner.download(storage_key).await
    }

    async fn delete(&self, storage_key: &str) -> StorageResult<()> {
        self.inner.delete(storage_key).await?;
        self.record(StorageEvent::Deleted(storage_key.to_string()));
        Ok(())
    }

    async fn exists(&self, storage_key: &str) -> StorageResult<bool> {
        self.inner.exists(storage_key).await
    }

    fn public_url(&self, storage_key: &str) -> String {
        self.inner.public_url(storage_key)
    }

    fn backend_type(&self) -> StorageBackend {
        self.inner.backend_type()
    }
}

pub struct Harness {
    pub store: Arc<MemoryCatalogStore>,
    pub faults: Arc<Faults>,
    pub storage: MemoryStorage,
    events: Arc<Mutex<Vec<StorageEvent>>>,
    pub writer: VideoWriter,
}

impl Harness {
    pub fn new() -> Self {
        let store = Arc::new(MemoryCatalogStore::new());
        let faults = Arc::new(Faults::default());
        let storage = MemoryStorage::new();
        let events = Arc::new(Mutex::new(Vec::new()));

        let faulty = FaultyStore {
            inner: Arc::clone(&store),
            faults: Arc::clone(&faults),
        };
        let recording = RecordingStorage {
            inner: storage.clone(),
            events: Arc::clone(&events),
        };
        let writer = VideoWriter::new(
            Arc::new(faulty),
            store.clone(),
            FileLifecycle::new(Arc::new(recording)),
        );

        Self {
            store,
            faults,
            storage,
            events,
            writer,
        }
    }

    pub fn events(&self) -> Vec<StorageEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn clear_events(&self) {
        self.events.lock().unwrap().clear();
    }

    /// Row as committed, trashed or not.
    pub async fn stored(&self, id: Uuid) -> Option<Video> {
        self.store.find_video(id, true).await.unwrap()
    }

    pub async fn related(&self, video_id: Uuid, kind: RelationKind) -> Vec<Uuid> {
        self.store.related_ids(video_id, kind).await.unwrap()
    }
}

/// Attributes of a valid create request without relations or files.
pub fn video_attrs() -> Attributes {
    Attributes::new()
        .with(fields::TITLE, "The Movie")
        .with(fields::DESCRIPTION, "A description")
        .with(fields::YEAR_LAUNCHED, 2010)
        .with(fields::OPENED, false)
        .with(fields::RATING, "12")
        .with(fields::DURATION, 90)
}

pub fn mp4(name: &str, content: &[u8]) -> UploadedFile {
    UploadedFile::new(name, "video/mp4", content.to_vec())
}

pub fn png(name: &str, content: &[u8]) -> UploadedFile {
    UploadedFile::new(name, "image/png", content.to_vec())
}

pub fn key(video_id: Uuid, name: &str) -> String {
    format!("{}/{}", video_id, name)
}

pub fn sorted(mut ids: Vec<Uuid>) -> Vec<Uuid> {
    ids.sort();
    ids
}
