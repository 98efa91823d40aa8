use async_trait::async_trait;
use catalog_core::models::{Category, Gender, RelationKind, Video};
use catalog_core::{AppError, CoverageLookup};
use sqlx::PgPool;
use std::collections::HashSet;
use uuid::Uuid;

use super::store::{CatalogStore, CatalogTx, TagLookup};
use super::tag::TagRepository;
use super::transaction::PgCatalogTx;
use super::video::VideoRepository;

/// Postgres implementation of the catalog store
#[derive(Clone)]
pub struct PgCatalogStore {
    pool: PgPool,
    videos: VideoRepository,
    tags: TagRepository,
}

impl PgCatalogStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            videos: VideoRepository::new(pool.clone()),
            tags: TagRepository::new(pool.clone()),
            pool,
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn videos(&self) -> &VideoRepository {
        &self.videos
    }

    pub fn tags(&self) -> &TagRepository {
        &self.tags
    }

    pub async fn create_category(&self, name: &str) -> Result<Category, AppError> {
        self.tags.create_category(name, true).await
    }

    pub async fn create_gender(
        &self,
        name: &str,
        category_ids: &[Uuid],
    ) -> Result<Gender, AppError> {
        self.tags.create_gender(name, true, category_ids).await
    }

    pub async fn sync_gender_categories(
        &self,
        gender_id: Uuid,
        category_ids: &[Uuid],
    ) -> Result<(), AppError> {
        self.tags.sync_gender_categories(gender_id, category_ids).await
    }

    pub async fn soft_delete_tag(&self, kind: RelationKind, id: Uuid) -> Result<bool, AppError> {
        self.tags.soft_delete(kind, id).await
    }
}

#[async_trait]
impl CatalogStore for PgCatalogStore {
    async fn begin(&self) -> Result<Box<dyn CatalogTx>, AppError> {
        Ok(Box::new(PgCatalogTx::begin(&self.pool).await?))
    }

    async fn find_video(
        &self,
        id: Uuid,
        include_deleted: bool,
    ) -> Result<Option<Video>, AppError> {
        self.videos.find(id, include_deleted).await
    }

    async fn related_ids(
        &self,
        video_id: Uuid,
        kind: RelationKind,
    ) -> Result<Vec<Uuid>, AppError> {
        self.videos.related_ids(video_id, kind).await
    }

    async fn soft_delete_video(&self, id: Uuid) -> Result<bool, AppError> {
        self.videos.soft_delete(id).await
    }
}

#[async_trait]
impl CoverageLookup for PgCatalogStore {
    async fn categories_for_gender(
        &self,
        gender_id: Uuid,
        candidates: &HashSet<Uuid>,
    ) -> Result<HashSet<Uuid>, AppError> {
        self.tags.categories_for_gender(gender_id, candidates).await
    }
}

#[async_trait]
impl TagLookup for PgCatalogStore {
    async fn live_tag_ids(
        &self,
        kind: RelationKind,
        ids: &HashSet<Uuid>,
    ) -> Result<HashSet<Uuid>, AppError> {
        self.tags.live_ids(kind, ids).await
    }
}
