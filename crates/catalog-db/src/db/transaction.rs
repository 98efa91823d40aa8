//! Postgres transaction handle
//!
//! Wraps one sqlx transaction for the whole write. Dropping the handle
//! without committing rolls the transaction back when the connection returns
//! to the pool.

use async_trait::async_trait;
use catalog_core::models::{RelationKind, Video};
use catalog_core::AppError;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::store::CatalogTx;
use super::video;

pub struct PgCatalogTx {
    tx: Transaction<'static, Postgres>,
}

impl PgCatalogTx {
    /// Begin a new database transaction
    pub async fn begin(pool: &PgPool) -> Result<Self, AppError> {
        let tx = pool.begin().await?;
        Ok(Self { tx })
    }
}

#[async_trait]
impl CatalogTx for PgCatalogTx {
    async fn lock_video(&mut self, id: Uuid) -> Result<Option<Video>, AppError> {
        video::lock_video(&mut *self.tx, id).await
    }

    async fn insert_video(&mut self, video: &Video) -> Result<(), AppError> {
        video::insert_video(&mut *self.tx, video).await
    }

    async fn update_video(&mut self, video: &Video) -> Result<(), AppError> {
        video::update_video(&mut *self.tx, video).await
    }

    async fn related_ids(
        &mut self,
        video_id: Uuid,
        kind: RelationKind,
    ) -> Result<Vec<Uuid>, AppError> {
        video::select_related_ids(&mut *self.tx, video_id, kind).await
    }

    async fn attach(
        &mut self,
        video_id: Uuid,
        kind: RelationKind,
        tag_id: Uuid,
    ) -> Result<(), AppError> {
        video::insert_relation(&mut *self.tx, video_id, kind, tag_id).await
    }

    async fn detach(
        &mut self,
        video_id: Uuid,
        kind: RelationKind,
        tag_id: Uuid,
    ) -> Result<(), AppError> {
        video::delete_relation(&mut *self.tx, video_id, kind, tag_id).await
    }

    async fn commit(self: Box<Self>) -> Result<(), AppError> {
        let this = *self;
        this.tx.commit().await?;
        tracing::debug!("Transaction committed");
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), AppError> {
        let this = *self;
        this.tx.rollback().await?;
        tracing::debug!("Transaction rolled back");
        Ok(())
    }
}
