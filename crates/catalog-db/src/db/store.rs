//! Store seam used by the write coordinator
//!
//! A `CatalogStore` hands out `CatalogTx` units of work. Every write of the
//! coordinator goes through one transaction handle, which is passed
//! explicitly down the call graph and consumed by `commit` or `rollback`.

use async_trait::async_trait;
use catalog_core::models::{RelationKind, Video};
use catalog_core::{AppError, CoverageLookup};
use std::collections::HashSet;
use uuid::Uuid;

/// Non-transactional reads plus the entry point for transactional writes.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Open a new transaction.
    async fn begin(&self) -> Result<Box<dyn CatalogTx>, AppError>;

    /// Load a video. Soft-deleted rows are only returned when
    /// `include_deleted` is set.
    async fn find_video(&self, id: Uuid, include_deleted: bool)
        -> Result<Option<Video>, AppError>;

    /// Tag ids associated with a video, sorted. Soft-deleted tags are
    /// included.
    async fn related_ids(&self, video_id: Uuid, kind: RelationKind)
        -> Result<Vec<Uuid>, AppError>;

    /// Mark a live video as deleted. Returns `false` when no live row matched.
    async fn soft_delete_video(&self, id: Uuid) -> Result<bool, AppError>;
}

/// One open relational transaction.
///
/// Dropping a handle without calling `commit` discards its writes.
#[async_trait]
pub trait CatalogTx: Send {
    /// Load a live video and hold a row lock on it until the transaction
    /// ends.
    async fn lock_video(&mut self, id: Uuid) -> Result<Option<Video>, AppError>;

    async fn insert_video(&mut self, video: &Video) -> Result<(), AppError>;

    /// Overwrite the scalar and slot columns of an existing row.
    async fn update_video(&mut self, video: &Video) -> Result<(), AppError>;

    /// Tag ids associated with a video as seen by this transaction, sorted.
    async fn related_ids(&mut self, video_id: Uuid, kind: RelationKind)
        -> Result<Vec<Uuid>, AppError>;

    /// Insert one association row.
    async fn attach(&mut self, video_id: Uuid, kind: RelationKind, tag_id: Uuid)
        -> Result<(), AppError>;

    /// Delete one association row. Deleting a missing row is not an error.
    async fn detach(&mut self, video_id: Uuid, kind: RelationKind, tag_id: Uuid)
        -> Result<(), AppError>;

    async fn commit(self: Box<Self>) -> Result<(), AppError>;

    async fn rollback(self: Box<Self>) -> Result<(), AppError>;
}

/// Tag reads needed before a write: existence and coverage.
#[async_trait]
pub trait TagLookup: CoverageLookup {
    /// Subset of `ids` naming live (not soft-deleted) tags of `kind`.
    async fn live_tag_ids(
        &self,
        kind: RelationKind,
        ids: &HashSet<Uuid>,
    ) -> Result<HashSet<Uuid>, AppError>;
}
