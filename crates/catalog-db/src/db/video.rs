//! Video rows and their association rows
//!
//! Query functions are generic over the executor so the same SQL serves the
//! pool-level repository and the transaction handle.

use catalog_core::models::{RelationKind, Video};
use catalog_core::AppError;
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

const VIDEO_COLUMNS: &str = "id, title, description, year_launched, opened, rating, duration, \
     video_file, thumb_file, banner_file, trailer_file, created_at, updated_at, deleted_at";

/// Repository for reading and trashing videos outside a write transaction
#[derive(Clone)]
pub struct VideoRepository {
    pool: PgPool,
}

impl VideoRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get video by ID with explicit soft-delete visibility
    #[tracing::instrument(skip(self), fields(db.table = "videos", db.operation = "select", db.record_id = %id))]
    pub async fn find(&self, id: Uuid, include_deleted: bool) -> Result<Option<Video>, AppError> {
        fetch_video(&self.pool, id, include_deleted).await
    }

    #[tracing::instrument(skip(self), fields(db.table = kind.join_table(), db.operation = "select"))]
    pub async fn related_ids(
        &self,
        video_id: Uuid,
        kind: RelationKind,
    ) -> Result<Vec<Uuid>, AppError> {
        select_related_ids(&self.pool, video_id, kind).await
    }

    /// Soft delete a live video. Associations and files are kept.
    #[tracing::instrument(skip(self), fields(db.table = "videos", db.operation = "update", db.record_id = %id))]
    pub async fn soft_delete(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE videos SET deleted_at = NOW(), updated_at = NOW() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Count video rows
    #[tracing::instrument(skip(self), fields(db.table = "videos", db.operation = "select"))]
    pub async fn count(&self, include_deleted: bool) -> Result<i64, AppError> {
        let sql = if include_deleted {
            "SELECT COUNT(*) FROM videos"
        } else {
            "SELECT COUNT(*) FROM videos WHERE deleted_at IS NULL"
        };
        let count = sqlx::query_scalar::<Postgres, i64>(sql)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

pub(crate) async fn fetch_video<'e, E>(
    executor: E,
    id: Uuid,
    include_deleted: bool,
) -> Result<Option<Video>, AppError>
where
    E: Executor<'e, Database = Postgres>,
{
    let sql = if include_deleted {
        format!("SELECT {} FROM videos WHERE id = $1", VIDEO_COLUMNS)
    } else {
        format!(
            "SELECT {} FROM videos WHERE id = $1 AND deleted_at IS NULL",
            VIDEO_COLUMNS
        )
    };
    let video = sqlx::query_as::<Postgres, Video>(&sql)
        .bind(id)
        .fetch_optional(executor)
        .await?;
    Ok(video)
}

#[tracing::instrument(skip(executor), fields(db.table = "videos", db.operation = "select_for_update", db.record_id = %id))]
pub(crate) async fn lock_video<'e, E>(executor: E, id: Uuid) -> Result<Option<Video>, AppError>
where
    E: Executor<'e, Database = Postgres>,
{
    let sql = format!(
        "SELECT {} FROM videos WHERE id = $1 AND deleted_at IS NULL FOR UPDATE",
        VIDEO_COLUMNS
    );
    let video = sqlx::query_as::<Postgres, Video>(&sql)
        .bind(id)
        .fetch_optional(executor)
        .await?;
    Ok(video)
}

#[tracing::instrument(skip(executor, video), fields(db.table = "videos", db.operation = "insert", db.record_id = %video.id))]
pub(crate) async fn insert_video<'e, E>(executor: E, video: &Video) -> Result<(), AppError>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query(
        r#"
        INSERT INTO videos (
            id, title, description, year_launched, opened, rating, duration,
            video_file, thumb_file, banner_file, trailer_file,
            created_at, updated_at, deleted_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
        "#,
    )
    .bind(video.id)
    .bind(&video.title)
    .bind(&video.description)
    .bind(video.year_launched)
    .bind(video.opened)
    .bind(&video.rating)
    .bind(video.duration)
    .bind(&video.video_file)
    .bind(&video.thumb_file)
    .bind(&video.banner_file)
    .bind(&video.trailer_file)
    .bind(video.created_at)
    .bind(video.updated_at)
    .bind(video.deleted_at)
    .execute(executor)
    .await?;

    Ok(())
}

#[tracing::instrument(skip(executor, video), fields(db.table = "videos", db.operation = "update", db.record_id = %video.id))]
pub(crate) async fn update_video<'e, E>(executor: E, video: &Video) -> Result<(), AppError>
where
    E: Executor<'e, Database = Postgres>,
{
    let result = sqlx::query(
        r#"
        UPDATE videos
        SET title = $2, description = $3, year_launched = $4, opened = $5,
            rating = $6, duration = $7, video_file = $8, thumb_file = $9,
            banner_file = $10, trailer_file = $11, updated_at = $12
        WHERE id = $1
        "#,
    )
    .bind(video.id)
    .bind(&video.title)
    .bind(&video.description)
    .bind(video.year_launched)
    .bind(video.opened)
    .bind(&video.rating)
    .bind(video.duration)
    .bind(&video.video_file)
    .bind(&video.thumb_file)
    .bind(&video.banner_file)
    .bind(&video.trailer_file)
    .bind(video.updated_at)
    .execute(executor)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("Video {}", video.id)));
    }
    Ok(())
}

pub(crate) async fn select_related_ids<'e, E>(
    executor: E,
    video_id: Uuid,
    kind: RelationKind,
) -> Result<Vec<Uuid>, AppError>
where
    E: Executor<'e, Database = Postgres>,
{
    let sql = format!(
        "SELECT {col} FROM {table} WHERE video_id = $1 ORDER BY {col}",
        col = kind.tag_column(),
        table = kind.join_table()
    );
    let ids = sqlx::query_scalar::<Postgres, Uuid>(&sql)
        .bind(video_id)
        .fetch_all(executor)
        .await?;
    Ok(ids)
}

#[tracing::instrument(skip(executor), fields(db.table = kind.join_table(), db.operation = "insert"))]
pub(crate) async fn insert_relation<'e, E>(
    executor: E,
    video_id: Uuid,
    kind: RelationKind,
    tag_id: Uuid,
) -> Result<(), AppError>
where
    E: Executor<'e, Database = Postgres>,
{
    let sql = format!(
        "INSERT INTO {} (video_id, {}) VALUES ($1, $2)",
        kind.join_table(),
        kind.tag_column()
    );
    sqlx::query(&sql)
        .bind(video_id)
        .bind(tag_id)
        .execute(executor)
        .await?;
    Ok(())
}

#[tracing::instrument(skip(executor), fields(db.table = kind.join_table(), db.operation = "delete"))]
pub(crate) async fn delete_relation<'e, E>(
    executor: E,
    video_id: Uuid,
    kind: RelationKind,
    tag_id: Uuid,
) -> Result<(), AppError>
where
    E: Executor<'e, Database = Postgres>,
{
    let sql = format!(
        "DELETE FROM {} WHERE video_id = $1 AND {} = $2",
        kind.join_table(),
        kind.tag_column()
    );
    sqlx::query(&sql)
        .bind(video_id)
        .bind(tag_id)
        .execute(executor)
        .await?;
    Ok(())
}
