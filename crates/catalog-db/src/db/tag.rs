use catalog_core::models::{Category, Gender, RelationKind};
use catalog_core::AppError;
use sqlx::{PgPool, Postgres};
use std::collections::HashSet;
use uuid::Uuid;

const TAG_COLUMNS: &str = "id, name, is_active, created_at, updated_at, deleted_at";

/// Repository for categories, genders and the `category_gender` join
#[derive(Clone)]
pub struct TagRepository {
    pool: PgPool,
}

impl TagRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a new category
    #[tracing::instrument(skip(self), fields(db.table = "categories", db.operation = "insert"))]
    pub async fn create_category(&self, name: &str, is_active: bool) -> Result<Category, AppError> {
        let sql = format!(
            "INSERT INTO categories (id, name, is_active) VALUES ($1, $2, $3) RETURNING {}",
            TAG_COLUMNS
        );
        let category = sqlx::query_as::<Postgres, Category>(&sql)
            .bind(Uuid::new_v4())
            .bind(name)
            .bind(is_active)
            .fetch_one(&self.pool)
            .await?;

        Ok(category)
    }

    /// Create a new gender grouping `category_ids`
    #[tracing::instrument(skip(self), fields(db.table = "genders", db.operation = "insert"))]
    pub async fn create_gender(
        &self,
        name: &str,
        is_active: bool,
        category_ids: &[Uuid],
    ) -> Result<Gender, AppError> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            "INSERT INTO genders (id, name, is_active) VALUES ($1, $2, $3) RETURNING {}",
            TAG_COLUMNS
        );
        let gender = sqlx::query_as::<Postgres, Gender>(&sql)
            .bind(Uuid::new_v4())
            .bind(name)
            .bind(is_active)
            .fetch_one(&mut *tx)
            .await?;

        for category_id in dedup(category_ids) {
            sqlx::query("INSERT INTO category_gender (category_id, gender_id) VALUES ($1, $2)")
                .bind(category_id)
                .bind(gender.id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(gender)
    }

    /// Replace the categories a gender groups
    #[tracing::instrument(skip(self), fields(db.table = "category_gender", db.operation = "replace", db.record_id = %gender_id))]
    pub async fn sync_gender_categories(
        &self,
        gender_id: Uuid,
        category_ids: &[Uuid],
    ) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM category_gender WHERE gender_id = $1")
            .bind(gender_id)
            .execute(&mut *tx)
            .await?;

        for category_id in dedup(category_ids) {
            sqlx::query("INSERT INTO category_gender (category_id, gender_id) VALUES ($1, $2)")
                .bind(category_id)
                .bind(gender_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Soft delete a tag. Returns `false` when no live tag matched.
    #[tracing::instrument(skip(self), fields(db.table = kind.tag_table(), db.operation = "update", db.record_id = %id))]
    pub async fn soft_delete(&self, kind: RelationKind, id: Uuid) -> Result<bool, AppError> {
        let sql = format!(
            "UPDATE {} SET deleted_at = NOW(), updated_at = NOW() WHERE id = $1 AND deleted_at IS NULL",
            kind.tag_table()
        );
        let result = sqlx::query(&sql).bind(id).execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }

    #[tracing::instrument(skip(self), fields(db.table = "categories", db.operation = "select", db.record_id = %id))]
    pub async fn find_category(
        &self,
        id: Uuid,
        include_deleted: bool,
    ) -> Result<Option<Category>, AppError> {
        let sql = format!(
            "SELECT {} FROM categories WHERE id = $1 AND ($2 OR deleted_at IS NULL)",
            TAG_COLUMNS
        );
        let category = sqlx::query_as::<Postgres, Category>(&sql)
            .bind(id)
            .bind(include_deleted)
            .fetch_optional(&self.pool)
            .await?;
        Ok(category)
    }

    #[tracing::instrument(skip(self), fields(db.table = "genders", db.operation = "select", db.record_id = %id))]
    pub async fn find_gender(
        &self,
        id: Uuid,
        include_deleted: bool,
    ) -> Result<Option<Gender>, AppError> {
        let sql = format!(
            "SELECT {} FROM genders WHERE id = $1 AND ($2 OR deleted_at IS NULL)",
            TAG_COLUMNS
        );
        let gender = sqlx::query_as::<Postgres, Gender>(&sql)
            .bind(id)
            .bind(include_deleted)
            .fetch_optional(&self.pool)
            .await?;
        Ok(gender)
    }

    /// Categories grouped by a gender, sorted, soft-deleted ones included
    #[tracing::instrument(skip(self), fields(db.table = "category_gender", db.operation = "select", db.record_id = %gender_id))]
    pub async fn gender_category_ids(&self, gender_id: Uuid) -> Result<Vec<Uuid>, AppError> {
        let ids = sqlx::query_scalar::<Postgres, Uuid>(
            "SELECT category_id FROM category_gender WHERE gender_id = $1 ORDER BY category_id",
        )
        .bind(gender_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }

    /// Subset of `ids` naming live tags of `kind`
    #[tracing::instrument(skip(self, ids), fields(db.table = kind.tag_table(), db.operation = "select", id_count = ids.len()))]
    pub async fn live_ids(
        &self,
        kind: RelationKind,
        ids: &HashSet<Uuid>,
    ) -> Result<HashSet<Uuid>, AppError> {
        if ids.is_empty() {
            return Ok(HashSet::new());
        }
        let sql = format!(
            "SELECT id FROM {} WHERE id = ANY($1) AND deleted_at IS NULL",
            kind.tag_table()
        );
        let candidates: Vec<Uuid> = ids.iter().copied().collect();
        let found = sqlx::query_scalar::<Postgres, Uuid>(&sql)
            .bind(&candidates)
            .fetch_all(&self.pool)
            .await?;
        Ok(found.into_iter().collect())
    }

    /// Subset of `candidates` grouped by a live gender, live categories only
    #[tracing::instrument(skip(self, candidates), fields(db.table = "category_gender", db.operation = "select", db.record_id = %gender_id))]
    pub async fn categories_for_gender(
        &self,
        gender_id: Uuid,
        candidates: &HashSet<Uuid>,
    ) -> Result<HashSet<Uuid>, AppError> {
        if candidates.is_empty() {
            return Ok(HashSet::new());
        }
        let candidates: Vec<Uuid> = candidates.iter().copied().collect();
        let found = sqlx::query_scalar::<Postgres, Uuid>(
            r#"
            SELECT cg.category_id
            FROM category_gender cg
            JOIN genders g ON g.id = cg.gender_id AND g.deleted_at IS NULL
            JOIN categories c ON c.id = cg.category_id AND c.deleted_at IS NULL
            WHERE cg.gender_id = $1 AND cg.category_id = ANY($2)
            "#,
        )
        .bind(gender_id)
        .bind(&candidates)
        .fetch_all(&self.pool)
        .await?;
        Ok(found.into_iter().collect())
    }
}

fn dedup(ids: &[Uuid]) -> Vec<Uuid> {
    let mut ids = ids.to_vec();
    ids.sort();
    ids.dedup();
    ids
}
