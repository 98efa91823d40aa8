//! Transactional video writes
//!
//! A write validates its input, persists the row and its associations in one
//! relational transaction, and only then touches storage. Everything up to
//! the commit aborts as a unit. After the commit, a failed file store is
//! compensated by removing this call's files, but the committed row stays:
//! the caller receives `WriteError::PartialWrite` and can retry the upload.

use catalog_core::models::{fields, AttributeValue, Attributes, FileSlot, RelationKind, Video};
use catalog_core::validation::field_error;
use catalog_core::{covers, validate_video_attributes, WriteMode};
use catalog_db::{CatalogStore, CatalogTx, TagLookup};
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;
use validator::ValidationErrors;

use crate::error::{WriteError, WritePhase};
use crate::files::{diff_obsolete, extract_files, FileLifecycle, StagedFile};
use crate::relations::sync_from_attributes;

/// Creates and updates videos.
#[derive(Clone)]
pub struct VideoWriter {
    store: Arc<dyn CatalogStore>,
    tags: Arc<dyn TagLookup>,
    files: FileLifecycle,
}

impl VideoWriter {
    pub fn new(store: Arc<dyn CatalogStore>, tags: Arc<dyn TagLookup>, files: FileLifecycle) -> Self {
        Self { store, tags, files }
    }

    pub fn files(&self) -> &FileLifecycle {
        &self.files
    }

    /// Create a video from `attrs`.
    #[tracing::instrument(skip(self, attrs), fields(video_id = tracing::field::Empty))]
    pub async fn create(&self, mut attrs: Attributes) -> Result<Video, WriteError> {
        let video_id = Uuid::new_v4();
        tracing::Span::current().record("video_id", tracing::field::display(video_id));

        self.validate(&attrs, WriteMode::Create).await?;

        let staged = extract_files(&mut attrs, &FileSlot::ALL);
        let video = Video::from_attributes(video_id, &attrs, Utc::now())
            .map_err(WriteError::Validation)?;
        let upload_dir = video.upload_dir();

        let mut tx = self.begin().await?;

        tracing::debug!(phase = %WritePhase::Persisting, "Inserting video");
        if let Err(source) = tx.insert_video(&video).await {
            let err = WriteError::transaction(WritePhase::Persisting, source);
            return Err(self.abort(tx, &upload_dir, &staged, err).await);
        }

        if let Err(err) = self.sync_relations(tx.as_mut(), video.id, &attrs).await {
            return Err(self.abort(tx, &upload_dir, &staged, err).await);
        }

        self.commit(tx, &upload_dir, &staged).await?;
        self.store_files(&video, &staged).await?;

        tracing::info!(phase = %WritePhase::Done, files = staged.len(), "Video created");
        Ok(video)
    }

    /// Update the live video `id` with `attrs`.
    ///
    /// Replaced files are deleted only after the new ones are stored.
    #[tracing::instrument(skip(self, attrs), fields(video_id = %id))]
    pub async fn update(&self, id: Uuid, mut attrs: Attributes) -> Result<Video, WriteError> {
        let existing = self
            .store
            .find_video(id, false)
            .await
            .map_err(|source| WriteError::transaction(WritePhase::Validating, source))?;
        if existing.is_none() {
            return Err(WriteError::NotFound(id));
        }

        self.validate(&attrs, WriteMode::Update).await?;

        let staged = extract_files(&mut attrs, &FileSlot::ALL);
        let upload_dir = id.to_string();

        let mut tx = self.begin().await?;

        tracing::debug!(phase = %WritePhase::Persisting, "Locking video");
        let previous = match tx.lock_video(id).await {
            Ok(Some(video)) => video,
            // Trashed between the lookup and the lock.
            Ok(None) => {
                return Err(self
                    .abort(tx, &upload_dir, &staged, WriteError::NotFound(id))
                    .await)
            }
            Err(source) => {
                let err = WriteError::transaction(WritePhase::Persisting, source);
                return Err(self.abort(tx, &upload_dir, &staged, err).await);
            }
        };

        if let Some(errors) = unknown_file_names(&previous, &attrs, &staged) {
            return Err(self
                .abort(tx, &upload_dir, &staged, WriteError::Validation(errors))
                .await);
        }

        let mut video = previous.clone();
        if let Err(errors) = video.apply(&attrs) {
            return Err(self
                .abort(tx, &upload_dir, &staged, WriteError::Validation(errors))
                .await);
        }
        video.updated_at = Utc::now();

        if let Err(source) = tx.update_video(&video).await {
            let err = WriteError::transaction(WritePhase::Persisting, source);
            return Err(self.abort(tx, &upload_dir, &staged, err).await);
        }

        if let Err(err) = self.sync_relations(tx.as_mut(), id, &attrs).await {
            return Err(self.abort(tx, &upload_dir, &staged, err).await);
        }

        self.commit(tx, &upload_dir, &staged).await?;
        self.store_files(&video, &staged).await?;

        let obsolete: Vec<String> = diff_obsolete(&previous.file_names(), &video.file_names())
            .into_iter()
            .collect();
        if !obsolete.is_empty() {
            let failed = self.files.remove(&upload_dir, &obsolete).await;
            tracing::info!(obsolete = obsolete.len(), failed, "Removed replaced files");
        }

        tracing::info!(phase = %WritePhase::Done, files = staged.len(), "Video updated");
        Ok(video)
    }

    /// Whether `gender_ids` collectively cover `category_ids`.
    pub async fn validate_coverage(
        &self,
        category_ids: &[Uuid],
        gender_ids: &[Uuid],
    ) -> Result<bool, WriteError> {
        covers(self.tags.as_ref(), category_ids, gender_ids)
            .await
            .map_err(|source| WriteError::transaction(WritePhase::Validating, source))
    }

    /// Soft delete a live video. Its associations and files are kept.
    #[tracing::instrument(skip(self), fields(video_id = %id))]
    pub async fn trash(&self, id: Uuid) -> Result<(), WriteError> {
        let deleted = self
            .store
            .soft_delete_video(id)
            .await
            .map_err(|source| WriteError::transaction(WritePhase::Persisting, source))?;
        if !deleted {
            return Err(WriteError::NotFound(id));
        }
        tracing::info!("Video trashed");
        Ok(())
    }

    pub async fn find(&self, id: Uuid, include_deleted: bool) -> Result<Video, WriteError> {
        self.store
            .find_video(id, include_deleted)
            .await
            .map_err(|source| WriteError::transaction(WritePhase::Validating, source))?
            .ok_or(WriteError::NotFound(id))
    }

    /// Tag ids associated with a video, soft-deleted tags included.
    pub async fn related_ids(&self, id: Uuid, kind: RelationKind) -> Result<Vec<Uuid>, WriteError> {
        self.store
            .related_ids(id, kind)
            .await
            .map_err(|source| WriteError::transaction(WritePhase::Validating, source))
    }

    /// Public URL of the file in `slot`, if the slot holds one.
    pub fn file_url(&self, video: &Video, slot: FileSlot) -> Result<Option<String>, WriteError> {
        match video.file_name(slot) {
            Some(name) => Ok(Some(self.files.file_url(&video.upload_dir(), name)?)),
            None => Ok(None),
        }
    }

    /// Field rules, then tag existence, then coverage.
    async fn validate(&self, attrs: &Attributes, mode: WriteMode) -> Result<(), WriteError> {
        tracing::debug!(phase = %WritePhase::Validating, "Validating attributes");
        validate_video_attributes(attrs, mode).map_err(WriteError::Validation)?;

        let mut errors = ValidationErrors::new();
        for kind in RelationKind::ALL {
            let key = kind.attribute_key();
            let Some(ids) = attrs.id_set(key) else {
                continue;
            };
            let live = self
                .tags
                .live_tag_ids(kind, &ids)
                .await
                .map_err(|source| WriteError::transaction(WritePhase::Validating, source))?;
            if live.len() != ids.len() {
                errors.add(key, field_error("exists", format!("The selected {} is invalid.", key)));
            }
        }
        if !errors.is_empty() {
            return Err(WriteError::Validation(errors));
        }

        if let (Some(category_ids), Some(gender_ids)) = (
            attrs.id_set(fields::CATEGORIES_ID),
            attrs.id_set(fields::GENDERS_ID),
        ) {
            let category_ids: Vec<Uuid> = category_ids.into_iter().collect();
            let gender_ids: Vec<Uuid> = gender_ids.into_iter().collect();
            if !self.validate_coverage(&category_ids, &gender_ids).await? {
                errors.add(
                    fields::GENDERS_ID,
                    field_error(
                        "genders_has_categories",
                        "Every selected category must belong to one of the selected genders.",
                    ),
                );
                return Err(WriteError::Validation(errors));
            }
        }

        Ok(())
    }

    async fn begin(&self) -> Result<Box<dyn CatalogTx>, WriteError> {
        self.store.begin().await.map_err(|source| {
            tracing::error!(error = %source, "Failed to begin transaction");
            WriteError::transaction(WritePhase::Persisting, source)
        })
    }

    async fn sync_relations(
        &self,
        tx: &mut dyn CatalogTx,
        video_id: Uuid,
        attrs: &Attributes,
    ) -> Result<(), WriteError> {
        tracing::debug!(phase = %WritePhase::RelationSyncing, "Syncing associations");
        sync_from_attributes(tx, video_id, attrs)
            .await
            .map(|_| ())
            .map_err(|source| WriteError::transaction(WritePhase::RelationSyncing, source))
    }

    async fn commit(
        &self,
        tx: Box<dyn CatalogTx>,
        upload_dir: &str,
        staged: &[StagedFile],
    ) -> Result<(), WriteError> {
        tracing::debug!(phase = %WritePhase::Committing, "Committing transaction");
        if let Err(source) = tx.commit().await {
            tracing::warn!(error = %source, phase = %WritePhase::Committing, "Failed to commit transaction");
            self.discard_staged(upload_dir, staged).await;
            return Err(WriteError::transaction(WritePhase::Committing, source));
        }
        Ok(())
    }

    /// Store this call's files after the commit.
    async fn store_files(&self, video: &Video, staged: &[StagedFile]) -> Result<(), WriteError> {
        if staged.is_empty() {
            return Ok(());
        }
        tracing::debug!(phase = %WritePhase::FileCommitting, files = staged.len(), "Storing files");
        if let Err(source) = self.files.store(&video.upload_dir(), staged).await {
            tracing::error!(
                error = %source,
                phase = %WritePhase::FileCommitting,
                "Video committed but its files could not be stored"
            );
            return Err(WriteError::PartialWrite {
                video: Box::new(video.clone()),
                source,
            });
        }
        Ok(())
    }

    /// Roll back a failed transaction and drop this call's staged files.
    async fn abort(
        &self,
        tx: Box<dyn CatalogTx>,
        upload_dir: &str,
        staged: &[StagedFile],
        err: WriteError,
    ) -> WriteError {
        tracing::warn!(error = %err, phase = ?err.phase(), "Write failed before commit, rolling back");
        if let Err(rollback_err) = tx.rollback().await {
            tracing::error!(
                error = %rollback_err,
                original_error = %err,
                "Failed to rollback transaction"
            );
        }
        self.discard_staged(upload_dir, staged).await;
        err
    }

    async fn discard_staged(&self, upload_dir: &str, staged: &[StagedFile]) {
        if staged.is_empty() {
            return;
        }
        let names: Vec<String> = staged.iter().map(|s| s.name().to_string()).collect();
        self.files.remove(upload_dir, &names).await;
    }
}

/// Slots whose name value is not the file the locked row already holds.
///
/// Staged slots are skipped: their names were generated for this call.
fn unknown_file_names(
    previous: &Video,
    attrs: &Attributes,
    staged: &[StagedFile],
) -> Option<ValidationErrors> {
    let mut errors = ValidationErrors::new();
    for slot in FileSlot::ALL {
        if staged.iter().any(|s| s.slot == slot) {
            continue;
        }
        let key = slot.attribute_key();
        if let Some(AttributeValue::Text(name)) = attrs.get(key) {
            if previous.file_name(slot) != Some(name.as_str()) {
                errors.add(
                    key,
                    field_error("file", format!("The {} must be a file or its current name.", key)),
                );
            }
        }
    }
    if errors.is_empty() {
        None
    } else {
        Some(errors)
    }
}
