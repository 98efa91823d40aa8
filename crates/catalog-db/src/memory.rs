//! In-memory catalog store
//!
//! Transactions work on a private copy of the catalog and record their
//! writes; `commit` replays the writes against the shared state under one
//! lock, so a failed replay leaves the shared state untouched. Primary-key
//! and foreign-key constraints are enforced like the Postgres schema does.
//! Row locks are not modelled. Two transactions open on the same video both
//! commit: the later commit's video row wins, while their join-row writes
//! are replayed one after the other, so the associations end up holding
//! both diffs. Callers that need one writer per video must serialize
//! themselves.

use async_trait::async_trait;
use catalog_core::models::{Category, Gender, RelationKind, Video};
use catalog_core::{AppError, CoverageLookup};
use chrono::Utc;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

use crate::db::{CatalogStore, CatalogTx, TagLookup};

#[derive(Debug, Clone, Default)]
struct CatalogState {
    videos: HashMap<Uuid, Video>,
    categories: HashMap<Uuid, Category>,
    genders: HashMap<Uuid, Gender>,
    /// (gender_id, category_id)
    category_gender: BTreeSet<(Uuid, Uuid)>,
    /// (video_id, category_id)
    category_video: BTreeSet<(Uuid, Uuid)>,
    /// (video_id, gender_id)
    gender_video: BTreeSet<(Uuid, Uuid)>,
}

impl CatalogState {
    fn relations(&self, kind: RelationKind) -> &BTreeSet<(Uuid, Uuid)> {
        match kind {
            RelationKind::Categories => &self.category_video,
            RelationKind::Genders => &self.gender_video,
        }
    }

    fn relations_mut(&mut self, kind: RelationKind) -> &mut BTreeSet<(Uuid, Uuid)> {
        match kind {
            RelationKind::Categories => &mut self.category_video,
            RelationKind::Genders => &mut self.gender_video,
        }
    }

    fn tag_deleted_at(&self, kind: RelationKind, id: Uuid) -> Option<bool> {
        match kind {
            RelationKind::Categories => self.categories.get(&id).map(|c| c.deleted_at.is_some()),
            RelationKind::Genders => self.genders.get(&id).map(|g| g.deleted_at.is_some()),
        }
    }

    fn is_live_tag(&self, kind: RelationKind, id: Uuid) -> bool {
        self.tag_deleted_at(kind, id) == Some(false)
    }

    fn related_ids(&self, video_id: Uuid, kind: RelationKind) -> Vec<Uuid> {
        self.relations(kind)
            .iter()
            .filter(|(video, _)| *video == video_id)
            .map(|(_, tag)| *tag)
            .collect()
    }

    fn apply(&mut self, write: &Write) -> Result<(), AppError> {
        match write {
            Write::InsertVideo(video) => {
                if self.videos.contains_key(&video.id) {
                    return Err(AppError::Conflict(format!(
                        "duplicate key value violates unique constraint \"videos_pkey\" ({})",
                        video.id
                    )));
                }
                self.videos.insert(video.id, video.clone());
            }
            Write::UpdateVideo(video) => match self.videos.get_mut(&video.id) {
                Some(row) => {
                    let created_at = row.created_at;
                    let deleted_at = row.deleted_at;
                    *row = video.clone();
                    row.created_at = created_at;
                    row.deleted_at = deleted_at;
                }
                None => return Err(AppError::NotFound(format!("Video {}", video.id))),
            },
            Write::Attach(video_id, kind, tag_id) => {
                if !self.videos.contains_key(video_id) {
                    return Err(AppError::Conflict(format!(
                        "insert on \"{}\" violates foreign key: video {} does not exist",
                        kind.join_table(),
                        video_id
                    )));
                }
                if self.tag_deleted_at(*kind, *tag_id).is_none() {
                    return Err(AppError::Conflict(format!(
                        "insert on \"{}\" violates foreign key: {} {} does not exist",
                        kind.join_table(),
                        kind.tag_column(),
                        tag_id
                    )));
                }
                if !self.relations_mut(*kind).insert((*video_id, *tag_id)) {
                    return Err(AppError::Conflict(format!(
                        "duplicate key value violates unique constraint \"{}_pkey\" ({}, {})",
                        kind.join_table(),
                        video_id,
                        tag_id
                    )));
                }
            }
            Write::Detach(video_id, kind, tag_id) => {
                self.relations_mut(*kind).remove(&(*video_id, *tag_id));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
enum Write {
    InsertVideo(Video),
    UpdateVideo(Video),
    Attach(Uuid, RelationKind, Uuid),
    Detach(Uuid, RelationKind, Uuid),
}

/// In-memory implementation of the catalog store
#[derive(Clone, Default)]
pub struct MemoryCatalogStore {
    state: Arc<Mutex<CatalogState>>,
}

impl MemoryCatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, CatalogState> {
        lock(&self.state)
    }

    /// Add a live category and return its id
    pub fn add_category(&self, name: &str) -> Uuid {
        let now = Utc::now();
        let category = Category {
            id: Uuid::new_v4(),
            name: name.to_string(),
            is_active: true,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        let id = category.id;
        self.state().categories.insert(id, category);
        id
    }

    /// Add a live gender grouping `category_ids` and return its id
    pub fn add_gender(&self, name: &str, category_ids: &[Uuid]) -> Uuid {
        let now = Utc::now();
        let gender = Gender {
            id: Uuid::new_v4(),
            name: name.to_string(),
            is_active: true,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        let id = gender.id;
        let mut state = self.state();
        state.genders.insert(id, gender);
        for category_id in category_ids {
            state.category_gender.insert((id, *category_id));
        }
        id
    }

    /// Replace the categories a gender groups
    pub fn set_gender_categories(&self, gender_id: Uuid, category_ids: &[Uuid]) {
        let mut state = self.state();
        state.category_gender.retain(|(gender, _)| *gender != gender_id);
        for category_id in category_ids {
            state.category_gender.insert((gender_id, *category_id));
        }
    }

    /// Soft delete a tag. Returns `false` when no live tag matched.
    pub fn soft_delete_tag(&self, kind: RelationKind, id: Uuid) -> bool {
        let now = Utc::now();
        let mut state = self.state();
        let deleted_at = match kind {
            RelationKind::Categories => state.categories.get_mut(&id).map(|c| &mut c.deleted_at),
            RelationKind::Genders => state.genders.get_mut(&id).map(|g| &mut g.deleted_at),
        };
        match deleted_at {
            Some(slot) if slot.is_none() => {
                *slot = Some(now);
                true
            }
            _ => false,
        }
    }

    /// Number of video rows
    pub fn video_count(&self, include_deleted: bool) -> usize {
        self.state()
            .videos
            .values()
            .filter(|video| include_deleted || video.deleted_at.is_none())
            .count()
    }
}

#[async_trait]
impl CatalogStore for MemoryCatalogStore {
    async fn begin(&self) -> Result<Box<dyn CatalogTx>, AppError> {
        let view = self.state().clone();
        Ok(Box::new(MemoryCatalogTx {
            shared: Arc::clone(&self.state),
            view,
            writes: Vec::new(),
        }))
    }

    async fn find_video(
        &self,
        id: Uuid,
        include_deleted: bool,
    ) -> Result<Option<Video>, AppError> {
        Ok(self
            .state()
            .videos
            .get(&id)
            .filter(|video| include_deleted || video.deleted_at.is_none())
            .cloned())
    }

    async fn related_ids(
        &self,
        video_id: Uuid,
        kind: RelationKind,
    ) -> Result<Vec<Uuid>, AppError> {
        Ok(self.state().related_ids(video_id, kind))
    }

    async fn soft_delete_video(&self, id: Uuid) -> Result<bool, AppError> {
        let now = Utc::now();
        let mut state = self.state();
        match state.videos.get_mut(&id) {
            Some(video) if video.deleted_at.is_none() => {
                video.deleted_at = Some(now);
                video.updated_at = now;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[async_trait]
impl CoverageLookup for MemoryCatalogStore {
    async fn categories_for_gender(
        &self,
        gender_id: Uuid,
        candidates: &HashSet<Uuid>,
    ) -> Result<HashSet<Uuid>, AppError> {
        let state = self.state();
        if !state.is_live_tag(RelationKind::Genders, gender_id) {
            return Ok(HashSet::new());
        }
        Ok(state
            .category_gender
            .iter()
            .filter(|(gender, category)| {
                *gender == gender_id
                    && candidates.contains(category)
                    && state.is_live_tag(RelationKind::Categories, *category)
            })
            .map(|(_, category)| *category)
            .collect())
    }
}

#[async_trait]
impl TagLookup for MemoryCatalogStore {
    async fn live_tag_ids(
        &self,
        kind: RelationKind,
        ids: &HashSet<Uuid>,
    ) -> Result<HashSet<Uuid>, AppError> {
        let state = self.state();
        Ok(ids
            .iter()
            .copied()
            .filter(|id| state.is_live_tag(kind, *id))
            .collect())
    }
}

struct MemoryCatalogTx {
    shared: Arc<Mutex<CatalogState>>,
    view: CatalogState,
    writes: Vec<Write>,
}

impl MemoryCatalogTx {
    fn record(&mut self, write: Write) -> Result<(), AppError> {
        self.view.apply(&write)?;
        self.writes.push(write);
        Ok(())
    }
}

#[async_trait]
impl CatalogTx for MemoryCatalogTx {
    async fn lock_video(&mut self, id: Uuid) -> Result<Option<Video>, AppError> {
        Ok(self
            .view
            .videos
            .get(&id)
            .filter(|video| video.deleted_at.is_none())
            .cloned())
    }

    async fn insert_video(&mut self, video: &Video) -> Result<(), AppError> {
        self.record(Write::InsertVideo(video.clone()))
    }

    async fn update_video(&mut self, video: &Video) -> Result<(), AppError> {
        self.record(Write::UpdateVideo(video.clone()))
    }

    async fn related_ids(
        &mut self,
        video_id: Uuid,
        kind: RelationKind,
    ) -> Result<Vec<Uuid>, AppError> {
        Ok(self.view.related_ids(video_id, kind))
    }

    async fn attach(
        &mut self,
        video_id: Uuid,
        kind: RelationKind,
        tag_id: Uuid,
    ) -> Result<(), AppError> {
        self.record(Write::Attach(video_id, kind, tag_id))
    }

    async fn detach(
        &mut self,
        video_id: Uuid,
        kind: RelationKind,
        tag_id: Uuid,
    ) -> Result<(), AppError> {
        self.record(Write::Detach(video_id, kind, tag_id))
    }

    async fn commit(self: Box<Self>) -> Result<(), AppError> {
        let mut shared = lock(&self.shared);
        let mut next = shared.clone();
        for write in &self.writes {
            next.apply(write)?;
        }
        *shared = next;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), AppError> {
        Ok(())
    }
}

// A poisoned lock only means another thread panicked while holding it; the
// catalog itself is still consistent because writes are swapped in whole.
fn lock(state: &Mutex<CatalogState>) -> MutexGuard<'_, CatalogState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
