//! Set-replace syncing of a video's tag associations.

use catalog_core::models::{Attributes, RelationKind};
use catalog_core::AppError;
use catalog_db::CatalogTx;
use std::collections::{BTreeSet, HashSet};
use uuid::Uuid;

/// Association rows changed by one sync, each in ascending id order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncOutcome {
    pub attached: Vec<Uuid>,
    pub detached: Vec<Uuid>,
}

impl SyncOutcome {
    pub fn is_noop(&self) -> bool {
        self.attached.is_empty() && self.detached.is_empty()
    }
}

/// Make the `kind` associations of `video_id` equal `target`.
///
/// Only the difference is written, detaches first, each in ascending id
/// order so concurrent syncs lock rows in the same order. Running it again
/// with the same target changes nothing.
pub async fn sync(
    tx: &mut dyn CatalogTx,
    video_id: Uuid,
    kind: RelationKind,
    target: &HashSet<Uuid>,
) -> Result<SyncOutcome, AppError> {
    let current: BTreeSet<Uuid> = tx.related_ids(video_id, kind).await?.into_iter().collect();
    let target: BTreeSet<Uuid> = target.iter().copied().collect();

    let detached: Vec<Uuid> = current.difference(&target).copied().collect();
    let attached: Vec<Uuid> = target.difference(&current).copied().collect();

    for tag_id in &detached {
        tx.detach(video_id, kind, *tag_id).await?;
    }
    for tag_id in &attached {
        tx.attach(video_id, kind, *tag_id).await?;
    }

    tracing::debug!(
        video_id = %video_id,
        relation = %kind,
        attached = attached.len(),
        detached = detached.len(),
        "Synced associations"
    );

    Ok(SyncOutcome { attached, detached })
}

/// Sync every relation kind whose key is present in `attrs`.
///
/// An absent key leaves that relation untouched; an empty list clears it.
pub async fn sync_from_attributes(
    tx: &mut dyn CatalogTx,
    video_id: Uuid,
    attrs: &Attributes,
) -> Result<Vec<(RelationKind, SyncOutcome)>, AppError> {
    let mut outcomes = Vec::new();
    for kind in RelationKind::ALL {
        if let Some(target) = attrs.id_set(kind.attribute_key()) {
            let outcome = sync(tx, video_id, kind, &target).await?;
            outcomes.push((kind, outcome));
        }
    }
    Ok(outcomes)
}
