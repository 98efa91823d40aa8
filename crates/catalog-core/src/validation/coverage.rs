//! Gender/category coverage rule
//!
//! A set of genders covers a set of categories when every requested category
//! is grouped by at least one of the genders. A single gender may cover
//! several categories; a gender that groups none of the requested categories
//! fails the whole check.

use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap, HashSet};
use uuid::Uuid;

use crate::AppError;

/// Lookup over the `category_gender` join.
#[async_trait]
pub trait CoverageLookup: Send + Sync {
    /// Subset of `candidates` grouped by `gender_id`.
    ///
    /// Soft-deleted genders and categories never appear in the result.
    async fn categories_for_gender(
        &self,
        gender_id: Uuid,
        candidates: &HashSet<Uuid>,
    ) -> Result<HashSet<Uuid>, AppError>;
}

/// In-memory join keyed by gender id.
#[async_trait]
impl CoverageLookup for HashMap<Uuid, HashSet<Uuid>> {
    async fn categories_for_gender(
        &self,
        gender_id: Uuid,
        candidates: &HashSet<Uuid>,
    ) -> Result<HashSet<Uuid>, AppError> {
        Ok(self
            .get(&gender_id)
            .map(|categories| categories.intersection(candidates).copied().collect())
            .unwrap_or_default())
    }
}

/// Check that `gender_ids` collectively cover `category_ids`.
///
/// Returns `Ok(false)` when the rule does not hold (including when either set
/// is empty); errors are reserved for lookup failures.
pub async fn covers<L>(
    lookup: &L,
    category_ids: &[Uuid],
    gender_ids: &[Uuid],
) -> Result<bool, AppError>
where
    L: CoverageLookup + ?Sized,
{
    let categories: HashSet<Uuid> = category_ids.iter().copied().collect();
    let genders: BTreeSet<Uuid> = gender_ids.iter().copied().collect();

    if categories.is_empty() || genders.is_empty() {
        return Ok(false);
    }

    let mut found = HashSet::with_capacity(categories.len());
    for gender_id in genders {
        let rows = lookup.categories_for_gender(gender_id, &categories).await?;
        if rows.is_empty() {
            tracing::debug!(gender_id = %gender_id, "Gender groups none of the requested categories");
            return Ok(false);
        }
        found.extend(rows.into_iter().filter(|id| categories.contains(id)));
    }

    Ok(found.len() == categories.len())
}
