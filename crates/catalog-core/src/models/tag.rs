use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use uuid::Uuid;

use super::video::fields;

/// Many-to-many relations a video carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationKind {
    Categories,
    Genders,
}

impl RelationKind {
    pub const ALL: [RelationKind; 2] = [RelationKind::Categories, RelationKind::Genders];

    /// Attribute map key carrying the target id list.
    pub fn attribute_key(&self) -> &'static str {
        match self {
            RelationKind::Categories => fields::CATEGORIES_ID,
            RelationKind::Genders => fields::GENDERS_ID,
        }
    }

    /// Join table between videos and this tag kind.
    pub fn join_table(&self) -> &'static str {
        match self {
            RelationKind::Categories => "category_video",
            RelationKind::Genders => "gender_video",
        }
    }

    /// Tag id column in the join table.
    pub fn tag_column(&self) -> &'static str {
        match self {
            RelationKind::Categories => "category_id",
            RelationKind::Genders => "gender_id",
        }
    }

    pub fn tag_table(&self) -> &'static str {
        match self {
            RelationKind::Categories => "categories",
            RelationKind::Genders => "genders",
        }
    }
}

impl Display for RelationKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            RelationKind::Categories => write!(f, "categories"),
            RelationKind::Genders => write!(f, "genders"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// A gender groups a set of categories through `category_gender`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Gender {
    pub id: Uuid,
    pub name: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}
