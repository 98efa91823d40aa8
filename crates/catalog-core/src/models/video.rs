use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt::{Display, Formatter, Result as FmtResult};
use uuid::Uuid;
use validator::ValidationErrors;

use super::attributes::{AttributeValue, Attributes};
use crate::validation::field_error;

/// Accepted values of `Video::rating`.
pub const RATING_LIST: [&str; 6] = ["L", "10", "12", "14", "16", "18"];

/// Attribute keys understood by the catalog.
pub mod fields {
    pub const TITLE: &str = "title";
    pub const DESCRIPTION: &str = "description";
    pub const YEAR_LAUNCHED: &str = "year_launched";
    pub const OPENED: &str = "opened";
    pub const RATING: &str = "rating";
    pub const DURATION: &str = "duration";
    pub const VIDEO_FILE: &str = "video_file";
    pub const THUMB_FILE: &str = "thumb_file";
    pub const BANNER_FILE: &str = "banner_file";
    pub const TRAILER_FILE: &str = "trailer_file";
    pub const CATEGORIES_ID: &str = "categories_id";
    pub const GENDERS_ID: &str = "genders_id";

    pub const REQUIRED_ON_CREATE: [&str; 5] = [TITLE, DESCRIPTION, YEAR_LAUNCHED, RATING, DURATION];
}

const KIB: u64 = 1024;

/// File slots of a video, in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileSlot {
    VideoFile,
    ThumbFile,
    BannerFile,
    TrailerFile,
}

impl FileSlot {
    pub const ALL: [FileSlot; 4] = [
        FileSlot::VideoFile,
        FileSlot::ThumbFile,
        FileSlot::BannerFile,
        FileSlot::TrailerFile,
    ];

    pub fn attribute_key(&self) -> &'static str {
        match self {
            FileSlot::VideoFile => fields::VIDEO_FILE,
            FileSlot::ThumbFile => fields::THUMB_FILE,
            FileSlot::BannerFile => fields::BANNER_FILE,
            FileSlot::TrailerFile => fields::TRAILER_FILE,
        }
    }

    pub fn max_size_bytes(&self) -> u64 {
        match self {
            FileSlot::ThumbFile => 5 * KIB * KIB,
            FileSlot::BannerFile => 10 * KIB * KIB,
            FileSlot::TrailerFile => KIB * KIB * KIB,
            FileSlot::VideoFile => 50 * KIB * KIB * KIB,
        }
    }

    pub fn accepts_content_type(&self, content_type: &str) -> bool {
        match self {
            FileSlot::ThumbFile | FileSlot::BannerFile => content_type.starts_with("image/"),
            FileSlot::VideoFile | FileSlot::TrailerFile => content_type == "video/mp4",
        }
    }
}

impl Display for FileSlot {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.attribute_key())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Video {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub year_launched: i32,
    pub opened: bool,
    pub rating: String,
    pub duration: i32,
    pub video_file: Option<String>,
    pub thumb_file: Option<String>,
    pub banner_file: Option<String>,
    pub trailer_file: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Video {
    /// Build a new video from create attributes.
    ///
    /// File slots must already hold file names (see the staging step); a raw
    /// file value is rejected.
    pub fn from_attributes(
        id: Uuid,
        attrs: &Attributes,
        now: DateTime<Utc>,
    ) -> Result<Self, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        for key in fields::REQUIRED_ON_CREATE {
            if matches!(attrs.get(key), None | Some(AttributeValue::Null)) {
                errors.add(key, field_error("required", format!("The {} field is required.", key)));
            }
        }
        if !errors.is_empty() {
            return Err(errors);
        }

        let mut video = Video {
            id,
            title: String::new(),
            description: String::new(),
            year_launched: 0,
            opened: false,
            rating: String::new(),
            duration: 0,
            video_file: None,
            thumb_file: None,
            banner_file: None,
            trailer_file: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        video.apply(attrs)?;
        Ok(video)
    }

    /// Copy every known scalar and file-slot attribute onto this video.
    /// Unknown keys and relation keys are ignored.
    pub fn apply(&mut self, attrs: &Attributes) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if let Some(value) = attrs.get(fields::TITLE) {
            match value {
                AttributeValue::Text(s) => self.title = s.clone(),
                other => errors.add(fields::TITLE, type_error("string", other)),
            }
        }
        if let Some(value) = attrs.get(fields::DESCRIPTION) {
            match value {
                AttributeValue::Text(s) => self.description = s.clone(),
                other => errors.add(fields::DESCRIPTION, type_error("string", other)),
            }
        }
        if let Some(value) = attrs.get(fields::YEAR_LAUNCHED) {
            match int_field(value) {
                Ok(year) => self.year_launched = year,
                Err(e) => errors.add(fields::YEAR_LAUNCHED, e),
            }
        }
        if let Some(value) = attrs.get(fields::OPENED) {
            match value {
                AttributeValue::Bool(b) => self.opened = *b,
                other => errors.add(fields::OPENED, type_error("boolean", other)),
            }
        }
        if let Some(value) = attrs.get(fields::RATING) {
            match value {
                AttributeValue::Text(s) => self.rating = s.clone(),
                other => errors.add(fields::RATING, type_error("string", other)),
            }
        }
        if let Some(value) = attrs.get(fields::DURATION) {
            match int_field(value) {
                Ok(duration) => self.duration = duration,
                Err(e) => errors.add(fields::DURATION, e),
            }
        }

        for slot in FileSlot::ALL {
            match attrs.get(slot.attribute_key()) {
                None => {}
                Some(AttributeValue::Text(name)) => self.set_file_name(slot, Some(name.clone())),
                Some(AttributeValue::Null) => self.set_file_name(slot, None),
                Some(AttributeValue::File(_)) => errors.add(
                    slot.attribute_key(),
                    field_error("unstaged", "File must be staged before it is persisted"),
                ),
                Some(other) => errors.add(slot.attribute_key(), type_error("file", other)),
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Upload directory of this video's files.
    pub fn upload_dir(&self) -> String {
        self.id.to_string()
    }

    pub fn file_name(&self, slot: FileSlot) -> Option<&str> {
        match slot {
            FileSlot::VideoFile => self.video_file.as_deref(),
            FileSlot::ThumbFile => self.thumb_file.as_deref(),
            FileSlot::BannerFile => self.banner_file.as_deref(),
            FileSlot::TrailerFile => self.trailer_file.as_deref(),
        }
    }

    pub fn set_file_name(&mut self, slot: FileSlot, name: Option<String>) {
        let target = match slot {
            FileSlot::VideoFile => &mut self.video_file,
            FileSlot::ThumbFile => &mut self.thumb_file,
            FileSlot::BannerFile => &mut self.banner_file,
            FileSlot::TrailerFile => &mut self.trailer_file,
        };
        *target = name;
    }

    /// Names currently referenced by any file slot.
    pub fn file_names(&self) -> HashSet<String> {
        FileSlot::ALL
            .iter()
            .filter_map(|slot| self.file_name(*slot).map(str::to_string))
            .collect()
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

fn int_field(value: &AttributeValue) -> Result<i32, validator::ValidationError> {
    match value {
        AttributeValue::Int(n) => {
            i32::try_from(*n).map_err(|_| field_error("range", "Value is out of range"))
        }
        other => Err(type_error("integer", other)),
    }
}

fn type_error(expected: &str, got: &AttributeValue) -> validator::ValidationError {
    field_error(
        "type",
        format!("Expected {}, got {}", expected, got.kind()),
    )
}
