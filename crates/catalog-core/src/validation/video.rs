//! Field rules for video write requests.

use validator::ValidationErrors;

use super::field_error;
use crate::models::{fields, AttributeValue, Attributes, FileSlot, RATING_LIST};

pub const MAX_TITLE_LENGTH: usize = 255;

/// Which write the attributes belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Every required field must be present.
    Create,
    /// Only the fields present are checked.
    Update,
}

/// Validate the shape of a create/update attribute map.
pub fn validate_video_attributes(
    attrs: &Attributes,
    mode: WriteMode,
) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();

    // Required fields may be omitted on update but never cleared.
    for key in fields::REQUIRED_ON_CREATE {
        let missing = match attrs.get(key) {
            None => mode == WriteMode::Create,
            Some(AttributeValue::Null) => true,
            Some(_) => false,
        };
        if missing {
            errors.add(
                key,
                field_error("required", format!("The {} field is required.", key)),
            );
        }
    }

    match attrs.get(fields::TITLE) {
        Some(AttributeValue::Text(title)) if title.chars().count() > MAX_TITLE_LENGTH => {
            errors.add(
                fields::TITLE,
                field_error(
                    "max",
                    format!("The title may not be greater than {} characters.", MAX_TITLE_LENGTH),
                ),
            );
        }
        Some(AttributeValue::Text(title)) if title.trim().is_empty() => {
            errors.add(fields::TITLE, field_error("required", "The title field is required."));
        }
        Some(AttributeValue::Text(_)) | Some(AttributeValue::Null) | None => {}
        Some(other) => errors.add(fields::TITLE, expected("string", other)),
    }

    match attrs.get(fields::DESCRIPTION) {
        Some(AttributeValue::Text(_)) | Some(AttributeValue::Null) | None => {}
        Some(other) => errors.add(fields::DESCRIPTION, expected("string", other)),
    }

    match attrs.get(fields::YEAR_LAUNCHED) {
        Some(AttributeValue::Int(year)) if !(1000..=9999).contains(year) => {
            errors.add(
                fields::YEAR_LAUNCHED,
                field_error("date_format", "The year launched does not match the format Y."),
            );
        }
        Some(AttributeValue::Int(_)) | Some(AttributeValue::Null) | None => {}
        Some(other) => errors.add(fields::YEAR_LAUNCHED, expected("integer", other)),
    }

    match attrs.get(fields::OPENED) {
        Some(AttributeValue::Bool(_)) | None => {}
        Some(other) => errors.add(fields::OPENED, expected("boolean", other)),
    }

    match attrs.get(fields::RATING) {
        Some(AttributeValue::Text(rating)) if !RATING_LIST.contains(&rating.as_str()) => {
            errors.add(
                fields::RATING,
                field_error(
                    "in",
                    format!("The rating must be one of: {}.", RATING_LIST.join(", ")),
                ),
            );
        }
        Some(AttributeValue::Text(_)) | Some(AttributeValue::Null) | None => {}
        Some(other) => errors.add(fields::RATING, expected("string", other)),
    }

    match attrs.get(fields::DURATION) {
        Some(AttributeValue::Int(duration)) if *duration < 0 => {
            errors.add(
                fields::DURATION,
                field_error("min", "The duration must be at least 0."),
            );
        }
        Some(AttributeValue::Int(_)) | Some(AttributeValue::Null) | None => {}
        Some(other) => errors.add(fields::DURATION, expected("integer", other)),
    }

    for key in [fields::CATEGORIES_ID, fields::GENDERS_ID] {
        match attrs.get(key) {
            Some(AttributeValue::Ids(_)) | None => {}
            Some(other) => errors.add(key, expected("array", other)),
        }
    }

    for slot in FileSlot::ALL {
        let key = slot.attribute_key();
        match attrs.get(key) {
            Some(AttributeValue::File(file)) => {
                if !slot.accepts_content_type(file.content_type()) {
                    errors.add(
                        key,
                        field_error(
                            "mimetypes",
                            format!("The {} has an unsupported type {}.", key, file.content_type()),
                        ),
                    );
                }
                if file.size() > slot.max_size_bytes() {
                    errors.add(
                        key,
                        field_error(
                            "max",
                            format!(
                                "The {} may not be greater than {} kilobytes.",
                                key,
                                slot.max_size_bytes() / 1024
                            ),
                        ),
                    );
                }
            }
            // A name only refers to the file already in the slot, so a new
            // video has none to refer to.
            Some(AttributeValue::Text(_)) if mode == WriteMode::Create => errors.add(
                key,
                field_error("file", format!("The {} must be a file.", key)),
            ),
            Some(AttributeValue::Text(_)) | Some(AttributeValue::Null) | None => {}
            Some(other) => errors.add(key, expected("file", other)),
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn expected(kind: &str, got: &AttributeValue) -> validator::ValidationError {
    field_error(
        "type",
        format!("Expected {}, got {}", kind, got.kind()),
    )
}
