//! Validation modules

pub mod coverage;
pub mod video;

use std::borrow::Cow;
use validator::ValidationError;

pub use coverage::{covers, CoverageLookup};
pub use video::{validate_video_attributes, WriteMode, MAX_TITLE_LENGTH};

/// Build a validation error with a code and a human readable message.
pub fn field_error(code: &'static str, message: impl Into<Cow<'static, str>>) -> ValidationError {
    let mut error = ValidationError::new(code);
    error.message = Some(message.into());
    error
}
