//! Data models for the catalog
//!
//! Videos, the tags attached to them, the attribute map that carries write
//! requests, and the uploaded-file handle.

mod attributes;
mod tag;
mod upload;
mod video;

pub use attributes::{AttributeValue, Attributes};
pub use tag::{Category, Gender, RelationKind};
pub use upload::UploadedFile;
pub use video::{fields, FileSlot, Video, RATING_LIST};
