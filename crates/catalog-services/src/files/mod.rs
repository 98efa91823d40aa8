//! Uploaded files: staging out of the attribute map and lifecycle in storage

pub mod lifecycle;
pub mod staging;

pub use lifecycle::{diff_obsolete, FileLifecycle};
pub use staging::{extract_files, StagedFile};
