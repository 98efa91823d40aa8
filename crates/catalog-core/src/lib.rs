//! Catalog Core Library
//!
//! This crate provides the domain models, error types, configuration and
//! validation rules shared by every catalog component.

pub mod config;
pub mod error;
pub mod models;
pub mod storage_types;
pub mod validation;

// Re-export commonly used types
pub use config::Config;
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use storage_types::StorageBackend;
pub use validation::{covers, validate_video_attributes, CoverageLookup, WriteMode};
