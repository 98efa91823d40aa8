//! Catalog Storage Library
//!
//! This crate provides the storage abstraction for video files and its
//! implementations for the local filesystem and for memory.
//!
//! # Storage key format
//!
//! Every file belongs to exactly one video and lives in that video's
//! directory: `{video_id}/{file_name}`. Keys must not contain `..` or a
//! leading `/`. Key generation is centralized in the `keys` module so all
//! backends stay consistent.

pub mod factory;
pub mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-memory")]
pub mod memory;
pub mod traits;

// Re-export commonly used types
pub use catalog_core::StorageBackend;
pub use factory::create_storage;
pub use keys::{split_key, storage_key};
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
#[cfg(feature = "storage-memory")]
pub use memory::MemoryStorage;
pub use traits::{Storage, StorageError, StorageResult};
