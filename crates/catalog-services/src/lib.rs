//! Catalog Services Layer
//!
//! Orchestration of video writes: file staging, the file lifecycle in
//! storage, association syncing and the transactional write coordinator
//! that ties them to one relational transaction.

pub mod coordinator;
pub mod error;
pub mod files;
pub mod relations;

pub use coordinator::VideoWriter;
pub use error::{WriteError, WritePhase};
pub use files::{diff_obsolete, extract_files, FileLifecycle, StagedFile};
pub use relations::{sync, sync_from_attributes, SyncOutcome};

pub use catalog_db::{CatalogStore, CatalogTx, MemoryCatalogStore, PgCatalogStore, TagLookup};
pub use catalog_storage::{create_storage, LocalStorage, MemoryStorage, Storage, StorageError};
