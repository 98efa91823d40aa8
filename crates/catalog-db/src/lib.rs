//! Catalog Database Library
//!
//! Relational side of the catalog: the store seam the write coordinator works
//! against, its Postgres implementation and an in-memory implementation for
//! tests and demos.

pub mod db;
pub mod memory;

pub use db::{
    connect, run_migrations, setup_database, CatalogStore, CatalogTx, PgCatalogStore,
    PgCatalogTx, TagLookup, TagRepository, VideoRepository,
};
pub use memory::MemoryCatalogStore;
