//! Database repositories and the transactional store seam
//!
//! `store` defines the traits the write coordinator depends on. The remaining
//! modules implement them on Postgres through sqlx.
//
// Store seam
pub mod store;
//
// Pool setup and migrations
pub mod setup;
//
// Repositories
pub mod tag;
pub mod video;
//
// Postgres implementation of the seam
pub mod postgres;
pub mod transaction;

pub use postgres::PgCatalogStore;
pub use setup::{connect, run_migrations, setup_database};
pub use store::{CatalogStore, CatalogTx, TagLookup};
pub use tag::TagRepository;
pub use transaction::PgCatalogTx;
pub use video::VideoRepository;
