//! Relational catalog of books, authors, categories and reviews.
//!
//! `CatalogStore` is the unit-of-work seam the ingest pipeline writes through.
//! `PgCatalog` is the Postgres implementation; `MemoryCatalog` (feature
//! `test-utils`) is an in-memory stand-in with fault injection for tests.

pub mod catalog;
pub mod error;
#[cfg(any(test, feature = "test-utils"))]
pub mod memory;
pub mod postgres;

pub use catalog::CatalogStore;
pub use error::{Result, StoreError};
#[cfg(any(test, feature = "test-utils"))]
pub use memory::MemoryCatalog;
pub use postgres::PgCatalog;
