use async_trait::async_trait;
use uuid::Uuid;

use bookshelf_common::{Book, Entity, EntityKind, NewBook, NewReview, Review};

use crate::error::Result;

/// Everything the ingest pipeline and review seeder need from storage.
///
/// Writes are expected to come from a single task per pipeline cycle; the
/// uniqueness constraints behind `insert_entity` and `insert_book` still hold
/// if that discipline is broken, surfacing as `StoreError::UniqueViolation`.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn book_exists(&self, external_id: &str) -> Result<bool>;

    /// A book with its author and category names (sorted by name).
    async fn find_book(&self, external_id: &str) -> Result<Option<Book>>;

    async fn find_entity(&self, kind: EntityKind, name: &str) -> Result<Option<Entity>>;

    /// Insert a new Author or Category. Fails with `UniqueViolation` if the name exists.
    async fn insert_entity(&self, kind: EntityKind, name: &str) -> Result<Entity>;

    /// Persist a book and its relation rows in one transaction. Every listed
    /// author and category must already exist.
    async fn insert_book(&self, book: &NewBook) -> Result<Book>;

    /// Distinct names of every stored entity of `kind`, sorted.
    async fn entity_names(&self, kind: EntityKind) -> Result<Vec<String>>;

    async fn book_ids(&self) -> Result<Vec<Uuid>>;

    async fn count_books(&self) -> Result<i64>;

    async fn insert_review(&self, review: &NewReview) -> Result<Review>;
}
