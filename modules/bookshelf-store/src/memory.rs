// In-memory catalog for tests.
//
// Enforces the same constraints as the Postgres schema (unique external id,
// unique entity names, relations reference existing entities, one actual
// review per user/book) and lets tests inject failures and write races.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use bookshelf_common::{Book, Entity, EntityKind, NewBook, NewReview, Review};

use crate::catalog::CatalogStore;
use crate::error::{Result, StoreError};

#[derive(Default)]
struct Inner {
    books: HashMap<String, Book>,
    authors: BTreeSet<String>,
    categories: BTreeSet<String>,
    reviews: Vec<Review>,
    /// external ids whose insert fails with a non-uniqueness error
    failing_books: HashSet<String>,
    /// external ids whose insert loses a simulated race
    racing_books: HashSet<String>,
    /// names created by a simulated concurrent writer on first insert attempt
    racing_entities: HashSet<(EntityKind, String)>,
    entity_inserts: usize,
    book_inserts: usize,
}

impl Inner {
    fn names(&self, kind: EntityKind) -> &BTreeSet<String> {
        match kind {
            EntityKind::Author => &self.authors,
            EntityKind::Category => &self.categories,
        }
    }

    fn names_mut(&mut self, kind: EntityKind) -> &mut BTreeSet<String> {
        match kind {
            EntityKind::Author => &mut self.authors,
            EntityKind::Category => &mut self.categories,
        }
    }
}

#[derive(Default)]
pub struct MemoryCatalog {
    inner: Mutex<Inner>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `insert_book` fail with a database-style error for this external id.
    pub fn fail_book(self, external_id: &str) -> Self {
        self.lock().failing_books.insert(external_id.to_string());
        self
    }

    /// Make `insert_book` report a uniqueness violation for this external id,
    /// as if another writer committed it first.
    pub fn race_book(self, external_id: &str) -> Self {
        self.lock().racing_books.insert(external_id.to_string());
        self
    }

    /// On the first insert of this name, create it "from another writer" and
    /// report a uniqueness violation.
    pub fn race_entity(self, kind: EntityKind, name: &str) -> Self {
        self.lock().racing_entities.insert((kind, name.to_string()));
        self
    }

    pub fn books(&self) -> Vec<Book> {
        let mut books: Vec<_> = self.lock().books.values().cloned().collect();
        books.sort_by(|a, b| a.external_id.cmp(&b.external_id));
        books
    }

    pub fn reviews(&self) -> Vec<Review> {
        self.lock().reviews.clone()
    }

    /// Number of `insert_entity` calls, successful or not.
    pub fn entity_insert_attempts(&self) -> usize {
        self.lock().entity_inserts
    }

    /// Number of `insert_book` calls, successful or not.
    pub fn book_insert_attempts(&self) -> usize {
        self.lock().book_inserts
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl CatalogStore for MemoryCatalog {
    async fn book_exists(&self, external_id: &str) -> Result<bool> {
        Ok(self.lock().books.contains_key(external_id))
    }

    async fn find_book(&self, external_id: &str) -> Result<Option<Book>> {
        Ok(self.lock().books.get(external_id).cloned())
    }

    async fn find_entity(&self, kind: EntityKind, name: &str) -> Result<Option<Entity>> {
        let inner = self.lock();
        Ok(inner
            .names(kind)
            .contains(name)
            .then(|| Entity::new(kind, name)))
    }

    async fn insert_entity(&self, kind: EntityKind, name: &str) -> Result<Entity> {
        let mut inner = self.lock();
        inner.entity_inserts += 1;

        if inner.racing_entities.remove(&(kind, name.to_string())) {
            inner.names_mut(kind).insert(name.to_string());
        }

        if !inner.names_mut(kind).insert(name.to_string()) {
            return Err(StoreError::UniqueViolation {
                constraint: format!("{}s_pkey", kind.as_str()),
            });
        }
        Ok(Entity::new(kind, name))
    }

    async fn insert_book(&self, book: &NewBook) -> Result<Book> {
        let mut inner = self.lock();
        inner.book_inserts += 1;

        if inner.failing_books.contains(&book.external_id) {
            return Err(StoreError::Unavailable(format!(
                "injected failure for {}",
                book.external_id
            )));
        }
        if inner.racing_books.remove(&book.external_id)
            || inner.books.contains_key(&book.external_id)
        {
            return Err(StoreError::UniqueViolation {
                constraint: "books_external_id_key".to_string(),
            });
        }
        for kind in [EntityKind::Author, EntityKind::Category] {
            if let Some(missing) = book
                .names(kind)
                .iter()
                .find(|name| !inner.names(kind).contains(name.as_str()))
            {
                return Err(StoreError::MissingEntity {
                    kind,
                    name: missing.clone(),
                });
            }
        }

        let mut stored = Book::from_new(Uuid::new_v4(), book.clone(), Utc::now());
        stored.authors.sort();
        stored.authors.dedup();
        stored.categories.sort();
        stored.categories.dedup();

        inner
            .books
            .insert(stored.external_id.clone(), stored.clone());
        Ok(stored)
    }

    async fn entity_names(&self, kind: EntityKind) -> Result<Vec<String>> {
        Ok(self.lock().names(kind).iter().cloned().collect())
    }

    async fn book_ids(&self) -> Result<Vec<Uuid>> {
        Ok(self.books().into_iter().map(|b| b.id).collect())
    }

    async fn count_books(&self) -> Result<i64> {
        Ok(self.lock().books.len() as i64)
    }

    async fn insert_review(&self, review: &NewReview) -> Result<Review> {
        let mut inner = self.lock();

        if !inner.books.values().any(|b| b.id == review.book_id) {
            return Err(StoreError::MissingBook(review.book_id));
        }
        if review.actual
            && inner.reviews.iter().any(|r| {
                r.actual && r.user_id == review.user_id && r.book_id == review.book_id
            })
        {
            return Err(StoreError::UniqueViolation {
                constraint: "reviews_one_actual_idx".to_string(),
            });
        }

        let stored = Review {
            id: Uuid::new_v4(),
            user_id: review.user_id.clone(),
            book_id: review.book_id,
            stars: review.stars,
            comment: review.comment.clone(),
            actual: review.actual,
            created_at: Utc::now(),
        };
        inner.reviews.push(stored.clone());
        Ok(stored)
    }
}
