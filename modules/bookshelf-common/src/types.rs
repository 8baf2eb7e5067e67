use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::BookshelfError;

// --- Natural-key entities ---

/// The two entity kinds identified by their name alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Author,
    Category,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Author => "author",
            EntityKind::Category => "category",
        }
    }

    /// Google Books search operator that scopes a query to this kind.
    pub fn search_operator(&self) -> &'static str {
        match self {
            EntityKind::Author => "inauthor",
            EntityKind::Category => "subject",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An Author or Category row. Names are case-sensitive and stored verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Entity {
    pub kind: EntityKind,
    pub name: String,
}

impl Entity {
    pub fn new(kind: EntityKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }
}

// --- Books ---

/// A book as built from a search payload, before it has a surrogate id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewBook {
    pub external_id: String,
    pub title: String,
    pub publisher: Option<String>,
    /// Kept as the API returns it; never parsed.
    pub published_date: Option<String>,
    pub description: Option<String>,
    pub page_count: Option<i32>,
    pub maturity_rating: Option<String>,
    pub small_thumbnail: Option<String>,
    pub thumbnail: Option<String>,
    pub language: Option<String>,
    pub authors: Vec<String>,
    pub categories: Vec<String>,
}

impl NewBook {
    /// Names listed for `kind`, in payload order.
    pub fn names(&self, kind: EntityKind) -> &[String] {
        match kind {
            EntityKind::Author => &self.authors,
            EntityKind::Category => &self.categories,
        }
    }
}

/// A persisted book with its relations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Book {
    pub id: Uuid,
    pub external_id: String,
    pub title: String,
    pub publisher: Option<String>,
    pub published_date: Option<String>,
    pub description: Option<String>,
    pub page_count: Option<i32>,
    pub maturity_rating: Option<String>,
    pub small_thumbnail: Option<String>,
    pub thumbnail: Option<String>,
    pub language: Option<String>,
    pub authors: Vec<String>,
    pub categories: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl Book {
    pub fn from_new(id: Uuid, book: NewBook, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            external_id: book.external_id,
            title: book.title,
            publisher: book.publisher,
            published_date: book.published_date,
            description: book.description,
            page_count: book.page_count,
            maturity_rating: book.maturity_rating,
            small_thumbnail: book.small_thumbnail,
            thumbnail: book.thumbnail,
            language: book.language,
            authors: book.authors,
            categories: book.categories,
            created_at,
        }
    }
}

// --- Reviews ---

/// A star rating in the inclusive range 1..=5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub struct StarRating(u8);

impl StarRating {
    pub const MIN: i32 = 1;
    pub const MAX: i32 = 5;

    pub fn new(stars: i32) -> Result<Self, BookshelfError> {
        if (Self::MIN..=Self::MAX).contains(&stars) {
            Ok(Self(stars as u8))
        } else {
            Err(BookshelfError::Validation(format!(
                "Invalid number of stars ({stars})"
            )))
        }
    }

    pub fn get(&self) -> u8 {
        self.0
    }
}

impl TryFrom<i32> for StarRating {
    type Error = BookshelfError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<StarRating> for i32 {
    fn from(value: StarRating) -> Self {
        value.0 as i32
    }
}

/// A review to be written. Construction of `stars` is where invalid ratings are rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewReview {
    pub user_id: String,
    pub book_id: Uuid,
    pub stars: StarRating,
    pub comment: Option<String>,
    /// Marks the currently active review for a (user, book) pair.
    pub actual: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub id: Uuid,
    pub user_id: String,
    pub book_id: Uuid,
    pub stars: StarRating,
    pub comment: Option<String>,
    pub actual: bool,
    pub created_at: DateTime<Utc>,
}
