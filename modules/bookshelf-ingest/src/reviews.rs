//! Synthetic reviews for a freshly filled catalog.
//!
//! Roughly half of the known users get between one and five reviews, each on
//! a random stored book. About one review in five is marked as the user's
//! actual review for that book; a second actual review for the same pair is
//! rejected by the store and skipped.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use tracing::{info, warn};
use uuid::Uuid;

use bookshelf_common::{BookshelfError, NewReview, StarRating};
use bookshelf_store::CatalogStore;

const MAX_REVIEWS_PER_USER: usize = 5;

const FILLER_WORDS: &[&str] = &[
    "plot", "pacing", "characters", "ending", "chapter", "author", "style", "story", "world",
    "dialogue", "slow", "gripping", "uneven", "memorable", "dense", "light", "clever", "familiar",
    "reread", "recommend", "again", "later", "middle", "start", "translation", "edition", "cover",
    "worth", "the", "a", "and", "but", "really", "quite", "never", "always",
];

/// Source of user ids to write reviews for.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn user_ids(&self) -> Result<Vec<String>>;
}

/// A fixed list of user ids, e.g. from the command line.
#[derive(Debug, Clone, Default)]
pub struct StaticUsers(pub Vec<String>);

#[async_trait]
impl UserDirectory for StaticUsers {
    async fn user_ids(&self) -> Result<Vec<String>> {
        Ok(self.0.clone())
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReviewSeedReport {
    pub users_selected: usize,
    pub written: usize,
    pub conflicts: usize,
    pub failed: usize,
}

/// Validate and assemble a review. Stars outside 1..=5 are rejected here,
/// before anything reaches the store.
pub fn build_review(
    user_id: &str,
    book_id: Uuid,
    stars: i32,
    comment: Option<String>,
    actual: bool,
) -> Result<NewReview, BookshelfError> {
    Ok(NewReview {
        user_id: user_id.to_string(),
        book_id,
        stars: StarRating::new(stars)?,
        comment,
        actual,
    })
}

pub struct ReviewSynthesizer<R: Rng + Send = StdRng> {
    catalog: Arc<dyn CatalogStore>,
    rng: R,
}

impl ReviewSynthesizer<StdRng> {
    pub fn new(catalog: Arc<dyn CatalogStore>) -> Self {
        Self::with_rng(catalog, StdRng::from_os_rng())
    }

    /// Reproducible output for a given seed.
    pub fn seeded(catalog: Arc<dyn CatalogStore>, seed: u64) -> Self {
        Self::with_rng(catalog, StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng + Send> ReviewSynthesizer<R> {
    pub fn with_rng(catalog: Arc<dyn CatalogStore>, rng: R) -> Self {
        Self { catalog, rng }
    }

    pub async fn synthesize(&mut self, users: &dyn UserDirectory) -> Result<ReviewSeedReport> {
        let books = self.catalog.book_ids().await?;
        let user_ids = users.user_ids().await?;
        let mut report = ReviewSeedReport::default();

        if books.is_empty() {
            warn!("No books in catalog, skipping review synthesis");
            return Ok(report);
        }

        let mut pending = Vec::new();
        for user_id in &user_ids {
            if !self.rng.random_bool(0.5) {
                continue;
            }
            report.users_selected += 1;
            for _ in 0..self.rng.random_range(1..=MAX_REVIEWS_PER_USER) {
                pending.push(self.draw_review(user_id, &books)?);
            }
        }

        for review in &pending {
            match self.catalog.insert_review(review).await {
                Ok(_) => report.written += 1,
                Err(e) if e.is_unique_violation() => {
                    report.conflicts += 1;
                }
                Err(e) => {
                    warn!(user_id = review.user_id.as_str(), error = %e, "Failed to write review");
                    report.failed += 1;
                }
            }
        }

        info!(
            users = user_ids.len(),
            selected = report.users_selected,
            written = report.written,
            conflicts = report.conflicts,
            "Review synthesis complete"
        );
        Ok(report)
    }

    fn draw_review(&mut self, user_id: &str, books: &[Uuid]) -> Result<NewReview> {
        let book_id = *books
            .choose(&mut self.rng)
            .ok_or_else(|| anyhow::anyhow!("no books to review"))?;
        let stars = self.rng.random_range(StarRating::MIN..=StarRating::MAX);
        let comment = filler_comment(&mut self.rng);
        let actual = self.rng.random_range(1..=10) > 8;
        Ok(build_review(user_id, book_id, stars, Some(comment), actual)?)
    }
}

fn filler_comment<R: Rng>(rng: &mut R) -> String {
    let len = rng.random_range(6..=16);
    let words: Vec<&str> = (0..len)
        .filter_map(|_| FILLER_WORDS.choose(&mut *rng).copied())
        .collect();
    let mut text = words.join(" ");
    if let Some(first) = text.get(..1) {
        text.replace_range(..1, &first.to_uppercase());
    }
    text.push('.');
    text
}
