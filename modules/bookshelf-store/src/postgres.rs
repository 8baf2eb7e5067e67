// Postgres-backed catalog.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use bookshelf_common::{Book, Entity, EntityKind, NewBook, NewReview, Review};

use crate::catalog::CatalogStore;
use crate::error::Result;

#[derive(Clone)]
pub struct PgCatalog {
    pool: PgPool,
}

/// A row from the books table, without relations.
#[derive(Debug, Clone, sqlx::FromRow)]
struct BookRow {
    id: Uuid,
    external_id: String,
    title: String,
    publisher: Option<String>,
    published_date: Option<String>,
    description: Option<String>,
    page_count: Option<i32>,
    maturity_rating: Option<String>,
    small_thumbnail: Option<String>,
    thumbnail: Option<String>,
    language: Option<String>,
    created_at: DateTime<Utc>,
}

/// Table and column names for a natural-key entity and its relation table.
struct EntityTables {
    table: &'static str,
    relation: &'static str,
    relation_column: &'static str,
}

fn tables(kind: EntityKind) -> EntityTables {
    match kind {
        EntityKind::Author => EntityTables {
            table: "authors",
            relation: "book_authors",
            relation_column: "author_name",
        },
        EntityKind::Category => EntityTables {
            table: "categories",
            relation: "book_categories",
            relation_column: "category_name",
        },
    }
}

impl PgCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run the embedded SQL migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    async fn related_names(&self, book_id: Uuid, kind: EntityKind) -> Result<Vec<String>> {
        let t = tables(kind);
        let sql = format!(
            "SELECT {col} FROM {rel} WHERE book_id = $1 ORDER BY {col}",
            col = t.relation_column,
            rel = t.relation,
        );
        let names = sqlx::query_scalar::<_, String>(&sql)
            .bind(book_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(names)
    }
}

#[async_trait]
impl CatalogStore for PgCatalog {
    async fn book_exists(&self, external_id: &str) -> Result<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM books WHERE external_id = $1)",
        )
        .bind(external_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn find_book(&self, external_id: &str) -> Result<Option<Book>> {
        let row = sqlx::query_as::<_, BookRow>(
            r#"
            SELECT id, external_id, title, publisher, published_date, description,
                   page_count, maturity_rating, small_thumbnail, thumbnail, language,
                   created_at
            FROM books
            WHERE external_id = $1
            "#,
        )
        .bind(external_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let authors = self.related_names(row.id, EntityKind::Author).await?;
        let categories = self.related_names(row.id, EntityKind::Category).await?;

        Ok(Some(Book {
            id: row.id,
            external_id: row.external_id,
            title: row.title,
            publisher: row.publisher,
            published_date: row.published_date,
            description: row.description,
            page_count: row.page_count,
            maturity_rating: row.maturity_rating,
            small_thumbnail: row.small_thumbnail,
            thumbnail: row.thumbnail,
            language: row.language,
            authors,
            categories,
            created_at: row.created_at,
        }))
    }

    async fn find_entity(&self, kind: EntityKind, name: &str) -> Result<Option<Entity>> {
        let sql = format!("SELECT name FROM {} WHERE name = $1", tables(kind).table);
        let found = sqlx::query_scalar::<_, String>(&sql)
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        Ok(found.map(|name| Entity::new(kind, name)))
    }

    async fn insert_entity(&self, kind: EntityKind, name: &str) -> Result<Entity> {
        let sql = format!("INSERT INTO {} (name) VALUES ($1)", tables(kind).table);
        sqlx::query(&sql).bind(name).execute(&self.pool).await?;
        debug!(%kind, name, "Created entity");
        Ok(Entity::new(kind, name))
    }

    async fn insert_book(&self, book: &NewBook) -> Result<Book> {
        let id = Uuid::new_v4();
        let mut tx = self.pool.begin().await?;

        let created_at = sqlx::query_scalar::<_, DateTime<Utc>>(
            r#"
            INSERT INTO books
                (id, external_id, title, publisher, published_date, description,
                 page_count, maturity_rating, small_thumbnail, thumbnail, language)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING created_at
            "#,
        )
        .bind(id)
        .bind(&book.external_id)
        .bind(&book.title)
        .bind(&book.publisher)
        .bind(&book.published_date)
        .bind(&book.description)
        .bind(book.page_count)
        .bind(&book.maturity_rating)
        .bind(&book.small_thumbnail)
        .bind(&book.thumbnail)
        .bind(&book.language)
        .fetch_one(&mut *tx)
        .await?;

        for kind in [EntityKind::Author, EntityKind::Category] {
            let names = book.names(kind);
            if names.is_empty() {
                continue;
            }
            let t = tables(kind);
            let sql = format!(
                r#"
                INSERT INTO {rel} (book_id, {col})
                SELECT $1, unnest($2::text[])
                ON CONFLICT DO NOTHING
                "#,
                rel = t.relation,
                col = t.relation_column,
            );
            sqlx::query(&sql)
                .bind(id)
                .bind(names)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        let mut stored = Book::from_new(id, book.clone(), created_at);
        stored.authors.sort();
        stored.authors.dedup();
        stored.categories.sort();
        stored.categories.dedup();
        Ok(stored)
    }

    async fn entity_names(&self, kind: EntityKind) -> Result<Vec<String>> {
        let sql = format!("SELECT DISTINCT name FROM {} ORDER BY name", tables(kind).table);
        let names = sqlx::query_scalar::<_, String>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(names)
    }

    async fn book_ids(&self) -> Result<Vec<Uuid>> {
        let ids = sqlx::query_scalar::<_, Uuid>("SELECT id FROM books ORDER BY created_at")
            .fetch_all(&self.pool)
            .await?;
        Ok(ids)
    }

    async fn count_books(&self) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM books")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn insert_review(&self, review: &NewReview) -> Result<Review> {
        let id = Uuid::new_v4();
        let created_at = sqlx::query_scalar::<_, DateTime<Utc>>(
            r#"
            INSERT INTO reviews (id, user_id, book_id, stars, comment, actual)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING created_at
            "#,
        )
        .bind(id)
        .bind(&review.user_id)
        .bind(review.book_id)
        .bind(review.stars.get() as i16)
        .bind(&review.comment)
        .bind(review.actual)
        .fetch_one(&self.pool)
        .await?;

        Ok(Review {
            id,
            user_id: review.user_id.clone(),
            book_id: review.book_id,
            stars: review.stars,
            comment: review.comment.clone(),
            actual: review.actual,
            created_at,
        })
    }
}
