use bookshelf_common::EntityKind;

/// Result type alias for catalog operations.
pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Another row already holds this natural key or external id.
    #[error("Unique constraint violated: {constraint}")]
    UniqueViolation { constraint: String },

    #[error("Book references unknown {kind}: {name}")]
    MissingEntity { kind: EntityKind, name: String },

    #[error("Unknown book: {0}")]
    MissingBook(uuid::Uuid),

    #[error("Database error: {0}")]
    Database(sqlx::Error),

    #[error("Migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, StoreError::UniqueViolation { .. })
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        let constraint = err
            .as_database_error()
            .filter(|db| db.is_unique_violation())
            .map(|db| db.constraint().unwrap_or("unknown").to_string());

        match constraint {
            Some(constraint) => StoreError::UniqueViolation { constraint },
            None => StoreError::Database(err),
        }
    }
}
