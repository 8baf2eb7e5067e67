use thiserror::Error;

#[derive(Error, Debug)]
pub enum BookshelfError {
    #[error("Validation error: {0}")]
    Validation(String),
}
