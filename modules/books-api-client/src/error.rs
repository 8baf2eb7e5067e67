use thiserror::Error;

pub type Result<T> = std::result::Result<T, BooksApiError>;

#[derive(Debug, Error)]
pub enum BooksApiError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for BooksApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            BooksApiError::Parse(err.to_string())
        } else {
            BooksApiError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for BooksApiError {
    fn from(err: serde_json::Error) -> Self {
        BooksApiError::Parse(err.to_string())
    }
}
