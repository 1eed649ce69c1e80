use thiserror::Error;

pub type Result<T> = std::result::Result<T, SearchError>;

/// Failure of one search call. Callers treat any of these as an empty partition.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("search request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("search provider returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("malformed search response: {0}")]
    Parse(#[from] serde_json::Error),
}
