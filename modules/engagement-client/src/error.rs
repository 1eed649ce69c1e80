use thiserror::Error;

pub type Result<T> = std::result::Result<T, EngagementError>;

#[derive(Debug, Error)]
pub enum EngagementError {
    #[error("data service unreachable: {0}")]
    Http(#[from] reqwest::Error),

    /// Token missing, expired or rejected on a write or lookup.
    #[error("data service rejected credentials (status {0})")]
    Unauthorized(u16),

    #[error("data service returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("malformed data service response: {0}")]
    Parse(#[from] serde_json::Error),
}
