use thiserror::Error;

#[derive(Error, Debug)]
pub enum SkyfeedError {
    /// Every partition dispatched in a cycle failed.
    #[error("All {0} partitions failed to fetch")]
    TotalFetchFailure(usize),

    /// A like/bookmark write failed after the optimistic update was applied.
    #[error("Engagement sync failed: {0}")]
    EngagementSync(String),

    #[error("No authenticated viewer")]
    NotAuthenticated,

    #[error("Unknown item: {0}")]
    UnknownItem(String),

    #[error("Session has been closed")]
    SessionClosed,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}
