#[derive(Debug, thiserror::Error)]
pub enum ConsoleError {
    #[error("Authentication rejected: {0}")]
    AuthRejected(String),

    #[error("Fetch failed: {0}")]
    FetchFailed(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Session storage error: {0}")]
    Storage(String),
}
