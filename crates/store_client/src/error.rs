use thiserror::Error;

/// Error type for store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No auth credentials configured
    #[error("not authenticated; run `bestie login` first")]
    NotAuthenticated,
    /// Credentials were rejected (401/403)
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("HTTP {0}: {1}")]
    Http(u16, String),
    /// Server rejected the request (400/422)
    #[error("{0}")]
    Validation(String),
    #[error("parse error: {0}")]
    Parse(String),
    #[error("I/O error: {0}")]
    Io(String),
}

impl StoreError {
    /// Credentials are missing or were refused.
    pub fn is_auth(&self) -> bool {
        matches!(self, StoreError::NotAuthenticated | StoreError::Unauthorized(_))
    }
}
