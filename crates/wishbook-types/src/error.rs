use thiserror::Error;

/// Engine error taxonomy. Authorization and invariant violations are raised
/// immediately and never retried; `Upstream` covers collaborator failures.
#[derive(Debug, Error)]
pub enum WishbookError {
    #[error("not authorized")]
    Unauthorized,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("cannot remove the last administrator")]
    LastAdminProtected,

    #[error("validation failed: {0}")]
    ValidationFailed(String),

    #[error("upstream failure: {0}")]
    Upstream(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, WishbookError>;

impl WishbookError {
    pub fn validation(reason: impl Into<String>) -> Self {
        Self::ValidationFailed(reason.into())
    }
}
