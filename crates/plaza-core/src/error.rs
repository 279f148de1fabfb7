use thiserror::Error;

/// Failures surfaced by the domain services. None of them are retried here.
#[derive(Debug, Error)]
pub enum SocialError {
    /// Self-targeting actions, empty bodies, and transitions out of a
    /// terminal friend-request state.
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    /// The actor is not the party allowed to perform this mutation.
    #[error("permission denied")]
    PermissionDenied,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("storage error: {0}")]
    Storage(#[from] anyhow::Error),
}

impl SocialError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidOperation(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, SocialError>;
