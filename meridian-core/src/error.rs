use std::time::Duration;
use thiserror::Error;

/// The error taxonomy shared across every Meridian trading-core component
/// (`spec.md` §7). Adapters convert their own transport-specific errors
/// (`SocketError`, `ClientError`, …) into a `CoreError` at the boundary, the
/// way `barter-execution::error::ConnectivityError` converts into
/// `ClientError`.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("optimistic-concurrency conflict: expected version {expected}, found {found}")]
    VersionConflict { expected: u64, found: u64 },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },

    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("upstream rejected the request: {0}")]
    UpstreamRejected(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("precondition failed: {0}")]
    PreconditionFailed(String),

    #[error("operation cancelled")]
    Cancelled,

    #[error("internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Whether this error kind is eligible for the bounded, jittered retry
    /// policy of `spec.md` §7 (base 250ms, factor 2, max 5 attempts).
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CoreError::RateLimited { .. } | CoreError::UpstreamUnavailable(_)
        )
    }

    pub fn not_found(entity: impl Into<String>) -> Self {
        Self::NotFound(entity.into())
    }

    pub fn invalid_input(reason: impl Into<String>) -> Self {
        Self::InvalidInput(reason.into())
    }

    pub fn precondition_failed(reason: impl Into<String>) -> Self {
        Self::PreconditionFailed(reason.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_transient_upstream_errors_are_retryable() {
        assert!(CoreError::RateLimited { retry_after: Duration::from_secs(1) }.is_retryable());
        assert!(CoreError::UpstreamUnavailable("timeout".into()).is_retryable());
        assert!(!CoreError::UpstreamRejected("insufficient funds".into()).is_retryable());
        assert!(!CoreError::PreconditionFailed("daily cap".into()).is_retryable());
    }
}
