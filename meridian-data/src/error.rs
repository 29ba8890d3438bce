use meridian_core::CoreError;
use meridian_integration::SocketError;
use thiserror::Error;

/// Errors surfaced by the Market Data Hub, converted into [`CoreError`] at
/// every caller's boundary.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("transport error: {0}")]
    Transport(#[from] SocketError),

    #[error("no subscriptions provided")]
    SubscriptionsEmpty,

    #[error("rate limit wait exceeded: {0}")]
    RateLimitExceeded(#[from] meridian_integration::rate_limit::RateLimitError),

    #[error("unexpected response shape: {0}")]
    UnexpectedResponse(String),
}

impl DataError {
    /// Whether this error should cause the owning reconnecting stream to
    /// tear down and re-initialise, per `spec.md` §4.3.
    pub fn is_terminal(&self) -> bool {
        matches!(self, DataError::Transport(_))
    }
}

impl From<DataError> for CoreError {
    fn from(err: DataError) -> Self {
        match err {
            DataError::Transport(_) => CoreError::UpstreamUnavailable(err.to_string()),
            DataError::SubscriptionsEmpty => CoreError::InvalidInput(err.to_string()),
            DataError::RateLimitExceeded(_) => CoreError::RateLimited {
                retry_after: std::time::Duration::from_secs(1),
            },
            DataError::UnexpectedResponse(reason) => CoreError::Internal(reason),
        }
    }
}
