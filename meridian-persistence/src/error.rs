use meridian_core::CoreError;
use thiserror::Error;

/// Errors internal to a `PersistencePort` implementation, converted into
/// [`CoreError`] at the call boundary.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("entity not found: {0}")]
    NotFound(String),

    #[error("serializable-isolation conflict, retryable")]
    Conflict,

    #[error("optimistic-concurrency conflict: expected version {expected}, found {found}")]
    VersionConflict { expected: u64, found: u64 },

    #[error("transaction aborted: {0}")]
    TransactionAborted(String),

    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

impl From<PersistenceError> for CoreError {
    fn from(err: PersistenceError) -> Self {
        match err {
            PersistenceError::NotFound(entity) => CoreError::NotFound(entity),
            PersistenceError::Conflict => {
                CoreError::UpstreamUnavailable("serializable-isolation conflict".into())
            }
            PersistenceError::VersionConflict { expected, found } => {
                CoreError::VersionConflict { expected, found }
            }
            PersistenceError::TransactionAborted(reason) => CoreError::Internal(reason),
            PersistenceError::Unavailable(reason) => CoreError::UpstreamUnavailable(reason),
        }
    }
}
