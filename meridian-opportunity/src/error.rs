use meridian_core::CoreError;
use meridian_persistence::PersistenceError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OpportunityEngineError {
    #[error("illegal opportunity transition: {0}")]
    InvalidTransition(String),

    #[error("opportunity has no verdict to route on")]
    MissingVerdict,

    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

impl From<OpportunityEngineError> for CoreError {
    fn from(err: OpportunityEngineError) -> Self {
        match err {
            OpportunityEngineError::InvalidTransition(reason) => CoreError::PreconditionFailed(reason),
            OpportunityEngineError::MissingVerdict => {
                CoreError::PreconditionFailed("opportunity has no verdict".into())
            }
            OpportunityEngineError::Persistence(err) => err.into(),
        }
    }
}
