use meridian_core::CoreError;
use meridian_persistence::PersistenceError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("illegal trade/order transition: {0}")]
    InvalidTransition(String),

    #[error("position sizing refused: {0}")]
    SizingRefused(String),

    #[error("unknown or expired proposal nonce")]
    UnknownNonce,

    #[error("real-mode trading is currently paused: {0:?}")]
    TradingPaused(meridian_risk::PauseReason),

    #[error("exchange rejected the order: {0}")]
    ExchangeRejected(String),

    #[error("exchange client error: {0}")]
    ExchangeClient(String),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error(transparent)]
    Opportunity(#[from] meridian_opportunity::OpportunityEngineError),
}

impl From<ExecutionError> for CoreError {
    fn from(err: ExecutionError) -> Self {
        match err {
            ExecutionError::InvalidTransition(reason) => CoreError::PreconditionFailed(reason),
            ExecutionError::SizingRefused(reason) => CoreError::PreconditionFailed(reason),
            ExecutionError::UnknownNonce => CoreError::invalid_input("unknown or expired proposal nonce"),
            ExecutionError::TradingPaused(reason) => {
                CoreError::PreconditionFailed(format!("real-mode trading paused: {reason:?}"))
            }
            ExecutionError::ExchangeRejected(reason) => CoreError::UpstreamRejected(reason),
            ExecutionError::ExchangeClient(reason) => CoreError::UpstreamUnavailable(reason),
            ExecutionError::Persistence(err) => err.into(),
            ExecutionError::Opportunity(err) => err.into(),
        }
    }
}
