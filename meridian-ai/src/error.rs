use meridian_core::CoreError;
use thiserror::Error;

/// Errors the agent loop can raise (`spec.md` §4.4). Tool failures that are
/// recoverable by the loop itself (unknown tool, single execution failure)
/// are folded into [`crate::tool::ToolOutcome`] instead and never reach the
/// caller unless the loop gives up on them.
#[derive(Debug, Error)]
pub enum AiError {
    #[error("hop budget exhausted after {hops} tool calls")]
    HopBudgetExhausted { hops: u32 },

    #[error("tool {tool_name} failed identically three times in a row: {reason}")]
    RepeatedToolFailure { tool_name: String, reason: String },

    #[error("tool {0} timed out")]
    ToolTimeout(String),

    #[error("llm call failed: {0}")]
    LlmFailure(String),

    #[error("llm returned a malformed verdict or tool call: {0}")]
    MalformedResponse(String),

    #[error("analysis for this opportunity is already in progress")]
    AlreadyAnalyzing,

    #[error("analysis cancelled")]
    Cancelled,

    #[error("opportunity is not in a state analysis can act on: {0}")]
    InvalidOpportunityState(String),

    #[error(transparent)]
    Persistence(#[from] meridian_persistence::PersistenceError),

    #[error(transparent)]
    Data(#[from] meridian_data::DataError),
}

impl From<AiError> for CoreError {
    fn from(err: AiError) -> Self {
        match err {
            AiError::HopBudgetExhausted { .. } => CoreError::PreconditionFailed(err.to_string()),
            AiError::RepeatedToolFailure { .. } => CoreError::UpstreamRejected(err.to_string()),
            AiError::ToolTimeout(_) => CoreError::UpstreamUnavailable(err.to_string()),
            AiError::LlmFailure(_) => CoreError::UpstreamUnavailable(err.to_string()),
            AiError::MalformedResponse(_) => CoreError::UpstreamRejected(err.to_string()),
            AiError::AlreadyAnalyzing => CoreError::PreconditionFailed(err.to_string()),
            AiError::InvalidOpportunityState(_) => CoreError::PreconditionFailed(err.to_string()),
            AiError::Cancelled => CoreError::Cancelled,
            AiError::Persistence(inner) => inner.into(),
            AiError::Data(inner) => inner.into(),
        }
    }
}
