use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::instrument;

/// One turn of the agent loop's conversation (`spec.md` §4.4 step 2-4d):
/// the opportunity payload and catalog go in as `System`/`User`, tool
/// results come back as `ToolResult`, and the model's own turns are
/// `Assistant`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Message {
    System(String),
    User(String),
    Assistant(String),
    ToolResult {
        tool_name: String,
        result: Result<serde_json::Value, String>,
    },
}

/// What the LLM produced for one turn: either it is done and hands back a
/// verdict, or it wants a tool invoked before it can continue (`spec.md`
/// §4.4 step 3).
#[derive(Debug, Clone)]
pub enum LlmTurn {
    ToolCall {
        tool_name: String,
        args: serde_json::Value,
    },
    FinalVerdict(meridian_core::opportunity::Verdict),
}

/// The seam between the agent loop and whichever model backend is
/// configured. Deliberately thin — the orchestrator owns every piece of
/// loop state (hop count, failure tally, conversation history); this trait
/// only ever sees one turn at a time.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn next_turn(&self, history: &[Message]) -> Result<LlmTurn, String>;

    /// Identifier recorded on the final [`meridian_core::opportunity::Verdict::model_id`].
    fn model_id(&self) -> &str;
}

/// Wire shape of one request to the configured LLM endpoint: the
/// conversation so far, verbatim. The endpoint is expected to speak this
/// platform's own turn shape (mirroring [`LlmTurn`]) rather than a
/// vendor-specific tool-call schema, since `meridian`'s config names one
/// endpoint behind which any model can be fronted.
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ChatResponse {
    ToolCall {
        tool_name: String,
        args: serde_json::Value,
    },
    FinalVerdict {
        verdict: meridian_core::opportunity::Verdict,
    },
}

/// The one concrete `LlmClient` this platform ships (`spec.md` §6): a
/// plain HTTP POST to a configured endpoint, signed the same way
/// `meridian-data`'s REST pull surface is — no vendor-specific request
/// shape, since the endpoint is expected to front whichever model the
/// operator configures behind this platform's own turn schema.
pub struct HttpLlmClient {
    http: reqwest::Client,
    endpoint: String,
    model: String,
    timeout: Duration,
}

impl HttpLlmClient {
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>, timeout: Duration) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.into(),
            model: model.into(),
            timeout,
        }
    }
}

#[async_trait]
impl LlmClient for HttpLlmClient {
    #[instrument(skip(self, history))]
    async fn next_turn(&self, history: &[Message]) -> Result<LlmTurn, String> {
        let body = ChatRequest {
            model: &self.model,
            messages: history,
        };

        let response = self
            .http
            .post(&self.endpoint)
            .json(&body)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        let status = response.status();
        let bytes = response.bytes().await.map_err(|e| e.to_string())?;
        if !status.is_success() {
            return Err(format!("status {status}: {}", String::from_utf8_lossy(&bytes)));
        }

        let parsed: ChatResponse =
            serde_json::from_slice(&bytes).map_err(|e| format!("malformed LLM response: {e}"))?;
        Ok(match parsed {
            ChatResponse::ToolCall { tool_name, args } => LlmTurn::ToolCall { tool_name, args },
            ChatResponse::FinalVerdict { verdict } => LlmTurn::FinalVerdict(verdict),
        })
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}
