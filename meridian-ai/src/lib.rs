#![forbid(unsafe_code)]
#![warn(
    unused,
    clippy::cognitive_complexity,
    missing_debug_implementations,
    rust_2018_idioms
)]

//! The AI Orchestrator (C4): the agent loop that turns an Opportunity into
//! a [`meridian_core::opportunity::Verdict`] through an LLM/tool-call cycle
//! (`spec.md` §4.4).
//!
//! Plays the role `jackbot-strategy::Strategy<E>` plays for the wider
//! Jackbot ecosystem, generalized from a statically-typed single reaction
//! to a dynamic, by-name tool dispatch loop.

pub mod error;
pub mod guard;
pub mod llm;
pub mod orchestrator;
pub mod tool;
pub mod tools;

pub use error::AiError;
pub use guard::OpportunityGuards;
pub use llm::{HttpLlmClient, LlmClient, LlmTurn, Message};
pub use orchestrator::{AiOrchestrator, OrchestratorConfig};
pub use tool::{Tool, ToolRegistry};
