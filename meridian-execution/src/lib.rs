#![forbid(unsafe_code)]
#![warn(
    unused,
    clippy::cognitive_complexity,
    missing_debug_implementations,
    rust_2018_idioms
)]

//! The Execution & Risk Engine (C6): sizes a confirmed or auto-converted
//! Opportunity into a Trade, submits and reconciles its orders against a
//! venue (or the paper simulator), ratchets trailing stops, and evaluates
//! the auto-pause state on every close (`spec.md` §4.6).

mod client;
mod client_order_id;
mod engine;
mod error;
mod sizing;

pub use client::{BinanceExecutionClient, ExchangeClient, OrderRequest, PaperExchangeClient, SubmissionAck};
pub use client_order_id::ClientOrderIdGenerator;
pub use engine::{AutoPauseThresholds, ExecutionEngine, SizingPolicy, TradeProposal};
pub use error::ExecutionError;
pub use sizing::{size_position, SizedPosition, SizingInputs};
