#![forbid(unsafe_code)]
#![warn(
    unused,
    clippy::cognitive_complexity,
    missing_debug_implementations,
    rust_2018_idioms
)]

//! The Opportunity Engine (C5): drives an Opportunity from detection to a
//! terminal state exactly per `spec.md` §4.5's diagram, persisting every
//! transition through C2 with compare-and-swap, plus the periodic expiry
//! sweep and the startup recovery for analyses stuck mid-crash.

mod engine;
mod error;

pub use engine::{load_routing_config, OpportunityEngine, RoutingDecision};
pub use error::OpportunityEngineError;
