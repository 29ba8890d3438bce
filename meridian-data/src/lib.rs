#![forbid(unsafe_code)]
#![warn(
    unused,
    clippy::cognitive_complexity,
    missing_debug_implementations,
    rust_2018_idioms
)]

//! The Market Data Hub (C3): a rate-limit-aware REST pull surface
//! (`pull::MarketDataClient`) and a reconnecting, deduplicated WebSocket
//! stream surface (`stream::MarketDataHub`).
//!
//! Plays the role `jackbot-data` plays for the wider Jackbot ecosystem,
//! trimmed to a single exchange family and generalized around the Hub's
//! two surfaces rather than per-exchange protocol plumbing.

pub mod dedupe;
pub mod error;
pub mod event;
pub mod pull;
pub mod reconnect;
pub mod stream;

pub use error::DataError;
pub use pull::{BinanceRestClient, MarketDataClient};
pub use stream::{Channel, ChannelConnector, MarketDataHub};
