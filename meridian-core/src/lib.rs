#![forbid(unsafe_code)]
#![warn(
    unused,
    clippy::cognitive_complexity,
    missing_debug_implementations,
    rust_2018_idioms
)]

//! Core domain model shared by every component of the Meridian trading
//! core: [`Opportunity`](opportunity::Opportunity), [`Trade`](trade::Trade),
//! [`TradeOrder`](order::TradeOrder), [`PortfolioSnapshot`](snapshot::PortfolioSnapshot),
//! [`UserConfiguration`](config::UserConfiguration), [`APICredential`](credential::ApiCredential)
//! and [`TradingStrategyConfig`](strategy::TradingStrategyConfig), plus the
//! error taxonomy (`error::CoreError`) every other crate converts into at
//! its boundary.
//!
//! Plays the role `jackbot-instrument` plays for the wider Jackbot
//! ecosystem, extended with this platform's own entity model.

pub mod config;
pub mod credential;
pub mod error;
pub mod ids;
pub mod notification;
pub mod opportunity;
pub mod order;
pub mod snapshot;
pub mod strategy;
pub mod trade;

pub use error::CoreError;
pub use ids::{OpportunityId, TradeId, TradeOrderId};
pub use notification::NotificationEvent;
pub use opportunity::{Opportunity, OpportunityStatus};
pub use order::{TradeOrder, TradeOrderStatus};
pub use trade::{Trade, TradeMode};
