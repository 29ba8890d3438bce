#![forbid(unsafe_code)]
#![warn(
    unused,
    clippy::cognitive_complexity,
    missing_debug_implementations,
    rust_2018_idioms
)]

//! Core identity types shared across the Meridian trading core: exchanges,
//! assets, and instruments. Mirrors the role `jackbot-instrument` plays for
//! the wider Jackbot ecosystem, scoped to this platform's spot-only core.

pub mod asset;
pub mod exchange;
pub mod instrument;

pub use asset::Asset;
pub use exchange::ExchangeId;
pub use instrument::{Instrument, InstrumentKind, InstrumentSpec, Symbol};
