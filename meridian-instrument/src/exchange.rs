use derive_more::Display;
use serde::{Deserialize, Serialize};

/// Unique identifier for an execution venue.
///
/// The core ships against a single live exchange family (Binance-shaped
/// spot REST/WS) plus `Simulated`/`Mock` variants used by paper mode and
/// tests; `Other` is kept open for an operator-supplied adapter.
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Display,
)]
#[serde(rename = "exchange", rename_all = "snake_case")]
pub enum ExchangeId {
    Other,
    Simulated,
    Mock,
    BinanceSpot,
    BinanceSpotTestnet,
}

impl ExchangeId {
    /// Return the `&str` representation of this [`ExchangeId`].
    pub fn as_str(&self) -> &'static str {
        match self {
            ExchangeId::Other => "other",
            ExchangeId::Simulated => "simulated",
            ExchangeId::Mock => "mock",
            ExchangeId::BinanceSpot => "binance_spot",
            ExchangeId::BinanceSpotTestnet => "binance_spot_testnet",
        }
    }

    /// Whether this venue accepts real (non-simulated) order submission.
    pub fn is_live(&self) -> bool {
        matches!(self, ExchangeId::BinanceSpot)
    }
}
