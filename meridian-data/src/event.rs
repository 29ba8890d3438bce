use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// A single OHLCV bar (`spec.md` §4.3 `kline_<interval>`).
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Kline {
    pub symbol: SmolStr,
    pub interval: SmolStr,
    pub open_time: DateTime<Utc>,
    pub close_time: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
    pub is_final: bool,
}

/// 24h rolling ticker statistics.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Ticker24h {
    pub symbol: SmolStr,
    pub last_price: Decimal,
    pub price_change_pct: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub volume: Decimal,
    pub event_time: DateTime<Utc>,
}

/// A single depth-update level delta (`spec.md` §4.3 `depth<levels>`).
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DepthLevel {
    pub price: Decimal,
    pub quantity: Decimal,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DepthUpdate {
    pub symbol: SmolStr,
    pub event_time: DateTime<Utc>,
    pub bids: Vec<DepthLevel>,
    pub asks: Vec<DepthLevel>,
}

/// An account balance or order-status push from the `user_data_stream`
/// channel.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub enum UserDataEvent {
    BalanceUpdate { asset: SmolStr, free: Decimal, locked: Decimal },
    OrderUpdate { client_order_id: String, status: SmolStr },
}

/// The event envelope every stream subscription ultimately yields;
/// `event_id` is the dedupe key's non-symbol, non-time component
/// (`spec.md` §4.3).
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct MarketDataEvent {
    pub event_id: SmolStr,
    pub symbol: SmolStr,
    pub event_time: DateTime<Utc>,
    pub payload: MarketDataPayload,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub enum MarketDataPayload {
    Kline(Kline),
    Ticker(Ticker24h),
    Depth(DepthUpdate),
    UserData(UserDataEvent),
}
