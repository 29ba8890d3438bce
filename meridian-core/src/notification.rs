use crate::ids::{OpportunityId, TradeId, TradeOrderId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A typed event the trading core emits onto its internal notification bus
/// (`spec.md` §6: "The core emits typed notification events onto an
/// internal bus; the fan-out is not part of this spec."). The bus itself
/// is a plain `meridian-integration::channel::UnboundedTx<NotificationEvent>`;
/// only the external fan-out (push, email, chat) is out of scope here.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NotificationEvent {
    OrderRejected {
        trade_id: TradeId,
        order_id: TradeOrderId,
        reason: String,
        at: DateTime<Utc>,
    },
    TradeClosed {
        trade_id: TradeId,
        opportunity_id: OpportunityId,
        realized_pnl: Decimal,
        at: DateTime<Utc>,
    },
    TrailingStopTriggered {
        trade_id: TradeId,
        trigger_price: Decimal,
        at: DateTime<Utc>,
    },
    AutoPauseTriggered {
        reason: PauseReasonSummary,
        at: DateTime<Utc>,
    },
}

/// A serializable mirror of `meridian_risk::PauseReason`, kept here rather
/// than depending on `meridian-risk` from this crate, which would invert
/// the dependency direction every other crate relies on.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub enum PauseReasonSummary {
    DailyLossLimitBreached,
    MaxDrawdownBreached,
    ConsecutiveLossesBreached { count: u32 },
    ExternalVolatilitySignal,
}
