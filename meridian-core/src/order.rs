use crate::ids::{TradeId, TradeOrderId};
use crate::trade::TradeSide;
use chrono::{DateTime, Utc};
use derive_more::Display;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize, Serialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum TradeOrderType {
    Market,
    Limit,
    StopMarket,
    StopLimit,
}

/// Whether a [`TradeOrder`] opens a position or reduces one (`spec.md` §3:
/// "Exit orders ... their executions successively reduce the open
/// quantity"). `Trade::record_exit_fill` only ever accounts fills from
/// orders carrying an exit role against the entry's filled quantity.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize, Serialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum TradeOrderRole {
    Entry,
    ExitStopLoss,
    ExitTakeProfit,
    ExitTrailingStop,
    ExitManual,
    ExitLiquidation,
    ExitRiskCeiling,
}

impl TradeOrderRole {
    pub fn is_exit(&self) -> bool {
        !matches!(self, TradeOrderRole::Entry)
    }
}

/// The lifecycle of a single order sent toward the exchange (or the paper
/// simulator) for one [`Trade`](crate::trade::Trade) leg (`spec.md` §4.6).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize, Serialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum TradeOrderStatus {
    PendingSubmission,
    Submitted,
    PartiallyFilled,
    Filled,
    PendingCancel,
    Cancelled,
    Rejected,
    Expired,
}

impl TradeOrderStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TradeOrderStatus::Filled
                | TradeOrderStatus::Cancelled
                | TradeOrderStatus::Rejected
                | TradeOrderStatus::Expired
        )
    }

    pub fn can_transition_to(&self, next: TradeOrderStatus) -> bool {
        use TradeOrderStatus::*;
        matches!(
            (self, next),
            (PendingSubmission, Submitted)
                | (PendingSubmission, Rejected)
                | (Submitted, PartiallyFilled)
                | (Submitted, Filled)
                | (Submitted, PendingCancel)
                | (Submitted, Rejected)
                | (Submitted, Expired)
                | (PartiallyFilled, PartiallyFilled)
                | (PartiallyFilled, Filled)
                | (PartiallyFilled, PendingCancel)
                | (PendingCancel, Cancelled)
                | (PendingCancel, Filled)
                | (PendingCancel, PartiallyFilled)
        )
    }
}

/// A single order placed against one side of a [`Trade`](crate::trade::Trade)
/// (`spec.md` §3, §4.6). `exchange_order_id` is populated only once the
/// venue has acknowledged submission; it is the idempotency anchor for
/// reconciling fills.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TradeOrder {
    pub id: TradeOrderId,
    pub trade_id: TradeId,
    /// The venue's own order id, verbatim — not every exchange mints
    /// UUID-shaped ids, so this is a raw string rather than one of the
    /// opaque ids used for internally-minted identifiers.
    pub exchange_order_id: Option<String>,
    pub client_order_id: String,
    pub symbol: String,
    pub side: TradeSide,
    pub order_type: TradeOrderType,
    pub role: TradeOrderRole,
    pub status: TradeOrderStatus,
    pub requested_quantity: Decimal,
    pub filled_quantity: Decimal,
    pub limit_price: Option<Decimal>,
    pub average_fill_price: Option<Decimal>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub last_updated_at: DateTime<Utc>,
    pub rejection_reason: Option<String>,
}

impl TradeOrder {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        trade_id: TradeId,
        client_order_id: impl Into<String>,
        symbol: impl Into<String>,
        side: TradeSide,
        order_type: TradeOrderType,
        role: TradeOrderRole,
        requested_quantity: Decimal,
        limit_price: Option<Decimal>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: TradeOrderId::random(),
            trade_id,
            exchange_order_id: None,
            client_order_id: client_order_id.into(),
            symbol: symbol.into(),
            side,
            order_type,
            role,
            status: TradeOrderStatus::PendingSubmission,
            requested_quantity,
            filled_quantity: Decimal::ZERO,
            limit_price,
            average_fill_price: None,
            submitted_at: None,
            last_updated_at: now,
            rejection_reason: None,
        }
    }

    pub fn transition(&mut self, next: TradeOrderStatus, now: DateTime<Utc>) -> Result<(), String> {
        if !self.status.can_transition_to(next) {
            return Err(format!("illegal order transition {} -> {}", self.status, next));
        }
        self.status = next;
        self.last_updated_at = now;
        Ok(())
    }

    pub fn is_fully_filled(&self) -> bool {
        self.filled_quantity >= self.requested_quantity
    }

    pub fn remaining_quantity(&self) -> Decimal {
        (self.requested_quantity - self.filled_quantity).max(Decimal::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn pending_order() -> TradeOrder {
        TradeOrder::new(
            TradeId::random(),
            "client-1",
            "BTCUSDT",
            TradeSide::Long,
            TradeOrderType::Market,
            TradeOrderRole::Entry,
            dec!(0.1),
            None,
            Utc::now(),
        )
    }

    #[test]
    fn rejection_only_reachable_before_submission_acknowledged() {
        let mut order = pending_order();
        assert!(order.transition(TradeOrderStatus::Rejected, Utc::now()).is_ok());
        assert!(order.status.is_terminal());
    }

    #[test]
    fn partial_fills_can_accumulate_before_final_fill() {
        let mut order = pending_order();
        order.transition(TradeOrderStatus::Submitted, Utc::now()).unwrap();
        order.filled_quantity = dec!(0.04);
        order.transition(TradeOrderStatus::PartiallyFilled, Utc::now()).unwrap();
        order.filled_quantity = dec!(0.07);
        order.transition(TradeOrderStatus::PartiallyFilled, Utc::now()).unwrap();
        assert!(!order.is_fully_filled());
        order.filled_quantity = dec!(0.1);
        order.transition(TradeOrderStatus::Filled, Utc::now()).unwrap();
        assert!(order.is_fully_filled());
        assert_eq!(order.remaining_quantity(), Decimal::ZERO);
    }

    #[test]
    fn only_exit_roles_report_as_exits() {
        assert!(!TradeOrderRole::Entry.is_exit());
        assert!(TradeOrderRole::ExitStopLoss.is_exit());
        assert!(TradeOrderRole::ExitManual.is_exit());
    }

    #[test]
    fn filled_orders_cannot_be_cancelled() {
        let mut order = pending_order();
        order.transition(TradeOrderStatus::Submitted, Utc::now()).unwrap();
        order.transition(TradeOrderStatus::Filled, Utc::now()).unwrap();
        assert!(order.transition(TradeOrderStatus::PendingCancel, Utc::now()).is_err());
    }
}
