use crate::ids::{OpportunityId, TradeId, TradeOrderId};
use chrono::{DateTime, Utc};
use derive_more::Display;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Paper trades simulate fills against live market data; real trades
/// submit to the exchange. `spec.md` §3 forbids ever mixing the two within
/// a single [`Trade`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize, Serialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum TradeMode {
    Paper,
    Real,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize, Serialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum TradeSide {
    Long,
    Short,
}

/// The lifecycle of a [`Trade`] position (`spec.md` §3):
/// `pending_entry -> opening -> open -> (partially_closed ->)* closing ->
/// closed`, with `error` reachable from any non-terminal state (a
/// deterministically-rejected entry, or an exit whose own order is
/// rejected mid-flight, still needs a terminal record rather than quietly
/// vanishing).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize, Serialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum PositionStatus {
    PendingEntry,
    Opening,
    Open,
    PartiallyClosed,
    Closing,
    Closed,
    Error,
}

impl PositionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PositionStatus::Closed | PositionStatus::Error)
    }

    pub fn can_transition_to(&self, next: PositionStatus) -> bool {
        use PositionStatus::*;
        if self.is_terminal() {
            return false;
        }
        if next == Error {
            return true;
        }
        matches!(
            (self, next),
            (PendingEntry, Opening)
                | (Opening, Open)
                | (Open, PartiallyClosed)
                | (Open, Closing)
                | (Open, Closed)
                | (PartiallyClosed, Closing)
                | (PartiallyClosed, Closed)
                | (Closing, PartiallyClosed)
                | (Closing, Closed)
        )
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize, Serialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum ClosingReason {
    TakeProfit,
    StopLoss,
    TrailingStop,
    Manual,
    Liquidation,
    RiskCeilingBreached,
}

/// An open or closed position resulting from one or more [`TradeOrder`]
/// fills (`spec.md` §3). The trailing-stop ratchet state lives here rather
/// than on the order, since it tracks the position's lifetime extreme.
/// Exit orders are tracked separately from the entry order so that
/// `record_exit_fill` can enforce `spec.md` §3's invariant:
/// `sum(executed quantity of exit orders) <= executed quantity of the
/// entry order`, and so `position_status = closed` only once that sum
/// reaches the entry's filled quantity (or a `manual` exit order force-
/// closes the residual).
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Trade {
    pub id: TradeId,
    pub opportunity_id: OpportunityId,
    pub symbol: String,
    pub mode: TradeMode,
    pub side: TradeSide,
    pub status: PositionStatus,
    pub entry_price: Option<Decimal>,
    pub quantity: Decimal,
    pub stop_loss: Option<Decimal>,
    pub take_profit: Option<Decimal>,
    pub trailing_stop_ratio: Option<Decimal>,
    pub trailing_stop_extreme: Option<Decimal>,
    pub entry_order_id: Option<TradeOrderId>,
    pub exit_order_ids: Vec<TradeOrderId>,
    pub entry_filled_quantity: Decimal,
    pub exit_filled_quantity: Decimal,
    pub opened_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
    pub realized_pnl: Option<Decimal>,
    pub closing_reason: Option<ClosingReason>,
}

impl Trade {
    pub fn new(
        opportunity_id: OpportunityId,
        symbol: impl Into<String>,
        mode: TradeMode,
        side: TradeSide,
        quantity: Decimal,
        stop_loss: Option<Decimal>,
        take_profit: Option<Decimal>,
        trailing_stop_ratio: Option<Decimal>,
    ) -> Self {
        Self {
            id: TradeId::random(),
            opportunity_id,
            symbol: symbol.into(),
            mode,
            side,
            status: PositionStatus::PendingEntry,
            entry_price: None,
            quantity,
            stop_loss,
            take_profit,
            trailing_stop_ratio,
            trailing_stop_extreme: None,
            entry_order_id: None,
            exit_order_ids: Vec::new(),
            entry_filled_quantity: Decimal::ZERO,
            exit_filled_quantity: Decimal::ZERO,
            opened_at: None,
            closed_at: None,
            realized_pnl: None,
            closing_reason: None,
        }
    }

    pub fn transition(&mut self, next: PositionStatus) -> Result<(), String> {
        if !self.status.can_transition_to(next) {
            return Err(format!("illegal position transition {} -> {}", self.status, next));
        }
        self.status = next;
        Ok(())
    }

    /// Record (a possibly partial) fill against the entry order. Never
    /// regresses — a late, smaller report for an already-larger fill is
    /// ignored rather than walking the recorded quantity backward.
    pub fn record_entry_fill(&mut self, filled_quantity: Decimal) {
        if filled_quantity > self.entry_filled_quantity {
            self.entry_filled_quantity = filled_quantity;
        }
    }

    /// Account a fill from one of this trade's exit orders against the
    /// entry's filled quantity, enforcing `spec.md` §3's invariant.
    /// Moves the position to `partially_closed` the first time some but
    /// not all of the entry quantity has been closed out.
    pub fn record_exit_fill(&mut self, executed_quantity: Decimal) -> Result<(), String> {
        let prospective = self.exit_filled_quantity + executed_quantity;
        if prospective > self.entry_filled_quantity {
            return Err(format!(
                "exit fill of {executed_quantity} would bring total exits to {prospective}, exceeding the entry's filled quantity of {}",
                self.entry_filled_quantity
            ));
        }
        self.exit_filled_quantity = prospective;
        if self.status == PositionStatus::Open
            && self.exit_filled_quantity > Decimal::ZERO
            && self.exit_filled_quantity < self.entry_filled_quantity
        {
            self.transition(PositionStatus::PartiallyClosed)?;
        }
        Ok(())
    }

    /// Whether every unit of the entry's filled quantity has been
    /// accounted for by exit fills (`spec.md` §3: "position_status=closed
    /// iff that sum equals executed entry quantity").
    pub fn is_fully_exited(&self) -> bool {
        self.entry_filled_quantity > Decimal::ZERO && self.exit_filled_quantity >= self.entry_filled_quantity
    }

    /// Ratchet the trailing stop toward the current price, only ever
    /// tightening. Returns the updated stop-loss if it moved (`spec.md`
    /// §3 trailing-stop invariant).
    pub fn update_trailing_stop(&mut self, current_price: Decimal) -> Option<Decimal> {
        let ratio = self.trailing_stop_ratio?;
        let extreme = match (self.side, self.trailing_stop_extreme) {
            (TradeSide::Long, Some(prev)) => current_price.max(prev),
            (TradeSide::Short, Some(prev)) => current_price.min(prev),
            (_, None) => current_price,
        };
        self.trailing_stop_extreme = Some(extreme);

        let candidate = match self.side {
            TradeSide::Long => extreme * (Decimal::ONE - ratio),
            TradeSide::Short => extreme * (Decimal::ONE + ratio),
        };

        let tighter = match (self.side, self.stop_loss) {
            (TradeSide::Long, Some(current)) => candidate > current,
            (TradeSide::Short, Some(current)) => candidate < current,
            (_, None) => true,
        };

        if tighter {
            self.stop_loss = Some(candidate);
            self.stop_loss
        } else {
            None
        }
    }

    /// Seal the position closed. Refuses unless every unit of the entry's
    /// filled quantity has been accounted for by exit fills, or `reason`
    /// is `Manual` — a manual close force-closes whatever residual
    /// quantity exit fills haven't yet covered (`spec.md` §3).
    pub fn close(
        &mut self,
        closed_at: DateTime<Utc>,
        realized_pnl: Decimal,
        reason: ClosingReason,
    ) -> Result<(), String> {
        if reason != ClosingReason::Manual && !self.is_fully_exited() {
            return Err(format!(
                "cannot close: only {}/{} of the entry's filled quantity has been exited",
                self.exit_filled_quantity, self.entry_filled_quantity
            ));
        }
        self.transition(PositionStatus::Closed)?;
        self.closed_at = Some(closed_at);
        self.realized_pnl = Some(realized_pnl);
        self.closing_reason = Some(reason);
        Ok(())
    }

    /// Move a non-terminal position to `error` (`spec.md` §3: "error
    /// reachable from any non-terminal state"), e.g. a deterministically-
    /// rejected entry submission.
    pub fn fail(&mut self) -> Result<(), String> {
        self.transition(PositionStatus::Error)
    }
}
