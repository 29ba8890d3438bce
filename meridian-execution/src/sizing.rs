use crate::error::ExecutionError;
use chrono::{DateTime, Utc};
use meridian_core::trade::TradeSide;
use meridian_instrument::InstrumentSpec;
use meridian_risk::{ConcurrencyGate, DailyRiskLedger};
use rust_decimal::Decimal;

/// Everything the sizing algorithm needs that isn't already owned by
/// `ExecutionEngine` (`spec.md` §4.6 steps 1-7).
#[derive(Debug, Clone, Copy)]
pub struct SizingInputs {
    pub account_equity: Decimal,
    pub per_trade_risk_pct: Decimal,
    pub daily_capital_risk_pct: Decimal,
    pub max_concurrent_operations: u32,
    pub entry_price: Decimal,
    pub stop_loss_price: Decimal,
    pub side: TradeSide,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SizedPosition {
    pub quantity: Decimal,
    pub entry_price: Decimal,
    pub stop_loss_price: Decimal,
    pub risk_budget_quote: Decimal,
}

/// Steps 1-7 of `spec.md` §4.6's position-sizing algorithm. Claims a
/// concurrency-gate slot as a side effect of success; callers must release
/// it (`gate.release()`) once the resulting Trade reaches a terminal
/// state, and must call `ledger.commit(..)` once the Trade is actually
/// opened (sizing only *checks* the daily ceiling, it doesn't spend
/// against it — spending happens only once the entry order is
/// confirmed, per step 5's "if the new trade would exceed it").
pub fn size_position(
    inputs: SizingInputs,
    spec: &InstrumentSpec,
    ledger: &DailyRiskLedger,
    gate: &ConcurrencyGate,
    now: DateTime<Utc>,
) -> Result<SizedPosition, ExecutionError> {
    // Step 3: risk budget.
    let risk_budget_quote = inputs.account_equity * inputs.per_trade_risk_pct;

    // Step 4: per-unit risk -> quantity.
    let per_unit_risk = (inputs.entry_price - inputs.stop_loss_price).abs();
    if per_unit_risk.is_zero() {
        return Err(ExecutionError::SizingRefused(
            "entry and stop-loss price are identical".into(),
        ));
    }
    let quantity = risk_budget_quote / per_unit_risk;

    // Step 5: daily risk ceiling.
    if ledger.would_exceed_ceiling(now, risk_budget_quote, inputs.account_equity, inputs.daily_capital_risk_pct) {
        return Err(ExecutionError::SizingRefused(
            "trade would exceed the daily capital risk ceiling".into(),
        ));
    }

    // Step 6: concurrent-operations cap.
    if !gate.try_reserve(inputs.max_concurrent_operations) {
        return Err(ExecutionError::SizingRefused(
            "maximum concurrent operations reached".into(),
        ));
    }

    // Step 7: rounding and minimum notional, rolling back the gate
    // reservation if the rounded order can't actually be placed.
    let rounded_quantity = spec.round_quantity(quantity);
    let rounded_entry = spec.round_price(inputs.entry_price);
    let rounded_stop = spec.round_price(inputs.stop_loss_price);

    if !spec.meets_min_notional(rounded_entry, rounded_quantity) {
        gate.release();
        return Err(ExecutionError::SizingRefused(
            "rounded quantity falls below the exchange's minimum notional".into(),
        ));
    }

    Ok(SizedPosition {
        quantity: rounded_quantity,
        entry_price: rounded_entry,
        stop_loss_price: rounded_stop,
        risk_budget_quote,
    })
}
