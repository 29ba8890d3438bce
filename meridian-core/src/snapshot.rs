use chrono::{DateTime, Utc};
use derive_more::Display;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Where a [`PortfolioSnapshot`] was pulled from (`spec.md` §3). Exchange
/// snapshots are authoritative; derived ones are computed locally from
/// open trades when a pull is unavailable or stale.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize, Serialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotSource {
    ExchangePull,
    Derived,
}

/// A point-in-time view of account balances and open exposure, used by the
/// Execution & Risk Engine (C6) to size new positions against available
/// capital (`spec.md` §4.6).
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PortfolioSnapshot {
    pub taken_at: DateTime<Utc>,
    pub source: SnapshotSource,
    pub total_equity: Decimal,
    pub available_balance: Decimal,
    pub balances_by_asset: BTreeMap<String, Decimal>,
    pub open_exposure: Decimal,
    pub unrealized_pnl: Decimal,
}

impl PortfolioSnapshot {
    pub fn free_margin(&self) -> Decimal {
        (self.available_balance - self.open_exposure).max(Decimal::ZERO)
    }

    pub fn is_stale(&self, now: DateTime<Utc>, max_age: chrono::Duration) -> bool {
        now - self.taken_at > max_age
    }
}
