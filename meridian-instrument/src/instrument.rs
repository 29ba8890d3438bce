use crate::asset::Asset;
use derive_more::{Constructor, Display};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// Exchange-facing symbol (eg/ `"BTCUSDT"`), distinct from the `(base, quote)`
/// pair it's derived from so exchange-specific formatting never leaks past
/// the adapter boundary.
#[derive(
    Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Constructor, Display,
)]
#[serde(transparent)]
pub struct Symbol(pub SmolStr);

impl Symbol {
    pub fn new_from_str(symbol: impl AsRef<str>) -> Self {
        Self(SmolStr::new(symbol.as_ref().to_uppercase()))
    }
}

/// Distinguishes spot instruments (the only kind this core ever routes an
/// order against) from margin/derivative kinds that exist in the data model
/// only as inert placeholders — see `spec.md` §1 Non-goals.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize)]
pub enum InstrumentKind {
    Spot,
    /// Placeholder only: no execution path in this core ever constructs an
    /// order against a `Perpetual` instrument.
    Perpetual,
    /// Placeholder only: no execution path in this core ever constructs an
    /// order against a `Future` instrument.
    Future,
}

impl InstrumentKind {
    pub fn is_spot(&self) -> bool {
        matches!(self, InstrumentKind::Spot)
    }
}

/// Exchange-provided price/quantity rounding and minimum-notional rules used
/// by the position-sizing algorithm (spec §4.6 step 7).
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Deserialize, Serialize, Constructor)]
pub struct InstrumentSpec {
    pub tick_size: Decimal,
    pub lot_size: Decimal,
    pub min_notional: Decimal,
}

impl InstrumentSpec {
    /// Round `price` down to the nearest `tick_size` step.
    pub fn round_price(&self, price: Decimal) -> Decimal {
        round_down_to_step(price, self.tick_size)
    }

    /// Round `quantity` down to the nearest `lot_size` step.
    pub fn round_quantity(&self, quantity: Decimal) -> Decimal {
        round_down_to_step(quantity, self.lot_size)
    }

    /// Whether `price * quantity` clears the exchange's minimum notional.
    pub fn meets_min_notional(&self, price: Decimal, quantity: Decimal) -> bool {
        price * quantity >= self.min_notional
    }
}

fn round_down_to_step(value: Decimal, step: Decimal) -> Decimal {
    if step.is_zero() {
        return value;
    }
    (value / step).trunc() * step
}

/// Comprehensive instrument identity: exchange, human-internal symbol,
/// exchange-wire symbol, base/quote assets, kind, and exchange trading
/// rules.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, Constructor)]
pub struct Instrument {
    pub exchange: crate::exchange::ExchangeId,
    pub symbol: Symbol,
    pub base: Asset,
    pub quote: Asset,
    pub kind: InstrumentKind,
    pub spec: InstrumentSpec,
}

impl Instrument {
    pub fn spot(
        exchange: crate::exchange::ExchangeId,
        symbol: impl AsRef<str>,
        base: impl Into<Asset>,
        quote: impl Into<Asset>,
        spec: InstrumentSpec,
    ) -> Self {
        Self {
            exchange,
            symbol: Symbol::new_from_str(symbol),
            base: base.into(),
            quote: quote.into(),
            kind: InstrumentKind::Spot,
            spec,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchange::ExchangeId;

    fn spec() -> InstrumentSpec {
        InstrumentSpec::new(
            Decimal::new(1, 2),     // 0.01
            Decimal::new(1, 5),     // 0.00001
            Decimal::new(10, 0),    // 10
        )
    }

    #[test]
    fn rounds_quantity_down_to_lot_step() {
        let spec = spec();
        let qty = Decimal::new(333333, 7); // 0.0333333
        assert_eq!(spec.round_quantity(qty), Decimal::new(33333, 6));
    }

    #[test]
    fn rejects_below_min_notional() {
        let spec = spec();
        assert!(!spec.meets_min_notional(Decimal::new(1, 0), Decimal::new(1, 1)));
    }

    #[test]
    fn builds_spot_instrument() {
        let instrument = Instrument::spot(ExchangeId::BinanceSpot, "btcusdt", "btc", "usdt", spec());
        assert_eq!(instrument.symbol, Symbol::new_from_str("BTCUSDT"));
        assert!(instrument.kind.is_spot());
    }
}
