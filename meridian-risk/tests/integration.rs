use meridian_instrument::exchange::ExchangeId;
use meridian_instrument::instrument::Symbol;
use meridian_risk::{
    alert::{RiskViolation, VecAlertHook},
    correlation::CorrelationMatrix,
    drawdown::DrawdownTracker,
    exposure::ExposureTracker,
    position_tracker::PositionTracker,
    volatility::VolatilityScaler,
};
use rust_decimal_macros::dec;

fn symbol(s: &str) -> Symbol {
    Symbol::new_from_str(s)
}

#[test]
fn exposure_alert_triggered() {
    let mut tracker: ExposureTracker = ExposureTracker::new();
    tracker.update(symbol("BTCUSDT"), dec!(50));
    let alerts = VecAlertHook::default();
    tracker.check_limit(symbol("BTCUSDT"), dec!(20), &alerts);
    assert!(matches!(alerts.alerts.lock().pop().unwrap(), RiskViolation::ExposureLimit { .. }));
}

#[test]
fn drawdown_alert_triggered() {
    let mut tracker: DrawdownTracker = DrawdownTracker::new();
    tracker.update_pnl(symbol("BTCUSDT"), dec!(100));
    tracker.update_pnl(symbol("BTCUSDT"), dec!(-60));
    let alerts = VecAlertHook::default();
    tracker.check_limit(symbol("BTCUSDT"), dec!(0.3), &alerts);
    assert!(matches!(alerts.alerts.lock().pop().unwrap(), RiskViolation::DrawdownLimit { .. }));
}

#[test]
fn correlation_alert_triggered() {
    let mut corr: CorrelationMatrix = CorrelationMatrix::new();
    corr.set_limit(symbol("BTCUSDT"), symbol("ETHUSDT"), dec!(40));
    let alerts = VecAlertHook::default();
    corr.check_limit(symbol("BTCUSDT"), symbol("ETHUSDT"), dec!(50), &alerts);
    assert!(matches!(alerts.alerts.lock().pop().unwrap(), RiskViolation::CorrelationLimit { .. }));
}

#[test]
fn volatility_scaler_adjusts_position() {
    let scaler = VolatilityScaler::new(dec!(0.02), dec!(0.5), dec!(2));
    let adjusted = scaler.adjust_position(dec!(10), dec!(0.04));
    assert_eq!(adjusted, dec!(5));
}

#[test]
fn position_tracker_limits() {
    let mut tracker: PositionTracker = PositionTracker::new();
    tracker.update(ExchangeId::BinanceSpot, symbol("BTCUSDT"), dec!(5));
    let alerts = VecAlertHook::default();
    tracker.check_limit(ExchangeId::BinanceSpot, symbol("BTCUSDT"), dec!(2), &alerts);
    assert!(matches!(alerts.alerts.lock().pop().unwrap(), RiskViolation::ExposureLimit { .. }));
}
