use parking_lot::RwLock;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Why new real-mode trades were disabled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PauseReason {
    DailyLossLimitBreached,
    MaxDrawdownBreached,
    ConsecutiveLossesBreached { count: u32 },
    ExternalVolatilitySignal,
}

/// Process-wide "new real trades disabled" flag (`spec.md` §4.6 auto-pause),
/// evaluated after every Trade close. Paper-mode trading is never affected;
/// only real-mode `confirm` calls consult this gate.
#[derive(Debug, Default)]
pub struct AutoPauseState {
    reason: RwLock<Option<PauseReason>>,
}

impl AutoPauseState {
    pub fn new() -> Self {
        Self { reason: RwLock::new(None) }
    }

    pub fn is_paused(&self) -> bool {
        self.reason.read().is_some()
    }

    pub fn reason(&self) -> Option<PauseReason> {
        self.reason.read().clone()
    }

    pub fn pause(&self, reason: PauseReason) {
        *self.reason.write() = Some(reason);
    }

    /// Manual resume, e.g. an operator acknowledging the pause.
    pub fn resume(&self) {
        *self.reason.write() = None;
    }

    /// Evaluate the triggers spec.md §4.6 names against today's realised
    /// figures, pausing if any is breached. Already-paused states are left
    /// alone rather than overwritten by a lower-priority trigger.
    pub fn evaluate(
        &self,
        realised_pnl_today: Decimal,
        account_equity: Decimal,
        daily_loss_limit_pct: Decimal,
        current_drawdown_pct: Decimal,
        max_drawdown_pct: Decimal,
        consecutive_losses: u32,
        max_consecutive_losses: u32,
        external_volatility_triggered: bool,
    ) {
        if self.is_paused() {
            return;
        }
        let loss_pct = if account_equity.is_zero() {
            Decimal::ZERO
        } else {
            (-realised_pnl_today / account_equity).max(Decimal::ZERO)
        };
        if loss_pct > daily_loss_limit_pct {
            self.pause(PauseReason::DailyLossLimitBreached);
        } else if current_drawdown_pct > max_drawdown_pct {
            self.pause(PauseReason::MaxDrawdownBreached);
        } else if consecutive_losses >= max_consecutive_losses {
            self.pause(PauseReason::ConsecutiveLossesBreached { count: consecutive_losses });
        } else if external_volatility_triggered {
            self.pause(PauseReason::ExternalVolatilitySignal);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn daily_loss_breach_pauses_real_trading() {
        let state = AutoPauseState::new();
        state.evaluate(dec!(-600), dec!(10000), dec!(0.05), dec!(0), dec!(1), 0, 10, false);
        assert_eq!(state.reason(), Some(PauseReason::DailyLossLimitBreached));
    }

    #[test]
    fn already_paused_state_is_not_overwritten() {
        let state = AutoPauseState::new();
        state.pause(PauseReason::ExternalVolatilitySignal);
        state.evaluate(dec!(-10000), dec!(10000), dec!(0.01), dec!(0), dec!(1), 0, 10, false);
        assert_eq!(state.reason(), Some(PauseReason::ExternalVolatilitySignal));
    }

    #[test]
    fn resume_clears_the_pause() {
        let state = AutoPauseState::new();
        state.pause(PauseReason::MaxDrawdownBreached);
        state.resume();
        assert!(!state.is_paused());
    }

    #[test]
    fn consecutive_losses_trigger_a_pause() {
        let state = AutoPauseState::new();
        state.evaluate(dec!(0), dec!(10000), dec!(0.05), dec!(0), dec!(1), 5, 5, false);
        assert_eq!(state.reason(), Some(PauseReason::ConsecutiveLossesBreached { count: 5 }));
    }
}
