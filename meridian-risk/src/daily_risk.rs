use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rust_decimal::Decimal;

/// Tracks the sum of executed-position risk for trades opened "today" and
/// gates new risk against `dailyCapitalRiskPercentage × account_equity`
/// (`spec.md` §4.6 position-sizing step 5). The ledger resets itself the
/// first time a call observes a new UTC calendar day, mirroring how the
/// teacher's `DrawdownTracker` keys state per instrument rather than
/// running an explicit scheduled reset task.
#[derive(Debug)]
pub struct DailyRiskLedger {
    state: Mutex<LedgerState>,
}

#[derive(Debug)]
struct LedgerState {
    day: chrono::NaiveDate,
    risk_spent: Decimal,
}

impl DailyRiskLedger {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            state: Mutex::new(LedgerState { day: now.date_naive(), risk_spent: Decimal::ZERO }),
        }
    }

    fn roll_if_new_day(&self, state: &mut LedgerState, now: DateTime<Utc>) {
        let today = now.date_naive();
        if today != state.day {
            state.day = today;
            state.risk_spent = Decimal::ZERO;
        }
    }

    /// Whether committing `additional_risk_quote` on top of what's already
    /// spent today would exceed `daily_cap_pct × account_equity`.
    pub fn would_exceed_ceiling(
        &self,
        now: DateTime<Utc>,
        additional_risk_quote: Decimal,
        account_equity: Decimal,
        daily_cap_pct: Decimal,
    ) -> bool {
        let mut state = self.state.lock();
        self.roll_if_new_day(&mut state, now);
        let ceiling = account_equity * daily_cap_pct;
        state.risk_spent + additional_risk_quote > ceiling
    }

    /// Commit `risk_quote` against today's ledger. Called once a trade
    /// whose risk was checked via `would_exceed_ceiling` is actually
    /// opened.
    pub fn commit(&self, now: DateTime<Utc>, risk_quote: Decimal) {
        let mut state = self.state.lock();
        self.roll_if_new_day(&mut state, now);
        state.risk_spent += risk_quote;
    }

    pub fn risk_spent_today(&self, now: DateTime<Utc>) -> Decimal {
        let mut state = self.state.lock();
        self.roll_if_new_day(&mut state, now);
        state.risk_spent
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn refuses_risk_that_would_breach_the_daily_ceiling() {
        let now = Utc::now();
        let ledger = DailyRiskLedger::new(now);
        ledger.commit(now, dec!(250));
        assert!(!ledger.would_exceed_ceiling(now, dec!(100), dec!(10000), dec!(0.03)));
        assert!(ledger.would_exceed_ceiling(now, dec!(100), dec!(1000), dec!(0.03)));
    }

    #[test]
    fn ledger_resets_on_a_new_calendar_day() {
        let day_one = Utc::now() - chrono::Duration::days(1);
        let ledger = DailyRiskLedger::new(day_one);
        ledger.commit(day_one, dec!(1000));
        let today = Utc::now();
        assert_eq!(ledger.risk_spent_today(today), Decimal::ZERO);
    }
}
