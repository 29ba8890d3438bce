use crate::ids::UserId;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Per-mode minimum AI confidence required before an [`Opportunity`]
/// (`crate::opportunity::Opportunity`) may be converted into a
/// [`Trade`](crate::trade::Trade) (`spec.md` §3). Kept separate so an
/// operator can run paper trading permissively while gating real trading
/// much tighter.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct ConfidenceThresholds {
    pub paper: Decimal,
    pub real: Decimal,
}

/// Bounds the Execution & Risk Engine (C6) enforces on every proposed
/// trade, independent of what the AI Orchestrator recommends (`spec.md`
/// §4.6).
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct RiskProfileSettings {
    pub max_position_risk_pct: Decimal,
    pub max_concurrent_trades: u32,
    pub max_daily_loss_pct: Decimal,
    /// Ceiling on total executed-position risk opened "today", checked
    /// against `account_equity` (`spec.md` §4.6 position-sizing step 5).
    /// Distinct from `max_daily_loss_pct`, which gates the auto-pause
    /// trigger off *realised* P&L rather than risk committed at entry.
    pub daily_capital_risk_pct: Decimal,
    pub max_consecutive_losses: u32,
    pub default_trailing_stop_ratio: Option<Decimal>,
}

/// Guardrails that apply only when `TradeMode::Real` is in play (`spec.md`
/// §4.6, §9). `requires_explicit_confirmation` gates the
/// `pending_user_confirmation_real` step in the opportunity state machine.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct RealTradingSettings {
    pub enabled: bool,
    pub requires_explicit_confirmation: bool,
    pub max_real_notional_per_trade: Decimal,
}

/// A user's full operating configuration (`spec.md` §3). Mutated only
/// through compare-and-swap against `version` at the persistence boundary
/// (`meridian-persistence::PersistencePort::compare_and_swap_config`) so
/// concurrent edits from, say, the UI and an automated policy change never
/// silently clobber each other.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct UserConfiguration {
    pub user_id: UserId,
    pub version: u64,
    pub confidence_thresholds: ConfidenceThresholds,
    pub risk_profile: RiskProfileSettings,
    pub real_trading: RealTradingSettings,
    pub active_strategy_ids: Vec<crate::ids::StrategyConfigId>,
    pub updated_at: DateTime<Utc>,
}

impl UserConfiguration {
    /// A conservative starting configuration: real trading disabled,
    /// generous paper threshold, strict real threshold once enabled.
    pub fn default_for(user_id: UserId, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            version: 0,
            confidence_thresholds: ConfidenceThresholds {
                paper: Decimal::new(80, 2),
                real: Decimal::new(95, 2),
            },
            risk_profile: RiskProfileSettings {
                max_position_risk_pct: Decimal::new(1, 2),
                max_concurrent_trades: 5,
                max_daily_loss_pct: Decimal::new(3, 2),
                daily_capital_risk_pct: Decimal::new(5, 2),
                max_consecutive_losses: 5,
                default_trailing_stop_ratio: Some(Decimal::new(2, 2)),
            },
            real_trading: RealTradingSettings {
                enabled: false,
                requires_explicit_confirmation: true,
                max_real_notional_per_trade: Decimal::new(0, 0),
            },
            active_strategy_ids: Vec::new(),
            updated_at: now,
        }
    }

    /// The confidence bar for the given mode (`spec.md` §3).
    pub fn confidence_threshold_for(&self, mode: crate::trade::TradeMode) -> Decimal {
        match mode {
            crate::trade::TradeMode::Paper => self.confidence_thresholds.paper,
            crate::trade::TradeMode::Real => self.confidence_thresholds.real,
        }
    }

    /// Bump `version` and `updated_at` after a successful compare-and-swap
    /// write. Callers never set `version` directly.
    pub fn bump_version(&mut self, now: DateTime<Utc>) {
        self.version += 1;
        self.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trade::TradeMode;

    #[test]
    fn default_config_disables_real_trading() {
        let config = UserConfiguration::default_for(UserId::random(), Utc::now());
        assert!(!config.real_trading.enabled);
        assert!(config.real_trading.requires_explicit_confirmation);
    }

    #[test]
    fn real_threshold_is_stricter_than_paper() {
        let config = UserConfiguration::default_for(UserId::random(), Utc::now());
        assert!(
            config.confidence_threshold_for(TradeMode::Real)
                > config.confidence_threshold_for(TradeMode::Paper)
        );
    }

    #[test]
    fn bumping_version_advances_monotonically() {
        let mut config = UserConfiguration::default_for(UserId::random(), Utc::now());
        let before = config.version;
        config.bump_version(Utc::now());
        assert_eq!(config.version, before + 1);
    }
}
