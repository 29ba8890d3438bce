use crate::ids::StrategyConfigId;
use derive_more::Display;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize, Serialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum BaseStrategyType {
    TrendFollowing,
    MeanReversion,
    Breakout,
    AiDiscretionary,
}

/// The knobs an [`Opportunity`] analysis hands to the AI Orchestrator
/// (`spec.md` §4.4 step 1): a prompt template, per-indicator weights the
/// template may interpolate, confidence-threshold overrides, and a context
/// budget. Absent entirely for non-AI strategies.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct AiAnalysisProfile {
    pub prompt_template: String,
    pub indicator_weights: BTreeMap<String, Decimal>,
    pub paper_confidence_threshold: Option<Decimal>,
    pub real_confidence_threshold: Option<Decimal>,
    pub max_context_tokens: u32,
}

/// A user-authored strategy profile applied when an [`Opportunity`] is
/// generated for a given symbol (`spec.md` §3). `params` holds the
/// strategy-specific knobs (e.g. lookback window) as opaque JSON since
/// strategies are data, not code, in this platform.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TradingStrategyConfig {
    pub id: StrategyConfigId,
    pub name: String,
    pub base_type: BaseStrategyType,
    pub symbols: Vec<String>,
    pub enabled: bool,
    pub min_confidence_to_trade: Decimal,
    pub default_stop_loss_ratio: Option<Decimal>,
    pub default_take_profit_ratio: Option<Decimal>,
    pub trailing_stop_ratio: Option<Decimal>,
    pub params: serde_json::Value,
    pub ai_profile: Option<AiAnalysisProfile>,
}

impl TradingStrategyConfig {
    pub fn applies_to(&self, symbol: &str) -> bool {
        self.enabled && self.symbols.iter().any(|s| s == symbol)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strategy() -> TradingStrategyConfig {
        TradingStrategyConfig {
            id: StrategyConfigId::random(),
            name: "trend-1h".into(),
            base_type: BaseStrategyType::TrendFollowing,
            symbols: vec!["BTCUSDT".into()],
            enabled: true,
            min_confidence_to_trade: Decimal::new(70, 2),
            default_stop_loss_ratio: None,
            default_take_profit_ratio: None,
            trailing_stop_ratio: None,
            params: serde_json::json!({}),
            ai_profile: None,
        }
    }

    #[test]
    fn disabled_strategy_applies_to_nothing() {
        let mut strategy = strategy();
        strategy.enabled = false;
        assert!(!strategy.applies_to("BTCUSDT"));
    }

    #[test]
    fn matches_only_configured_symbols() {
        let strategy = strategy();
        assert!(strategy.applies_to("BTCUSDT"));
        assert!(!strategy.applies_to("ETHUSDT"));
    }
}
