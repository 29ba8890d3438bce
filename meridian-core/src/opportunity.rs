use crate::ids::{OpportunityId, TradeId};
use crate::trade::TradeMode;
use chrono::{DateTime, Utc};
use derive_more::Display;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Where an [`Opportunity`] originated. The opaque source payload is
/// preserved verbatim alongside the variant for audit purposes.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub enum OpportunitySource {
    ExternalSignal { payload: serde_json::Value },
    InternalIndicator { payload: serde_json::Value },
    AiProactive { payload: serde_json::Value },
    Manual,
    UserAlert { payload: serde_json::Value },
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub enum DirectionHint {
    Buy,
    Sell,
}

/// The signal that gave rise to this [`Opportunity`], before any AI
/// analysis has run.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct InitialSignal {
    pub direction_hint: DirectionHint,
    pub target_entry: Option<Decimal>,
    pub target_stop: Option<Decimal>,
    pub target_take_profit: Option<Decimal>,
    pub timeframe: String,
    pub source_confidence: Option<Decimal>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize, Serialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum SuggestedAction {
    StrongBuy,
    Buy,
    FurtherInvestigationNeeded,
    Sell,
    StrongSell,
}

impl SuggestedAction {
    pub fn is_directional(&self) -> bool {
        matches!(
            self,
            SuggestedAction::Buy
                | SuggestedAction::StrongBuy
                | SuggestedAction::Sell
                | SuggestedAction::StrongSell
        )
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DataVerificationStatus {
    Verified,
    Mismatch,
    NotApplicable,
}

/// The AI Orchestrator's (C4) decision about an [`Opportunity`] (`spec.md`
/// §4.4).
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Verdict {
    pub confidence: Decimal,
    pub suggested_action: SuggestedAction,
    pub recommended_entry: Option<Decimal>,
    pub recommended_stop: Option<Decimal>,
    pub recommended_take_profit: Option<Decimal>,
    pub reasoning: String,
    pub warnings: Vec<String>,
    pub data_verification_status: DataVerificationStatus,
    pub processing_time_ms: u64,
    pub model_id: String,
}

/// The finite set of states an [`Opportunity`] can occupy (`spec.md` §4.5).
/// Terminal states can never transition further.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize, Serialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum OpportunityStatus {
    New,
    PendingAiAnalysis,
    UnderAiAnalysis,
    AnalysisComplete,
    RejectedByAi,
    PendingUserConfirmationReal,
    ConvertedToTradePaper,
    ConvertedToTradeReal,
    RejectedByUser,
    Expired,
    ErrorInProcessing,
}

impl OpportunityStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OpportunityStatus::RejectedByAi
                | OpportunityStatus::ConvertedToTradePaper
                | OpportunityStatus::ConvertedToTradeReal
                | OpportunityStatus::RejectedByUser
                | OpportunityStatus::Expired
                | OpportunityStatus::ErrorInProcessing
        )
    }

    /// Whether `self -> next` is a permitted edge in the `spec.md` §4.5
    /// state diagram. `error_in_processing` is reachable from any
    /// non-terminal state; its only outgoing edge is the manual reopen back
    /// to `pending_ai_analysis`.
    pub fn can_transition_to(&self, next: OpportunityStatus) -> bool {
        use OpportunityStatus::*;

        if *self == next {
            return false;
        }
        if !self.is_terminal() && next == ErrorInProcessing {
            return true;
        }
        match (self, next) {
            (New, PendingAiAnalysis) => true,
            (PendingAiAnalysis, UnderAiAnalysis) => true,
            (UnderAiAnalysis, AnalysisComplete) => true,
            (UnderAiAnalysis, RejectedByAi) => true,
            (AnalysisComplete, PendingUserConfirmationReal) => true,
            (AnalysisComplete, ConvertedToTradePaper) => true,
            (AnalysisComplete, RejectedByUser) => true,
            (AnalysisComplete, Expired) => true,
            (AnalysisComplete, RejectedByAi) => true,
            (PendingUserConfirmationReal, ConvertedToTradeReal) => true,
            (PendingUserConfirmationReal, RejectedByUser) => true,
            (PendingUserConfirmationReal, Expired) => true,
            (ErrorInProcessing, PendingAiAnalysis) => true,
            _ => false,
        }
    }
}

/// The central record of a potential trade (`spec.md` §3).
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Opportunity {
    pub id: OpportunityId,
    pub symbol: String,
    pub detected_at: DateTime<Utc>,
    pub source: OpportunitySource,
    pub initial_signal: InitialSignal,
    pub verdict: Option<Verdict>,
    pub status: OpportunityStatus,
    pub linked_trade_ids: Vec<TradeId>,
    pub expires_at: DateTime<Utc>,
    pub mode: TradeMode,
    pub error_reason: Option<String>,
}

impl Opportunity {
    pub fn new(
        symbol: impl Into<String>,
        detected_at: DateTime<Utc>,
        source: OpportunitySource,
        initial_signal: InitialSignal,
        expires_at: DateTime<Utc>,
        mode: TradeMode,
    ) -> Self {
        Self {
            id: OpportunityId::random(),
            symbol: symbol.into(),
            detected_at,
            source,
            initial_signal,
            verdict: None,
            status: OpportunityStatus::New,
            linked_trade_ids: Vec::new(),
            expires_at,
            mode,
            error_reason: None,
        }
    }

    /// Apply a validated status transition, enforcing the linked-trade and
    /// verdict invariants from `spec.md` §3.
    pub fn transition(&mut self, next: OpportunityStatus) -> Result<(), String> {
        if !self.status.can_transition_to(next) {
            return Err(format!("illegal transition {} -> {}", self.status, next));
        }
        self.status = next;
        Ok(())
    }

    pub fn link_trade(&mut self, trade_id: TradeId) {
        self.linked_trade_ids.push(trade_id);
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        !self.status.is_terminal() && now >= self.expires_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_opportunity() -> Opportunity {
        Opportunity::new(
            "BTCUSDT",
            Utc::now(),
            OpportunitySource::Manual,
            InitialSignal {
                direction_hint: DirectionHint::Buy,
                target_entry: Some(Decimal::new(30000, 0)),
                target_stop: Some(Decimal::new(29700, 0)),
                target_take_profit: None,
                timeframe: "1h".into(),
                source_confidence: None,
            },
            Utc::now(),
            TradeMode::Paper,
        )
    }

    #[test]
    fn valid_path_to_paper_conversion() {
        let mut opp = new_opportunity();
        assert!(opp.transition(OpportunityStatus::PendingAiAnalysis).is_ok());
        assert!(opp.transition(OpportunityStatus::UnderAiAnalysis).is_ok());
        assert!(opp.transition(OpportunityStatus::AnalysisComplete).is_ok());
        assert!(opp.transition(OpportunityStatus::ConvertedToTradePaper).is_ok());
        assert!(opp.status.is_terminal());
    }

    #[test]
    fn cannot_re_enter_under_ai_analysis_after_leaving() {
        let mut opp = new_opportunity();
        opp.transition(OpportunityStatus::PendingAiAnalysis).unwrap();
        opp.transition(OpportunityStatus::UnderAiAnalysis).unwrap();
        opp.transition(OpportunityStatus::AnalysisComplete).unwrap();
        assert!(
            !opp.status
                .can_transition_to(OpportunityStatus::UnderAiAnalysis)
        );
    }

    #[test]
    fn error_in_processing_reachable_from_any_non_terminal_state() {
        let mut opp = new_opportunity();
        assert!(opp.transition(OpportunityStatus::ErrorInProcessing).is_ok());
        assert!(opp.status.is_terminal());
    }

    #[test]
    fn only_backward_edge_is_error_to_pending_analysis() {
        let mut opp = new_opportunity();
        opp.transition(OpportunityStatus::ErrorInProcessing).unwrap();
        assert!(opp.transition(OpportunityStatus::PendingAiAnalysis).is_ok());
    }

    #[test]
    fn terminal_states_accept_no_further_transitions_except_error_reopen() {
        let mut opp = new_opportunity();
        opp.transition(OpportunityStatus::PendingAiAnalysis).unwrap();
        opp.transition(OpportunityStatus::UnderAiAnalysis).unwrap();
        opp.transition(OpportunityStatus::AnalysisComplete).unwrap();
        opp.transition(OpportunityStatus::RejectedByUser).unwrap();
        assert!(!opp.status.can_transition_to(OpportunityStatus::Expired));
    }
}
