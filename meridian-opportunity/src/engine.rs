use crate::error::OpportunityEngineError;
use chrono::{DateTime, Utc};
use meridian_core::config::UserConfiguration;
use meridian_core::ids::{OpportunityId, UserId};
use meridian_core::opportunity::{Opportunity, OpportunityStatus};
use meridian_core::trade::TradeMode;
use meridian_persistence::PersistencePort;
use meridian_risk::RealSlotCounter;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};

/// What the engine decided should happen to an [`Opportunity`] whose AI
/// verdict is in hand (`spec.md` §4.5). A pure decision: it claims
/// resources (e.g. a real-mode slot) where the decision depends on doing
/// so, but it never mutates the `Opportunity`'s persisted status itself —
/// the caller applies the corresponding transition once it has carried out
/// whatever side effect the decision implies (creating a paper Trade,
/// surfacing a confirmation prompt, etc.), via [`OpportunityEngine::transition`].
#[derive(Debug, Clone, PartialEq)]
pub enum RoutingDecision {
    /// Paper mode, confidence at or above the paper threshold: convert
    /// immediately with no human in the loop.
    AutoConvertToPaper,
    /// Real mode, confidence at or above the real threshold, and a slot was
    /// claimed: surface the confirmation prompt.
    RequireRealConfirmation,
    /// Real mode, confidence sufficient, but every real-mode slot is
    /// claimed. Spec.md §4.5 leaves the fallback (route to paper, or
    /// reject) to user preference; this engine only reports the fact.
    RealSlotsExhausted,
    /// Confidence fell short of the mode's threshold.
    BelowConfidenceThreshold,
}

/// Drives the [`Opportunity`] state machine from detection to a terminal
/// state (`spec.md` §4.5), generalizing the teacher's event-driven
/// `EngineState`/`Processor` shape in spirit: all mutation flows through
/// persisted compare-and-swap, never a bare read-modify-write.
pub struct OpportunityEngine {
    persistence: Arc<dyn PersistencePort>,
    real_slots: Arc<RealSlotCounter>,
    /// Opportunities are reset out of `under_ai_analysis` if stuck there
    /// longer than this after a crash (`spec.md` §9 durable fence note).
    pub stuck_analysis_grace_period: Duration,
}

impl OpportunityEngine {
    pub fn new(persistence: Arc<dyn PersistencePort>, real_slots: Arc<RealSlotCounter>) -> Self {
        Self {
            persistence,
            real_slots,
            stuck_analysis_grace_period: Duration::from_secs(300),
        }
    }

    /// Apply a validated, CAS-backed status transition. A replayed
    /// transition (the stored status already matches) is a no-op success.
    #[instrument(skip(self))]
    pub async fn transition(
        &self,
        opportunity_id: OpportunityId,
        next: OpportunityStatus,
    ) -> Result<Opportunity, OpportunityEngineError> {
        let mut opportunity = self.persistence.get_opportunity(opportunity_id).await?;
        let prior_status = opportunity.status;
        opportunity
            .transition(next)
            .map_err(OpportunityEngineError::InvalidTransition)?;
        let stored = self
            .persistence
            .compare_and_swap_opportunity(opportunity, prior_status)
            .await?;
        Ok(stored)
    }

    /// Link a freshly created Trade and advance the Opportunity to its
    /// converted terminal state. Called by the Execution & Risk Engine
    /// (C6) once `execute_paper`/`confirm` has actually produced a Trade —
    /// the conversion is only durable once both records agree.
    #[instrument(skip(self))]
    pub async fn record_conversion(
        &self,
        opportunity_id: OpportunityId,
        trade_id: meridian_core::ids::TradeId,
        mode: TradeMode,
    ) -> Result<Opportunity, OpportunityEngineError> {
        let mut opportunity = self.persistence.get_opportunity(opportunity_id).await?;
        let prior_status = opportunity.status;
        let next = match mode {
            TradeMode::Paper => OpportunityStatus::ConvertedToTradePaper,
            TradeMode::Real => OpportunityStatus::ConvertedToTradeReal,
        };
        opportunity
            .transition(next)
            .map_err(OpportunityEngineError::InvalidTransition)?;
        opportunity.link_trade(trade_id);
        let stored = self
            .persistence
            .compare_and_swap_opportunity(opportunity, prior_status)
            .await?;
        Ok(stored)
    }

    /// Decide what should happen to an `analysis_complete` Opportunity
    /// given the user's confidence thresholds (`spec.md` §4.5). Claims a
    /// real-mode slot as a side effect of `RequireRealConfirmation` so two
    /// concurrent callers can never both proceed on the same slot; callers
    /// that discard the decision without acting on it must release it back
    /// via the engine's `real_slots` counter themselves.
    #[instrument(skip(self, config))]
    pub fn decide_routing(
        &self,
        opportunity: &Opportunity,
        config: &UserConfiguration,
    ) -> Result<RoutingDecision, OpportunityEngineError> {
        let verdict = opportunity
            .verdict
            .as_ref()
            .ok_or(OpportunityEngineError::MissingVerdict)?;

        let threshold = config.confidence_threshold_for(opportunity.mode);
        if verdict.confidence < threshold {
            return Ok(RoutingDecision::BelowConfidenceThreshold);
        }

        match opportunity.mode {
            TradeMode::Paper => Ok(RoutingDecision::AutoConvertToPaper),
            TradeMode::Real => {
                if self.real_slots.try_claim() {
                    Ok(RoutingDecision::RequireRealConfirmation)
                } else {
                    warn!(opportunity_id = %opportunity.id, "real-mode slots exhausted");
                    Ok(RoutingDecision::RealSlotsExhausted)
                }
            }
        }
    }

    /// Manual dismiss (`spec.md` §4.5 `rejected_by_user`).
    pub async fn reject_manually(
        &self,
        opportunity_id: OpportunityId,
    ) -> Result<Opportunity, OpportunityEngineError> {
        self.transition(opportunity_id, OpportunityStatus::RejectedByUser).await
    }

    /// The sole backward edge: an operator reopening an Opportunity stuck
    /// in `error_in_processing` (`spec.md` §4.5).
    pub async fn reopen_after_error(
        &self,
        opportunity_id: OpportunityId,
    ) -> Result<Opportunity, OpportunityEngineError> {
        self.transition(opportunity_id, OpportunityStatus::PendingAiAnalysis).await
    }

    /// Advance every expired, non-terminal Opportunity to `expired` exactly
    /// once. Returns the number advanced. A replayed sweep over the same
    /// opportunity is a no-op because `transition` is CAS-backed: once one
    /// sweep wins, a second sees the terminal status and skips it.
    #[instrument(skip(self))]
    pub async fn run_expiry_sweep_once(&self, now: DateTime<Utc>) -> Result<usize, OpportunityEngineError> {
        let open = self.persistence.list_open_opportunities().await?;
        let mut advanced = 0;
        for opportunity in open {
            if opportunity.is_expired(now) {
                match self.transition(opportunity.id, OpportunityStatus::Expired).await {
                    Ok(_) => advanced += 1,
                    Err(OpportunityEngineError::Persistence(
                        meridian_persistence::PersistenceError::Conflict,
                    )) => {
                        // Another sweep or transition already moved it; fine.
                    }
                    Err(err) => return Err(err),
                }
            }
        }
        if advanced > 0 {
            info!(advanced, "expiry sweep advanced opportunities");
        }
        Ok(advanced)
    }

    /// Reset on startup any Opportunity stuck in `under_ai_analysis` past
    /// the grace period back to `pending_ai_analysis`, since the durable
    /// fence can otherwise wedge it forever after a crash mid-analysis
    /// (`spec.md` §9).
    #[instrument(skip(self))]
    pub async fn recover_stuck_analyses(&self, now: DateTime<Utc>) -> Result<usize, OpportunityEngineError> {
        let open = self.persistence.list_open_opportunities().await?;
        let mut recovered = 0;
        let grace = chrono::Duration::from_std(self.stuck_analysis_grace_period)
            .unwrap_or_else(|_| chrono::Duration::seconds(300));
        for opportunity in open {
            if opportunity.status == OpportunityStatus::UnderAiAnalysis
                && now - opportunity.detected_at > grace
            {
                // Force through `error_in_processing` first since there is
                // no direct `under_ai_analysis -> pending_ai_analysis` edge.
                let prior_status = opportunity.status;
                let mut reset = opportunity;
                reset
                    .transition(OpportunityStatus::ErrorInProcessing)
                    .map_err(OpportunityEngineError::InvalidTransition)?;
                reset.error_reason = Some("stuck in under_ai_analysis past grace period".into());
                let reset = self
                    .persistence
                    .compare_and_swap_opportunity(reset, prior_status)
                    .await?;
                self.reopen_after_error(reset.id).await?;
                recovered += 1;
            }
        }
        Ok(recovered)
    }

    /// Spawn the periodic expiry sweep task (`spec.md` §4.5). The returned
    /// handle is aborted on drop if the caller doesn't otherwise retain it.
    pub fn spawn_expiry_sweep(self: Arc<Self>, interval: Duration) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                if let Err(err) = self.run_expiry_sweep_once(Utc::now()).await {
                    warn!(?err, "expiry sweep iteration failed");
                }
            }
        })
    }
}

/// Resolve the user whose configuration should gate a given Opportunity.
/// v1 is single-tenant (`spec.md` §3's data model carries no per-Opportunity
/// owner); call sites pass the operator's `UserId` explicitly rather than
/// this crate inventing a lookup.
pub async fn load_routing_config(
    persistence: &dyn PersistencePort,
    user_id: UserId,
) -> Result<UserConfiguration, OpportunityEngineError> {
    Ok(persistence.get_config(user_id).await?)
}
