use crate::client::{ExchangeClient, OrderRequest};
use crate::client_order_id::ClientOrderIdGenerator;
use crate::error::ExecutionError;
use crate::sizing::{size_position, SizedPosition, SizingInputs};
use chrono::{DateTime, Utc};
use meridian_core::ids::{OpportunityId, TradeId, UserId};
use meridian_core::notification::{NotificationEvent, PauseReasonSummary};
use meridian_core::opportunity::{OpportunityStatus, SuggestedAction};
use meridian_core::order::{TradeOrder, TradeOrderRole, TradeOrderStatus, TradeOrderType};
use meridian_core::snapshot::{PortfolioSnapshot, SnapshotSource};
use meridian_core::trade::{ClosingReason, PositionStatus, Trade, TradeMode, TradeSide};
use meridian_instrument::InstrumentSpec;
use meridian_integration::channel::{Tx, UnboundedTx};
use meridian_opportunity::OpportunityEngine;
use meridian_persistence::PersistencePort;
use meridian_risk::{AutoPauseState, ConcurrencyGate, DailyRiskLedger, DrawdownTracker, PauseReason, RealSlotCounter};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::Mutex as AsyncMutex;
use tracing::instrument;
use uuid::Uuid;

/// Thresholds the Execution & Risk Engine checks after every close, lifted
/// from the caller's `UserConfiguration::risk_profile` (`spec.md` §4.6
/// auto-pause).
#[derive(Debug, Clone, Copy)]
pub struct AutoPauseThresholds {
    pub daily_loss_limit_pct: Decimal,
    pub max_drawdown_pct: Decimal,
    pub max_consecutive_losses: u32,
}

fn summarize_pause_reason(reason: PauseReason) -> PauseReasonSummary {
    match reason {
        PauseReason::DailyLossLimitBreached => PauseReasonSummary::DailyLossLimitBreached,
        PauseReason::MaxDrawdownBreached => PauseReasonSummary::MaxDrawdownBreached,
        PauseReason::ConsecutiveLossesBreached { count } => PauseReasonSummary::ConsecutiveLossesBreached { count },
        PauseReason::ExternalVolatilitySignal => PauseReasonSummary::ExternalVolatilitySignal,
    }
}

/// What the account's risk profile permits for the next sizing attempt
/// (`spec.md` §4.6 steps 1-2: per-strategy override if present, else the
/// user's risk profile, else a conservative default — resolved by the
/// caller since it depends on the `UserConfiguration`/strategy lookup this
/// crate has no business performing itself).
#[derive(Debug, Clone, Copy)]
pub struct SizingPolicy {
    pub per_trade_risk_pct: Decimal,
    pub daily_capital_risk_pct: Decimal,
    pub max_concurrent_operations: u32,
}

/// A sized, not-yet-submitted entry ready for confirmation (`spec.md`
/// §4.6). Real-mode proposals must be confirmed via [`ExecutionEngine::confirm`]
/// before any order reaches the exchange; paper-mode proposals are normally
/// routed straight to [`ExecutionEngine::execute_paper`] instead.
#[derive(Debug, Clone)]
pub struct TradeProposal {
    pub nonce: Uuid,
    pub opportunity_id: OpportunityId,
    pub symbol: String,
    pub side: TradeSide,
    pub mode: TradeMode,
    pub sized: SizedPosition,
    pub trailing_stop_ratio: Option<Decimal>,
    pub take_profit: Option<Decimal>,
    pub created_at: DateTime<Utc>,
}

fn side_for(action: SuggestedAction) -> Result<TradeSide, ExecutionError> {
    match action {
        SuggestedAction::Buy | SuggestedAction::StrongBuy => Ok(TradeSide::Long),
        SuggestedAction::Sell | SuggestedAction::StrongSell => Ok(TradeSide::Short),
        SuggestedAction::FurtherInvestigationNeeded => Err(ExecutionError::SizingRefused(
            "verdict carries no directional suggestion".into(),
        )),
    }
}

/// Drives a Trade from a sized proposal through submission, order-event
/// reconciliation, trailing-stop ratcheting, and closing (`spec.md` §4.6),
/// generalizing the teacher's `ExecutionClient`-driven order lifecycle to
/// the paper/real duality this platform requires.
pub struct ExecutionEngine<C> {
    persistence: Arc<dyn PersistencePort>,
    opportunities: Arc<OpportunityEngine>,
    exchange: Arc<C>,
    paper_exchange: crate::client::PaperExchangeClient,
    daily_risk: Arc<DailyRiskLedger>,
    concurrency_gate: Arc<ConcurrencyGate>,
    real_slots: Arc<RealSlotCounter>,
    total_real_slots: u32,
    auto_pause: Arc<AutoPauseState>,
    auto_pause_thresholds: AutoPauseThresholds,
    notifications: UnboundedTx<NotificationEvent>,
    user_id: UserId,
    client_order_ids: ClientOrderIdGenerator,
    proposals: parking_lot::Mutex<HashMap<Uuid, TradeProposal>>,
    real_confirm_lock: AsyncMutex<()>,
    trade_locks: parking_lot::Mutex<HashMap<TradeId, Arc<AsyncMutex<()>>>>,
    realized_pnl_today: parking_lot::Mutex<(chrono::NaiveDate, Decimal)>,
    consecutive_losses: parking_lot::Mutex<u32>,
    drawdown: parking_lot::Mutex<DrawdownTracker<String>>,
}

const DRAWDOWN_KEY: &str = "account";

impl<C: ExchangeClient> ExecutionEngine<C> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        persistence: Arc<dyn PersistencePort>,
        opportunities: Arc<OpportunityEngine>,
        exchange: Arc<C>,
        daily_risk: Arc<DailyRiskLedger>,
        concurrency_gate: Arc<ConcurrencyGate>,
        real_slots: Arc<RealSlotCounter>,
        total_real_slots: u32,
        auto_pause: Arc<AutoPauseState>,
        auto_pause_thresholds: AutoPauseThresholds,
        notifications: UnboundedTx<NotificationEvent>,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            persistence,
            opportunities,
            exchange,
            paper_exchange: crate::client::PaperExchangeClient::new(Decimal::ZERO),
            daily_risk,
            concurrency_gate,
            real_slots,
            total_real_slots,
            auto_pause,
            auto_pause_thresholds,
            notifications,
            user_id,
            client_order_ids: ClientOrderIdGenerator::new(),
            proposals: parking_lot::Mutex::new(HashMap::new()),
            real_confirm_lock: AsyncMutex::new(()),
            trade_locks: parking_lot::Mutex::new(HashMap::new()),
            realized_pnl_today: parking_lot::Mutex::new((now.date_naive(), Decimal::ZERO)),
            consecutive_losses: parking_lot::Mutex::new(0),
            drawdown: parking_lot::Mutex::new(DrawdownTracker::new()),
        }
    }

    fn lock_for(&self, trade_id: TradeId) -> Arc<AsyncMutex<()>> {
        self.trade_locks
            .lock()
            .entry(trade_id)
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }

    /// Size an `analysis_complete`/`pending_user_confirmation_real`
    /// Opportunity into a proposal (`spec.md` §4.6 steps 1-7). Claims a
    /// concurrency-gate slot on success; the caller must act on the
    /// returned nonce (via [`Self::confirm`] or [`Self::execute_paper`])
    /// or release the gate itself if it abandons the proposal.
    #[instrument(skip(self, policy))]
    pub async fn propose(
        &self,
        opportunity_id: OpportunityId,
        live_cash_balance: Decimal,
        instrument_spec: &InstrumentSpec,
        policy: SizingPolicy,
        now: DateTime<Utc>,
    ) -> Result<TradeProposal, ExecutionError> {
        let account_equity = self
            .persistence
            .latest_snapshot(self.user_id)
            .await?
            .map(|snapshot| snapshot.total_equity)
            .unwrap_or(Decimal::ZERO)
            + live_cash_balance;

        let opportunity = self.persistence.get_opportunity(opportunity_id).await?;
        let verdict = opportunity
            .verdict
            .as_ref()
            .ok_or_else(|| ExecutionError::SizingRefused("opportunity has no verdict".into()))?;
        let side = side_for(verdict.suggested_action)?;
        let entry_price = verdict
            .recommended_entry
            .ok_or_else(|| ExecutionError::SizingRefused("verdict has no recommended entry".into()))?;
        let stop_loss_price = verdict
            .recommended_stop
            .ok_or_else(|| ExecutionError::SizingRefused("verdict has no recommended stop".into()))?;

        let sized = size_position(
            SizingInputs {
                account_equity,
                per_trade_risk_pct: policy.per_trade_risk_pct,
                daily_capital_risk_pct: policy.daily_capital_risk_pct,
                max_concurrent_operations: policy.max_concurrent_operations,
                entry_price,
                stop_loss_price,
                side,
            },
            instrument_spec,
            &self.daily_risk,
            &self.concurrency_gate,
            now,
        )?;

        if opportunity.mode == TradeMode::Real
            && opportunity.status == OpportunityStatus::AnalysisComplete
        {
            self.opportunities
                .transition(opportunity_id, OpportunityStatus::PendingUserConfirmationReal)
                .await?;
        }

        let proposal = TradeProposal {
            nonce: Uuid::new_v4(),
            opportunity_id,
            symbol: opportunity.symbol.clone(),
            side,
            mode: opportunity.mode,
            sized,
            trailing_stop_ratio: None,
            take_profit: verdict.recommended_take_profit,
            created_at: now,
        };
        self.proposals.lock().insert(proposal.nonce, proposal.clone());
        Ok(proposal)
    }

    /// Confirm a real-mode proposal, submitting its entry order
    /// (`spec.md` §4.6). Serialized across the whole engine — real
    /// submissions are rare and correctness matters far more than
    /// throughput here. Any failure after the proposal is taken rolls back
    /// the concurrency-gate reservation made during `propose`.
    #[instrument(skip(self))]
    pub async fn confirm(&self, nonce: Uuid, trailing_stop_ratio: Option<Decimal>) -> Result<Trade, ExecutionError> {
        let _guard = self.real_confirm_lock.lock().await;

        let proposal = self
            .proposals
            .lock()
            .remove(&nonce)
            .ok_or(ExecutionError::UnknownNonce)?;

        if proposal.mode != TradeMode::Real {
            self.concurrency_gate.release();
            return Err(ExecutionError::InvalidTransition(
                "confirm is only valid for real-mode proposals".into(),
            ));
        }

        if self.auto_pause.is_paused() {
            self.concurrency_gate.release();
            let reason = self.auto_pause.reason().expect("is_paused implies reason is set");
            return Err(ExecutionError::TradingPaused(reason));
        }

        let exchange = self.exchange.clone();
        match self
            .submit_entry_via(exchange.as_ref(), &proposal, trailing_stop_ratio)
            .await
        {
            Ok(trade) => Ok(trade),
            Err(err) => {
                self.concurrency_gate.release();
                self.real_slots.release(self.total_real_slots);
                Err(err)
            }
        }
    }

    /// Execute a paper-mode proposal immediately against the paper
    /// simulator (`spec.md` §4.6). No confirmation nonce is required —
    /// paper mode has no human in the loop.
    #[instrument(skip(self))]
    pub async fn execute_paper(&self, nonce: Uuid) -> Result<Trade, ExecutionError> {
        let proposal = self
            .proposals
            .lock()
            .remove(&nonce)
            .ok_or(ExecutionError::UnknownNonce)?;

        if proposal.mode != TradeMode::Paper {
            self.concurrency_gate.release();
            return Err(ExecutionError::InvalidTransition(
                "execute_paper is only valid for paper-mode proposals".into(),
            ));
        }

        match self
            .submit_entry_via(&self.paper_exchange, &proposal, None)
            .await
        {
            Ok(trade) => Ok(trade),
            Err(err) => {
                self.concurrency_gate.release();
                Err(err)
            }
        }
    }

    async fn submit_entry_via(
        &self,
        exchange: &(impl ExchangeClient + ?Sized),
        proposal: &TradeProposal,
        trailing_stop_ratio: Option<Decimal>,
    ) -> Result<Trade, ExecutionError> {
        let mut trade = Trade::new(
            proposal.opportunity_id,
            proposal.symbol.clone(),
            proposal.mode,
            proposal.side,
            proposal.sized.quantity,
            Some(proposal.sized.stop_loss_price),
            proposal.take_profit,
            trailing_stop_ratio,
        );

        let client_order_id = self.client_order_ids.next(proposal.opportunity_id);
        let mut order = TradeOrder::new(
            trade.id,
            client_order_id.clone(),
            proposal.symbol.clone(),
            proposal.side,
            TradeOrderType::Market,
            TradeOrderRole::Entry,
            proposal.sized.quantity,
            None,
            proposal.created_at,
        );

        let request = OrderRequest {
            client_order_id,
            symbol: proposal.symbol.clone(),
            side: proposal.side,
            order_type: TradeOrderType::Market,
            quantity: proposal.sized.quantity,
            limit_price: None,
        };

        match exchange.submit_order(request).await {
            Ok(ack) => {
                order.exchange_order_id = Some(ack.exchange_order_id);
                order
                    .transition(TradeOrderStatus::Submitted, ack.accepted_at)
                    .map_err(ExecutionError::InvalidTransition)?;
                trade.entry_order_id = Some(order.id);
                trade
                    .transition(PositionStatus::Opening)
                    .map_err(ExecutionError::InvalidTransition)?;

                self.persistence.put_order(order).await?;
                self.persistence.put_trade(trade.clone()).await?;
                self.daily_risk.commit(proposal.created_at, proposal.sized.risk_budget_quote);

                self.opportunities
                    .record_conversion(proposal.opportunity_id, trade.id, proposal.mode)
                    .await?;

                Ok(trade)
            }
            Err(reason) => {
                order.rejection_reason = Some(reason.clone());
                let _ = order.transition(TradeOrderStatus::Rejected, proposal.created_at);
                trade.entry_order_id = Some(order.id);
                let _ = trade.fail();

                self.persistence.put_order(order.clone()).await?;
                self.persistence.put_trade(trade.clone()).await?;
                let _ = self.notifications.send(NotificationEvent::OrderRejected {
                    trade_id: trade.id,
                    order_id: order.id,
                    reason: reason.clone(),
                    at: proposal.created_at,
                });

                Err(ExecutionError::ExchangeRejected(reason))
            }
        }
    }

    /// Apply a fill/cancel/reject report from the exchange (or the paper
    /// simulator) to the owning order and Trade (`spec.md` §4.6), serialized
    /// per-trade so concurrent reports for the same Trade can't interleave.
    #[instrument(skip(self))]
    pub async fn on_order_event(
        &self,
        trade_id: TradeId,
        mut order: TradeOrder,
        next_status: TradeOrderStatus,
        filled_quantity: Decimal,
        average_fill_price: Option<Decimal>,
        now: DateTime<Utc>,
    ) -> Result<Trade, ExecutionError> {
        let lock = self.lock_for(trade_id);
        let _guard = lock.lock().await;

        let previously_filled = order.filled_quantity;
        order.filled_quantity = filled_quantity;
        order.average_fill_price = average_fill_price.or(order.average_fill_price);
        order
            .transition(next_status, now)
            .map_err(ExecutionError::InvalidTransition)?;
        self.persistence.put_order(order.clone()).await?;

        let mut trade = self.persistence.get_trade(trade_id).await?;
        match order.role {
            TradeOrderRole::Entry => {
                trade.record_entry_fill(order.filled_quantity);
                if order.is_fully_filled() && trade.status == PositionStatus::Opening {
                    trade
                        .transition(PositionStatus::Open)
                        .map_err(ExecutionError::InvalidTransition)?;
                    trade.entry_price = order.average_fill_price.or(trade.entry_price);
                    trade.opened_at = Some(now);
                }
            }
            _ => {
                let delta = (order.filled_quantity - previously_filled).max(Decimal::ZERO);
                if delta > Decimal::ZERO {
                    trade.record_exit_fill(delta).map_err(ExecutionError::InvalidTransition)?;
                }
            }
        }
        self.persistence.put_trade(trade.clone()).await?;
        Ok(trade)
    }

    /// Ratchet the trailing stop against the latest mark price, persist the
    /// move if any, and submit a market-out exit order once price crosses
    /// the ratcheted stop (`spec.md` §3 trailing-stop invariant: the stop
    /// only tightens, and crossing it closes the position).
    #[instrument(skip(self))]
    pub async fn update_trailing_stop(
        &self,
        trade_id: TradeId,
        current_price: Decimal,
        now: DateTime<Utc>,
    ) -> Result<Option<Decimal>, ExecutionError> {
        let lock = self.lock_for(trade_id);
        let _guard = lock.lock().await;

        let mut trade = self.persistence.get_trade(trade_id).await?;
        let moved = trade.update_trailing_stop(current_price);
        if moved.is_some() {
            self.persistence.put_trade(trade.clone()).await?;
        }

        let crossed = match (trade.side, trade.stop_loss) {
            (TradeSide::Long, Some(stop)) => current_price <= stop,
            (TradeSide::Short, Some(stop)) => current_price >= stop,
            (_, None) => false,
        };

        let already_exiting = !trade.exit_order_ids.is_empty();
        if crossed
            && trade.trailing_stop_ratio.is_some()
            && matches!(trade.status, PositionStatus::Open | PositionStatus::PartiallyClosed)
            && !already_exiting
        {
            let remaining = (trade.entry_filled_quantity - trade.exit_filled_quantity).max(Decimal::ZERO);
            if remaining > Decimal::ZERO {
                match trade.mode {
                    TradeMode::Real => {
                        let exchange = self.exchange.clone();
                        self.submit_exit_via(exchange.as_ref(), &mut trade, remaining, TradeOrderRole::ExitTrailingStop, now)
                            .await?;
                    }
                    TradeMode::Paper => {
                        self.submit_exit_via(&self.paper_exchange, &mut trade, remaining, TradeOrderRole::ExitTrailingStop, now)
                            .await?;
                    }
                }
                let _ = self.notifications.send(NotificationEvent::TrailingStopTriggered {
                    trade_id,
                    trigger_price: current_price,
                    at: now,
                });
            }
        }

        Ok(moved)
    }

    /// Submit a market order that reduces (rather than opens) `trade`,
    /// recording it among the trade's exit orders and nudging the position
    /// toward `closing` (`spec.md` §3).
    async fn submit_exit_via(
        &self,
        exchange: &(impl ExchangeClient + ?Sized),
        trade: &mut Trade,
        quantity: Decimal,
        role: TradeOrderRole,
        now: DateTime<Utc>,
    ) -> Result<(), ExecutionError> {
        let exit_side = match trade.side {
            TradeSide::Long => TradeSide::Short,
            TradeSide::Short => TradeSide::Long,
        };
        let client_order_id = self.client_order_ids.next(trade.opportunity_id);
        let mut order = TradeOrder::new(
            trade.id,
            client_order_id.clone(),
            trade.symbol.clone(),
            exit_side,
            TradeOrderType::Market,
            role,
            quantity,
            None,
            now,
        );

        let request = OrderRequest {
            client_order_id,
            symbol: trade.symbol.clone(),
            side: exit_side,
            order_type: TradeOrderType::Market,
            quantity,
            limit_price: None,
        };

        let ack = exchange
            .submit_order(request)
            .await
            .map_err(ExecutionError::ExchangeRejected)?;
        order.exchange_order_id = Some(ack.exchange_order_id);
        order
            .transition(TradeOrderStatus::Submitted, ack.accepted_at)
            .map_err(ExecutionError::InvalidTransition)?;
        trade.exit_order_ids.push(order.id);
        if matches!(trade.status, PositionStatus::Open | PositionStatus::PartiallyClosed) {
            trade
                .transition(PositionStatus::Closing)
                .map_err(ExecutionError::InvalidTransition)?;
        }

        self.persistence.put_order(order).await?;
        self.persistence.put_trade(trade.clone()).await?;
        Ok(())
    }

    /// Close a Trade, release the concurrency-gate and (for real mode) the
    /// real-slot it was holding, and re-evaluate the auto-pause state
    /// against the account's post-close figures (`spec.md` §4.6: "evaluated
    /// after every Trade close").
    #[instrument(skip(self))]
    pub async fn close(
        &self,
        trade_id: TradeId,
        closed_at: DateTime<Utc>,
        realized_pnl: Decimal,
        reason: ClosingReason,
    ) -> Result<Trade, ExecutionError> {
        let mut trade = self.persistence.get_trade(trade_id).await?;
        trade
            .close(closed_at, realized_pnl, reason)
            .map_err(ExecutionError::InvalidTransition)?;
        self.persistence.put_trade(trade.clone()).await?;

        self.concurrency_gate.release();
        if trade.mode == TradeMode::Real {
            self.real_slots.release(self.total_real_slots);
        }

        let _ = self.notifications.send(NotificationEvent::TradeClosed {
            trade_id: trade.id,
            opportunity_id: trade.opportunity_id,
            realized_pnl,
            at: closed_at,
        });

        self.evaluate_auto_pause(realized_pnl, closed_at).await?;

        Ok(trade)
    }

    /// Re-evaluate auto-pause against today's realised figures and refresh
    /// the account's stored [`PortfolioSnapshot`] (`spec.md` §4.6: "evaluated
    /// after every Trade close").
    async fn evaluate_auto_pause(&self, realized_pnl: Decimal, now: DateTime<Utc>) -> Result<(), ExecutionError> {
        let today = now.date_naive();
        let today_pnl = {
            let mut ledger = self.realized_pnl_today.lock();
            if ledger.0 != today {
                *ledger = (today, Decimal::ZERO);
            }
            ledger.1 += realized_pnl;
            ledger.1
        };
        let consecutive_losses = {
            let mut count = self.consecutive_losses.lock();
            if realized_pnl < Decimal::ZERO {
                *count += 1;
            } else {
                *count = 0;
            }
            *count
        };
        let current_drawdown = {
            let mut drawdown = self.drawdown.lock();
            drawdown.update_pnl(DRAWDOWN_KEY.to_string(), realized_pnl);
            drawdown.drawdown(&DRAWDOWN_KEY.to_string())
        };

        let previous_equity = self
            .persistence
            .latest_snapshot(self.user_id)
            .await?
            .map(|snapshot| snapshot.total_equity)
            .unwrap_or(Decimal::ZERO);
        let account_equity = previous_equity + realized_pnl;

        let was_paused = self.auto_pause.is_paused();
        self.auto_pause.evaluate(
            today_pnl,
            account_equity,
            self.auto_pause_thresholds.daily_loss_limit_pct,
            current_drawdown,
            self.auto_pause_thresholds.max_drawdown_pct,
            consecutive_losses,
            self.auto_pause_thresholds.max_consecutive_losses,
            false,
        );
        if !was_paused {
            if let Some(reason) = self.auto_pause.reason() {
                let _ = self.notifications.send(NotificationEvent::AutoPauseTriggered {
                    reason: summarize_pause_reason(reason),
                    at: now,
                });
            }
        }

        let snapshot = PortfolioSnapshot {
            taken_at: now,
            source: SnapshotSource::Derived,
            total_equity: account_equity,
            available_balance: account_equity,
            balances_by_asset: BTreeMap::new(),
            open_exposure: Decimal::ZERO,
            unrealized_pnl: Decimal::ZERO,
        };
        self.persistence.put_snapshot(self.user_id, snapshot).await?;

        Ok(())
    }

    /// Cancel every still-open order for a Trade and move it toward
    /// `pending_close`/`closed` (`spec.md` §4.6 manual cancel path).
    #[instrument(skip(self))]
    pub async fn cancel(&self, trade_id: TradeId, order: TradeOrder) -> Result<(), ExecutionError> {
        let exchange_order_id = order
            .exchange_order_id
            .as_deref()
            .ok_or_else(|| ExecutionError::InvalidTransition("order has no exchange ack to cancel".into()))?;

        let exchange = self.exchange.clone();
        exchange
            .cancel_order(&order.symbol, exchange_order_id)
            .await
            .map_err(ExecutionError::ExchangeClient)?;

        let mut trade = self.persistence.get_trade(trade_id).await?;
        if matches!(trade.status, PositionStatus::Open | PositionStatus::PartiallyClosed) {
            trade
                .transition(PositionStatus::Closing)
                .map_err(ExecutionError::InvalidTransition)?;
            self.persistence.put_trade(trade).await?;
        }

        Ok(())
    }

    /// Reject a Trade proposal's outstanding gate reservation without ever
    /// submitting it (e.g. the opportunity expired while awaiting real
    /// confirmation).
    pub fn abandon(&self, nonce: Uuid) -> Result<(), ExecutionError> {
        let proposal = self.proposals.lock().remove(&nonce).ok_or(ExecutionError::UnknownNonce)?;
        self.concurrency_gate.release();
        if proposal.mode == TradeMode::Real {
            self.real_slots.release(self.total_real_slots);
        }
        Ok(())
    }
}
