use crate::error::AiError;
use crate::guard::OpportunityGuards;
use crate::llm::{LlmClient, LlmTurn, Message};
use crate::tool::ToolRegistry;
use chrono::Utc;
use meridian_core::ids::{OpportunityId, StrategyConfigId};
use meridian_core::opportunity::{DataVerificationStatus, OpportunityStatus, SuggestedAction, Verdict};
use meridian_data::pull::MarketDataClient;
use meridian_integration::rate_limit::Priority;
use meridian_persistence::PersistencePort;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use tracing::{instrument, warn};

/// Tunables for the agent loop (`spec.md` §4.4 step 4c), all with the
/// spec's stated defaults.
#[derive(Debug, Clone, Copy)]
pub struct OrchestratorConfig {
    /// Per-tool timeouts are `Tool::timeout()`'s job (default 10s,
    /// market-data tools override to 3s); this bounds only the LLM call.
    pub llm_timeout: Duration,
    pub hop_budget: u32,
    pub repeated_failure_limit: u32,
    pub data_verification_deviation_bps: Decimal,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            llm_timeout: Duration::from_secs(30),
            hop_budget: 8,
            repeated_failure_limit: 3,
            data_verification_deviation_bps: Decimal::new(50, 0),
        }
    }
}

/// The agent loop (`spec.md` §4.4): load Opportunity + profile, run the
/// LLM/tool-call cycle to a final verdict, data-verify it, and persist it
/// transactionally. Generalizes `jackbot-strategy::Strategy<E>`'s dispatch
/// surface from one static strategy type to a named tool registry, since
/// the behaviour here is "call whichever tool the model asks for", not
/// "run this one fixed reaction to each event".
pub struct AiOrchestrator<L, D> {
    llm: L,
    tools: ToolRegistry,
    persistence: Arc<dyn PersistencePort>,
    market_data: Arc<D>,
    guards: OpportunityGuards,
    config: OrchestratorConfig,
}

impl<L, D> AiOrchestrator<L, D>
where
    L: LlmClient,
    D: MarketDataClient,
{
    pub fn new(
        llm: L,
        tools: ToolRegistry,
        persistence: Arc<dyn PersistencePort>,
        market_data: Arc<D>,
    ) -> Self {
        Self {
            llm,
            tools,
            persistence,
            market_data,
            guards: OpportunityGuards::new(),
            config: OrchestratorConfig::default(),
        }
    }

    pub fn with_config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    /// `analyze(opportunity_id, strategy_profile_id?) → Verdict` (`spec.md`
    /// §4.4 contract). Refuses to run a second concurrent analysis of the
    /// same opportunity; the durable `under_ai_analysis` status transition
    /// is the cross-process half of that guarantee.
    #[instrument(skip(self))]
    pub async fn analyze(
        &self,
        opportunity_id: OpportunityId,
        strategy_profile_id: Option<StrategyConfigId>,
    ) -> Result<Verdict, AiError> {
        let _permit = self
            .guards
            .try_acquire(opportunity_id)
            .ok_or(AiError::AlreadyAnalyzing)?;

        let mut opportunity = self.persistence.get_opportunity(opportunity_id).await?;
        let prior_status = opportunity.status;
        opportunity
            .transition(OpportunityStatus::UnderAiAnalysis)
            .map_err(AiError::InvalidOpportunityState)?;
        opportunity = self
            .persistence
            .compare_and_swap_opportunity(opportunity, prior_status)
            .await?;

        let profile = match strategy_profile_id {
            Some(id) => Some(self.persistence.get_strategy_config(id).await?),
            None => None,
        };

        let started_at = Utc::now();
        let verdict_result = self.run_loop(&opportunity, profile.as_ref()).await;

        let mut verdict = match verdict_result {
            Ok(verdict) => verdict,
            Err(err) => {
                let prior_status = opportunity.status;
                opportunity.error_reason = Some(err.to_string());
                opportunity
                    .transition(OpportunityStatus::ErrorInProcessing)
                    .map_err(AiError::InvalidOpportunityState)?;
                self.persistence
                    .compare_and_swap_opportunity(opportunity, prior_status)
                    .await?;
                return Err(err);
            }
        };
        verdict.processing_time_ms = (Utc::now() - started_at).num_milliseconds().max(0) as u64;

        self.verify_against_market(&opportunity.symbol, &mut verdict).await;

        let next_status = if verdict.suggested_action.is_directional() {
            OpportunityStatus::AnalysisComplete
        } else {
            OpportunityStatus::RejectedByAi
        };
        let prior_status = opportunity.status;
        opportunity.verdict = Some(verdict.clone());
        opportunity
            .transition(next_status)
            .map_err(AiError::InvalidOpportunityState)?;
        self.persistence
            .compare_and_swap_opportunity(opportunity, prior_status)
            .await?;

        Ok(verdict)
    }

    /// Steps 2-5 of `spec.md` §4.4, excluding the trailing data-verification
    /// pass (run by the caller once we have a candidate verdict and can
    /// still downgrade it before it's observable).
    async fn run_loop(
        &self,
        opportunity: &meridian_core::opportunity::Opportunity,
        profile: Option<&meridian_core::strategy::TradingStrategyConfig>,
    ) -> Result<Verdict, AiError> {
        let mut history = vec![
            Message::System(self.prompt_for(opportunity, profile)),
            Message::User(serde_json::to_string(&self.tools.catalog()).unwrap_or_default()),
        ];

        let mut hops = 0u32;
        let mut last_failure: Option<(String, serde_json::Value, String)> = None;
        let mut repeats = 0u32;

        loop {
            let turn = tokio::time::timeout(self.config.llm_timeout, self.llm.next_turn(&history))
                .await
                .map_err(|_| AiError::LlmFailure("LLM call exceeded its timeout".into()))?
                .map_err(AiError::LlmFailure)?;

            match turn {
                LlmTurn::FinalVerdict(verdict) => return Ok(verdict),
                LlmTurn::ToolCall { tool_name, args } => {
                    if hops >= self.config.hop_budget {
                        return Err(AiError::HopBudgetExhausted { hops });
                    }
                    hops += 1;

                    let Some(tool) = self.tools.get(&tool_name) else {
                        history.push(Message::ToolResult {
                            tool_name: tool_name.clone(),
                            result: Err(format!("unknown tool: {tool_name}")),
                        });
                        continue;
                    };

                    let outcome = tokio::time::timeout(tool.timeout(), tool.invoke(args.clone()))
                        .await
                        .unwrap_or_else(|_| Err(format!("tool {tool_name} timed out")));

                    match &outcome {
                        Ok(_) => repeats = 0,
                        Err(reason) => {
                            let is_repeat = last_failure
                                .as_ref()
                                .is_some_and(|(name, last_args, last_reason)| {
                                    *name == tool_name && *last_args == args && last_reason == reason
                                });
                            repeats = if is_repeat { repeats + 1 } else { 1 };
                            last_failure = Some((tool_name.clone(), args.clone(), reason.clone()));

                            if repeats >= self.config.repeated_failure_limit {
                                return Err(AiError::RepeatedToolFailure {
                                    tool_name: tool_name.clone(),
                                    reason: reason.clone(),
                                });
                            }
                        }
                    }

                    history.push(Message::ToolResult { tool_name, result: outcome });
                }
            }
        }
    }

    fn prompt_for(
        &self,
        opportunity: &meridian_core::opportunity::Opportunity,
        profile: Option<&meridian_core::strategy::TradingStrategyConfig>,
    ) -> String {
        match profile.and_then(|p| p.ai_profile.as_ref()) {
            Some(ai_profile) => ai_profile
                .prompt_template
                .replace("{{symbol}}", &opportunity.symbol)
                .replace("{{opportunity_id}}", &opportunity.id.to_string()),
            None => format!(
                "Analyze opportunity {} on {}. No strategy profile was supplied; use general judgment.",
                opportunity.id, opportunity.symbol
            ),
        }
    }

    /// Step 5a of `spec.md` §4.4: cross-check the recommended entry against
    /// the live tick and downgrade on excessive deviation.
    async fn verify_against_market(&self, symbol: &str, verdict: &mut Verdict) {
        if !verdict.suggested_action.is_directional() {
            verdict.data_verification_status = DataVerificationStatus::NotApplicable;
            return;
        }
        let Some(recommended_entry) = verdict.recommended_entry else {
            verdict.data_verification_status = DataVerificationStatus::NotApplicable;
            return;
        };

        let tick = self
            .market_data
            .get_ticker_24h(Some(symbol), Priority::PortfolioValuation)
            .await;

        let Ok(tickers) = tick else {
            warn!(symbol, "data verification pull failed; leaving verdict unverified");
            verdict.data_verification_status = DataVerificationStatus::NotApplicable;
            return;
        };
        let Some(ticker) = tickers.first() else {
            verdict.data_verification_status = DataVerificationStatus::NotApplicable;
            return;
        };

        let deviation_bps = ((ticker.last_price - recommended_entry) / ticker.last_price).abs()
            * Decimal::new(10_000, 0);

        if deviation_bps > self.config.data_verification_deviation_bps {
            verdict.data_verification_status = DataVerificationStatus::Mismatch;
            verdict.suggested_action = SuggestedAction::FurtherInvestigationNeeded;
            verdict
                .warnings
                .push(format!("recommended entry deviates {deviation_bps} bps from market tick"));
        } else {
            verdict.data_verification_status = DataVerificationStatus::Verified;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{LlmClient, LlmTurn, Message};
    use crate::tool::Tool;
    use async_trait::async_trait;
    use meridian_core::opportunity::{
        DirectionHint, InitialSignal, Opportunity, OpportunitySource, SuggestedAction,
    };
    use meridian_core::trade::TradeMode;
    use meridian_data::error::DataError;
    use meridian_data::event::{Kline, Ticker24h};
    use meridian_instrument::Instrument;
    use meridian_persistence::InMemoryPersistence;
    use parking_lot::Mutex;
    use rust_decimal_macros::dec;
    use std::collections::BTreeMap;

    fn opportunity() -> Opportunity {
        let mut opp = Opportunity::new(
            "BTCUSDT",
            Utc::now(),
            OpportunitySource::Manual,
            InitialSignal {
                direction_hint: DirectionHint::Buy,
                target_entry: Some(dec!(30000)),
                target_stop: Some(dec!(29700)),
                target_take_profit: None,
                timeframe: "1h".into(),
                source_confidence: None,
            },
            Utc::now() + chrono::Duration::hours(1),
            TradeMode::Paper,
        );
        opp.transition(OpportunityStatus::PendingAiAnalysis).unwrap();
        opp
    }

    fn verdict(action: SuggestedAction, confidence: Decimal) -> Verdict {
        Verdict {
            confidence,
            suggested_action: action,
            recommended_entry: Some(dec!(30000)),
            recommended_stop: Some(dec!(29700)),
            recommended_take_profit: None,
            reasoning: "trend continuation".into(),
            warnings: Vec::new(),
            data_verification_status: DataVerificationStatus::NotApplicable,
            processing_time_ms: 0,
            model_id: "test-model".into(),
        }
    }

    struct StubMarketData {
        last_price: Decimal,
    }

    #[async_trait]
    impl MarketDataClient for StubMarketData {
        async fn get_klines(
            &self,
            _symbol: &str,
            _interval: &str,
            _start: chrono::DateTime<Utc>,
            _end: chrono::DateTime<Utc>,
            _limit: u32,
            _priority: Priority,
        ) -> Result<Vec<Kline>, DataError> {
            Ok(Vec::new())
        }

        async fn get_ticker_24h(
            &self,
            symbol: Option<&str>,
            _priority: Priority,
        ) -> Result<Vec<Ticker24h>, DataError> {
            Ok(vec![Ticker24h {
                symbol: symbol.unwrap_or("BTCUSDT").into(),
                last_price: self.last_price,
                price_change_pct: dec!(0),
                high: self.last_price,
                low: self.last_price,
                volume: dec!(100),
                event_time: Utc::now(),
            }])
        }

        async fn get_account_balances(&self, _priority: Priority) -> Result<BTreeMap<String, Decimal>, DataError> {
            Ok(BTreeMap::new())
        }

        async fn list_pairs(&self, _priority: Priority) -> Result<Vec<Instrument>, DataError> {
            Ok(Vec::new())
        }
    }

    /// Replays a scripted sequence of turns, one per call to `next_turn`.
    struct ScriptedLlm {
        turns: Mutex<Vec<LlmTurn>>,
    }

    impl ScriptedLlm {
        fn new(turns: Vec<LlmTurn>) -> Self {
            let mut turns = turns;
            turns.reverse();
            Self { turns: Mutex::new(turns) }
        }
    }

    #[async_trait]
    impl LlmClient for ScriptedLlm {
        async fn next_turn(&self, _history: &[Message]) -> Result<LlmTurn, String> {
            self.turns.lock().pop().ok_or_else(|| "script exhausted".to_string())
        }

        fn model_id(&self) -> &str {
            "test-model"
        }
    }

    struct AlwaysFailingTool;

    #[async_trait]
    impl Tool for AlwaysFailingTool {
        fn name(&self) -> &'static str {
            "flaky"
        }
        fn input_schema(&self) -> serde_json::Value {
            serde_json::json!({})
        }
        fn output_schema(&self) -> serde_json::Value {
            serde_json::json!({})
        }
        async fn invoke(&self, _args: serde_json::Value) -> Result<serde_json::Value, String> {
            Err("permanently broken".into())
        }
    }

    #[tokio::test]
    async fn final_verdict_persists_and_advances_status() {
        let persistence: Arc<dyn PersistencePort> = Arc::new(InMemoryPersistence::new());
        let opp = opportunity();
        let id = opp.id;
        persistence.put_opportunity(opp).await.unwrap();

        let llm = ScriptedLlm::new(vec![LlmTurn::FinalVerdict(verdict(
            SuggestedAction::Buy,
            dec!(0.9),
        ))]);
        let market_data = Arc::new(StubMarketData { last_price: dec!(30000) });
        let orchestrator = AiOrchestrator::new(llm, ToolRegistry::new(), persistence.clone(), market_data);

        let verdict = orchestrator.analyze(id, None).await.unwrap();
        assert_eq!(verdict.data_verification_status, DataVerificationStatus::Verified);

        let stored = persistence.get_opportunity(id).await.unwrap();
        assert_eq!(stored.status, OpportunityStatus::AnalysisComplete);
        assert!(stored.verdict.is_some());
    }

    #[tokio::test]
    async fn large_price_deviation_downgrades_to_further_investigation() {
        let persistence: Arc<dyn PersistencePort> = Arc::new(InMemoryPersistence::new());
        let opp = opportunity();
        let id = opp.id;
        persistence.put_opportunity(opp).await.unwrap();

        let llm = ScriptedLlm::new(vec![LlmTurn::FinalVerdict(verdict(
            SuggestedAction::Buy,
            dec!(0.9),
        ))]);
        // Market is 10% away from the recommended entry, far past 50bps.
        let market_data = Arc::new(StubMarketData { last_price: dec!(33000) });
        let orchestrator = AiOrchestrator::new(llm, ToolRegistry::new(), persistence, market_data);

        let verdict = orchestrator.analyze(id, None).await.unwrap();
        assert_eq!(verdict.suggested_action, SuggestedAction::FurtherInvestigationNeeded);
        assert_eq!(verdict.data_verification_status, DataVerificationStatus::Mismatch);
    }

    #[tokio::test]
    async fn repeated_identical_tool_failure_aborts_the_loop() {
        let persistence: Arc<dyn PersistencePort> = Arc::new(InMemoryPersistence::new());
        let opp = opportunity();
        let id = opp.id;
        persistence.put_opportunity(opp).await.unwrap();

        let failing_call = LlmTurn::ToolCall {
            tool_name: "flaky".into(),
            args: serde_json::json!({}),
        };
        let llm = ScriptedLlm::new(vec![
            failing_call.clone(),
            failing_call.clone(),
            failing_call,
        ]);
        let mut tools = ToolRegistry::new();
        tools.register(Arc::new(AlwaysFailingTool));
        let market_data = Arc::new(StubMarketData { last_price: dec!(30000) });
        let orchestrator = AiOrchestrator::new(llm, tools, persistence.clone(), market_data);

        let result = orchestrator.analyze(id, None).await;
        assert!(matches!(result, Err(AiError::RepeatedToolFailure { .. })));

        let stored = persistence.get_opportunity(id).await.unwrap();
        assert_eq!(stored.status, OpportunityStatus::ErrorInProcessing);
    }

    #[tokio::test]
    async fn concurrent_analysis_of_the_same_opportunity_is_refused() {
        let persistence: Arc<dyn PersistencePort> = Arc::new(InMemoryPersistence::new());
        let opp = opportunity();
        let id = opp.id;
        persistence.put_opportunity(opp).await.unwrap();

        let llm = ScriptedLlm::new(vec![LlmTurn::FinalVerdict(verdict(
            SuggestedAction::Buy,
            dec!(0.9),
        ))]);
        let market_data = Arc::new(StubMarketData { last_price: dec!(30000) });
        let orchestrator = AiOrchestrator::new(llm, ToolRegistry::new(), persistence, market_data);

        let _guard = orchestrator.guards.try_acquire(id).unwrap();
        let result = orchestrator.analyze(id, None).await;
        assert!(matches!(result, Err(AiError::AlreadyAnalyzing)));
    }
}
