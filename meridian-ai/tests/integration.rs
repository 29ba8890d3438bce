use async_trait::async_trait;
use chrono::Utc;
use meridian_ai::{AiError, AiOrchestrator, LlmClient, LlmTurn, Message, OrchestratorConfig, Tool, ToolRegistry};
use meridian_core::opportunity::{
    DataVerificationStatus, DirectionHint, InitialSignal, Opportunity, OpportunityStatus, OpportunitySource,
};
use meridian_core::trade::TradeMode;
use meridian_data::error::DataError;
use meridian_data::event::{Kline, Ticker24h};
use meridian_data::pull::MarketDataClient;
use meridian_instrument::Instrument;
use meridian_integration::rate_limit::Priority;
use meridian_persistence::{InMemoryPersistence, PersistencePort};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

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

struct FlatMarketData;

#[async_trait]
impl MarketDataClient for FlatMarketData {
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

    async fn get_ticker_24h(&self, symbol: Option<&str>, _priority: Priority) -> Result<Vec<Ticker24h>, DataError> {
        Ok(vec![Ticker24h {
            symbol: symbol.unwrap_or("BTCUSDT").into(),
            last_price: dec!(30000),
            price_change_pct: dec!(0),
            high: dec!(30000),
            low: dec!(30000),
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

/// Always asks for the same unregistered tool, so every hop is an "unknown
/// tool" reply rather than a real invocation.
struct LoopingLlm;

#[async_trait]
impl LlmClient for LoopingLlm {
    async fn next_turn(&self, _history: &[Message]) -> Result<LlmTurn, String> {
        Ok(LlmTurn::ToolCall {
            tool_name: "nonexistent".into(),
            args: serde_json::json!({}),
        })
    }

    fn model_id(&self) -> &str {
        "looping-test-model"
    }
}

#[tokio::test]
async fn hop_budget_exhaustion_marks_the_opportunity_as_errored() {
    let persistence: Arc<dyn PersistencePort> = Arc::new(InMemoryPersistence::new());
    let opp = opportunity();
    let id = opp.id;
    persistence.put_opportunity(opp).await.unwrap();

    let orchestrator = AiOrchestrator::new(LoopingLlm, ToolRegistry::new(), persistence.clone(), Arc::new(FlatMarketData))
        .with_config(OrchestratorConfig {
            hop_budget: 2,
            ..OrchestratorConfig::default()
        });

    let result = orchestrator.analyze(id, None).await;
    assert!(matches!(result, Err(AiError::HopBudgetExhausted { hops: 2 })));

    let stored = persistence.get_opportunity(id).await.unwrap();
    assert_eq!(stored.status, OpportunityStatus::ErrorInProcessing);
    assert!(stored.error_reason.is_some());
}

struct SingleToolCallThenVerdict;

#[async_trait]
impl LlmClient for SingleToolCallThenVerdict {
    async fn next_turn(&self, history: &[Message]) -> Result<LlmTurn, String> {
        let already_called = history
            .iter()
            .any(|m| matches!(m, Message::ToolResult { tool_name, .. } if tool_name == "nonexistent"));
        if already_called {
            Ok(LlmTurn::FinalVerdict(meridian_core::opportunity::Verdict {
                confidence: dec!(0.5),
                suggested_action: meridian_core::opportunity::SuggestedAction::Buy,
                recommended_entry: Some(dec!(30000)),
                recommended_stop: Some(dec!(29700)),
                recommended_take_profit: None,
                reasoning: "recovered after an unknown tool call".into(),
                warnings: Vec::new(),
                data_verification_status: DataVerificationStatus::NotApplicable,
                processing_time_ms: 0,
                model_id: "test".into(),
            }))
        } else {
            Ok(LlmTurn::ToolCall {
                tool_name: "nonexistent".into(),
                args: serde_json::json!({}),
            })
        }
    }

    fn model_id(&self) -> &str {
        "recovering-test-model"
    }
}

#[tokio::test]
async fn an_unknown_tool_name_is_reported_back_to_the_model_instead_of_aborting() {
    let persistence: Arc<dyn PersistencePort> = Arc::new(InMemoryPersistence::new());
    let opp = opportunity();
    let id = opp.id;
    persistence.put_opportunity(opp).await.unwrap();

    let orchestrator = AiOrchestrator::new(
        SingleToolCallThenVerdict,
        ToolRegistry::new(),
        persistence.clone(),
        Arc::new(FlatMarketData),
    );

    let verdict = orchestrator.analyze(id, None).await.unwrap();
    assert_eq!(verdict.reasoning, "recovered after an unknown tool call");

    let stored = persistence.get_opportunity(id).await.unwrap();
    assert_eq!(stored.status, OpportunityStatus::AnalysisComplete);
}

#[tokio::test]
async fn a_tool_that_never_returns_is_cut_off_by_its_own_timeout() {
    struct StallingTool;

    #[async_trait]
    impl Tool for StallingTool {
        fn name(&self) -> &'static str {
            "stalling"
        }
        fn input_schema(&self) -> serde_json::Value {
            serde_json::json!({})
        }
        fn output_schema(&self) -> serde_json::Value {
            serde_json::json!({})
        }
        fn timeout(&self) -> Duration {
            Duration::from_millis(10)
        }
        async fn invoke(&self, _args: serde_json::Value) -> Result<serde_json::Value, String> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(serde_json::json!({}))
        }
    }

    struct StallThenFail;

    #[async_trait]
    impl LlmClient for StallThenFail {
        async fn next_turn(&self, history: &[Message]) -> Result<LlmTurn, String> {
            let calls = history
                .iter()
                .filter(|m| matches!(m, Message::ToolResult { tool_name, .. } if tool_name == "stalling"))
                .count();
            if calls >= 3 {
                Err("giving up".into())
            } else {
                Ok(LlmTurn::ToolCall {
                    tool_name: "stalling".into(),
                    args: serde_json::json!({}),
                })
            }
        }

        fn model_id(&self) -> &str {
            "stall-test-model"
        }
    }

    let persistence: Arc<dyn PersistencePort> = Arc::new(InMemoryPersistence::new());
    let opp = opportunity();
    let id = opp.id;
    persistence.put_opportunity(opp).await.unwrap();

    let mut tools = ToolRegistry::new();
    tools.register(Arc::new(StallingTool));
    let orchestrator = AiOrchestrator::new(StallThenFail, tools, persistence, Arc::new(FlatMarketData));

    let result = orchestrator.analyze(id, None).await;
    assert!(matches!(result, Err(AiError::RepeatedToolFailure { tool_name, .. }) if tool_name == "stalling"));
}
