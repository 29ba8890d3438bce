use chrono::Utc;
use meridian_core::config::UserConfiguration;
use meridian_core::ids::{TradeId, UserId};
use meridian_core::opportunity::{
    DataVerificationStatus, DirectionHint, InitialSignal, Opportunity, OpportunityStatus,
    OpportunitySource, SuggestedAction, Verdict,
};
use meridian_core::trade::TradeMode;
use meridian_opportunity::{load_routing_config, OpportunityEngine};
use meridian_persistence::{InMemoryPersistence, PersistencePort};
use meridian_risk::RealSlotCounter;
use rust_decimal_macros::dec;
use std::sync::Arc;

fn analysis_complete_opportunity() -> Opportunity {
    let mut opp = Opportunity::new(
        "ETHUSDT",
        Utc::now(),
        OpportunitySource::Manual,
        InitialSignal {
            direction_hint: DirectionHint::Buy,
            target_entry: None,
            target_stop: None,
            target_take_profit: None,
            timeframe: "1h".into(),
            source_confidence: None,
        },
        Utc::now() + chrono::Duration::hours(1),
        TradeMode::Paper,
    );
    opp.transition(OpportunityStatus::PendingAiAnalysis).unwrap();
    opp.transition(OpportunityStatus::UnderAiAnalysis).unwrap();
    opp.transition(OpportunityStatus::AnalysisComplete).unwrap();
    opp.verdict = Some(Verdict {
        confidence: dec!(0.9),
        suggested_action: SuggestedAction::Buy,
        recommended_entry: Some(dec!(2000)),
        recommended_stop: Some(dec!(1950)),
        recommended_take_profit: None,
        reasoning: "test".into(),
        warnings: Vec::new(),
        data_verification_status: DataVerificationStatus::Verified,
        processing_time_ms: 0,
        model_id: "test".into(),
    });
    opp
}

#[tokio::test]
async fn record_conversion_links_the_trade_and_moves_to_the_mode_specific_terminal_status() {
    let persistence: Arc<dyn PersistencePort> = Arc::new(InMemoryPersistence::new());
    let engine = OpportunityEngine::new(persistence.clone(), Arc::new(RealSlotCounter::new(5)));
    let opp = analysis_complete_opportunity();
    persistence.put_opportunity(opp.clone()).await.unwrap();

    let trade_id = TradeId::random();
    let stored = engine.record_conversion(opp.id, trade_id, TradeMode::Paper).await.unwrap();

    assert_eq!(stored.status, OpportunityStatus::ConvertedToTradePaper);
    assert!(stored.linked_trade_ids.contains(&trade_id));
}

#[tokio::test]
async fn reopen_after_error_is_the_only_backward_edge() {
    let persistence: Arc<dyn PersistencePort> = Arc::new(InMemoryPersistence::new());
    let engine = OpportunityEngine::new(persistence.clone(), Arc::new(RealSlotCounter::new(5)));
    let mut opp = analysis_complete_opportunity();
    opp.transition(OpportunityStatus::ErrorInProcessing).unwrap();
    persistence.put_opportunity(opp.clone()).await.unwrap();

    let reopened = engine.reopen_after_error(opp.id).await.unwrap();
    assert_eq!(reopened.status, OpportunityStatus::PendingAiAnalysis);
}

#[tokio::test]
async fn load_routing_config_resolves_the_requested_users_configuration() {
    let persistence: Arc<dyn PersistencePort> = Arc::new(InMemoryPersistence::new());
    let user = UserId::random();
    persistence
        .compare_and_swap_config(UserConfiguration::default_for(user, Utc::now()), 0)
        .await
        .unwrap();

    let config = load_routing_config(persistence.as_ref(), user).await.unwrap();
    assert_eq!(config.user_id, user);
}
