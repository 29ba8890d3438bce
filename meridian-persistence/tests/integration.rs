use meridian_core::ids::UserId;
use meridian_core::opportunity::{DirectionHint, InitialSignal, Opportunity, OpportunityStatus, OpportunitySource};
use meridian_core::snapshot::{PortfolioSnapshot, SnapshotSource};
use meridian_core::trade::TradeMode;
use meridian_persistence::{with_conflict_retry, InMemoryPersistence, PersistenceError, PersistencePort};
use rust_decimal_macros::dec;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU32, Ordering};

fn opportunity() -> Opportunity {
    Opportunity::new(
        "BTCUSDT",
        chrono::Utc::now(),
        OpportunitySource::Manual,
        InitialSignal {
            direction_hint: DirectionHint::Buy,
            target_entry: None,
            target_stop: None,
            target_take_profit: None,
            timeframe: "1h".into(),
            source_confidence: None,
        },
        chrono::Utc::now() + chrono::Duration::hours(1),
        TradeMode::Paper,
    )
}

#[tokio::test]
async fn compare_and_swap_conflicts_on_a_stale_expected_status() {
    let store = InMemoryPersistence::new();
    let opp = opportunity();
    store.put_opportunity(opp.clone()).await.unwrap();

    let mut advanced = opp.clone();
    advanced.status = OpportunityStatus::AnalysisComplete;
    store
        .compare_and_swap_opportunity(advanced, OpportunityStatus::New)
        .await
        .unwrap();

    let mut stale_write = opp;
    stale_write.status = OpportunityStatus::RejectedByUser;
    let result = store
        .compare_and_swap_opportunity(stale_write, OpportunityStatus::New)
        .await;
    assert!(matches!(result, Err(PersistenceError::Conflict)));
}

#[tokio::test]
async fn latest_snapshot_is_absent_until_one_is_put() {
    let store = InMemoryPersistence::new();
    let user = UserId::random();
    assert!(store.latest_snapshot(user).await.unwrap().is_none());

    let snapshot = PortfolioSnapshot {
        taken_at: chrono::Utc::now(),
        source: SnapshotSource::Derived,
        total_equity: dec!(10000),
        available_balance: dec!(8000),
        balances_by_asset: BTreeMap::new(),
        open_exposure: dec!(2000),
        unrealized_pnl: dec!(0),
    };
    store.put_snapshot(user, snapshot).await.unwrap();
    let fetched = store.latest_snapshot(user).await.unwrap().unwrap();
    assert_eq!(fetched.total_equity, dec!(10000));
}

#[tokio::test]
async fn with_conflict_retry_gives_up_on_a_persistently_stale_compare_and_swap() {
    let store = InMemoryPersistence::new();
    let opp = opportunity();
    store.put_opportunity(opp.clone()).await.unwrap();

    let mut winner = opp.clone();
    winner.status = OpportunityStatus::AnalysisComplete;
    store
        .compare_and_swap_opportunity(winner, OpportunityStatus::New)
        .await
        .unwrap();

    let attempts = AtomicU32::new(0);
    let result: Result<Opportunity, _> = with_conflict_retry(|| {
        attempts.fetch_add(1, Ordering::SeqCst);
        let mut stale = opp.clone();
        stale.status = OpportunityStatus::RejectedByUser;
        store.compare_and_swap_opportunity(stale, OpportunityStatus::New)
    })
    .await;

    assert!(matches!(result, Err(PersistenceError::Conflict)));
    assert_eq!(attempts.load(Ordering::SeqCst), 5);
}
