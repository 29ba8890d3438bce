use crate::error::PersistenceError;
use crate::port::PersistencePort;
use async_trait::async_trait;
use meridian_core::config::UserConfiguration;
use meridian_core::credential::ApiCredential;
use meridian_core::ids::{CredentialId, OpportunityId, StrategyConfigId, TradeId, TradeOrderId, UserId};
use meridian_core::opportunity::{Opportunity, OpportunityStatus};
use meridian_core::order::TradeOrder;
use meridian_core::snapshot::PortfolioSnapshot;
use meridian_core::strategy::TradingStrategyConfig;
use meridian_core::trade::Trade;
use parking_lot::Mutex;
use std::collections::HashMap;

/// A reference `PersistencePort` implementation for tests and local
/// development. Mirrors `barter::portfolio::repository::InMemoryRepository`
/// down to its doc-comment warning: **do not use in production, no fault
/// tolerant guarantees.**
#[derive(Debug, Default)]
pub struct InMemoryPersistence {
    opportunities: Mutex<HashMap<OpportunityId, Opportunity>>,
    trades: Mutex<HashMap<TradeId, Trade>>,
    orders: Mutex<HashMap<TradeOrderId, TradeOrder>>,
    orders_by_trade: Mutex<HashMap<TradeId, Vec<TradeOrderId>>>,
    credentials: Mutex<HashMap<CredentialId, ApiCredential>>,
    configs: Mutex<HashMap<UserId, UserConfiguration>>,
    strategy_configs: Mutex<HashMap<StrategyConfigId, TradingStrategyConfig>>,
    append_log: Mutex<HashMap<String, Vec<serde_json::Value>>>,
    snapshots: Mutex<HashMap<UserId, PortfolioSnapshot>>,
}

impl InMemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PersistencePort for InMemoryPersistence {
    async fn get_opportunity(&self, id: OpportunityId) -> Result<Opportunity, PersistenceError> {
        self.opportunities
            .lock()
            .get(&id)
            .cloned()
            .ok_or_else(|| PersistenceError::NotFound(format!("opportunity {id}")))
    }

    async fn put_opportunity(&self, opportunity: Opportunity) -> Result<(), PersistenceError> {
        self.opportunities.lock().insert(opportunity.id, opportunity);
        Ok(())
    }

    async fn list_open_opportunities(&self) -> Result<Vec<Opportunity>, PersistenceError> {
        Ok(self
            .opportunities
            .lock()
            .values()
            .filter(|o| !o.status.is_terminal())
            .cloned()
            .collect())
    }

    async fn compare_and_swap_opportunity(
        &self,
        opportunity: Opportunity,
        expected_status: OpportunityStatus,
    ) -> Result<Opportunity, PersistenceError> {
        let mut opportunities = self.opportunities.lock();
        let current_status = opportunities
            .get(&opportunity.id)
            .ok_or_else(|| PersistenceError::NotFound(format!("opportunity {}", opportunity.id)))?
            .status;
        if current_status == opportunity.status {
            return Ok(opportunity);
        }
        if current_status != expected_status {
            return Err(PersistenceError::Conflict);
        }
        opportunities.insert(opportunity.id, opportunity.clone());
        Ok(opportunity)
    }

    async fn get_trade(&self, id: TradeId) -> Result<Trade, PersistenceError> {
        self.trades
            .lock()
            .get(&id)
            .cloned()
            .ok_or_else(|| PersistenceError::NotFound(format!("trade {id}")))
    }

    async fn put_trade(&self, trade: Trade) -> Result<(), PersistenceError> {
        self.trades.lock().insert(trade.id, trade);
        Ok(())
    }

    async fn list_open_trades(&self) -> Result<Vec<Trade>, PersistenceError> {
        Ok(self
            .trades
            .lock()
            .values()
            .filter(|t| !t.status.is_terminal())
            .cloned()
            .collect())
    }

    async fn get_order(&self, id: TradeOrderId) -> Result<TradeOrder, PersistenceError> {
        self.orders
            .lock()
            .get(&id)
            .cloned()
            .ok_or_else(|| PersistenceError::NotFound(format!("order {id}")))
    }

    async fn put_order(&self, order: TradeOrder) -> Result<(), PersistenceError> {
        self.orders_by_trade
            .lock()
            .entry(order.trade_id)
            .or_default()
            .push(order.id);
        self.orders.lock().insert(order.id, order);
        Ok(())
    }

    async fn get_credential(&self, id: CredentialId) -> Result<ApiCredential, PersistenceError> {
        self.credentials
            .lock()
            .get(&id)
            .cloned()
            .ok_or_else(|| PersistenceError::NotFound(format!("credential {id}")))
    }

    async fn put_credential(&self, credential: ApiCredential) -> Result<(), PersistenceError> {
        self.credentials.lock().insert(credential.id, credential);
        Ok(())
    }

    async fn get_config(&self, user_id: UserId) -> Result<UserConfiguration, PersistenceError> {
        self.configs
            .lock()
            .get(&user_id)
            .cloned()
            .ok_or_else(|| PersistenceError::NotFound(format!("config for user {user_id}")))
    }

    async fn put_snapshot(&self, user_id: UserId, snapshot: PortfolioSnapshot) -> Result<(), PersistenceError> {
        self.snapshots.lock().insert(user_id, snapshot);
        Ok(())
    }

    async fn latest_snapshot(&self, user_id: UserId) -> Result<Option<PortfolioSnapshot>, PersistenceError> {
        Ok(self.snapshots.lock().get(&user_id).cloned())
    }

    async fn get_strategy_config(
        &self,
        id: StrategyConfigId,
    ) -> Result<TradingStrategyConfig, PersistenceError> {
        self.strategy_configs
            .lock()
            .get(&id)
            .cloned()
            .ok_or_else(|| PersistenceError::NotFound(format!("strategy config {id}")))
    }

    async fn put_strategy_config(&self, config: TradingStrategyConfig) -> Result<(), PersistenceError> {
        self.strategy_configs.lock().insert(config.id, config);
        Ok(())
    }

    async fn compare_and_swap_config(
        &self,
        mut config: UserConfiguration,
        expected_version: u64,
    ) -> Result<UserConfiguration, PersistenceError> {
        let mut configs = self.configs.lock();
        let current_version = configs.get(&config.user_id).map(|c| c.version).unwrap_or(0);
        if current_version != expected_version {
            return Err(PersistenceError::VersionConflict {
                expected: expected_version,
                found: current_version,
            });
        }
        config.bump_version(chrono::Utc::now());
        configs.insert(config.user_id, config.clone());
        Ok(config)
    }

    async fn append_only(&self, stream: &str, record: serde_json::Value) -> Result<(), PersistenceError> {
        self.append_log
            .lock()
            .entry(stream.to_string())
            .or_default()
            .push(record);
        Ok(())
    }

    async fn with_transaction(
        &self,
        trade_id: TradeId,
        body: Box<dyn FnOnce(Trade, Vec<TradeOrder>) -> Result<(Trade, Vec<TradeOrder>), PersistenceError> + Send>,
    ) -> Result<(Trade, Vec<TradeOrder>), PersistenceError> {
        let trade = self.get_trade(trade_id).await?;
        let order_ids = self
            .orders_by_trade
            .lock()
            .get(&trade_id)
            .cloned()
            .unwrap_or_default();
        let mut orders = Vec::with_capacity(order_ids.len());
        for id in order_ids {
            orders.push(self.get_order(id).await?);
        }

        let (updated_trade, updated_orders) = body(trade, orders)?;

        self.put_trade(updated_trade.clone()).await?;
        for order in &updated_orders {
            self.put_order(order.clone()).await?;
        }
        Ok((updated_trade, updated_orders))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meridian_core::ids::UserId;
    use meridian_core::opportunity::{DirectionHint, InitialSignal, OpportunitySource};
    use meridian_core::trade::TradeMode;

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
    async fn round_trips_an_opportunity() {
        let store = InMemoryPersistence::new();
        let opp = opportunity();
        let id = opp.id;
        store.put_opportunity(opp).await.unwrap();
        let fetched = store.get_opportunity(id).await.unwrap();
        assert_eq!(fetched.id, id);
    }

    #[tokio::test]
    async fn compare_and_swap_rejects_stale_version() {
        let store = InMemoryPersistence::new();
        let config = UserConfiguration::default_for(UserId::random(), chrono::Utc::now());
        let saved = store
            .compare_and_swap_config(config.clone(), 0)
            .await
            .unwrap();
        assert_eq!(saved.version, 1);

        let stale_write = store.compare_and_swap_config(config, 0).await;
        assert!(matches!(
            stale_write,
            Err(PersistenceError::VersionConflict { .. })
        ));
    }

    #[tokio::test]
    async fn missing_entity_surfaces_not_found() {
        let store = InMemoryPersistence::new();
        let result = store.get_trade(meridian_core::ids::TradeId::random()).await;
        assert!(matches!(result, Err(PersistenceError::NotFound(_))));
    }

    #[tokio::test]
    async fn append_only_log_accumulates_records() {
        let store = InMemoryPersistence::new();
        store
            .append_only("ai-verdicts", serde_json::json!({"confidence": 0.8}))
            .await
            .unwrap();
        store
            .append_only("ai-verdicts", serde_json::json!({"confidence": 0.9}))
            .await
            .unwrap();
        assert_eq!(store.append_log.lock().get("ai-verdicts").unwrap().len(), 2);
    }
}
