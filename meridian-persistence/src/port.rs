use crate::error::PersistenceError;
use async_trait::async_trait;
use meridian_core::config::UserConfiguration;
use meridian_core::credential::ApiCredential;
use meridian_core::ids::{CredentialId, OpportunityId, StrategyConfigId, TradeId, TradeOrderId, UserId};
use meridian_core::opportunity::{Opportunity, OpportunityStatus};
use meridian_core::order::TradeOrder;
use meridian_core::snapshot::PortfolioSnapshot;
use meridian_core::strategy::TradingStrategyConfig;
use meridian_core::trade::Trade;

/// The narrow capability every other component depends on instead of a
/// concrete database client, mirroring the role
/// `barter::portfolio::repository::{PositionHandler, EquityHandler}` play
/// for the teacher's portfolio layer — generalized here to every entity in
/// spec.md §3 plus the transactional and optimistic-concurrency primitives
/// the trading core needs across components.
#[async_trait]
pub trait PersistencePort: Send + Sync {
    async fn get_opportunity(&self, id: OpportunityId) -> Result<Opportunity, PersistenceError>;
    async fn put_opportunity(&self, opportunity: Opportunity) -> Result<(), PersistenceError>;
    async fn list_open_opportunities(&self) -> Result<Vec<Opportunity>, PersistenceError>;

    /// Persist a status transition only if the stored opportunity's status
    /// still matches `expected_status`, otherwise `PersistenceError::Conflict`
    /// (spec.md §4.5: "every transition is persisted through C2 with a
    /// condition on the prior status"). A replayed transition — the stored
    /// status already equals `opportunity.status` — is treated as a
    /// successful no-op rather than a conflict.
    async fn compare_and_swap_opportunity(
        &self,
        opportunity: Opportunity,
        expected_status: OpportunityStatus,
    ) -> Result<Opportunity, PersistenceError>;

    async fn get_trade(&self, id: TradeId) -> Result<Trade, PersistenceError>;
    async fn put_trade(&self, trade: Trade) -> Result<(), PersistenceError>;
    async fn list_open_trades(&self) -> Result<Vec<Trade>, PersistenceError>;

    async fn get_order(&self, id: TradeOrderId) -> Result<TradeOrder, PersistenceError>;
    async fn put_order(&self, order: TradeOrder) -> Result<(), PersistenceError>;

    async fn get_credential(&self, id: CredentialId) -> Result<ApiCredential, PersistenceError>;
    async fn put_credential(&self, credential: ApiCredential) -> Result<(), PersistenceError>;

    async fn get_config(&self, user_id: UserId) -> Result<UserConfiguration, PersistenceError>;

    /// Persist a [`PortfolioSnapshot`] as the account's latest, superseding
    /// whatever was stored before (`spec.md` §3, §4.6 step 1). The Execution
    /// & Risk Engine derives a proposal's account equity from this plus a
    /// live cash-balance read.
    async fn put_snapshot(&self, user_id: UserId, snapshot: PortfolioSnapshot) -> Result<(), PersistenceError>;

    /// The account's most recently stored [`PortfolioSnapshot`], if one has
    /// ever been taken.
    async fn latest_snapshot(&self, user_id: UserId) -> Result<Option<PortfolioSnapshot>, PersistenceError>;

    async fn get_strategy_config(
        &self,
        id: StrategyConfigId,
    ) -> Result<TradingStrategyConfig, PersistenceError>;
    async fn put_strategy_config(&self, config: TradingStrategyConfig) -> Result<(), PersistenceError>;

    /// Optimistic-concurrency write: succeeds only if the stored version
    /// matches `expected_version`, otherwise returns
    /// `PersistenceError::VersionConflict` (spec.md §3, §7).
    async fn compare_and_swap_config(
        &self,
        config: UserConfiguration,
        expected_version: u64,
    ) -> Result<UserConfiguration, PersistenceError>;

    /// Append an immutable audit record (e.g. an AI verdict, a risk
    /// override) to a durable log keyed by `stream`. Never mutated or
    /// deleted.
    async fn append_only(&self, stream: &str, record: serde_json::Value) -> Result<(), PersistenceError>;

    /// Run `body` against a consistent snapshot of a trade and its orders,
    /// retrying on serializable-isolation conflict per
    /// `crate::retry::with_conflict_retry`. Callers use this whenever a
    /// single logical update spans more than one entity (e.g. filling an
    /// order and updating the owning trade's status together).
    async fn with_transaction(
        &self,
        trade_id: TradeId,
        body: Box<dyn FnOnce(Trade, Vec<TradeOrder>) -> Result<(Trade, Vec<TradeOrder>), PersistenceError> + Send>,
    ) -> Result<(Trade, Vec<TradeOrder>), PersistenceError>;
}
