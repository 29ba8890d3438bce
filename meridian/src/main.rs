mod config;

use crate::config::Config;
use meridian_ai::tools::{AssetMetadataTool, ExchangeAccountReadTool, HttpAssetIntelligenceClient, MarketDataLookupTool};
use meridian_ai::{AiOrchestrator, HttpLlmClient, OrchestratorConfig, ToolRegistry};
use meridian_core::config::UserConfiguration;
use meridian_core::credential::ApiCredential;
use meridian_core::ids::UserId;
use meridian_data::pull::BinanceRestClient;
use meridian_execution::{AutoPauseThresholds, BinanceExecutionClient, ExecutionEngine};
use meridian_instrument::ExchangeId;
use meridian_integration::channel::mpsc_unbounded;
use meridian_integration::http::HmacSigner;
use meridian_integration::notification::{forward_to_sink, HttpNotificationSink};
use meridian_integration::rate_limit::RateLimiter;
use meridian_opportunity::OpportunityEngine;
use meridian_persistence::{InMemoryPersistence, PersistencePort};
use meridian_risk::{AutoPauseState, ConcurrencyGate, DailyRiskLedger, RealSlotCounter};
use meridian_vault::{CredentialVault, MasterCipher, NoopVerifier, PlaintextSecret};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Per-minute request budget shared by every private/public REST call this
/// process makes to the configured exchange, mirroring the ceiling
/// `meridian-data::pull::BinanceRestClient`'s own test suite exercises.
const EXCHANGE_RATE_LIMIT_CAPACITY: usize = 1200;
const EXCHANGE_RATE_LIMIT_INTERVAL: Duration = Duration::from_secs(60);

fn init_tracing() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().json())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = Config::from_env()?;
    tracing::info!(
        primary_quote_currency = %config.primary_quote_currency,
        real_trading_slots = config.real_trading_slots,
        exchange_testnet = config.exchange_testnet,
        "starting meridian"
    );

    let persistence: Arc<dyn PersistencePort> = Arc::new(InMemoryPersistence::new());

    let operator = UserId::random();
    persistence
        .compare_and_swap_config(UserConfiguration::default_for(operator, chrono::Utc::now()), 0)
        .await?;

    let exchange_id = if config.exchange_testnet {
        ExchangeId::BinanceSpotTestnet
    } else {
        ExchangeId::BinanceSpot
    };

    let cipher = MasterCipher::from_bytes(&config.master_key)?;
    let vault = Arc::new(CredentialVault::new(cipher, Arc::new(NoopVerifier)));
    let operator_credential = ApiCredential::new(operator, exchange_id, "operator-primary", chrono::Utc::now());
    let operator_credential_id = operator_credential.id;
    let operator_secret = std::env::var("MERIDIAN_EXCHANGE_API_SECRET").unwrap_or_default();
    vault
        .put(operator_credential, PlaintextSecret::new(operator_secret.clone()), false)
        .await?;

    let market_data = Arc::new(BinanceRestClient::new(
        config.exchange_base_url.clone(),
        exchange_id,
        RateLimiter::new(EXCHANGE_RATE_LIMIT_CAPACITY, EXCHANGE_RATE_LIMIT_INTERVAL),
        Some(HmacSigner::new(operator_secret.clone())),
    ));

    let execution_client = Arc::new(BinanceExecutionClient::new(
        config.exchange_base_url.clone(),
        HmacSigner::new(operator_secret),
        RateLimiter::new(EXCHANGE_RATE_LIMIT_CAPACITY, EXCHANGE_RATE_LIMIT_INTERVAL),
    ));

    let real_slots = Arc::new(RealSlotCounter::new(config.real_trading_slots));
    let opportunities = Arc::new(OpportunityEngine::new(persistence.clone(), real_slots.clone()));
    let _expiry_sweep = opportunities.clone().spawn_expiry_sweep(Duration::from_secs(30));

    let (notification_tx, notification_rx) = mpsc_unbounded();
    let notification_sink = Arc::new(HttpNotificationSink::new(config.notification_webhook_url.clone()));
    let _notification_fanout = tokio::spawn(forward_to_sink(notification_rx, notification_sink));

    let risk_profile = UserConfiguration::default_for(operator, chrono::Utc::now()).risk_profile;
    let auto_pause_thresholds = AutoPauseThresholds {
        daily_loss_limit_pct: risk_profile.max_daily_loss_pct,
        // No dedicated max-drawdown setting on the risk profile yet; a
        // multiple of the daily loss limit is a conservative stand-in
        // until a configuration field is added.
        max_drawdown_pct: risk_profile.max_daily_loss_pct * rust_decimal::Decimal::new(3, 0),
        max_consecutive_losses: risk_profile.max_consecutive_losses,
    };

    // No HTTP/gRPC surface ships in this process; `_execution` and
    // `_orchestrator` are wired and held alive for a caller embedding this
    // binary's wiring (e.g. behind a future transport) to reach into.
    let _execution = Arc::new(ExecutionEngine::new(
        persistence.clone(),
        opportunities.clone(),
        execution_client,
        Arc::new(DailyRiskLedger::new(chrono::Utc::now())),
        Arc::new(ConcurrencyGate::new()),
        real_slots,
        config.real_trading_slots,
        Arc::new(AutoPauseState::new()),
        auto_pause_thresholds,
        notification_tx,
        operator,
        chrono::Utc::now(),
    ));

    let mut tools = ToolRegistry::new();
    tools.register(Arc::new(MarketDataLookupTool::new(market_data.clone())));
    tools.register(Arc::new(ExchangeAccountReadTool::new(
        market_data.clone(),
        vault.clone(),
        operator_credential_id,
    )));
    tools.register(Arc::new(AssetMetadataTool::new(Arc::new(HttpAssetIntelligenceClient::new(
        config.asset_intelligence_endpoint.clone(),
        config.asset_intelligence_api_key.clone(),
        config.llm_timeout,
    )))));

    let llm = HttpLlmClient::new(config.llm_endpoint.clone(), config.llm_model.clone(), config.llm_timeout);
    let _orchestrator = AiOrchestrator::new(llm, tools, persistence.clone(), market_data.clone())
        .with_config(OrchestratorConfig::default());

    tracing::info!("meridian wired, awaiting shutdown signal");
    tokio::signal::ctrl_c().await?;
    tracing::info!("shutdown signal received, exiting");

    Ok(())
}
