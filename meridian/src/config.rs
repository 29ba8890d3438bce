use std::time::Duration;

/// Everything the process needs before it can wire up a single component,
/// read once at startup from the environment (`spec.md` §3 ambient stack
/// note). No config file format, no hot reload — an operator restarts the
/// process to change any of this, the way `jackbot`'s own binary reads
/// exchange/testnet endpoints from constants rather than a config crate.
#[derive(Debug, Clone)]
pub struct Config {
    /// 32 raw bytes for `MasterCipher::from_bytes`, hex-decoded from
    /// `MERIDIAN_MASTER_KEY`. Never logged.
    pub master_key: [u8; 32],
    pub primary_quote_currency: String,
    pub real_trading_slots: u32,
    pub exchange_base_url: String,
    pub exchange_testnet: bool,
    pub llm_endpoint: String,
    pub llm_model: String,
    pub llm_timeout: Duration,
    pub asset_intelligence_endpoint: String,
    pub asset_intelligence_api_key: String,
    pub notification_webhook_url: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    Missing(&'static str),
    #[error("{0} must decode to exactly 32 bytes of hex, got {1}")]
    BadMasterKey(&'static str, usize),
    #[error("{0} is not a valid integer: {1}")]
    BadInteger(&'static str, std::num::ParseIntError),
}

impl Config {
    /// Read every setting from the process environment. Fails fast on
    /// anything missing or malformed rather than falling back to a
    /// production-unsafe default (there is no safe default master key).
    pub fn from_env() -> Result<Self, ConfigError> {
        let master_key_hex = require_env("MERIDIAN_MASTER_KEY")?;
        let master_key_bytes =
            hex::decode(&master_key_hex).map_err(|_| ConfigError::BadMasterKey("MERIDIAN_MASTER_KEY", master_key_hex.len()))?;
        let master_key: [u8; 32] = master_key_bytes
            .try_into()
            .map_err(|v: Vec<u8>| ConfigError::BadMasterKey("MERIDIAN_MASTER_KEY", v.len()))?;

        let real_trading_slots = optional_env("MERIDIAN_REAL_TRADING_SLOTS")
            .map(|raw| raw.parse::<u32>().map_err(|e| ConfigError::BadInteger("MERIDIAN_REAL_TRADING_SLOTS", e)))
            .transpose()?
            .unwrap_or(3);

        let llm_timeout_secs = optional_env("MERIDIAN_LLM_TIMEOUT_SECS")
            .map(|raw| raw.parse::<u64>().map_err(|e| ConfigError::BadInteger("MERIDIAN_LLM_TIMEOUT_SECS", e)))
            .transpose()?
            .unwrap_or(30);

        Ok(Self {
            master_key,
            primary_quote_currency: optional_env("MERIDIAN_PRIMARY_QUOTE_CURRENCY").unwrap_or_else(|| "USDT".to_string()),
            real_trading_slots,
            exchange_base_url: optional_env("MERIDIAN_EXCHANGE_BASE_URL")
                .unwrap_or_else(|| "https://api.binance.com".to_string()),
            exchange_testnet: optional_env("MERIDIAN_EXCHANGE_TESTNET")
                .map(|raw| raw == "1" || raw.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
            llm_endpoint: require_env("MERIDIAN_LLM_ENDPOINT")?,
            llm_model: optional_env("MERIDIAN_LLM_MODEL").unwrap_or_else(|| "default".to_string()),
            llm_timeout: Duration::from_secs(llm_timeout_secs),
            asset_intelligence_endpoint: require_env("MERIDIAN_ASSET_INTELLIGENCE_ENDPOINT")?,
            asset_intelligence_api_key: require_env("MERIDIAN_ASSET_INTELLIGENCE_API_KEY")?,
            notification_webhook_url: require_env("MERIDIAN_NOTIFICATION_WEBHOOK_URL")?,
        })
    }
}

fn require_env(key: &'static str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::Missing(key))
}

fn optional_env(key: &'static str) -> Option<String> {
    std::env::var(key).ok()
}
