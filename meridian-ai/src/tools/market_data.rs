use crate::tool::Tool;
use async_trait::async_trait;
use meridian_data::pull::MarketDataClient;
use meridian_integration::rate_limit::Priority;
use std::sync::Arc;
use std::time::Duration;

/// The agent loop's "market-data lookup" tool (`spec.md` §4.4 step 2):
/// thin wrapper over the C3 pull surface so the LLM can ask for a live
/// ticker without the orchestrator special-casing market data calls.
pub struct MarketDataLookupTool<D> {
    client: Arc<D>,
}

impl<D: MarketDataClient> MarketDataLookupTool<D> {
    pub fn new(client: Arc<D>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl<D: MarketDataClient> Tool for MarketDataLookupTool<D> {
    fn name(&self) -> &'static str {
        "market_data_lookup"
    }

    fn input_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {"symbol": {"type": "string"}},
            "required": ["symbol"],
        })
    }

    fn output_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "last_price": {"type": "string"},
                "high": {"type": "string"},
                "low": {"type": "string"},
                "volume": {"type": "string"},
            },
        })
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(3)
    }

    async fn invoke(&self, args: serde_json::Value) -> Result<serde_json::Value, String> {
        let symbol = args
            .get("symbol")
            .and_then(|v| v.as_str())
            .ok_or("missing required field: symbol")?;

        let tickers = self
            .client
            .get_ticker_24h(Some(symbol), Priority::Discovery)
            .await
            .map_err(|e| e.to_string())?;
        let ticker = tickers.first().ok_or("no ticker returned for symbol")?;

        Ok(serde_json::json!({
            "symbol": ticker.symbol.as_str(),
            "last_price": ticker.last_price.to_string(),
            "high": ticker.high.to_string(),
            "low": ticker.low.to_string(),
            "volume": ticker.volume.to_string(),
        }))
    }
}
