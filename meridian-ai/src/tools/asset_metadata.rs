use crate::tool::Tool;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

/// An external asset-intelligence service (`spec.md` §4.4 step 2: "asset
/// metadata lookup via an external asset-intelligence service").
#[async_trait]
pub trait AssetIntelligenceClient: Send + Sync {
    async fn lookup(&self, asset: &str) -> Result<serde_json::Value, String>;
}

/// A REST-backed `AssetIntelligenceClient`, shaped the same way
/// `meridian_ai::HttpLlmClient` wraps its provider: one endpoint, a bearer
/// token, a bounded timeout, and the vendor's JSON handed back verbatim to
/// the orchestrator rather than remapped into a platform-specific schema.
pub struct HttpAssetIntelligenceClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    timeout: Duration,
}

impl HttpAssetIntelligenceClient {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>, timeout: Duration) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            timeout,
        }
    }
}

#[async_trait]
impl AssetIntelligenceClient for HttpAssetIntelligenceClient {
    #[instrument(skip(self))]
    async fn lookup(&self, asset: &str) -> Result<serde_json::Value, String> {
        let response = self
            .http
            .get(format!("{}/assets/{asset}", self.endpoint))
            .bearer_auth(&self.api_key)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        let status = response.status();
        let bytes = response.bytes().await.map_err(|e| e.to_string())?;
        if !status.is_success() {
            return Err(format!("status {status}: {}", String::from_utf8_lossy(&bytes)));
        }
        serde_json::from_slice(&bytes).map_err(|e| format!("malformed asset-intelligence response: {e}"))
    }
}

pub struct AssetMetadataTool {
    client: Arc<dyn AssetIntelligenceClient>,
}

impl AssetMetadataTool {
    pub fn new(client: Arc<dyn AssetIntelligenceClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for AssetMetadataTool {
    fn name(&self) -> &'static str {
        "asset_metadata_lookup"
    }

    fn input_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {"asset": {"type": "string"}},
            "required": ["asset"],
        })
    }

    fn output_schema(&self) -> serde_json::Value {
        serde_json::json!({"type": "object"})
    }

    async fn invoke(&self, args: serde_json::Value) -> Result<serde_json::Value, String> {
        let asset = args
            .get("asset")
            .and_then(|v| v.as_str())
            .ok_or("missing required field: asset")?;
        self.client.lookup(asset).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StaticClient;

    #[async_trait]
    impl AssetIntelligenceClient for StaticClient {
        async fn lookup(&self, asset: &str) -> Result<serde_json::Value, String> {
            Ok(serde_json::json!({"asset": asset, "market_cap_rank": 1}))
        }
    }

    #[tokio::test]
    async fn forwards_lookup_result_unchanged() {
        let tool = AssetMetadataTool::new(Arc::new(StaticClient));
        let result = tool.invoke(serde_json::json!({"asset": "BTC"})).await.unwrap();
        assert_eq!(result["market_cap_rank"], 1);
    }

    #[tokio::test]
    async fn missing_asset_field_is_rejected() {
        let tool = AssetMetadataTool::new(Arc::new(StaticClient));
        assert!(tool.invoke(serde_json::json!({})).await.is_err());
    }
}
