use crate::tool::Tool;
use async_trait::async_trait;
use meridian_core::ids::CredentialId;
use meridian_data::pull::MarketDataClient;
use meridian_integration::rate_limit::Priority;
use meridian_vault::CredentialVault;
use std::sync::Arc;

/// The agent loop's "exchange account read" tool (`spec.md` §4.4 step 2):
/// pulls the caller's own balances. Requires a vault credential purely as
/// an authorization gate — the underlying [`MarketDataClient`] is expected
/// to already be constructed against that same credential's keys, the way
/// `meridian-data::pull::BinanceRestClient` takes an `HmacSigner` at
/// construction rather than per call.
pub struct ExchangeAccountReadTool<D> {
    client: Arc<D>,
    vault: Arc<CredentialVault>,
    credential_id: CredentialId,
}

impl<D: MarketDataClient> ExchangeAccountReadTool<D> {
    pub fn new(client: Arc<D>, vault: Arc<CredentialVault>, credential_id: CredentialId) -> Self {
        Self { client, vault, credential_id }
    }
}

#[async_trait]
impl<D: MarketDataClient> Tool for ExchangeAccountReadTool<D> {
    fn name(&self) -> &'static str {
        "exchange_account_read"
    }

    fn input_schema(&self) -> serde_json::Value {
        serde_json::json!({"type": "object", "properties": {}})
    }

    fn output_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "additionalProperties": {"type": "string"},
            "description": "asset -> balance",
        })
    }

    fn requires_credentials(&self) -> bool {
        true
    }

    async fn invoke(&self, _args: serde_json::Value) -> Result<serde_json::Value, String> {
        let (metadata, _plaintext) = self.vault.get(self.credential_id).map_err(|e| e.to_string())?;
        if !metadata.is_usable() {
            return Err(format!("credential {} is not usable", self.credential_id));
        }

        let balances = self
            .client
            .get_account_balances(Priority::PortfolioValuation)
            .await
            .map_err(|e| e.to_string())?;

        Ok(serde_json::Value::Object(
            balances
                .into_iter()
                .map(|(asset, amount)| (asset, serde_json::Value::String(amount.to_string())))
                .collect(),
        ))
    }
}
