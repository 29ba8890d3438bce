use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use meridian_core::order::TradeOrderType;
use meridian_core::trade::TradeSide;
use meridian_integration::http::HmacSigner;
use meridian_integration::rate_limit::{Priority, RateLimiter};
use rust_decimal::Decimal;
use serde::Deserialize;

/// A request to place one order, already sized and rounded (`spec.md`
/// §4.6). `client_order_id` is the deterministic idempotency anchor —
/// exchanges that support it echo it back on every fill/cancel report.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderRequest {
    pub client_order_id: String,
    pub symbol: String,
    pub side: TradeSide,
    pub order_type: TradeOrderType,
    pub quantity: Decimal,
    pub limit_price: Option<Decimal>,
}

/// What the venue (or the paper simulator) reported back at submission
/// time. `on_order_event` carries the subsequent fill/cancel lifecycle;
/// this is only the synchronous acknowledgement.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionAck {
    pub exchange_order_id: String,
    pub accepted_at: DateTime<Utc>,
}

/// The external seam for actually placing and cancelling orders (`spec.md`
/// §6's `ExchangeClient`), following the teacher's `ExecutionClient`
/// trait-object pattern: one call-shape regardless of venue, so
/// `ExecutionEngine` never hardcodes a specific exchange's wire format.
#[async_trait]
pub trait ExchangeClient: Send + Sync {
    async fn submit_order(&self, request: OrderRequest) -> Result<SubmissionAck, String>;
    async fn cancel_order(&self, symbol: &str, exchange_order_id: &str) -> Result<(), String>;
}

/// Simulates an immediate fill at the supplied mark price with optional
/// slippage, for `execute_paper` (`spec.md` §4.6). Never touches a real
/// venue; `accepted_at` and `exchange_order_id` are synthesized locally.
#[derive(Debug, Clone, Copy)]
pub struct PaperExchangeClient {
    pub slippage_bps: Decimal,
}

impl PaperExchangeClient {
    pub fn new(slippage_bps: Decimal) -> Self {
        Self { slippage_bps }
    }
}

#[async_trait]
impl ExchangeClient for PaperExchangeClient {
    async fn submit_order(&self, request: OrderRequest) -> Result<SubmissionAck, String> {
        let _ = request;
        Ok(SubmissionAck {
            exchange_order_id: format!("paper-{}", uuid::Uuid::new_v4()),
            accepted_at: Utc::now(),
        })
    }

    async fn cancel_order(&self, _symbol: &str, _exchange_order_id: &str) -> Result<(), String> {
        Ok(())
    }
}

fn side_str(side: TradeSide) -> &'static str {
    match side {
        TradeSide::Long => "BUY",
        TradeSide::Short => "SELL",
    }
}

fn order_type_str(order_type: TradeOrderType) -> &'static str {
    match order_type {
        TradeOrderType::Market => "MARKET",
        TradeOrderType::Limit => "LIMIT",
        TradeOrderType::StopMarket => "STOP_LOSS",
        TradeOrderType::StopLimit => "STOP_LOSS_LIMIT",
    }
}

#[derive(Debug, Deserialize)]
struct RawOrderAck {
    #[serde(rename = "orderId")]
    order_id: i64,
    #[serde(rename = "transactTime")]
    transact_time: i64,
}

#[derive(Debug, Deserialize)]
struct RawApiError {
    msg: String,
}

/// A Binance-shaped REST `ExchangeClient`, signed the same way
/// `BinanceRestClient` signs its private endpoints (`spec.md` §6). This is
/// the one concrete venue adapter this platform ships; every other
/// exchange is a further `ExchangeClient` impl an operator supplies.
pub struct BinanceExecutionClient {
    http: reqwest::Client,
    base_url: String,
    signer: HmacSigner,
    rate_limiter: RateLimiter,
}

impl BinanceExecutionClient {
    pub fn new(base_url: impl Into<String>, signer: HmacSigner, rate_limiter: RateLimiter) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            signer,
            rate_limiter,
        }
    }

    fn signed_query(&self, params: &[(&str, String)]) -> Vec<(String, String)> {
        let query_string = params
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&");
        let mut signed: Vec<(String, String)> =
            params.iter().map(|(k, v)| (k.to_string(), v.clone())).collect();
        signed.push(("signature".into(), self.signer.sign(&query_string)));
        signed
    }

    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, String> {
        let status = response.status();
        let bytes = response.bytes().await.map_err(|e| e.to_string())?;
        if status.is_success() {
            serde_json::from_slice(&bytes).map_err(|e| format!("deserialise failure: {e}"))
        } else if let Ok(api_error) = serde_json::from_slice::<RawApiError>(&bytes) {
            Err(format!("venue rejected order: {}", api_error.msg))
        } else {
            Err(format!("status {status}: {}", String::from_utf8_lossy(&bytes)))
        }
    }
}

#[async_trait]
impl ExchangeClient for BinanceExecutionClient {
    async fn submit_order(&self, request: OrderRequest) -> Result<SubmissionAck, String> {
        self.rate_limiter.acquire(Priority::Execution).await;

        let mut params = vec![
            ("symbol", request.symbol.clone()),
            ("side", side_str(request.side).to_string()),
            ("type", order_type_str(request.order_type).to_string()),
            ("quantity", request.quantity.to_string()),
            ("newClientOrderId", request.client_order_id.clone()),
            ("timestamp", Utc::now().timestamp_millis().to_string()),
        ];
        if let Some(limit_price) = request.limit_price {
            params.push(("price", limit_price.to_string()));
            params.push(("timeInForce", "GTC".to_string()));
        }
        let query: Vec<(&str, String)> = params.iter().map(|(k, v)| (*k, v.clone())).collect();
        let signed = self.signed_query(&query);

        let response = self
            .http
            .post(format!("{}/api/v3/order", self.base_url))
            .query(&signed)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        let ack: RawOrderAck = Self::parse_response(response).await?;
        Ok(SubmissionAck {
            exchange_order_id: ack.order_id.to_string(),
            accepted_at: Utc
                .timestamp_millis_opt(ack.transact_time)
                .single()
                .unwrap_or_else(Utc::now),
        })
    }

    async fn cancel_order(&self, symbol: &str, exchange_order_id: &str) -> Result<(), String> {
        self.rate_limiter.acquire(Priority::Execution).await;

        let params = vec![
            ("symbol", symbol.to_string()),
            ("orderId", exchange_order_id.to_string()),
            ("timestamp", Utc::now().timestamp_millis().to_string()),
        ];
        let signed = self.signed_query(&params);

        let response = self
            .http
            .delete(format!("{}/api/v3/order", self.base_url))
            .query(&signed)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(Self::parse_response::<RawOrderAck>(response).await.unwrap_err())
        }
    }
}
