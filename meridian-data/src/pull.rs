use crate::error::DataError;
use crate::event::{Kline, Ticker24h};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use meridian_instrument::{ExchangeId, Instrument};
use meridian_integration::http::HmacSigner;
use meridian_integration::rate_limit::{Priority, RateLimiter};
use rust_decimal::Decimal;
use serde::Deserialize;
use smol_str::SmolStr;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::instrument;

/// The request/response pull surface of the Market Data Hub (`spec.md`
/// §4.3). Every method is queued through the caller-supplied
/// [`RateLimiter`] at the priority the caller requests, suspending
/// cooperatively rather than failing when tokens are scarce.
#[async_trait]
pub trait MarketDataClient: Send + Sync {
    async fn get_klines(
        &self,
        symbol: &str,
        interval: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        limit: u32,
        priority: Priority,
    ) -> Result<Vec<Kline>, DataError>;

    async fn get_ticker_24h(
        &self,
        symbol: Option<&str>,
        priority: Priority,
    ) -> Result<Vec<Ticker24h>, DataError>;

    async fn get_account_balances(&self, priority: Priority) -> Result<BTreeMap<String, Decimal>, DataError>;

    async fn list_pairs(&self, priority: Priority) -> Result<Vec<Instrument>, DataError>;
}

#[derive(Debug, Deserialize)]
struct RawKline(
    i64,     // open time (ms)
    Decimal, // open
    Decimal, // high
    Decimal, // low
    Decimal, // close
    Decimal, // volume
    i64,     // close time (ms)
    #[serde(skip)] serde_json::Value,
    #[serde(skip)] serde_json::Value,
    #[serde(skip)] serde_json::Value,
    #[serde(skip)] serde_json::Value,
    #[serde(skip)] serde_json::Value,
);

#[derive(Debug, Deserialize)]
struct RawTicker24h {
    symbol: String,
    #[serde(rename = "lastPrice")]
    last_price: Decimal,
    #[serde(rename = "priceChangePercent")]
    price_change_pct: Decimal,
    #[serde(rename = "highPrice")]
    high: Decimal,
    #[serde(rename = "lowPrice")]
    low: Decimal,
    volume: Decimal,
}

#[derive(Debug, Deserialize)]
struct RawBalance {
    asset: String,
    free: Decimal,
    locked: Decimal,
}

#[derive(Debug, Deserialize)]
struct RawAccount {
    balances: Vec<RawBalance>,
}

#[derive(Debug, Deserialize)]
struct RawExchangeInfo {
    symbols: Vec<RawSymbol>,
}

#[derive(Debug, Deserialize)]
struct RawSymbol {
    symbol: String,
    #[serde(rename = "baseAsset")]
    base_asset: String,
    #[serde(rename = "quoteAsset")]
    quote_asset: String,
}

fn millis_to_datetime(ms: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ms).single().unwrap_or_else(Utc::now)
}

/// A Binance-shaped REST client implementing [`MarketDataClient`]. Signed
/// endpoints (`get_account_balances`) require an [`HmacSigner`]; public
/// endpoints do not.
pub struct BinanceRestClient {
    http: reqwest::Client,
    base_url: String,
    exchange: ExchangeId,
    rate_limiter: RateLimiter,
    signer: Option<HmacSigner>,
}

impl BinanceRestClient {
    pub fn new(
        base_url: impl Into<String>,
        exchange: ExchangeId,
        rate_limiter: RateLimiter,
        signer: Option<HmacSigner>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            exchange,
            rate_limiter,
            signer,
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
        signed: bool,
        priority: Priority,
    ) -> Result<T, DataError> {
        self.rate_limiter.acquire(priority).await;

        let mut query = query.to_vec();
        if signed {
            let signer = self
                .signer
                .as_ref()
                .ok_or_else(|| DataError::UnexpectedResponse("signed request has no signer configured".into()))?;
            let query_string = query
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect::<Vec<_>>()
                .join("&");
            query.push(("signature", signer.sign(&query_string)));
        }

        let response = self
            .http
            .get(format!("{}{}", self.base_url, path))
            .query(&query)
            .timeout(Duration::from_secs(3))
            .send()
            .await
            .map_err(meridian_integration::SocketError::from)?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(meridian_integration::SocketError::from)?;

        if !status.is_success() {
            return Err(DataError::UnexpectedResponse(format!(
                "status {status}: {}",
                String::from_utf8_lossy(&bytes)
            )));
        }

        serde_json::from_slice(&bytes)
            .map_err(|e| DataError::UnexpectedResponse(format!("deserialise failure: {e}")))
    }
}

#[async_trait]
impl MarketDataClient for BinanceRestClient {
    #[instrument(skip(self))]
    async fn get_klines(
        &self,
        symbol: &str,
        interval: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        limit: u32,
        priority: Priority,
    ) -> Result<Vec<Kline>, DataError> {
        let query = vec![
            ("symbol", symbol.to_string()),
            ("interval", interval.to_string()),
            ("startTime", start.timestamp_millis().to_string()),
            ("endTime", end.timestamp_millis().to_string()),
            ("limit", limit.to_string()),
        ];
        let raw: Vec<RawKline> = self.get_json("/api/v3/klines", &query, false, priority).await?;
        Ok(raw
            .into_iter()
            .map(|k| Kline {
                symbol: SmolStr::new(symbol),
                interval: SmolStr::new(interval),
                open_time: millis_to_datetime(k.0),
                close_time: millis_to_datetime(k.6),
                open: k.1,
                high: k.2,
                low: k.3,
                close: k.4,
                volume: k.5,
                is_final: true,
            })
            .collect())
    }

    #[instrument(skip(self))]
    async fn get_ticker_24h(
        &self,
        symbol: Option<&str>,
        priority: Priority,
    ) -> Result<Vec<Ticker24h>, DataError> {
        let mut query = Vec::new();
        if let Some(symbol) = symbol {
            query.push(("symbol", symbol.to_string()));
        }
        let now = Utc::now();
        let to_ticker = |raw: RawTicker24h| Ticker24h {
            symbol: SmolStr::new(raw.symbol),
            last_price: raw.last_price,
            price_change_pct: raw.price_change_pct,
            high: raw.high,
            low: raw.low,
            volume: raw.volume,
            event_time: now,
        };

        if symbol.is_some() {
            let raw: RawTicker24h = self.get_json("/api/v3/ticker/24hr", &query, false, priority).await?;
            Ok(vec![to_ticker(raw)])
        } else {
            let raw: Vec<RawTicker24h> = self.get_json("/api/v3/ticker/24hr", &query, false, priority).await?;
            Ok(raw.into_iter().map(to_ticker).collect())
        }
    }

    #[instrument(skip(self))]
    async fn get_account_balances(&self, priority: Priority) -> Result<BTreeMap<String, Decimal>, DataError> {
        let timestamp = Utc::now().timestamp_millis().to_string();
        let query = vec![("timestamp", timestamp)];
        let raw: RawAccount = self.get_json("/api/v3/account", &query, true, priority).await?;
        Ok(raw
            .balances
            .into_iter()
            .filter(|b| b.free + b.locked > Decimal::ZERO)
            .map(|b| (b.asset, b.free + b.locked))
            .collect())
    }

    #[instrument(skip(self))]
    async fn list_pairs(&self, priority: Priority) -> Result<Vec<Instrument>, DataError> {
        let raw: RawExchangeInfo = self
            .get_json("/api/v3/exchangeInfo", &[], false, priority)
            .await?;
        Ok(raw
            .symbols
            .into_iter()
            .map(|s| {
                Instrument::spot(
                    self.exchange,
                    s.symbol,
                    s.base_asset,
                    s.quote_asset,
                    meridian_instrument::InstrumentSpec::default(),
                )
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn millis_conversion_round_trips_through_timestamp() {
        let now = Utc::now();
        let ms = now.timestamp_millis();
        let back = millis_to_datetime(ms);
        assert_eq!(back.timestamp_millis(), ms);
    }
}
