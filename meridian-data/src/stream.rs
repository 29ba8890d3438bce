use crate::dedupe::DedupeWindow;
use crate::error::DataError;
use crate::event::MarketDataEvent;
use crate::reconnect::stream::{
    init_reconnecting_stream, ReconnectingStream, ReconnectionBackoffPolicy, StreamKey,
};
use crate::reconnect::Event;
use futures::Stream;
use futures_util::StreamExt;
use meridian_instrument::ExchangeId;
use std::pin::Pin;
use tracing::warn;

/// One logical subscription to the stream surface (`spec.md` §4.3):
/// `kline_<interval>`, `ticker`, `miniTicker_array`, `depth<levels>`, or
/// `user_data_stream`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Channel {
    Kline { symbol: String, interval: String },
    Ticker { symbol: String },
    MiniTickerArray,
    Depth { symbol: String, levels: u8 },
    UserDataStream,
}

impl Channel {
    fn kind(&self) -> &'static str {
        match self {
            Channel::Kline { .. } => "kline",
            Channel::Ticker { .. } => "ticker",
            Channel::MiniTickerArray => "mini_ticker_array",
            Channel::Depth { .. } => "depth",
            Channel::UserDataStream => "user_data_stream",
        }
    }
}

type RawMarketEvent = Result<MarketDataEvent, DataError>;
type RawEventStream = Pin<Box<dyn Stream<Item = RawMarketEvent> + Send>>;

/// Opens the raw (pre-reconnect, pre-dedupe) event stream for a channel,
/// called once per connection attempt by the Hub's reconnect driver — once
/// for the initial subscription and again on every reconnect.
#[async_trait::async_trait]
pub trait ChannelConnector: Send + Sync + 'static {
    async fn connect(&self, channel: &Channel) -> Result<RawEventStream, DataError>;
}

/// The Market Data Hub's stream surface (`spec.md` §4.3): multiplexes a
/// subscription onto a reconnecting, deduplicated event stream, emitting
/// `Event::Reconnecting` whenever the underlying connection is
/// re-established so stateful consumers know to re-synchronize.
pub struct MarketDataHub<C> {
    exchange: ExchangeId,
    connector: std::sync::Arc<C>,
    backoff_policy: ReconnectionBackoffPolicy,
    dedupe_capacity: usize,
}

impl<C: ChannelConnector> MarketDataHub<C> {
    pub fn new(exchange: ExchangeId, connector: C) -> Self {
        Self {
            exchange,
            connector: std::sync::Arc::new(connector),
            backoff_policy: ReconnectionBackoffPolicy::market_data_default(),
            dedupe_capacity: 4096,
        }
    }

    pub fn with_backoff_policy(mut self, policy: ReconnectionBackoffPolicy) -> Self {
        self.backoff_policy = policy;
        self
    }

    /// Subscribe to a single channel, returning a lazy, unbounded sequence
    /// of deduplicated [`MarketDataEvent`]s wrapped in reconnect markers.
    /// Dropping the returned stream cancels the subscription immediately
    /// on the consumer's side; the underlying connection is torn down in
    /// the background.
    pub async fn subscribe(
        &self,
        channel: Channel,
    ) -> Result<impl Stream<Item = Event<ExchangeId, RawMarketEvent>>, DataError> {
        let stream_key = StreamKey::new(self.exchange, channel.kind());
        let exchange = self.exchange;
        let dedupe_capacity = self.dedupe_capacity;

        let connector = self.connector.clone();
        let channel_for_init = channel.clone();
        let init = move || {
            let connector = connector.clone();
            let channel = channel_for_init.clone();
            async move { connector.connect(&channel).await }
        };

        let reconnecting = init_reconnecting_stream(init)
            .await?
            .with_reconnect_backoff(self.backoff_policy, stream_key)
            .with_termination_on_error(|_: &DataError| true, stream_key)
            .with_reconnection_events(exchange);

        let mut window = DedupeWindow::new(dedupe_capacity);
        Ok(reconnecting.filter_map(move |event| {
            let keep = match &event {
                Event::Item(Ok(item)) => {
                    window.admit(item.event_id.clone(), item.symbol.clone(), item.event_time)
                }
                Event::Item(Err(_)) | Event::Reconnecting(_) => true,
            };
            if !keep {
                warn!(?stream_key, "dropped duplicate market data event");
            }
            futures::future::ready(keep.then_some(event))
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{MarketDataPayload, Ticker24h};
    use rust_decimal_macros::dec;
    use smol_str::SmolStr;

    fn ticker_event(event_id: &str) -> RawMarketEvent {
        Ok(MarketDataEvent {
            event_id: SmolStr::new(event_id),
            symbol: SmolStr::new("BTCUSDT"),
            event_time: chrono::Utc::now(),
            payload: MarketDataPayload::Ticker(Ticker24h {
                symbol: SmolStr::new("BTCUSDT"),
                last_price: dec!(30000),
                price_change_pct: dec!(1.2),
                high: dec!(30500),
                low: dec!(29500),
                volume: dec!(1000),
                event_time: chrono::Utc::now(),
            }),
        })
    }

    struct ScriptedConnector;

    #[async_trait::async_trait]
    impl ChannelConnector for ScriptedConnector {
        async fn connect(&self, _channel: &Channel) -> Result<RawEventStream, DataError> {
            let events = vec![ticker_event("evt-1"), ticker_event("evt-1"), ticker_event("evt-2")];
            Ok(Box::pin(futures::stream::iter(events)))
        }
    }

    #[tokio::test]
    async fn subscription_drops_repeated_event_id() {
        let hub = MarketDataHub::new(ExchangeId::BinanceSpot, ScriptedConnector);
        let stream = hub
            .subscribe(Channel::Ticker { symbol: "BTCUSDT".into() })
            .await
            .unwrap();
        let items: Vec<_> = stream.take(2).collect().await;
        assert_eq!(
            items
                .iter()
                .filter(|e| matches!(e, Event::Item(Ok(_))))
                .count(),
            2
        );
    }
}
