use crate::reconnect::Event;
use derive_more::Constructor;
use futures::Stream;
use futures_util::StreamExt;
use meridian_instrument::ExchangeId;
use meridian_integration::channel::Tx;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::{convert, fmt::Debug, future, future::Future};
use tracing::{error, info, warn};

/// Identifies a long-lived stream for logging purposes: which exchange it
/// talks to and what kind of channel it carries (`kline_1m`, `ticker`, …).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct StreamKey {
    pub exchange: ExchangeId,
    pub kind: &'static str,
}

impl StreamKey {
    pub const fn new(exchange: ExchangeId, kind: &'static str) -> Self {
        Self { exchange, kind }
    }
}

/// Utilities for handling a continually reconnecting [`Stream`] initialised
/// via [`init_reconnecting_stream`].
pub trait ReconnectingStream
where
    Self: Stream + Sized,
{
    /// Add an exponential backoff policy to an initialised
    /// [`ReconnectingStream`] using the provided [`ReconnectionBackoffPolicy`].
    fn with_reconnect_backoff<St, InitError>(
        self,
        policy: ReconnectionBackoffPolicy,
        stream_key: StreamKey,
    ) -> impl Stream<Item = St>
    where
        Self: Stream<Item = Result<St, InitError>>,
        St: Stream,
        InitError: Debug,
    {
        self.enumerate()
            .scan(
                ReconnectionState::from(policy),
                move |state, (attempt, result)| match result {
                    Ok(stream) => {
                        info!(attempt, ?stream_key, "successfully initialised stream");
                        state.reset_backoff();
                        futures::future::Either::Left(future::ready(Some(Ok(stream))))
                    }
                    Err(error) => {
                        warn!(attempt, ?stream_key, ?error, "failed to re-initialise stream");
                        let sleep_duration = state.generate_sleep_duration();
                        let sleep_fut = tokio::time::sleep(sleep_duration);
                        state.multiply_backoff();
                        futures::future::Either::Right(Box::pin(async move {
                            info!(?stream_key, ?sleep_duration, "waiting before reconnect attempt");
                            sleep_fut.await;
                            Some(Err(error))
                        }))
                    }
                },
            )
            .filter_map(|result| future::ready(result.ok()))
    }

    /// Terminates the inner [`Stream`] when the encountered error is
    /// unrecoverable, causing the outer [`ReconnectingStream`] to
    /// re-initialise.
    fn with_termination_on_error<St, T, E, FnIsTerminal>(
        self,
        is_terminal: FnIsTerminal,
        stream_key: StreamKey,
    ) -> impl Stream<Item = impl Stream<Item = Result<T, E>>>
    where
        Self: Stream<Item = St>,
        St: Stream<Item = Result<T, E>>,
        FnIsTerminal: Fn(&E) -> bool + Copy,
    {
        self.map(move |stream| {
            tokio_stream::StreamExt::map_while(stream, move |result| match result {
                Ok(item) => Some(Ok(item)),
                Err(error) if is_terminal(&error) => {
                    error!(?stream_key, "stream encountered terminal error, reconnecting");
                    None
                }
                Err(error) => Some(Err(error)),
            })
        })
    }

    /// Maps every item into [`Event::Item`], chaining an
    /// [`Event::Reconnecting`] whenever the inner stream ends.
    fn with_reconnection_events<St, Origin>(
        self,
        origin: Origin,
    ) -> impl Stream<Item = Event<Origin, St::Item>>
    where
        Self: Stream<Item = St>,
        St: Stream,
        Origin: Clone + 'static,
    {
        self.map(move |stream| {
            stream
                .map(Event::Item)
                .chain(futures::stream::once(future::ready(Event::Reconnecting(
                    origin.clone(),
                ))))
        })
        .flatten()
    }

    /// Logs and filters out recoverable errors, leaving a stream of
    /// successful items.
    fn with_error_handler<FnOnErr, Origin, T, E>(self, op: FnOnErr) -> impl Stream<Item = Event<Origin, T>>
    where
        Self: Stream<Item = Event<Origin, Result<T, E>>>,
        FnOnErr: Fn(E) + 'static,
    {
        self.filter_map(move |event| {
            future::ready(match event {
                Event::Reconnecting(origin) => Some(Event::Reconnecting(origin)),
                Event::Item(Ok(item)) => Some(Event::Item(item)),
                Event::Item(Err(error)) => {
                    op(error);
                    None
                }
            })
        })
    }

    /// Forwards every item to the provided channel [`Tx`].
    fn forward_to<Transmitter>(self, tx: Transmitter) -> impl Future<Output = ()> + Send
    where
        Self: Stream + Sized + Send,
        Self::Item: Into<Transmitter::Item>,
        Transmitter: Tx + Send + 'static,
    {
        tokio_stream::StreamExt::map_while(self, move |event| tx.send(event.into()).ok()).collect()
    }
}

impl<T> ReconnectingStream for T where T: Stream {}

/// Initialise a [`ReconnectingStream`] using the provided initialisation
/// closure, retrying it indefinitely every time the previously initialised
/// stream ends.
pub async fn init_reconnecting_stream<FnInit, St, FnInitError, FnInitFut>(
    init_stream: FnInit,
) -> Result<impl Stream<Item = Result<St, FnInitError>>, FnInitError>
where
    FnInit: Fn() -> FnInitFut,
    FnInitFut: Future<Output = Result<St, FnInitError>>,
{
    let initial = init_stream().await?;
    let reconnections = futures::stream::repeat_with(init_stream).then(convert::identity);

    Ok(futures::stream::once(future::ready(Ok(initial))).chain(reconnections))
}

/// Reconnection backoff policy: spec.md §4.3 calls for 1s, 2s, 4s, …,
/// capped, with jitter to avoid thundering-herd reconnects.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize, Constructor)]
pub struct ReconnectionBackoffPolicy {
    pub backoff_ms_initial: u64,
    pub backoff_multiplier: u8,
    pub backoff_ms_max: u64,
    pub jitter_ms: u64,
}

impl ReconnectionBackoffPolicy {
    /// 1s, 2s, 4s, … capped at 60s, up to 250ms of jitter — the default
    /// policy spec.md §4.3 describes for market-data stream reconnects.
    pub const fn market_data_default() -> Self {
        Self {
            backoff_ms_initial: 1_000,
            backoff_multiplier: 2,
            backoff_ms_max: 60_000,
            jitter_ms: 250,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
struct ReconnectionState {
    policy: ReconnectionBackoffPolicy,
    backoff_ms_current: u64,
}

impl From<ReconnectionBackoffPolicy> for ReconnectionState {
    fn from(policy: ReconnectionBackoffPolicy) -> Self {
        Self {
            backoff_ms_current: policy.backoff_ms_initial,
            policy,
        }
    }
}

impl ReconnectionState {
    fn reset_backoff(&mut self) {
        self.backoff_ms_current = self.policy.backoff_ms_initial;
    }

    fn multiply_backoff(&mut self) {
        let next = self.backoff_ms_current * self.policy.backoff_multiplier as u64;
        self.backoff_ms_current = next.min(self.policy.backoff_ms_max);
    }

    fn generate_sleep_duration(&self) -> std::time::Duration {
        let jitter = if self.policy.jitter_ms > 0 {
            rand::rng().random_range(0..=self.policy.jitter_ms)
        } else {
            0
        };
        std::time::Duration::from_millis(self.backoff_ms_current + jitter)
    }
}
