use serde::{Deserialize, Serialize};

pub mod stream;

/// [`ReconnectingStream`](stream::ReconnectingStream) `Event` that
/// communicates either a `Stream::Item`, or that the inner `Stream` has
/// disconnected and is currently reconnecting (`spec.md` §4.3's
/// `reconnected` marker).
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub enum Event<Origin, T> {
    Reconnecting(Origin),
    Item(T),
}

impl<Origin, T> Event<Origin, T> {
    pub fn map<F, O>(self, op: F) -> Event<Origin, O>
    where
        F: FnOnce(T) -> O,
    {
        match self {
            Event::Reconnecting(origin) => Event::Reconnecting(origin),
            Event::Item(item) => Event::Item(op(item)),
        }
    }
}

impl<Origin, T, E> Event<Origin, Result<T, E>> {
    pub fn map_ok<F, O>(self, op: F) -> Event<Origin, Result<O, E>>
    where
        F: FnOnce(T) -> O,
    {
        match self {
            Event::Reconnecting(origin) => Event::Reconnecting(origin),
            Event::Item(result) => Event::Item(result.map(op)),
        }
    }
}
