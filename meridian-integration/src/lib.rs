#![forbid(unsafe_code)]
#![warn(
    unused,
    clippy::cognitive_complexity,
    missing_debug_implementations,
    rust_2018_idioms
)]

//! Low-level plumbing shared by every adapter that talks to an external
//! collaborator (exchange REST/WS, AI provider, asset-intelligence
//! provider): channels, a priority token-bucket rate limiter, signed HTTP
//! request scaffolding, and the error taxonomy they all surface through.
//!
//! Mirrors the role `jackbot-integration` plays for the wider Jackbot
//! ecosystem.

pub mod channel;
pub mod error;
pub mod http;
pub mod notification;
pub mod rate_limit;

pub use error::SocketError;
pub use notification::{HttpNotificationSink, NotificationSink};

/// Marker for errors that can never be recovered from by retrying — eg/ a
/// channel send failing because the receiver was dropped.
pub trait Unrecoverable {
    fn is_unrecoverable(&self) -> bool;
}
