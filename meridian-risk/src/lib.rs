#![forbid(unsafe_code)]
#![warn(
    unused,
    clippy::cognitive_complexity,
    missing_debug_implementations,
    rust_2018_idioms
)]

//! Risk primitives shared by the Opportunity Engine (C5) and the
//! Execution & Risk Engine (C6): exposure/drawdown/correlation alerting,
//! volatility-scaled sizing, the daily risk ceiling ledger, the
//! concurrent-operations cap, the real-mode slot counter, and the
//! process-wide auto-pause state.

pub mod alert;
pub mod auto_pause;
pub mod concurrency_gate;
pub mod correlation;
pub mod daily_risk;
pub mod drawdown;
pub mod exposure;
pub mod position_tracker;
pub mod real_slots;
pub mod volatility;

pub use alert::{RiskAlertHook, RiskViolation, VecAlertHook};
pub use auto_pause::{AutoPauseState, PauseReason};
pub use concurrency_gate::ConcurrencyGate;
pub use correlation::CorrelationMatrix;
pub use daily_risk::DailyRiskLedger;
pub use drawdown::DrawdownTracker;
pub use exposure::ExposureTracker;
pub use position_tracker::PositionTracker;
pub use real_slots::RealSlotCounter;
pub use volatility::VolatilityScaler;
