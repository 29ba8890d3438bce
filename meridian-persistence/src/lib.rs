#![forbid(unsafe_code)]
#![warn(
    unused,
    clippy::cognitive_complexity,
    missing_debug_implementations,
    rust_2018_idioms
)]

//! The Persistence Port (C2): a narrow storage capability every other
//! component programs against instead of a concrete database, plus an
//! in-memory reference implementation and the bounded jittered retry
//! helper for serializable-isolation conflicts.

mod error;
mod in_memory;
mod port;
mod retry;

pub use error::PersistenceError;
pub use in_memory::InMemoryPersistence;
pub use port::PersistencePort;
pub use retry::with_conflict_retry;
