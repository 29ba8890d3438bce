use meridian_core::ids::OpportunityId;
use parking_lot::Mutex as SyncMutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// In-memory per-opportunity mutual exclusion (`spec.md` §4.4): the same
/// opportunity is never analyzed twice concurrently. Backed by the
/// `under_ai_analysis` status fence for the durable half of the guarantee;
/// this registry only needs to hold the line within one process's lifetime.
#[derive(Debug, Default)]
pub struct OpportunityGuards {
    locks: SyncMutex<HashMap<OpportunityId, Arc<Mutex<()>>>>,
}

impl OpportunityGuards {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_for(&self, id: OpportunityId) -> Arc<Mutex<()>> {
        self.locks.lock().entry(id).or_insert_with(|| Arc::new(Mutex::new(()))).clone()
    }

    /// Acquire the guard for `id` without blocking, returning `None` if
    /// analysis is already underway elsewhere in this process.
    pub fn try_acquire(&self, id: OpportunityId) -> Option<OwnedMutexGuard<()>> {
        self.lock_for(id).try_lock_owned().ok()
    }
}
