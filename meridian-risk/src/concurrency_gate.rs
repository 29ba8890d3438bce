use parking_lot::Mutex;

/// Caps the number of Trades simultaneously open (`pending_entry`, `opening`,
/// `open`, `partially_closed`) against `maxConcurrentOperations`
/// (`spec.md` §4.6 position-sizing step 4). The counter is a plain guard:
/// the opportunity engine increments on entry, decrements on terminal
/// transition, mirroring the at-most-once reservation shape of
/// `crate::real_slots::RealSlotCounter` but without the exclusivity
/// requirement (many paper/real trades may be open concurrently, just not
/// more than the cap).
#[derive(Debug)]
pub struct ConcurrencyGate {
    open: Mutex<u32>,
}

impl ConcurrencyGate {
    pub fn new() -> Self {
        Self { open: Mutex::new(0) }
    }

    /// Reserve a slot if under `max_concurrent`. Returns `true` if reserved.
    pub fn try_reserve(&self, max_concurrent: u32) -> bool {
        let mut open = self.open.lock();
        if *open >= max_concurrent {
            false
        } else {
            *open += 1;
            true
        }
    }

    /// Release a previously reserved slot once its Trade reaches a terminal
    /// state.
    pub fn release(&self) {
        let mut open = self.open.lock();
        if *open > 0 {
            *open -= 1;
        }
    }

    pub fn currently_open(&self) -> u32 {
        *self.open.lock()
    }
}

impl Default for ConcurrencyGate {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reservation_is_refused_once_the_cap_is_reached() {
        let gate = ConcurrencyGate::new();
        assert!(gate.try_reserve(2));
        assert!(gate.try_reserve(2));
        assert!(!gate.try_reserve(2));
        assert_eq!(gate.currently_open(), 2);
    }

    #[test]
    fn releasing_a_slot_allows_a_new_reservation() {
        let gate = ConcurrencyGate::new();
        assert!(gate.try_reserve(1));
        assert!(!gate.try_reserve(1));
        gate.release();
        assert!(gate.try_reserve(1));
    }
}
