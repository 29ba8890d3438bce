use chrono::{DateTime, Utc};
use smol_str::SmolStr;
use std::collections::VecDeque;

/// Identifies a single market event for duplicate suppression: `spec.md`
/// §4.3 keys on `(event_id, symbol, event_time)` since neither field alone
/// is guaranteed unique (the same `event_id` can be reused across symbols
/// on some venues; clock skew can repeat an `event_time`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct DedupeKey {
    event_id: SmolStr,
    symbol: SmolStr,
    event_time: DateTime<Utc>,
}

/// Drops duplicate events observed within a sliding window, per `spec.md`
/// §4.3. The window is bounded by count rather than wall-clock time, since
/// the Hub has no reliable wall-clock signal independent of the events
/// themselves (their `event_time` is upstream-supplied and not trustworthy
/// for self-pacing).
pub struct DedupeWindow {
    capacity: usize,
    seen: std::collections::HashSet<DedupeKey>,
    order: VecDeque<DedupeKey>,
}

impl DedupeWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            seen: std::collections::HashSet::new(),
            order: VecDeque::new(),
        }
    }

    /// Returns `true` if this is the first time the key has been observed
    /// within the current window; `false` if it's a duplicate to be
    /// dropped.
    pub fn admit(
        &mut self,
        event_id: impl Into<SmolStr>,
        symbol: impl Into<SmolStr>,
        event_time: DateTime<Utc>,
    ) -> bool {
        let key = DedupeKey {
            event_id: event_id.into(),
            symbol: symbol.into(),
            event_time,
        };

        if self.seen.contains(&key) {
            return false;
        }

        if self.order.len() >= self.capacity {
            if let Some(evicted) = self.order.pop_front() {
                self.seen.remove(&evicted);
            }
        }

        self.order.push_back(key.clone());
        self.seen.insert(key);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_event_is_rejected_within_window() {
        let mut window = DedupeWindow::new(4);
        let now = Utc::now();
        assert!(window.admit("evt-1", "BTCUSDT", now));
        assert!(!window.admit("evt-1", "BTCUSDT", now));
    }

    #[test]
    fn same_event_id_on_different_symbol_is_distinct() {
        let mut window = DedupeWindow::new(4);
        let now = Utc::now();
        assert!(window.admit("evt-1", "BTCUSDT", now));
        assert!(window.admit("evt-1", "ETHUSDT", now));
    }

    #[test]
    fn eviction_allows_readmission_once_outside_window() {
        let mut window = DedupeWindow::new(2);
        let now = Utc::now();
        assert!(window.admit("evt-1", "BTCUSDT", now));
        assert!(window.admit("evt-2", "BTCUSDT", now));
        assert!(window.admit("evt-3", "BTCUSDT", now));
        // evt-1 has been evicted, so it is readmitted as if new.
        assert!(window.admit("evt-1", "BTCUSDT", now));
    }
}
