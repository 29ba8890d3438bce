use meridian_core::ids::OpportunityId;
use std::collections::HashMap;

/// Generates deterministic `clientOrderId`s from an Opportunity id plus a
/// monotonic per-opportunity sequence (`spec.md` §4.6 at-most-once real
/// submission). Reusing the same `(opportunity_id, seq)` pair always
/// yields the same id, so a retried submission after a crash collides
/// with, rather than duplicates, the original at the exchange.
#[derive(Debug, Default)]
pub struct ClientOrderIdGenerator {
    sequences: parking_lot::Mutex<HashMap<OpportunityId, u64>>,
}

impl ClientOrderIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&self, opportunity_id: OpportunityId) -> String {
        let mut sequences = self.sequences.lock();
        let seq = sequences.entry(opportunity_id).or_insert(0);
        let current = *seq;
        *seq += 1;
        format!("{opportunity_id}-{current}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_increments_per_opportunity() {
        let generator = ClientOrderIdGenerator::new();
        let id = OpportunityId::random();
        let first = generator.next(id);
        let second = generator.next(id);
        assert_ne!(first, second);
    }

    #[test]
    fn different_opportunities_do_not_share_a_sequence() {
        let generator = ClientOrderIdGenerator::new();
        let first = generator.next(OpportunityId::random());
        let second = generator.next(OpportunityId::random());
        assert!(first.ends_with("-0"));
        assert!(second.ends_with("-0"));
    }
}
