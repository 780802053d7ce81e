//! Reordering of committed records into a gap-free gsn sequence.

use crate::types::{CommittedRecord, Gsn};
use std::collections::BTreeMap;

/// Ordering state of one subscription.
///
/// Holds the delivery cursor and every record that arrived ahead of it.
/// Invariant: no buffered gsn is below `next_gsn`.
///
/// `Gsn::MAX` is reserved so the cursor can always step past the last
/// deliverable gsn; records carrying it are rejected.
#[derive(Debug, Clone)]
pub struct ReorderBuffer {
    next_gsn: Gsn,
    pending: BTreeMap<Gsn, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestDecision {
    /// Already delivered; dropped.
    Duplicate,
    /// Stored until the gap below it is filled.
    Buffered,
    /// The cursor record is now available.
    Ready,
    /// Carries the reserved gsn `Gsn::MAX`; dropped.
    OutOfRange,
}

impl ReorderBuffer {
    pub fn new(from_gsn: Gsn) -> Self {
        Self {
            next_gsn: from_gsn,
            pending: BTreeMap::new(),
        }
    }

    /// Smallest gsn not yet delivered.
    pub fn next_gsn(&self) -> Gsn {
        self.next_gsn
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Lowest buffered gsn, i.e. the far side of the current gap.
    pub fn lowest_pending(&self) -> Option<Gsn> {
        self.pending.keys().next().copied()
    }

    pub fn ingest(&mut self, record: CommittedRecord) -> IngestDecision {
        if record.gsn == Gsn::MAX {
            return IngestDecision::OutOfRange;
        }
        if record.gsn < self.next_gsn {
            return IngestDecision::Duplicate;
        }

        // Every source reports the same payload for a gsn, last write wins.
        let ready = record.gsn == self.next_gsn;
        self.pending.insert(record.gsn, record.record);

        if ready {
            IngestDecision::Ready
        } else {
            IngestDecision::Buffered
        }
    }

    /// Removes the cursor record, if present, and advances the cursor by one.
    pub fn pop_ready(&mut self) -> Option<CommittedRecord> {
        let record = self.pending.remove(&self.next_gsn)?;
        let gsn = self.next_gsn;
        self.next_gsn += 1;
        Some(CommittedRecord { gsn, record })
    }

    pub fn drain_ready(&mut self) -> Vec<CommittedRecord> {
        let mut ready = Vec::new();
        while let Some(record) = self.pop_ready() {
            ready.push(record);
        }
        ready
    }
}
