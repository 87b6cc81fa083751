//! Append-only record of everything the engine did, in order.
//!
//! Presentation layers replay this at their own pace (e.g. to animate a lookup
//! step by step); the engine itself never waits.

use std::collections::VecDeque;

use serde::Serialize;

use crate::outcome::TranslationOutcome;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineEvent {
    /// Final outcome of a `translate` call. Always recorded after the sub-events
    /// the lookup produced.
    Translated { outcome: TranslationOutcome },
    /// `page` was evicted from `frame` to service a fault.
    Evicted { page: u64, frame: usize },
    /// A TLB slot was cleared because the mapping it cached went away.
    TlbInvalidated { slot: usize, page: u64 },
    /// A mapping was cached in the TLB, possibly overwriting an older one.
    TlbFilled {
        slot: usize,
        page: u64,
        frame: usize,
        replaced_page: Option<u64>,
    },
    /// `page` was loaded into `frame`.
    PageLoaded { page: u64, frame: usize },
    /// Pages `first..=last` were added to the page table.
    PagesAdded { first: u64, last: u64 },
    /// `page` was deleted, releasing `freed_frame` if it was resident.
    PageDeleted {
        page: u64,
        freed_frame: Option<usize>,
    },
    /// The engine was restored to its configured initial state.
    Reset,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventRecord {
    /// Monotonically increasing, starting at 1. Never reused, even across `clear`.
    pub seq: u64,
    #[serde(flatten)]
    pub event: EngineEvent,
}

#[derive(Debug, Clone, Default)]
pub struct EventLog {
    records: VecDeque<EventRecord>,
    last_seq: u64,
    retain: Option<usize>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// A log that keeps only the newest `retain` records. Sequence numbers keep
    /// counting, so a cursor older than the oldest retained record simply sees
    /// everything still held.
    pub fn with_retention(retain: usize) -> Self {
        Self {
            retain: Some(retain),
            ..Self::default()
        }
    }

    pub fn push(&mut self, event: EngineEvent) -> u64 {
        self.last_seq += 1;
        if let Some(retain) = self.retain {
            while self.records.len() >= retain.max(1) {
                self.records.pop_front();
            }
        }
        self.records.push_back(EventRecord {
            seq: self.last_seq,
            event,
        });
        self.last_seq
    }

    /// Sequence number of the newest event, or 0 if nothing was ever recorded.
    pub fn last_seq(&self) -> u64 {
        self.last_seq
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Oldest first.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &EventRecord> + '_ {
        self.records.iter()
    }

    pub fn iter_newest_first(&self) -> impl Iterator<Item = &EventRecord> + '_ {
        self.records.iter().rev()
    }

    /// Records with `seq > cursor`, oldest first. Pass the last `seq` you saw (or 0)
    /// to pull only what is new.
    pub fn since(
        &self,
        cursor: u64,
    ) -> impl DoubleEndedIterator<Item = &EventRecord> + ExactSizeIterator + '_ {
        let start = self.records.partition_point(|r| r.seq <= cursor);
        self.records.range(start..)
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }
}
