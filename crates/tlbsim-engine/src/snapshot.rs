use serde::Serialize;

use crate::frame::FrameView;
use crate::page_table::PageTableEntry;
use crate::tlb::TlbEntryView;

/// Read-only dump of engine state for render collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    pub tlb_entries: Vec<TlbEntryView>,
    pub page_table_entries: Vec<PageTableEntry>,
    pub frames: Vec<FrameView>,
}

impl Snapshot {
    pub fn tlb_entry(&self, slot: usize) -> Option<&TlbEntryView> {
        self.tlb_entries.get(slot)
    }

    pub fn page(&self, page: u64) -> Option<&PageTableEntry> {
        usize::try_from(page)
            .ok()
            .and_then(|idx| self.page_table_entries.get(idx))
    }

    pub fn frame(&self, frame: usize) -> Option<&FrameView> {
        self.frames.get(frame)
    }
}
