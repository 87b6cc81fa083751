//! Physical frame bank.

use serde::Serialize;

use crate::page_table::PageTable;

/// Frame evicted when every frame is occupied.
pub const EVICTION_VICTIM: usize = 0;

/// What a frame currently holds, as seen by render collaborators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FrameView {
    pub frame: usize,
    /// Page whose contents occupy the frame, or `None` when free.
    pub contents: Option<u64>,
}

impl FrameView {
    pub fn label(&self) -> String {
        match self.contents {
            Some(page) => content_tag(page),
            None => "(free)".to_string(),
        }
    }
}

/// The content tag written into a frame when `page` is loaded.
pub fn content_tag(page: u64) -> String {
    format!("Page {page} data")
}

/// Fixed-size array of physical frames, each either free or tagged with the
/// page it holds.
#[derive(Debug, Clone)]
pub struct FrameStore {
    frames: Vec<Option<u64>>,
}

impl FrameStore {
    pub fn new(count: usize) -> Self {
        Self {
            frames: vec![None; count],
        }
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Lowest-indexed free frame, if any.
    pub fn allocate_free(&self) -> Option<usize> {
        self.frames.iter().position(Option::is_none)
    }

    pub fn set(&mut self, frame: usize, page: u64) {
        debug_assert!(frame < self.frames.len());
        if let Some(slot) = self.frames.get_mut(frame) {
            *slot = Some(page);
        }
    }

    /// Frees `frame`, returning the page it held.
    pub fn clear(&mut self, frame: usize) -> Option<u64> {
        self.frames.get_mut(frame).and_then(Option::take)
    }

    /// The page tag currently written into `frame`.
    pub fn contents(&self, frame: usize) -> Option<u64> {
        self.frames.get(frame).copied().flatten()
    }

    /// The page that owns `frame` according to the page table.
    ///
    /// This goes through the page table rather than the frame's tag so it reflects
    /// the authoritative mapping.
    pub fn owner_of(&self, frame: usize, page_table: &PageTable) -> Option<u64> {
        if frame >= self.frames.len() {
            return None;
        }
        page_table.resident_page_in(frame)
    }

    pub fn free_count(&self) -> usize {
        self.frames.iter().filter(|f| f.is_none()).count()
    }

    pub fn views(&self) -> impl Iterator<Item = FrameView> + '_ {
        self.frames
            .iter()
            .enumerate()
            .map(|(frame, &contents)| FrameView { frame, contents })
    }
}
