//! Growable page table with tombstoned deletions.

use serde::Serialize;

use crate::config::PAGE_LIMIT_CEILING;
use crate::error::PageTableError;

/// Lifecycle of a page table slot.
///
/// `NotPresent -> Resident -> NotPresent` cycles through faults and evictions;
/// `Deleted` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "frame", rename_all = "snake_case")]
pub enum PageState {
    NotPresent,
    Resident(usize),
    Deleted,
}

impl PageState {
    pub fn frame(self) -> Option<usize> {
        match self {
            PageState::Resident(frame) => Some(frame),
            PageState::NotPresent | PageState::Deleted => None,
        }
    }
}

/// Flattened view of one page table slot, as handed to render collaborators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageTableEntry {
    pub page: u64,
    pub present: bool,
    pub frame: Option<usize>,
    pub deleted: bool,
}

impl PageTableEntry {
    fn new(page: u64, state: PageState) -> Self {
        Self {
            page,
            present: matches!(state, PageState::Resident(_)),
            frame: state.frame(),
            deleted: state == PageState::Deleted,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PageTable {
    entries: Vec<PageState>,
    max_pages: u64,
}

impl PageTable {
    /// A table covering pages `0..initial_pages`, none of them resident.
    pub fn new(initial_pages: u64, max_pages: u64) -> Self {
        let initial_pages = initial_pages.min(max_pages).min(PAGE_LIMIT_CEILING);
        Self {
            entries: vec![PageState::NotPresent; index(initial_pages)],
            max_pages,
        }
    }

    /// Number of page numbers covered; valid pages are `0..extent`.
    pub fn extent(&self) -> u64 {
        self.entries.len() as u64
    }

    pub fn max_pages(&self) -> u64 {
        self.max_pages
    }

    /// State of `page`, or `None` when it lies beyond the current extent.
    pub fn state(&self, page: u64) -> Option<PageState> {
        self.entries.get(index(page)).copied()
    }

    pub fn entry(&self, page: u64) -> Option<PageTableEntry> {
        self.state(page).map(|state| PageTableEntry::new(page, state))
    }

    /// `true` when `page` is within the extent and not deleted.
    pub fn exists(&self, page: u64) -> bool {
        matches!(
            self.state(page),
            Some(PageState::NotPresent | PageState::Resident(_))
        )
    }

    /// Grows the table so it covers `page`, filling new slots as not present.
    ///
    /// Returns the first page number that was newly created, or `None` when `page`
    /// was already covered.
    pub fn extend_to(&mut self, page: u64) -> Result<Option<u64>, PageTableError> {
        if page >= self.max_pages {
            return Err(PageTableError::PageOutOfRange {
                page,
                max_pages: self.max_pages,
            });
        }
        let first_new = self.extent();
        if page < first_new {
            return Ok(None);
        }
        let new_len = index(page)
            .checked_add(1)
            .ok_or(PageTableError::GrowthFailed { page })?;
        self.entries
            .try_reserve_exact(new_len - self.entries.len())
            .map_err(|_| PageTableError::GrowthFailed { page })?;
        self.entries.resize(new_len, PageState::NotPresent);
        Ok(Some(first_new))
    }

    /// Makes `page` available for faulting in, extending the table as needed.
    ///
    /// Returns the first newly created page number; every page from there up to
    /// and including `page` is new.
    pub fn add(&mut self, page: u64) -> Result<u64, PageTableError> {
        match self.state(page) {
            Some(PageState::Deleted) => Err(PageTableError::PageDeleted { page }),
            Some(_) => Err(PageTableError::AlreadyExists { page }),
            None => {
                let first = self.extend_to(page)?;
                Ok(first.unwrap_or(page))
            }
        }
    }

    /// Checks that `page` may be deleted, returning the frame that currently backs
    /// it (which the caller must release before calling [`PageTable::mark_deleted`]).
    pub fn check_deletable(&self, page: u64) -> Result<Option<usize>, PageTableError> {
        match self.state(page) {
            None => Err(PageTableError::DeleteOutOfRange {
                page,
                extent: self.extent(),
            }),
            Some(PageState::Deleted) => Err(PageTableError::PageDeleted { page }),
            Some(state) => Ok(state.frame()),
        }
    }

    pub fn mark_deleted(&mut self, page: u64) {
        if let Some(state) = self.entries.get_mut(index(page)) {
            *state = PageState::Deleted;
        }
    }

    pub fn set_present(&mut self, page: u64, frame: usize) {
        match self.entries.get_mut(index(page)) {
            Some(state) if *state != PageState::Deleted => *state = PageState::Resident(frame),
            _ => debug_assert!(false, "set_present on missing or deleted page {page}"),
        }
    }

    /// Marks `page` not present, returning the frame it occupied.
    pub fn clear_present(&mut self, page: u64) -> Option<usize> {
        let state = self.entries.get_mut(index(page))?;
        let frame = state.frame()?;
        *state = PageState::NotPresent;
        Some(frame)
    }

    /// Reverse lookup: the page resident in `frame`, if any.
    pub fn resident_page_in(&self, frame: usize) -> Option<u64> {
        self.entries
            .iter()
            .position(|state| *state == PageState::Resident(frame))
            .map(|page| page as u64)
    }

    pub fn entries(&self) -> impl Iterator<Item = PageTableEntry> + '_ {
        self.entries
            .iter()
            .enumerate()
            .map(|(page, &state)| PageTableEntry::new(page as u64, state))
    }
}

/// Page numbers beyond `usize` can never be covered; saturate so lookups miss.
fn index(page: u64) -> usize {
    usize::try_from(page).unwrap_or(usize::MAX)
}
