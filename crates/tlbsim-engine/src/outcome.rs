use std::fmt;

use serde::Serialize;

use crate::address::PhysicalAddress;
use crate::error::ParseError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    TlbHit,
    PageTableHit,
    PageFault,
    InvalidPage,
    MalformedInput,
}

impl OutcomeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            OutcomeKind::TlbHit => "tlb_hit",
            OutcomeKind::PageTableHit => "page_table_hit",
            OutcomeKind::PageFault => "page_fault",
            OutcomeKind::InvalidPage => "invalid_page",
            OutcomeKind::MalformedInput => "malformed_input",
        }
    }
}

impl fmt::Display for OutcomeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A page pushed out of its frame to make room during fault servicing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Eviction {
    pub page: u64,
    pub frame: usize,
    /// TLB slots that cached the victim and were invalidated.
    pub invalidated_slots: Vec<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum InvalidPageReason {
    /// The page number lies beyond the page table extent.
    OutOfRange { extent: u64 },
    /// The page was deleted and can never be referenced again.
    Deleted,
}

/// Result of one `translate` call.
///
/// Only `TlbHit`, `PageTableHit` and `PageFault` resolve to a physical address;
/// the other two are reported errors that leave the engine untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TranslationOutcome {
    TlbHit {
        page: u64,
        offset: u64,
        slot: usize,
        frame: usize,
    },
    PageTableHit {
        page: u64,
        offset: u64,
        frame: usize,
        /// Slot the mapping was cached into after the page table hit.
        slot: usize,
    },
    PageFault {
        page: u64,
        offset: u64,
        frame: usize,
        slot: usize,
        eviction: Option<Eviction>,
    },
    InvalidPage {
        page: u64,
        offset: u64,
        reason: InvalidPageReason,
    },
    MalformedInput {
        input: String,
        error: ParseError,
    },
}

impl TranslationOutcome {
    pub fn kind(&self) -> OutcomeKind {
        match self {
            TranslationOutcome::TlbHit { .. } => OutcomeKind::TlbHit,
            TranslationOutcome::PageTableHit { .. } => OutcomeKind::PageTableHit,
            TranslationOutcome::PageFault { .. } => OutcomeKind::PageFault,
            TranslationOutcome::InvalidPage { .. } => OutcomeKind::InvalidPage,
            TranslationOutcome::MalformedInput { .. } => OutcomeKind::MalformedInput,
        }
    }

    pub fn physical_address(&self) -> Option<PhysicalAddress> {
        match *self {
            TranslationOutcome::TlbHit { offset, frame, .. }
            | TranslationOutcome::PageTableHit { offset, frame, .. }
            | TranslationOutcome::PageFault { offset, frame, .. } => {
                Some(PhysicalAddress { frame, offset })
            }
            TranslationOutcome::InvalidPage { .. } | TranslationOutcome::MalformedInput { .. } => {
                None
            }
        }
    }

    pub fn page(&self) -> Option<u64> {
        match *self {
            TranslationOutcome::TlbHit { page, .. }
            | TranslationOutcome::PageTableHit { page, .. }
            | TranslationOutcome::PageFault { page, .. }
            | TranslationOutcome::InvalidPage { page, .. } => Some(page),
            TranslationOutcome::MalformedInput { .. } => None,
        }
    }

    /// TLB slot that served or now caches the translation.
    pub fn tlb_slot(&self) -> Option<usize> {
        match *self {
            TranslationOutcome::TlbHit { slot, .. }
            | TranslationOutcome::PageTableHit { slot, .. }
            | TranslationOutcome::PageFault { slot, .. } => Some(slot),
            TranslationOutcome::InvalidPage { .. } | TranslationOutcome::MalformedInput { .. } => {
                None
            }
        }
    }

    pub fn frame(&self) -> Option<usize> {
        self.physical_address().map(|pa| pa.frame)
    }

    pub fn eviction(&self) -> Option<&Eviction> {
        match self {
            TranslationOutcome::PageFault { eviction, .. } => eviction.as_ref(),
            _ => None,
        }
    }
}

impl fmt::Display for TranslationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pa = self.physical_address();
        match self {
            TranslationOutcome::TlbHit { page, frame, .. } => {
                write!(f, "TLB hit: page {page} -> frame {frame}.")?;
            }
            TranslationOutcome::PageTableHit { page, frame, .. } => {
                write!(
                    f,
                    "TLB miss. Page table hit: page {page} is in frame {frame}."
                )?;
            }
            TranslationOutcome::PageFault {
                page,
                frame,
                eviction,
                ..
            } => {
                write!(f, "TLB miss. Page fault: page {page} not in memory.")?;
                if let Some(eviction) = eviction {
                    write!(
                        f,
                        " Evicted page {} from frame {}.",
                        eviction.page, eviction.frame
                    )?;
                }
                write!(f, " Page loaded into frame {frame}.")?;
            }
            TranslationOutcome::InvalidPage { page, reason, .. } => match reason {
                InvalidPageReason::OutOfRange { extent } => write!(
                    f,
                    "Invalid page {page}: page table only has {extent} pages."
                )?,
                InvalidPageReason::Deleted => {
                    write!(f, "Invalid page {page}: page has been deleted.")?
                }
            },
            TranslationOutcome::MalformedInput { error, .. } => {
                write!(f, "Enter address as page,offset (e.g. 2,5): {error}.")?;
            }
        }
        if let Some(pa) = pa {
            write!(f, " Physical address: {pa}")?;
        }
        Ok(())
    }
}
