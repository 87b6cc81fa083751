use serde::Serialize;
use thiserror::Error;

/// Errors returned by page table mutations (`add_page` / `delete_page`).
///
/// Every failing operation leaves the engine untouched; callers may retry with
/// different input without resetting anything.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "error", rename_all = "snake_case")]
pub enum PageTableError {
    #[error("page {page} is beyond the page table limit of {max_pages} pages")]
    PageOutOfRange { page: u64, max_pages: u64 },

    #[error("page {page} already exists")]
    AlreadyExists { page: u64 },

    #[error("page {page} has been deleted")]
    PageDeleted { page: u64 },

    #[error("cannot delete page {page}: page table only extends to {extent} pages")]
    DeleteOutOfRange { page: u64, extent: u64 },

    #[error("page table could not grow to cover page {page}")]
    GrowthFailed { page: u64 },
}

/// Why a logical address string could not be decomposed into `(page, offset)`.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "error", content = "detail", rename_all = "snake_case")]
pub enum ParseError {
    #[error("expected `page,offset` but found {0} field(s)")]
    WrongArity(usize),

    #[error("page `{0}` is not an integer")]
    InvalidPage(String),

    #[error("offset `{0}` is not an integer")]
    InvalidOffset(String),

    #[error("page {0} is negative")]
    NegativePage(i64),

    #[error("offset {0} is negative")]
    NegativeOffset(i64),
}

/// A broken structural invariant, reported by [`crate::Engine::check_invariants`].
///
/// None of these are reachable through the public API; they exist so tests (and
/// paranoid collaborators) can assert coherence after arbitrary operation sequences.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    #[error("TLB slot {slot} caches page {page} -> frame {frame}, but the page table disagrees")]
    StaleTlbEntry { slot: usize, page: u64, frame: usize },

    #[error("frame {frame} is mapped by pages {first} and {second}")]
    FrameAliased { frame: usize, first: u64, second: u64 },

    #[error("page {page} is resident in frame {frame}, but the frame holds {holder:?}")]
    FrameTagMismatch {
        page: u64,
        frame: usize,
        holder: Option<u64>,
    },

    #[error("page {page} maps frame {frame}, which does not exist")]
    FrameOutOfRange { page: u64, frame: usize },

    #[error("frame {frame} holds page {page}, but that page is not resident there")]
    OrphanedFrame { frame: usize, page: u64 },
}
