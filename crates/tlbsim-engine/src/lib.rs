//! Address translation engine: a TLB, a growable page table and a fixed bank of
//! physical frames, driven one logical-address lookup at a time.
//!
//! A lookup consults the TLB, falls back to the page table on a miss, and on a
//! page fault loads the page into the lowest free frame (evicting whatever lives
//! in frame 0 when memory is full). Every step is recorded in an [`EventLog`] so
//! presentation layers can replay it; they read state through [`Engine::snapshot`]
//! and never mutate it.

#![forbid(unsafe_code)]

mod address;
mod config;
mod engine;
mod error;
mod event;
mod frame;
mod outcome;
mod page_table;
mod snapshot;
mod tlb;

pub use address::{LogicalAddress, PhysicalAddress};
pub use config::{
    ConfigError, EngineConfig, SeedMapping, SeedState, SeedTlbEntry, DEFAULT_FRAMES,
    DEFAULT_INITIAL_PAGES, DEFAULT_MAX_PAGES, DEFAULT_TLB_ENTRIES, PAGE_LIMIT_CEILING,
};
pub use engine::Engine;
pub use error::{InvariantViolation, PageTableError, ParseError};
pub use event::{EngineEvent, EventLog, EventRecord};
pub use frame::{content_tag, FrameStore, FrameView, EVICTION_VICTIM};
pub use outcome::{Eviction, InvalidPageReason, OutcomeKind, TranslationOutcome};
pub use page_table::{PageState, PageTable, PageTableEntry};
pub use snapshot::Snapshot;
pub use tlb::{Tlb, TlbEntryView, TlbFill, TlbHit};
