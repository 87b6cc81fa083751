use std::collections::HashMap;

use tracing::debug;

use crate::address::LogicalAddress;
use crate::config::{ConfigError, EngineConfig};
use crate::error::{InvariantViolation, PageTableError};
use crate::event::{EngineEvent, EventLog, EventRecord};
use crate::frame::{content_tag, FrameStore, EVICTION_VICTIM};
use crate::outcome::{Eviction, InvalidPageReason, TranslationOutcome};
use crate::page_table::{PageState, PageTable};
use crate::snapshot::Snapshot;
use crate::tlb::Tlb;

/// Owns the TLB, page table and frame bank, and routes every mutation through
/// `translate`, `add_page`, `delete_page` and `reset`.
///
/// Each call runs to completion before returning, so no caller can observe a
/// half-serviced fault.
#[derive(Debug, Clone)]
pub struct Engine {
    config: EngineConfig,
    frames: FrameStore,
    page_table: PageTable,
    tlb: Tlb,
    events: EventLog,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let (frames, page_table, tlb) = initial_state(&config);
        let events = match config.event_retention {
            Some(retain) => EventLog::with_retention(retain),
            None => EventLog::new(),
        };
        Ok(Self {
            config,
            frames,
            page_table,
            tlb,
            events,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn tlb(&self) -> &Tlb {
        &self.tlb
    }

    pub fn page_table(&self) -> &PageTable {
        &self.page_table
    }

    pub fn frames(&self) -> &FrameStore {
        &self.frames
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    /// Events recorded after `cursor`, oldest first.
    pub fn events_since(
        &self,
        cursor: u64,
    ) -> impl DoubleEndedIterator<Item = &EventRecord> + ExactSizeIterator + '_ {
        self.events.since(cursor)
    }

    /// Restores the configured initial state and clears the event log.
    pub fn reset(&mut self) {
        let (frames, page_table, tlb) = initial_state(&self.config);
        self.frames = frames;
        self.page_table = page_table;
        self.tlb = tlb;
        self.events.clear();
        self.events.push(EngineEvent::Reset);
        debug!("engine reset");
    }

    /// Resolves a `"<page>,<offset>"` string.
    pub fn translate(&mut self, input: &str) -> TranslationOutcome {
        match input.parse::<LogicalAddress>() {
            Ok(addr) => self.translate_address(addr),
            Err(error) => {
                debug!(input, %error, "malformed logical address");
                self.record(TranslationOutcome::MalformedInput {
                    input: input.to_string(),
                    error,
                })
            }
        }
    }

    pub fn translate_address(&mut self, addr: LogicalAddress) -> TranslationOutcome {
        let LogicalAddress { page, offset } = addr;

        if let Some(hit) = self.tlb.lookup(page) {
            self.tlb.reset_age_on_hit(hit.slot);
            debug!(page, slot = hit.slot, frame = hit.frame, "tlb hit");
            return self.record(TranslationOutcome::TlbHit {
                page,
                offset,
                slot: hit.slot,
                frame: hit.frame,
            });
        }

        let outcome = match self.page_table.state(page) {
            None => {
                let extent = self.page_table.extent();
                debug!(page, extent, "tlb miss: page beyond page table");
                TranslationOutcome::InvalidPage {
                    page,
                    offset,
                    reason: InvalidPageReason::OutOfRange { extent },
                }
            }
            Some(PageState::Deleted) => {
                debug!(page, "tlb miss: page deleted");
                TranslationOutcome::InvalidPage {
                    page,
                    offset,
                    reason: InvalidPageReason::Deleted,
                }
            }
            Some(PageState::Resident(frame)) => {
                debug!(page, frame, "tlb miss: page table hit");
                let slot = self.fill_tlb(page, frame);
                TranslationOutcome::PageTableHit {
                    page,
                    offset,
                    frame,
                    slot,
                }
            }
            Some(PageState::NotPresent) => self.service_fault(page, offset),
        };
        self.record(outcome)
    }

    pub fn add_page(&mut self, page: u64) -> Result<(), PageTableError> {
        let first = self.page_table.add(page)?;
        debug!(first, last = page, "pages added");
        self.events
            .push(EngineEvent::PagesAdded { first, last: page });
        Ok(())
    }

    pub fn delete_page(&mut self, page: u64) -> Result<(), PageTableError> {
        let freed_frame = self.page_table.check_deletable(page)?;
        if let Some(frame) = freed_frame {
            self.frames.clear(frame);
        }
        self.invalidate_tlb(page);
        self.page_table.mark_deleted(page);
        debug!(page, ?freed_frame, "page deleted");
        self.events.push(EngineEvent::PageDeleted { page, freed_frame });
        Ok(())
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            tlb_entries: self.tlb.views().collect(),
            page_table_entries: self.page_table.entries().collect(),
            frames: self.frames.views().collect(),
        }
    }

    pub fn inspect_page(&self, page: u64) -> Option<String> {
        let entry = self.page_table.entry(page)?;
        Some(match (entry.deleted, entry.frame) {
            (true, _) => format!("Page {page}: deleted"),
            (false, Some(frame)) => format!("Page {page}: present=true frame={frame}"),
            (false, None) => format!("Page {page}: present=false"),
        })
    }

    pub fn inspect_tlb_slot(&self, slot: usize) -> Option<String> {
        let view = self.tlb.views().nth(slot)?;
        Some(match (view.page, view.frame) {
            (Some(page), Some(frame)) => format!("TLB entry {slot}: page={page}, frame={frame}"),
            _ => format!("TLB entry {slot}: invalid"),
        })
    }

    pub fn inspect_frame(&self, frame: usize) -> Option<String> {
        let view = self.frames.views().nth(frame)?;
        Some(format!("Frame {frame}: {}", view.label()))
    }

    /// Verifies TLB coherence, frame ownership and the absence of aliasing.
    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        let mut owners: HashMap<usize, u64> = HashMap::new();
        for entry in self.page_table.entries() {
            let Some(frame) = entry.frame else {
                continue;
            };
            if frame >= self.frames.len() {
                return Err(InvariantViolation::FrameOutOfRange {
                    page: entry.page,
                    frame,
                });
            }
            if let Some(first) = owners.insert(frame, entry.page) {
                return Err(InvariantViolation::FrameAliased {
                    frame,
                    first,
                    second: entry.page,
                });
            }
            let holder = self.frames.contents(frame);
            if holder != Some(entry.page) {
                return Err(InvariantViolation::FrameTagMismatch {
                    page: entry.page,
                    frame,
                    holder,
                });
            }
        }

        for view in self.frames.views() {
            if let Some(page) = view.contents {
                if owners.get(&view.frame) != Some(&page) {
                    return Err(InvariantViolation::OrphanedFrame {
                        frame: view.frame,
                        page,
                    });
                }
            }
        }

        for (slot, page, frame) in self.tlb.valid_entries() {
            if self.page_table.state(page) != Some(PageState::Resident(frame)) {
                return Err(InvariantViolation::StaleTlbEntry { slot, page, frame });
            }
        }

        Ok(())
    }

    fn service_fault(&mut self, page: u64, offset: u64) -> TranslationOutcome {
        let (frame, eviction) = match self.frames.allocate_free() {
            Some(frame) => (frame, None),
            None => (EVICTION_VICTIM, self.evict(EVICTION_VICTIM)),
        };

        self.page_table.set_present(page, frame);
        self.frames.set(frame, page);
        debug!(page, frame, tag = %content_tag(page), "page fault serviced");
        self.events.push(EngineEvent::PageLoaded { page, frame });

        let slot = self.fill_tlb(page, frame);
        TranslationOutcome::PageFault {
            page,
            offset,
            frame,
            slot,
            eviction,
        }
    }

    /// Frees `frame`, unmapping whichever page held it and dropping any TLB entries
    /// that cached that page.
    fn evict(&mut self, frame: usize) -> Option<Eviction> {
        let victim = self.frames.owner_of(frame, &self.page_table);
        self.frames.clear(frame);
        let page = victim?;

        self.page_table.clear_present(page);
        debug!(page, frame, "evicted");
        self.events.push(EngineEvent::Evicted { page, frame });
        let invalidated_slots = self.invalidate_tlb(page);
        Some(Eviction {
            page,
            frame,
            invalidated_slots,
        })
    }

    fn invalidate_tlb(&mut self, page: u64) -> Vec<usize> {
        let slots = self.tlb.invalidate_page(page);
        for &slot in &slots {
            debug!(slot, page, "tlb entry invalidated");
            self.events.push(EngineEvent::TlbInvalidated { slot, page });
        }
        slots
    }

    fn fill_tlb(&mut self, page: u64, frame: usize) -> usize {
        let fill = self.tlb.insert(page, frame);
        self.events.push(EngineEvent::TlbFilled {
            slot: fill.slot,
            page,
            frame,
            replaced_page: fill.replaced.map(|(page, _)| page),
        });
        fill.slot
    }

    fn record(&mut self, outcome: TranslationOutcome) -> TranslationOutcome {
        self.events.push(EngineEvent::Translated {
            outcome: outcome.clone(),
        });
        outcome
    }
}

fn initial_state(config: &EngineConfig) -> (FrameStore, PageTable, Tlb) {
    let mut frames = FrameStore::new(config.frames);
    let mut page_table = PageTable::new(config.initial_pages, config.max_pages);
    let mut tlb = Tlb::new(config.tlb_entries);

    for mapping in &config.seed.resident {
        page_table.set_present(mapping.page, mapping.frame);
        frames.set(mapping.frame, mapping.page);
    }
    for entry in &config.seed.tlb {
        tlb.preload(entry.slot, entry.page, entry.frame);
    }
    (frames, page_table, tlb)
}
