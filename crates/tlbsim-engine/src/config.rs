//! Engine sizing and initial state.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_FRAMES: usize = 6;
pub const DEFAULT_TLB_ENTRIES: usize = 4;
pub const DEFAULT_INITIAL_PAGES: u64 = 8;
/// Upper bound on the page table extent. `add_page` beyond this fails instead of
/// growing the table without limit.
pub const DEFAULT_MAX_PAGES: u64 = 4096;
/// Largest `max_pages` a configuration may ask for. The page table is dense, so
/// the limit bounds its worst-case allocation.
pub const PAGE_LIMIT_CEILING: u64 = 1 << 24;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("at least one physical frame is required")]
    NoFrames,

    #[error("at least one TLB entry is required")]
    NoTlbEntries,

    #[error("event retention must keep at least one event")]
    NoEventRetention,

    #[error("page limit {max_pages} exceeds the supported ceiling of {ceiling} pages")]
    MaxPagesTooLarge { max_pages: u64, ceiling: u64 },

    #[error("initial page count {initial_pages} exceeds the page limit {max_pages}")]
    InitialPagesExceedLimit { initial_pages: u64, max_pages: u64 },

    #[error("seed maps page {page}, but only {initial_pages} pages exist initially")]
    SeedPageOutOfRange { page: u64, initial_pages: u64 },

    #[error("seed maps page {page} to frame {frame}, but only {frames} frames exist")]
    SeedFrameOutOfRange { page: u64, frame: usize, frames: usize },

    #[error("seed maps page {page} more than once")]
    SeedDuplicatePage { page: u64 },

    #[error("seed maps frame {frame} more than once")]
    SeedAliasedFrame { frame: usize },

    #[error("seed TLB slot {slot} is beyond the TLB capacity {capacity}")]
    SeedTlbSlotOutOfRange { slot: usize, capacity: usize },

    #[error("seed TLB slot {slot} is used more than once")]
    SeedDuplicateTlbSlot { slot: usize },

    #[error("seed TLB slot {slot} caches page {page} -> frame {frame}, which is not a seeded mapping")]
    SeedTlbIncoherent { slot: usize, page: u64, frame: usize },
}

/// A page that is resident from the start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedMapping {
    pub page: u64,
    pub frame: usize,
}

/// A TLB slot that is valid from the start. Must match a [`SeedMapping`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedTlbEntry {
    pub slot: usize,
    pub page: u64,
    pub frame: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeedState {
    pub resident: Vec<SeedMapping>,
    pub tlb: Vec<SeedTlbEntry>,
}

impl SeedState {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Pages 0, 1, 3 and 4 resident in frames 2, 0, 1 and 4, with page 1 cached in TLB slot 0.
    pub fn demo() -> Self {
        let resident = [(0, 2), (1, 0), (3, 1), (4, 4)]
            .into_iter()
            .map(|(page, frame)| SeedMapping { page, frame })
            .collect();
        Self {
            resident,
            tlb: vec![SeedTlbEntry {
                slot: 0,
                page: 1,
                frame: 0,
            }],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub frames: usize,
    pub tlb_entries: usize,
    pub initial_pages: u64,
    pub max_pages: u64,
    /// Keep only this many of the newest events; `None` keeps everything.
    pub event_retention: Option<usize>,
    pub seed: SeedState,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            frames: DEFAULT_FRAMES,
            tlb_entries: DEFAULT_TLB_ENTRIES,
            initial_pages: DEFAULT_INITIAL_PAGES,
            max_pages: DEFAULT_MAX_PAGES,
            event_retention: None,
            seed: SeedState::demo(),
        }
    }
}

impl EngineConfig {
    /// No pages, nothing resident; every page must be added before it can fault in.
    pub fn empty(frames: usize, tlb_entries: usize) -> Self {
        Self {
            frames,
            tlb_entries,
            initial_pages: 0,
            max_pages: DEFAULT_MAX_PAGES,
            event_retention: None,
            seed: SeedState::empty(),
        }
    }

    pub fn with_frames(mut self, frames: usize) -> Self {
        self.frames = frames;
        self
    }

    pub fn with_tlb_entries(mut self, tlb_entries: usize) -> Self {
        self.tlb_entries = tlb_entries;
        self
    }

    pub fn with_initial_pages(mut self, initial_pages: u64) -> Self {
        self.initial_pages = initial_pages;
        self
    }

    pub fn with_max_pages(mut self, max_pages: u64) -> Self {
        self.max_pages = max_pages;
        self
    }

    pub fn with_event_retention(mut self, retain: usize) -> Self {
        self.event_retention = Some(retain);
        self
    }

    pub fn with_seed(mut self, seed: SeedState) -> Self {
        self.seed = seed;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.frames == 0 {
            return Err(ConfigError::NoFrames);
        }
        if self.tlb_entries == 0 {
            return Err(ConfigError::NoTlbEntries);
        }
        if self.event_retention == Some(0) {
            return Err(ConfigError::NoEventRetention);
        }
        if self.max_pages > PAGE_LIMIT_CEILING {
            return Err(ConfigError::MaxPagesTooLarge {
                max_pages: self.max_pages,
                ceiling: PAGE_LIMIT_CEILING,
            });
        }
        if self.initial_pages > self.max_pages {
            return Err(ConfigError::InitialPagesExceedLimit {
                initial_pages: self.initial_pages,
                max_pages: self.max_pages,
            });
        }

        let mut pages = HashSet::new();
        let mut frames = HashSet::new();
        for &SeedMapping { page, frame } in &self.seed.resident {
            if page >= self.initial_pages {
                return Err(ConfigError::SeedPageOutOfRange {
                    page,
                    initial_pages: self.initial_pages,
                });
            }
            if frame >= self.frames {
                return Err(ConfigError::SeedFrameOutOfRange {
                    page,
                    frame,
                    frames: self.frames,
                });
            }
            if !pages.insert(page) {
                return Err(ConfigError::SeedDuplicatePage { page });
            }
            if !frames.insert(frame) {
                return Err(ConfigError::SeedAliasedFrame { frame });
            }
        }

        let mut slots = HashSet::new();
        for &SeedTlbEntry { slot, page, frame } in &self.seed.tlb {
            if slot >= self.tlb_entries {
                return Err(ConfigError::SeedTlbSlotOutOfRange {
                    slot,
                    capacity: self.tlb_entries,
                });
            }
            if !slots.insert(slot) {
                return Err(ConfigError::SeedDuplicateTlbSlot { slot });
            }
            if !self.seed.resident.contains(&SeedMapping { page, frame }) {
                return Err(ConfigError::SeedTlbIncoherent { slot, page, frame });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_demo_and_validate() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.frames, 6);
        assert_eq!(cfg.tlb_entries, 4);
        assert_eq!(cfg.initial_pages, 8);
        assert_eq!(cfg.seed.resident.len(), 4);
        assert_eq!(cfg.validate(), Ok(()));
    }

    #[test]
    fn zero_sized_structures_are_rejected() {
        assert_eq!(
            EngineConfig::empty(0, 4).validate(),
            Err(ConfigError::NoFrames)
        );
        assert_eq!(
            EngineConfig::empty(6, 0).validate(),
            Err(ConfigError::NoTlbEntries)
        );
    }

    #[test]
    fn zero_event_retention_is_rejected() {
        let cfg = EngineConfig::default().with_event_retention(0);
        assert_eq!(cfg.validate(), Err(ConfigError::NoEventRetention));
        let cfg = EngineConfig::default().with_event_retention(1);
        assert_eq!(cfg.validate(), Ok(()));
    }

    #[test]
    fn page_limit_is_capped() {
        let cfg = EngineConfig::empty(6, 4).with_max_pages(u64::MAX);
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::MaxPagesTooLarge {
                max_pages: u64::MAX,
                ceiling: PAGE_LIMIT_CEILING
            })
        );

        // A huge initial extent trips the same check before anything is allocated.
        let cfg = EngineConfig::empty(6, 4)
            .with_max_pages(u64::MAX)
            .with_initial_pages(u64::MAX);
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::MaxPagesTooLarge { .. })
        ));

        let cfg = EngineConfig::empty(6, 4).with_max_pages(PAGE_LIMIT_CEILING);
        assert_eq!(cfg.validate(), Ok(()));
    }

    #[test]
    fn seed_aliasing_is_rejected() {
        let seed = SeedState {
            resident: vec![
                SeedMapping { page: 0, frame: 1 },
                SeedMapping { page: 2, frame: 1 },
            ],
            tlb: Vec::new(),
        };
        let cfg = EngineConfig::default().with_seed(seed);
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::SeedAliasedFrame { frame: 1 })
        );
    }

    #[test]
    fn seed_tlb_must_match_a_mapping() {
        let mut seed = SeedState::demo();
        seed.tlb[0].frame = 3;
        let cfg = EngineConfig::default().with_seed(seed);
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::SeedTlbIncoherent {
                slot: 0,
                page: 1,
                frame: 3
            })
        );
    }

    #[test]
    fn seed_pages_must_be_within_initial_extent() {
        let cfg = EngineConfig::default().with_initial_pages(4);
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::SeedPageOutOfRange {
                page: 4,
                initial_pages: 4
            })
        );
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let cfg: EngineConfig =
            serde_json::from_str(r#"{ "frames": 3, "seed": { "resident": [] } }"#).unwrap();
        assert_eq!(cfg.frames, 3);
        assert_eq!(cfg.tlb_entries, DEFAULT_TLB_ENTRIES);
        assert!(cfg.seed.resident.is_empty());
        assert!(cfg.seed.tlb.is_empty());
        assert_eq!(cfg.validate(), Ok(()));
    }
}
