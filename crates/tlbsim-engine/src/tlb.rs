//! Fully associative TLB with age-based replacement.
//!
//! Every insertion ages all valid entries by one; a hit resets the hit entry's
//! age to zero. The victim on a full TLB is the entry with the greatest age,
//! which is the one that has gone the longest without a hit.

use serde::Serialize;
use tracing::trace;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct TlbEntry {
    page: u64,
    frame: usize,
    age: u64,
    valid: bool,
}

impl TlbEntry {
    fn new(page: u64, frame: usize) -> Self {
        Self {
            page,
            frame,
            age: 0,
            valid: true,
        }
    }

    #[inline]
    fn matches(&self, page: u64) -> bool {
        self.valid && self.page == page
    }

    #[inline]
    fn invalidate(&mut self) {
        self.valid = false;
    }
}

/// Read-only view of one TLB slot.
///
/// `page` and `frame` are only meaningful while `valid` is set; invalidated slots
/// keep their last contents, but collaborators should render them as empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TlbEntryView {
    pub slot: usize,
    pub valid: bool,
    pub page: Option<u64>,
    pub frame: Option<usize>,
    pub age: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TlbHit {
    pub slot: usize,
    pub frame: usize,
}

/// Result of [`Tlb::insert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TlbFill {
    pub slot: usize,
    /// The valid `(page, frame)` pair that was overwritten, if the slot was in use.
    pub replaced: Option<(u64, usize)>,
}

#[derive(Debug, Clone)]
pub struct Tlb {
    entries: Vec<TlbEntry>,
}

impl Tlb {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: vec![TlbEntry::default(); capacity],
        }
    }

    pub fn capacity(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn lookup(&self, page: u64) -> Option<TlbHit> {
        self.entries
            .iter()
            .position(|entry| entry.matches(page))
            .map(|slot| TlbHit {
                slot,
                frame: self.entries[slot].frame,
            })
    }

    pub fn reset_age_on_hit(&mut self, slot: usize) {
        if let Some(entry) = self.entries.get_mut(slot) {
            debug_assert!(entry.valid);
            entry.age = 0;
        }
    }

    /// Caches `page -> frame`, choosing a slot by replacement priority:
    /// the lowest-indexed invalid slot, else the oldest valid slot (ties go to
    /// the lowest index).
    pub fn insert(&mut self, page: u64, frame: usize) -> TlbFill {
        for entry in self.entries.iter_mut().filter(|e| e.valid) {
            entry.age = entry.age.saturating_add(1);
        }

        let slot = self.victim_slot();
        let old = self.entries[slot];
        let replaced = old.valid.then_some((old.page, old.frame));
        trace!(slot, page, frame, ?replaced, "tlb fill");

        self.entries[slot] = TlbEntry::new(page, frame);
        TlbFill { slot, replaced }
    }

    fn victim_slot(&self) -> usize {
        if let Some(slot) = self.entries.iter().position(|e| !e.valid) {
            return slot;
        }
        let mut victim = 0;
        for (slot, entry) in self.entries.iter().enumerate() {
            if entry.age > self.entries[victim].age {
                victim = slot;
            }
        }
        victim
    }

    /// Clears every valid entry caching `page`, returning the affected slots.
    pub fn invalidate_page(&mut self, page: u64) -> Vec<usize> {
        let mut slots = Vec::new();
        for (slot, entry) in self.entries.iter_mut().enumerate() {
            if entry.matches(page) {
                entry.invalidate();
                slots.push(slot);
            }
        }
        slots
    }

    /// Writes a valid entry directly into `slot` without aging anything. Used to
    /// restore a configured initial state.
    pub(crate) fn preload(&mut self, slot: usize, page: u64, frame: usize) {
        if let Some(entry) = self.entries.get_mut(slot) {
            *entry = TlbEntry::new(page, frame);
        }
    }

    pub fn flush_all(&mut self) {
        for entry in &mut self.entries {
            entry.invalidate();
        }
    }

    pub fn valid_entries(&self) -> impl Iterator<Item = (usize, u64, usize)> + '_ {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.valid)
            .map(|(slot, e)| (slot, e.page, e.frame))
    }

    pub fn views(&self) -> impl Iterator<Item = TlbEntryView> + '_ {
        self.entries
            .iter()
            .enumerate()
            .map(|(slot, e)| TlbEntryView {
                slot,
                valid: e.valid,
                page: e.valid.then_some(e.page),
                frame: e.valid.then_some(e.frame),
                age: e.age,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ages(tlb: &Tlb) -> Vec<u64> {
        tlb.views().map(|v| v.age).collect()
    }

    #[test]
    fn invalid_slots_fill_lowest_first() {
        let mut tlb = Tlb::new(3);
        assert_eq!(tlb.insert(10, 0).slot, 0);
        assert_eq!(tlb.insert(11, 1).slot, 1);
        assert_eq!(tlb.insert(12, 2).slot, 2);
        assert_eq!(ages(&tlb), [2, 1, 0]);

        tlb.invalidate_page(11);
        let fill = tlb.insert(13, 3);
        assert_eq!(fill.slot, 1, "invalid slot wins over the oldest valid one");
        assert_eq!(fill.replaced, None);
    }

    #[test]
    fn full_tlb_replaces_oldest_entry() {
        let mut tlb = Tlb::new(3);
        tlb.insert(10, 0);
        tlb.insert(11, 1);
        tlb.insert(12, 2);

        // Slot 0 (age 2) is oldest.
        let fill = tlb.insert(13, 3);
        assert_eq!(fill.slot, 0);
        assert_eq!(fill.replaced, Some((10, 0)));
        assert_eq!(tlb.lookup(10), None);
        assert_eq!(tlb.lookup(13), Some(TlbHit { slot: 0, frame: 3 }));
    }

    #[test]
    fn hit_protects_entry_from_replacement() {
        let mut tlb = Tlb::new(2);
        tlb.insert(10, 0);
        tlb.insert(11, 1);

        let hit = tlb.lookup(10).unwrap();
        tlb.reset_age_on_hit(hit.slot);
        assert_eq!(ages(&tlb), [0, 0]);

        // Both entries now share age 1 after aging; the tie goes to slot 0.
        let fill = tlb.insert(12, 2);
        assert_eq!(fill.slot, 0);

        tlb.reset_age_on_hit(0);
        let fill = tlb.insert(13, 3);
        assert_eq!(fill.slot, 1, "slot 1 was not hit and is strictly older");
    }

    #[test]
    fn ties_resolve_to_lowest_index() {
        let mut tlb = Tlb::new(4);
        for slot in 0..4 {
            tlb.preload(slot, 20 + slot as u64, slot);
        }
        assert_eq!(ages(&tlb), [0, 0, 0, 0]);
        assert_eq!(tlb.insert(99, 5).slot, 0);
    }

    #[test]
    fn invalidate_reports_all_matching_slots() {
        let mut tlb = Tlb::new(3);
        tlb.preload(0, 4, 1);
        tlb.preload(2, 4, 1);
        tlb.preload(1, 5, 2);

        assert_eq!(tlb.invalidate_page(4), [0, 2]);
        assert_eq!(tlb.invalidate_page(4), Vec::<usize>::new());
        let valid: Vec<_> = tlb.valid_entries().collect();
        assert_eq!(valid, [(1, 5, 2)]);
    }

    #[test]
    fn aging_skips_invalid_entries() {
        let mut tlb = Tlb::new(3);
        tlb.insert(1, 0);
        tlb.invalidate_page(1);
        let before = tlb.views().next().unwrap().age;
        tlb.insert(2, 1);
        let after = tlb.views().next().unwrap();
        assert_eq!(after.slot, 0);
        assert_eq!(after.page, Some(2), "invalid slot 0 is reused");
        assert_eq!(before, 0);
    }

    #[test]
    fn flush_all_invalidates_everything() {
        let mut tlb = Tlb::new(2);
        tlb.insert(1, 0);
        tlb.insert(2, 1);
        tlb.flush_all();
        assert_eq!(tlb.valid_entries().count(), 0);
        assert!(tlb.views().all(|v| v.page.is_none() && v.frame.is_none()));
    }
}
