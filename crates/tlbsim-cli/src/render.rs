//! Plain-text rendering of engine state for terminal output.

use std::fmt::Write as _;

use tlbsim_engine::{EngineEvent, EventRecord, Snapshot};

fn opt<T: ToString>(value: Option<T>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}

fn flag(b: bool) -> &'static str {
    if b {
        "yes"
    } else {
        "no"
    }
}

pub fn snapshot_tables(snap: &Snapshot) -> String {
    let mut out = String::new();

    // Writing into a `String` cannot fail.
    let _ = writeln!(out, "TLB");
    let _ = writeln!(out, "  {:<5} {:<6} {:<6} {:<6} {:<4}", "slot", "valid", "page", "frame", "age");
    for e in &snap.tlb_entries {
        let _ = writeln!(
            out,
            "  {:<5} {:<6} {:<6} {:<6} {:<4}",
            e.slot,
            flag(e.valid),
            opt(e.page),
            opt(e.frame),
            e.age
        );
    }

    let _ = writeln!(out, "Page table");
    let _ = writeln!(out, "  {:<5} {:<8} {:<6}", "page", "present", "frame");
    for e in &snap.page_table_entries {
        let present = if e.deleted { "deleted" } else { flag(e.present) };
        let _ = writeln!(out, "  {:<5} {:<8} {:<6}", e.page, present, opt(e.frame));
    }

    let _ = writeln!(out, "Physical memory");
    let _ = writeln!(out, "  {:<6} {}", "frame", "contents");
    for f in &snap.frames {
        let _ = writeln!(out, "  {:<6} {}", f.frame, f.label());
    }

    out
}

pub fn event_line(record: &EventRecord) -> String {
    let detail = match &record.event {
        EngineEvent::Translated { outcome } => format!("translated [{}] {outcome}", outcome.kind()),
        EngineEvent::Evicted { page, frame } => format!("evicted page {page} from frame {frame}"),
        EngineEvent::TlbInvalidated { slot, page } => {
            format!("invalidated TLB slot {slot} (page {page})")
        }
        EngineEvent::TlbFilled {
            slot,
            page,
            frame,
            replaced_page,
        } => match replaced_page {
            Some(old) => format!("TLB slot {slot}: page {page} -> frame {frame} (replaced page {old})"),
            None => format!("TLB slot {slot}: page {page} -> frame {frame}"),
        },
        EngineEvent::PageLoaded { page, frame } => format!("loaded page {page} into frame {frame}"),
        EngineEvent::PagesAdded { first, last } if first == last => format!("added page {first}"),
        EngineEvent::PagesAdded { first, last } => format!("added pages {first}..={last}"),
        EngineEvent::PageDeleted { page, freed_frame } => match freed_frame {
            Some(frame) => format!("deleted page {page}, freed frame {frame}"),
            None => format!("deleted page {page}"),
        },
        EngineEvent::Reset => "reset".to_string(),
    };
    format!("#{} {detail}", record.seq)
}
