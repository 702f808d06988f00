//! Hourly hydration checkpoints.
//!
//! Two independent clocks produce checkpoints: each started block counts
//! hours from its own start, and the day as a whole counts hours from the
//! earliest block start until the latest block end.

use crate::models::{HydrationOffer, LogEntry, MainEntry, TimetableBlock, WATER_NAME};

pub const SLOT_MINUTES: u32 = 60;

/// Hour index of `minute` counted from `origin`, if at least one full hour has passed.
fn slot_since(origin: u32, minute: u32) -> Option<u32> {
    let elapsed = minute.checked_sub(origin)?;
    if elapsed < SLOT_MINUTES {
        return None;
    }
    Some(elapsed / SLOT_MINUTES)
}

/// The checkpoint owed inside `block`, unless it was already logged.
pub fn due_block_slot(
    block: &TimetableBlock,
    entry: Option<&MainEntry>,
    log: &[LogEntry],
    minute: u32,
) -> Option<HydrationOffer> {
    if !entry.is_some_and(|entry| entry.started) {
        return None;
    }
    let origin = block.start.minutes();
    let slot = slot_since(origin, minute)?;
    let logged = log.iter().any(|e| match e {
        LogEntry::Micro(h) => h.parent == block.name && h.slot == slot,
        _ => false,
    });
    if logged {
        return None;
    }
    Some(HydrationOffer {
        name: WATER_NAME.to_string(),
        parent: block.name.clone(),
        slot,
        start_minute: origin + slot * SLOT_MINUTES,
    })
}

/// Earliest start and latest end across the timetable.
pub fn day_bounds(timetable: &[TimetableBlock]) -> Option<(u32, u32)> {
    let start = timetable.iter().map(|b| b.start.minutes()).min()?;
    let end = timetable.iter().map(|b| b.end.minutes()).max()?;
    Some((start, end))
}

/// The day-wide checkpoint, if one is owed. `watermark` is the slot most
/// recently marked done; it suppresses that slot only.
pub fn due_daily_slot(
    timetable: &[TimetableBlock],
    watermark: Option<u32>,
    minute: u32,
) -> Option<HydrationOffer> {
    let (day_start, day_end) = day_bounds(timetable)?;
    if minute >= day_end {
        return None;
    }
    let slot = slot_since(day_start, minute)?;
    if watermark == Some(slot) {
        return None;
    }
    Some(HydrationOffer {
        name: WATER_NAME.to_string(),
        parent: crate::models::DAILY_HYDRATION_PARENT.to_string(),
        slot,
        start_minute: day_start + slot * SLOT_MINUTES,
    })
}
