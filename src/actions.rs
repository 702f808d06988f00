//! Log mutations requested by the user. Callers re-run the reconciler
//! afterwards with [`TickSource::UserAction`](crate::reconciler::TickSource).

use crate::clock::{format_12h, Moment};
use crate::hydration::{SLOT_MINUTES, day_bounds, due_block_slot, due_daily_slot};
use crate::models::{HydrationEntry, HydrationScope, LogEntry, MainEntry, TimetableBlock, WATER_NAME};
use crate::reconciler::find_main;
use crate::scoring::ScoringRules;
use crate::storage::KvStore;
use chrono::NaiveDate;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ActionError {
    #[error("`{block}` does not start until {starts}")]
    NotStarted { block: String, starts: String },
    #[error("hydration slot {slot} of `{parent}` is not due")]
    SlotNotDue { parent: String, slot: u32 },
    #[error("no timetable to count hydration from")]
    NoTimetable,
}

/// Records that the user began `block`. Returns false when the block already
/// has an entry for the day.
///
/// A block cannot be started before its start time. Once it has ended the
/// start is still taken and the next pass scores it with its real delay.
pub fn start_main_event(store: &mut KvStore, now: Moment, block: &TimetableBlock) -> Result<bool, ActionError> {
    if now.minute < block.start.minutes() {
        return Err(ActionError::NotStarted {
            block: block.name.clone(),
            starts: format_12h(block.start.minutes()),
        });
    }

    let mut log = store.log(now.date);
    if find_main(&log, &block.name).is_some() {
        debug!(block = %block.name, "start ignored, entry exists");
        return Ok(false);
    }

    log.push(LogEntry::Main(MainEntry {
        name: block.name.clone(),
        phase: block.phase,
        severity: block.severity,
        start: block.start,
        started: true,
        started_at: Some(now.minute),
        delay: None,
        score: None,
        auto_missed: false,
    }));
    info!(block = %block.name, at = now.minute, "block started");
    Ok(store.save_log(now.date, &log))
}

/// Appends a hydration entry scored against `start_minute`.
pub fn mark_micro(
    store: &mut KvStore,
    rules: &ScoringRules,
    now: Moment,
    scope: &HydrationScope,
    slot: u32,
    start_minute: u32,
) -> HydrationEntry {
    let delay = now.minute.saturating_sub(start_minute);
    let entry = HydrationEntry {
        name: WATER_NAME.to_string(),
        parent: scope.parent().to_string(),
        slot,
        delay,
        score: rules.hydration_score(delay),
    };

    let mut log = store.log(now.date);
    log.push(match scope {
        HydrationScope::Block(_) => LogEntry::Micro(entry.clone()),
        HydrationScope::Daily => LogEntry::DailyHydration(entry.clone()),
    });
    store.save_log(now.date, &log);
    info!(parent = %entry.parent, slot, delay, "hydration marked");
    entry
}

/// Marks the checkpoint `slot` of `block`, which must be the one currently owed.
pub fn mark_block_water(
    store: &mut KvStore,
    rules: &ScoringRules,
    now: Moment,
    block: &TimetableBlock,
    slot: u32,
) -> Result<HydrationEntry, ActionError> {
    let log = store.log(now.date);
    let offer = block
        .is_active(now.minute)
        .then(|| due_block_slot(block, find_main(&log, &block.name), &log, now.minute))
        .flatten()
        .filter(|offer| offer.slot == slot)
        .ok_or_else(|| ActionError::SlotNotDue {
            parent: block.name.clone(),
            slot,
        })?;

    let scope = HydrationScope::Block(block.name.clone());
    Ok(mark_micro(store, rules, now, &scope, slot, offer.start_minute))
}

pub fn mark_water_done(store: &mut KvStore, date: NaiveDate, slot: u32) -> bool {
    store.set_last_water_slot(date, slot)
}

/// Logs the day-wide checkpoint `slot` and moves the watermark onto it.
/// Only the checkpoint currently owed can be marked.
pub fn mark_water(
    store: &mut KvStore,
    rules: &ScoringRules,
    now: Moment,
    timetable: &[TimetableBlock],
    slot: u32,
) -> Result<HydrationEntry, ActionError> {
    let (day_start, _) = day_bounds(timetable).ok_or(ActionError::NoTimetable)?;
    let watermark = store.last_water_slot(now.date);
    if due_daily_slot(timetable, watermark, now.minute).is_none_or(|offer| offer.slot != slot) {
        return Err(ActionError::SlotNotDue {
            parent: crate::models::DAILY_HYDRATION_PARENT.to_string(),
            slot,
        });
    }

    let start_minute = day_start.saturating_add(slot.saturating_mul(SLOT_MINUTES));
    let entry = mark_micro(store, rules, now, &HydrationScope::Daily, slot, start_minute);
    mark_water_done(store, now.date, slot);
    Ok(entry)
}
