use crate::clock::{Moment, date_key};
use crate::hydration::{due_block_slot, due_daily_slot};
use crate::models::{HydrationOffer, HydrationScope, LogEntry, MainEntry, TimetableBlock};
use crate::notify::Notifier;
use crate::scoring::ScoringRules;
use crate::storage::KvStore;
use chrono::NaiveDate;
use std::{collections::HashSet, fmt, str::FromStr};
use tracing::{debug, info};

/// What asked for a reconciliation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickSource {
    Interval,
    Visibility,
    Focus,
    Render,
    StorageChanged,
    UserAction,
}

impl TickSource {
    /// Forcing sources run even when the current minute was already reconciled.
    pub fn forces(self) -> bool {
        matches!(self, TickSource::StorageChanged | TickSource::UserAction)
    }
}

impl FromStr for TickSource {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "interval" => Ok(TickSource::Interval),
            "visibility" => Ok(TickSource::Visibility),
            "focus" => Ok(TickSource::Focus),
            "render" => Ok(TickSource::Render),
            "storage" => Ok(TickSource::StorageChanged),
            other => Err(format!("unknown tick source `{other}`")),
        }
    }
}

impl fmt::Display for TickSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TickSource::Interval => "interval",
            TickSource::Visibility => "visibility",
            TickSource::Focus => "focus",
            TickSource::Render => "render",
            TickSource::StorageChanged => "storage",
            TickSource::UserAction => "user_action",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Same minute as the previous pass and nothing forced a rerun.
    Skipped,
    Reconciled { changed: bool },
}

impl TickOutcome {
    pub fn changed(self) -> bool {
        matches!(self, TickOutcome::Reconciled { changed: true })
    }
}

/// Brings the stored log in line with the timetable and the clock.
///
/// Holds the state that outlives a single pass: the minute of the last
/// completed pass and the slot keys already chimed today.
#[derive(Debug)]
pub struct Reconciler {
    rules: ScoringRules,
    last_minute: Option<(NaiveDate, u32)>,
    chimed: HashSet<String>,
}

impl Reconciler {
    pub fn new(rules: ScoringRules) -> Self {
        Self {
            rules,
            last_minute: None,
            chimed: HashSet::new(),
        }
    }

    pub fn rules(&self) -> &ScoringRules {
        &self.rules
    }

    pub fn tick(
        &mut self,
        store: &mut KvStore,
        now: Moment,
        source: TickSource,
        notifier: &dyn Notifier,
    ) -> TickOutcome {
        let minute_key = (now.date, now.minute);
        if !source.forces() && self.last_minute == Some(minute_key) {
            debug!(%source, "tick skipped, minute already reconciled");
            return TickOutcome::Skipped;
        }
        if self.last_minute.is_some_and(|(date, _)| date != now.date) {
            self.chimed.clear();
        }
        self.last_minute = Some(minute_key);

        let timetable = store.timetable();
        let mut changed = sync_with_timetable(store, now.date, &timetable);

        let mut log = store.log(now.date);
        if self.sweep(&timetable, &mut log, now.minute) {
            changed |= store.save_log(now.date, &log);
        }

        for block in active_blocks(&timetable, now.minute) {
            let entry = find_main(&log, &block.name);
            if let Some(offer) = due_block_slot(block, entry, &log, now.minute) {
                let scope = HydrationScope::Block(block.name.clone());
                let body = format!("Hydration break during {}", block.name);
                changed |= self.announce(store, now.date, &scope, &offer, &body, notifier);
            }
        }

        let watermark = store.last_water_slot(now.date);
        if let Some(offer) = due_daily_slot(&timetable, watermark, now.minute) {
            changed |= self.announce(
                store,
                now.date,
                &HydrationScope::Daily,
                &offer,
                "Time for your hourly hydration!",
                notifier,
            );
        }

        debug!(%source, changed, "tick reconciled");
        TickOutcome::Reconciled { changed }
    }

    /// Auto-misses ended blocks with no entry and finalizes ended pending ones.
    fn sweep(&self, timetable: &[TimetableBlock], log: &mut Vec<LogEntry>, minute: u32) -> bool {
        let mut changed = false;
        for block in timetable.iter().filter(|block| block.has_ended(minute)) {
            let existing = log
                .iter_mut()
                .filter_map(LogEntry::as_main_mut)
                .find(|entry| entry.name == block.name);
            match existing {
                Some(entry) if entry.is_pending() => {
                    self.rules.finalize(entry);
                    info!(block = %block.name, delay = ?entry.delay, score = ?entry.score, "block finalized");
                    changed = true;
                }
                Some(_) => {}
                None => {
                    info!(block = %block.name, "block ended without a start, marking missed");
                    log.push(LogEntry::Main(MainEntry {
                        name: block.name.clone(),
                        phase: block.phase,
                        severity: block.severity,
                        start: block.start,
                        started: false,
                        started_at: None,
                        delay: Some(self.rules.max_lateness),
                        score: Some(0),
                        auto_missed: true,
                    }));
                    changed = true;
                }
            }
        }
        changed
    }

    /// Notifies once per stored slot flag and chimes once per slot key.
    fn announce(
        &mut self,
        store: &mut KvStore,
        date: NaiveDate,
        scope: &HydrationScope,
        offer: &HydrationOffer,
        body: &str,
        notifier: &dyn Notifier,
    ) -> bool {
        let slot_key = format!("{}_{}_{}", date_key(date), scope.flag_segment(), offer.slot);
        let mut changed = false;

        if !store.is_notified(date, scope, offer.slot) {
            if let Err(err) = notifier.notify(&slot_key, "Drink Water", body) {
                debug!(%slot_key, "notification dropped: {err}");
            }
            changed = store.mark_notified(date, scope, offer.slot);
        }

        if !self.chimed.contains(&slot_key) {
            if let Err(err) = notifier.chime(&slot_key) {
                debug!(%slot_key, "chime dropped: {err}");
            }
            self.chimed.insert(slot_key);
        }

        changed
    }
}

/// Drops main entries for blocks no longer in the timetable. Hydration
/// entries always stay.
pub fn sync_with_timetable(store: &mut KvStore, date: NaiveDate, timetable: &[TimetableBlock]) -> bool {
    let names: HashSet<&str> = timetable.iter().map(|block| block.name.as_str()).collect();
    let log = store.log(date);
    let before = log.len();
    let cleaned: Vec<LogEntry> = log
        .into_iter()
        .filter(|entry| match entry {
            LogEntry::Main(main) => names.contains(main.name.as_str()),
            LogEntry::Micro(_) | LogEntry::DailyHydration(_) => true,
        })
        .collect();

    if cleaned.len() == before {
        return false;
    }
    info!(removed = before - cleaned.len(), "pruned entries for removed blocks");
    store.save_log(date, &cleaned)
}

/// Every block covering `minute`; overlapping blocks are all returned.
pub fn active_blocks(timetable: &[TimetableBlock], minute: u32) -> Vec<&TimetableBlock> {
    timetable.iter().filter(|block| block.is_active(minute)).collect()
}

pub fn find_main<'a>(log: &'a [LogEntry], name: &str) -> Option<&'a MainEntry> {
    log.iter().filter_map(LogEntry::as_main).find(|entry| entry.name == name)
}
