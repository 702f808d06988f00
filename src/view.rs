use crate::clock::{Moment, format_12h};
use crate::hydration::{due_block_slot, due_daily_slot};
use crate::models::{ActiveBlockView, BlockStatus, DayView, MainEntry};
use crate::reconciler::{active_blocks, find_main};
use crate::storage::KvStore;

pub fn build_day_view(store: &KvStore, now: Moment) -> DayView {
    let timetable = store.timetable();
    let log = store.log(now.date);
    let active = active_blocks(&timetable, now.minute);

    let micro_due = active
        .iter()
        .filter_map(|block| due_block_slot(block, find_main(&log, &block.name), &log, now.minute))
        .collect();
    let daily_water = due_daily_slot(&timetable, store.last_water_slot(now.date), now.minute);

    let mut phases: Vec<u32> = active.iter().map(|block| block.phase).collect();
    phases.sort_unstable();
    phases.dedup();

    let active = active
        .into_iter()
        .map(|block| ActiveBlockView {
            name: block.name.clone(),
            start: block.start,
            end: block.end,
            phase: block.phase,
            severity: block.severity,
            status: block_status(find_main(&log, &block.name)),
        })
        .collect();

    DayView {
        date: now.date_key(),
        now: format_12h(now.minute),
        phases,
        active,
        micro_due,
        daily_water,
        log,
    }
}

fn block_status(entry: Option<&MainEntry>) -> BlockStatus {
    match entry {
        None => BlockStatus::NotStarted,
        Some(entry) if entry.auto_missed => BlockStatus::Missed,
        Some(entry) => match entry.score {
            None => BlockStatus::Pending {
                started_at: entry.started_at,
            },
            Some(score) => BlockStatus::Completed {
                score,
                delay: entry.delay,
            },
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::start_main_event;
    use crate::models::TimetableBlock;
    use chrono::NaiveDate;

    fn moment(time: &str) -> Moment {
        Moment::at(NaiveDate::from_ymd_opt(2026, 6, 2).unwrap(), time.parse().unwrap())
    }

    fn block(name: &str, start: &str, end: &str, phase: u32) -> TimetableBlock {
        TimetableBlock {
            name: name.to_string(),
            start: start.parse().unwrap(),
            end: end.parse().unwrap(),
            phase,
            severity: 3,
        }
    }

    #[test]
    fn view_lists_active_blocks_and_due_water() {
        let mut store = KvStore::default();
        let timetable = [
            block("Deep Work", "09:00", "12:00", 2),
            block("Music", "10:00", "11:00", 3),
            block("Lunch", "12:00", "13:00", 1),
        ];
        store.set_timetable(&timetable);
        start_main_event(&mut store, moment("09:02"), &timetable[0]).unwrap();

        let view = build_day_view(&store, moment("10:15"));
        assert_eq!(view.date, "2026-06-02");
        assert_eq!(view.now, "10:15 AM");
        assert_eq!(view.phases, vec![2, 3]);
        assert_eq!(view.active.len(), 2);
        assert_eq!(view.active[0].status, BlockStatus::Pending { started_at: Some(542) });
        assert_eq!(view.active[1].status, BlockStatus::NotStarted);

        assert_eq!(view.micro_due.len(), 1);
        assert_eq!(view.micro_due[0].parent, "Deep Work");
        assert_eq!(view.daily_water.as_ref().map(|offer| offer.slot), Some(1));
        assert_eq!(view.log.len(), 1);
    }

    #[test]
    fn empty_store_renders_an_idle_day() {
        let view = build_day_view(&KvStore::default(), moment("07:00"));
        assert!(view.active.is_empty());
        assert!(view.phases.is_empty());
        assert!(view.daily_water.is_none());
        assert!(view.log.is_empty());
    }
}
