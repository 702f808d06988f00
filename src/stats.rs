use crate::clock::date_key;
use crate::models::{DaySummary, LogEntry, StatsResponse, WeeklyAveragePoint, WeeklyPoint};
use crate::storage::KvStore;
use chrono::{Datelike, Duration, Local, NaiveDate};

pub fn summarize_day(date: NaiveDate, log: &[LogEntry]) -> DaySummary {
    let mut summary = DaySummary {
        date: date_key(date),
        total_score: 0,
        completed: 0,
        missed: 0,
        hydration: 0,
    };
    for entry in log {
        summary.total_score += i64::from(entry.score().unwrap_or(0));
        match entry {
            LogEntry::Main(main) if main.auto_missed => summary.missed += 1,
            LogEntry::Main(main) if main.score.is_some() => summary.completed += 1,
            LogEntry::Main(_) => {}
            LogEntry::Micro(_) | LogEntry::DailyHydration(_) => summary.hydration += 1,
        }
    }
    summary
}

/// One summary per stored day, newest first.
pub fn build_history(data: &KvStore) -> Vec<DaySummary> {
    data.log_dates()
        .into_iter()
        .rev()
        .map(|date| summarize_day(date, &data.log(date)))
        .collect()
}

pub fn build_stats(data: &KvStore) -> StatsResponse {
    build_stats_at(Local::now().date_naive(), data)
}

pub fn build_stats_at(today: NaiveDate, data: &KvStore) -> StatsResponse {
    const WEEK_COUNT: usize = 8;

    let mut last_7_days = Vec::with_capacity(7);
    for offset in (0..7).rev() {
        let date = today - Duration::days(offset as i64);
        last_7_days.push(summarize_day(date, &data.log(date)));
    }

    let current_week_start = week_start(today);
    let mut weekly_totals = Vec::with_capacity(WEEK_COUNT);
    let mut weekly_averages = Vec::with_capacity(WEEK_COUNT);

    for offset in (0..WEEK_COUNT).rev() {
        let start = current_week_start - Duration::weeks(offset as i64);
        let end = start + Duration::days(6);

        let mut score_sum = 0i64;
        let mut completed_sum = 0u32;
        let mut missed_sum = 0u32;
        for day_offset in 0..7 {
            let date = start + Duration::days(day_offset);
            let day = summarize_day(date, &data.log(date));
            score_sum += day.total_score;
            completed_sum = completed_sum.saturating_add(day.completed);
            missed_sum = missed_sum.saturating_add(day.missed);
        }

        let days_counted = if today < start {
            0
        } else if today > end {
            7
        } else {
            (today - start).num_days() as u8 + 1
        };

        let denom = if days_counted == 0 { 1.0 } else { f64::from(days_counted) };

        weekly_totals.push(WeeklyPoint {
            week: week_label(start),
            start_date: start.to_string(),
            end_date: end.to_string(),
            total_score: score_sum,
            completed: completed_sum,
            missed: missed_sum,
        });

        weekly_averages.push(WeeklyAveragePoint {
            week: week_label(start),
            days_counted,
            avg_score: score_sum as f64 / denom,
            avg_completed: f64::from(completed_sum) / denom,
            avg_missed: f64::from(missed_sum) / denom,
        });
    }

    StatsResponse {
        last_7_days,
        weekly_totals,
        weekly_averages,
    }
}

fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_monday() as i64)
}

fn week_label(date: NaiveDate) -> String {
    let iso = date.iso_week();
    format!("{}-W{:02}", iso.year(), iso.week())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{HydrationEntry, MainEntry, WATER_NAME};

    fn main_entry(name: &str, score: Option<i32>, auto_missed: bool) -> LogEntry {
        LogEntry::Main(MainEntry {
            name: name.to_string(),
            phase: 1,
            severity: 4,
            start: "08:00".parse().unwrap(),
            started: !auto_missed,
            started_at: (!auto_missed).then_some(480),
            delay: score.map(|_| 0),
            score,
            auto_missed,
        })
    }

    fn water(score: i32) -> LogEntry {
        LogEntry::DailyHydration(HydrationEntry {
            name: WATER_NAME.to_string(),
            parent: "Daily Hydration".to_string(),
            slot: 1,
            delay: 0,
            score,
        })
    }

    #[test]
    fn summary_counts_each_kind() {
        let date = NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();
        let log = vec![
            main_entry("A", Some(40), false),
            main_entry("B", Some(0), true),
            main_entry("C", None, false),
            water(7),
        ];
        let summary = summarize_day(date, &log);
        assert_eq!(summary.total_score, 47);
        assert_eq!(summary.completed, 1);
        assert_eq!(summary.missed, 1);
        assert_eq!(summary.hydration, 1);
    }

    #[test]
    fn stats_last_7_days_includes_each_day() {
        let mut data = KvStore::default();
        let today = NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();
        let two_days_ago = today - Duration::days(2);
        data.save_log(two_days_ago, &[main_entry("A", Some(30), false), water(10)]);

        let stats = build_stats_at(today, &data);
        assert_eq!(stats.last_7_days.len(), 7);
        let point = stats
            .last_7_days
            .iter()
            .find(|day| day.date == two_days_ago.to_string())
            .expect("missing day");
        assert_eq!(point.total_score, 40);
        assert_eq!(point.completed, 1);
        assert_eq!(point.hydration, 1);
    }

    #[test]
    fn stats_weekly_series_lengths() {
        let data = KvStore::default();
        let today = NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();
        let stats = build_stats_at(today, &data);
        assert_eq!(stats.weekly_totals.len(), 8);
        assert_eq!(stats.weekly_averages.len(), 8);
        assert_eq!(stats.weekly_averages[7].days_counted, 1);
    }

    #[test]
    fn history_is_newest_first() {
        let mut data = KvStore::default();
        let first = NaiveDate::from_ymd_opt(2026, 1, 2).unwrap();
        let second = NaiveDate::from_ymd_opt(2026, 1, 3).unwrap();
        data.save_log(first, &[main_entry("A", Some(10), false)]);
        data.save_log(second, &[]);
        data.set_timetable(&[]);

        let history = build_history(&data);
        let dates: Vec<_> = history.iter().map(|day| day.date.as_str()).collect();
        assert_eq!(dates, vec!["2026-01-03", "2026-01-02"]);
        assert_eq!(history[1].total_score, 10);
    }
}
