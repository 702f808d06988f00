use crate::clock::{date_key, parse_date_key};
use crate::errors::AppError;
use crate::models::{HydrationScope, LogEntry, TimetableBlock};
use chrono::NaiveDate;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::{collections::BTreeMap, path::Path, path::PathBuf};
use tokio::fs;
use tracing::{error, warn};

pub const TIMETABLE_KEY: &str = "timetable";

/// Flat string-to-string store. Structured values are JSON encoded.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KvStore {
    entries: BTreeMap<String, String>,
}

impl KvStore {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Returns true when the stored value changed.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> bool {
        let value = value.into();
        match self.entries.insert(key.into(), value.clone()) {
            Some(previous) => previous != value,
            None => true,
        }
    }

    fn get_json<T: DeserializeOwned + Default>(&self, key: &str) -> T {
        let Some(raw) = self.get(key) else {
            return T::default();
        };
        match serde_json::from_str(raw) {
            Ok(value) => value,
            Err(err) => {
                warn!(key, "ignoring malformed stored value: {err}");
                T::default()
            }
        }
    }

    fn set_json<T: Serialize + ?Sized>(&mut self, key: String, value: &T) -> bool {
        match serde_json::to_string(value) {
            Ok(raw) => self.set(key, raw),
            Err(err) => {
                error!(key = %key, "failed to encode value: {err}");
                false
            }
        }
    }

    pub fn timetable(&self) -> Vec<TimetableBlock> {
        self.get_json(TIMETABLE_KEY)
    }

    pub fn set_timetable(&mut self, blocks: &[TimetableBlock]) -> bool {
        self.set_json(TIMETABLE_KEY.to_string(), blocks)
    }

    /// The log for `date`; an absent or unreadable record reads as empty.
    pub fn log(&self, date: NaiveDate) -> Vec<LogEntry> {
        self.get_json(&date_key(date))
    }

    pub fn save_log(&mut self, date: NaiveDate, log: &[LogEntry]) -> bool {
        self.set_json(date_key(date), log)
    }

    /// Dates that have a log record, oldest first.
    pub fn log_dates(&self) -> Vec<NaiveDate> {
        self.entries
            .keys()
            .filter_map(|key| parse_date_key(key).ok())
            .collect()
    }

    pub fn is_notified(&self, date: NaiveDate, scope: &HydrationScope, slot: u32) -> bool {
        self.get(&notified_key(date, scope, slot)).is_some()
    }

    pub fn mark_notified(&mut self, date: NaiveDate, scope: &HydrationScope, slot: u32) -> bool {
        self.set(notified_key(date, scope, slot), "yes")
    }

    pub fn last_water_slot(&self, date: NaiveDate) -> Option<u32> {
        self.get(&water_key(date)).and_then(|raw| raw.parse().ok())
    }

    pub fn set_last_water_slot(&mut self, date: NaiveDate, slot: u32) -> bool {
        self.set(water_key(date), slot.to_string())
    }
}

fn notified_key(date: NaiveDate, scope: &HydrationScope, slot: u32) -> String {
    format!("notified_{}_{}_{}", date_key(date), scope.flag_segment(), slot)
}

fn water_key(date: NaiveDate) -> String {
    format!("lastWaterSlot_{}", date_key(date))
}

pub fn resolve_data_path(configured: Option<String>) -> PathBuf {
    if let Some(path) = configured {
        return PathBuf::from(path);
    }

    PathBuf::from("data/state.json")
}

pub async fn load_data(path: &Path) -> KvStore {
    match fs::read(path).await {
        Ok(bytes) => match serde_json::from_slice(&bytes) {
            Ok(data) => data,
            Err(err) => {
                error!("failed to parse data file: {err}");
                KvStore::default()
            }
        },
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => KvStore::default(),
        Err(err) => {
            error!("failed to read data file: {err}");
            KvStore::default()
        }
    }
}

pub async fn persist_data(path: &Path, data: &KvStore) -> Result<(), AppError> {
    let payload = serde_json::to_vec_pretty(data).map_err(AppError::internal)?;
    fs::write(path, payload).await.map_err(AppError::internal)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{HydrationEntry, MainEntry, WATER_NAME};

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 2, d).unwrap()
    }

    fn sample_log() -> Vec<LogEntry> {
        vec![
            LogEntry::Main(MainEntry {
                name: "Read".to_string(),
                phase: 1,
                severity: 2,
                start: "08:00".parse().unwrap(),
                started: true,
                started_at: Some(485),
                delay: Some(5),
                score: Some(15),
                auto_missed: false,
            }),
            LogEntry::Micro(HydrationEntry {
                name: WATER_NAME.to_string(),
                parent: "Read".to_string(),
                slot: 1,
                delay: 0,
                score: 10,
            }),
        ]
    }

    #[test]
    fn log_round_trips_under_its_date_key() {
        let mut store = KvStore::default();
        let log = sample_log();
        assert!(store.save_log(day(3), &log));
        assert_eq!(store.log(day(3)), log);
        assert!(store.get("2026-02-03").is_some());
        assert!(store.log(day(4)).is_empty());
        assert!(!store.save_log(day(3), &log), "rewriting identical log is not a change");
    }

    #[test]
    fn malformed_values_read_as_empty() {
        let mut store = KvStore::default();
        store.set(TIMETABLE_KEY, "{not json");
        store.set("2026-02-03", "42");
        assert!(store.timetable().is_empty());
        assert!(store.log(day(3)).is_empty());
    }

    #[test]
    fn side_channel_flags_use_their_documented_keys() {
        let mut store = KvStore::default();
        let scope = HydrationScope::Block("Deep Work".to_string());
        assert!(!store.is_notified(day(5), &scope, 2));
        store.mark_notified(day(5), &scope, 2);
        assert!(store.is_notified(day(5), &scope, 2));
        assert_eq!(store.get("notified_2026-02-05_Deep Work_2"), Some("yes"));

        store.mark_notified(day(5), &HydrationScope::Daily, 1);
        assert_eq!(store.get("notified_2026-02-05_daily_1"), Some("yes"));

        store.set_last_water_slot(day(5), 3);
        assert_eq!(store.get("lastWaterSlot_2026-02-05"), Some("3"));
        assert_eq!(store.last_water_slot(day(5)), Some(3));
        assert_eq!(store.last_water_slot(day(6)), None);
    }

    #[test]
    fn log_dates_skip_other_keys() {
        let mut store = KvStore::default();
        store.set_timetable(&[]);
        store.save_log(day(9), &[]);
        store.save_log(day(2), &[]);
        store.set_last_water_slot(day(2), 1);
        assert_eq!(store.log_dates(), vec![day(2), day(9)]);
    }
}
