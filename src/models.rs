use crate::clock::ClockTime;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

pub const WATER_NAME: &str = "Drink Water";
pub const DAILY_HYDRATION_PARENT: &str = "Daily Hydration";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimetableBlock {
    pub name: String,
    pub start: ClockTime,
    pub end: ClockTime,
    pub phase: u32,
    pub severity: u32,
}

impl TimetableBlock {
    pub fn is_active(&self, minute: u32) -> bool {
        self.start.minutes() <= minute && minute < self.end.minutes()
    }

    pub fn has_ended(&self, minute: u32) -> bool {
        minute >= self.end.minutes()
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TimetableError {
    #[error("block name must not be empty")]
    EmptyName,
    #[error("block `{0}` appears more than once")]
    DuplicateName(String),
    #[error("block `{name}` must start before it ends ({start} >= {end})")]
    InvertedRange {
        name: String,
        start: ClockTime,
        end: ClockTime,
    },
    #[error("block `{0}` needs a severity of at least 1")]
    ZeroSeverity(String),
}

pub fn validate_timetable(blocks: &[TimetableBlock]) -> Result<(), TimetableError> {
    let mut seen = HashSet::new();
    for block in blocks {
        if block.name.trim().is_empty() {
            return Err(TimetableError::EmptyName);
        }
        if !seen.insert(block.name.as_str()) {
            return Err(TimetableError::DuplicateName(block.name.clone()));
        }
        if block.start >= block.end {
            return Err(TimetableError::InvertedRange {
                name: block.name.clone(),
                start: block.start,
                end: block.end,
            });
        }
        if block.severity == 0 {
            return Err(TimetableError::ZeroSeverity(block.name.clone()));
        }
    }
    Ok(())
}

/// One recorded outcome in a day's log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LogEntry {
    Main(MainEntry),
    Micro(HydrationEntry),
    DailyHydration(HydrationEntry),
}

impl LogEntry {
    pub fn as_main(&self) -> Option<&MainEntry> {
        match self {
            LogEntry::Main(entry) => Some(entry),
            _ => None,
        }
    }

    pub fn as_main_mut(&mut self) -> Option<&mut MainEntry> {
        match self {
            LogEntry::Main(entry) => Some(entry),
            _ => None,
        }
    }

    pub fn hydration(&self) -> Option<&HydrationEntry> {
        match self {
            LogEntry::Micro(entry) | LogEntry::DailyHydration(entry) => Some(entry),
            LogEntry::Main(_) => None,
        }
    }

    pub fn score(&self) -> Option<i32> {
        match self {
            LogEntry::Main(entry) => entry.score,
            LogEntry::Micro(entry) | LogEntry::DailyHydration(entry) => Some(entry.score),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MainEntry {
    pub name: String,
    pub phase: u32,
    pub severity: u32,
    pub start: ClockTime,
    pub started: bool,
    pub started_at: Option<u32>,
    pub delay: Option<u32>,
    pub score: Option<i32>,
    #[serde(default)]
    pub auto_missed: bool,
}

impl MainEntry {
    pub fn is_pending(&self) -> bool {
        self.started && self.score.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HydrationEntry {
    pub name: String,
    pub parent: String,
    pub slot: u32,
    pub delay: u32,
    pub score: i32,
}

/// Which clock a hydration slot is counted against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HydrationScope {
    Block(String),
    Daily,
}

impl HydrationScope {
    pub fn parent(&self) -> &str {
        match self {
            HydrationScope::Block(name) => name,
            HydrationScope::Daily => DAILY_HYDRATION_PARENT,
        }
    }

    /// Scope segment of the `notified_*` flag keys.
    pub fn flag_segment(&self) -> &str {
        match self {
            HydrationScope::Block(name) => name,
            HydrationScope::Daily => "daily",
        }
    }
}

/// A hydration checkpoint the user has not marked yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HydrationOffer {
    pub name: String,
    pub parent: String,
    pub slot: u32,
    pub start_minute: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum BlockStatus {
    NotStarted,
    Pending { started_at: Option<u32> },
    Completed { score: i32, delay: Option<u32> },
    Missed,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActiveBlockView {
    pub name: String,
    pub start: ClockTime,
    pub end: ClockTime,
    pub phase: u32,
    pub severity: u32,
    pub status: BlockStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct DayView {
    pub date: String,
    pub now: String,
    pub phases: Vec<u32>,
    pub active: Vec<ActiveBlockView>,
    pub micro_due: Vec<HydrationOffer>,
    pub daily_water: Option<HydrationOffer>,
    pub log: Vec<LogEntry>,
}

#[derive(Debug, Deserialize)]
pub struct StartRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct MicroRequest {
    pub parent: String,
    pub slot: u32,
}

#[derive(Debug, Deserialize)]
pub struct WaterRequest {
    pub slot: u32,
}

#[derive(Debug, Deserialize)]
pub struct TickRequest {
    pub source: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DaySummary {
    pub date: String,
    pub total_score: i64,
    pub completed: u32,
    pub missed: u32,
    pub hydration: u32,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub days: Vec<DaySummary>,
}

#[derive(Debug, Serialize)]
pub struct DayLogResponse {
    pub date: String,
    pub summary: DaySummary,
    pub log: Vec<LogEntry>,
}

#[derive(Debug, Serialize)]
pub struct WeeklyPoint {
    pub week: String,
    pub start_date: String,
    pub end_date: String,
    pub total_score: i64,
    pub completed: u32,
    pub missed: u32,
}

#[derive(Debug, Serialize)]
pub struct WeeklyAveragePoint {
    pub week: String,
    pub days_counted: u8,
    pub avg_score: f64,
    pub avg_completed: f64,
    pub avg_missed: f64,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub last_7_days: Vec<DaySummary>,
    pub weekly_totals: Vec<WeeklyPoint>,
    pub weekly_averages: Vec<WeeklyAveragePoint>,
}
