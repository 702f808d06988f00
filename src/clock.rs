use chrono::{Local, NaiveDate, Timelike};
use std::{fmt, str::FromStr};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ClockError {
    #[error("invalid time of day `{0}`, expected HH:MM")]
    Malformed(String),
    #[error("invalid date `{0}`, expected YYYY-MM-DD")]
    BadDate(String),
}

/// Time of day in whole minutes since midnight, written as `HH:MM`.
///
/// `24:00` is accepted so a block can run to the end of the day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ClockTime(u32);

impl ClockTime {
    #[cfg(test)]
    pub const END_OF_DAY: ClockTime = ClockTime(24 * 60);

    pub fn minutes(self) -> u32 {
        self.0
    }
}

impl FromStr for ClockTime {
    type Err = ClockError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let malformed = || ClockError::Malformed(value.to_string());
        let (hours, minutes) = value.trim().split_once(':').ok_or_else(malformed)?;
        let hours: u32 = hours.parse().map_err(|_| malformed())?;
        let minutes: u32 = minutes.parse().map_err(|_| malformed())?;
        if minutes > 59 || hours > 24 || (hours == 24 && minutes != 0) {
            return Err(malformed());
        }
        Ok(Self(hours * 60 + minutes))
    }
}

impl TryFrom<String> for ClockTime {
    type Error = ClockError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ClockTime> for String {
    fn from(value: ClockTime) -> Self {
        value.to_string()
    }
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.0 / 60, self.0 % 60)
    }
}

/// A wall-clock reading truncated to the minute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Moment {
    pub date: NaiveDate,
    pub minute: u32,
}

impl Moment {
    pub fn now() -> Self {
        let now = Local::now();
        Self {
            date: now.date_naive(),
            minute: now.hour() * 60 + now.minute(),
        }
    }

    #[cfg(test)]
    pub fn at(date: NaiveDate, time: ClockTime) -> Self {
        Self {
            date,
            minute: time.minutes(),
        }
    }

    pub fn date_key(&self) -> String {
        date_key(self.date)
    }
}

pub fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub fn parse_date_key(value: &str) -> Result<NaiveDate, ClockError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| ClockError::BadDate(value.to_string()))
}

/// `13:05` -> `01:05 PM`
pub fn format_12h(minute: u32) -> String {
    let hours = (minute / 60) % 24;
    let suffix = if hours >= 12 { "PM" } else { "AM" };
    let hour12 = match hours % 12 {
        0 => 12,
        h => h,
    };
    format!("{:02}:{:02} {}", hour12, minute % 60, suffix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_prints_clock_times() {
        let time: ClockTime = "09:05".parse().unwrap();
        assert_eq!(time.minutes(), 545);
        assert_eq!(time.to_string(), "09:05");
        assert_eq!("24:00".parse::<ClockTime>().unwrap(), ClockTime::END_OF_DAY);
    }

    #[test]
    fn rejects_malformed_clock_times() {
        for bad in ["", "9", "25:00", "24:01", "10:60", "ab:cd"] {
            assert!(bad.parse::<ClockTime>().is_err(), "accepted {bad:?}");
        }
    }

    #[test]
    fn clock_time_serializes_as_string() {
        let time: ClockTime = serde_json::from_str("\"18:30\"").unwrap();
        assert_eq!(time.minutes(), 18 * 60 + 30);
        assert_eq!(serde_json::to_string(&time).unwrap(), "\"18:30\"");
        assert!(serde_json::from_str::<ClockTime>("\"18h30\"").is_err());
    }

    #[test]
    fn twelve_hour_format() {
        assert_eq!(format_12h(0), "12:00 AM");
        assert_eq!(format_12h(13 * 60 + 5), "01:05 PM");
        assert_eq!(format_12h(12 * 60), "12:00 PM");
    }

    #[test]
    fn date_keys_round_trip() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 7).unwrap();
        assert_eq!(date_key(date), "2026-03-07");
        assert_eq!(parse_date_key("2026-03-07").unwrap(), date);
        assert!(parse_date_key("timetable").is_err());
    }
}
