use crate::notify::Permission;
use crate::scoring::{DEFAULT_GRACE_MINUTES, DEFAULT_MAX_LATENESS, ScoringRules};
use crate::storage::resolve_data_path;
use std::{env, fmt::Display, path::PathBuf, str::FromStr, time::Duration};
use tracing::warn;

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_TICK_SECS: u64 = 15;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub data_path: PathBuf,
    pub tick_interval: Duration,
    pub scoring: ScoringRules,
    pub notifications: Permission,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let tick_secs: u64 = parse_or(&lookup, "TICK_INTERVAL_SECS", DEFAULT_TICK_SECS).max(1);
        Self {
            port: parse_or(&lookup, "PORT", DEFAULT_PORT),
            data_path: resolve_data_path(lookup("APP_DATA_PATH")),
            tick_interval: Duration::from_secs(tick_secs),
            scoring: ScoringRules {
                grace_minutes: parse_or(&lookup, "GRACE_MINUTES", DEFAULT_GRACE_MINUTES),
                max_lateness: parse_or(&lookup, "MAX_LATENESS_MINUTES", DEFAULT_MAX_LATENESS),
            },
            notifications: parse_or(&lookup, "NOTIFICATIONS", Permission::Granted),
        }
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: FromStr,
    T::Err: Display,
{
    match lookup(key) {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|err| {
            warn!(key, value = %raw, "ignoring invalid setting: {err}");
            default
        }),
    }
}
