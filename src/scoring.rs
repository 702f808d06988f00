use crate::models::MainEntry;

pub const DEFAULT_GRACE_MINUTES: u32 = 15;
pub const DEFAULT_MAX_LATENESS: u32 = 999;

/// Punctuality rules shared by block and hydration scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoringRules {
    /// Lateness still worth points.
    pub grace_minutes: u32,
    /// Delay recorded for a block that was never started.
    pub max_lateness: u32,
}

impl Default for ScoringRules {
    fn default() -> Self {
        Self {
            grace_minutes: DEFAULT_GRACE_MINUTES,
            max_lateness: DEFAULT_MAX_LATENESS,
        }
    }
}

impl ScoringRules {
    pub fn block_score(&self, severity: u32, delay: u32) -> i32 {
        if delay > self.grace_minutes {
            return 0;
        }
        let raw = i64::from(severity) * 10 - i64::from(delay);
        raw.clamp(0, i64::from(i32::MAX)) as i32
    }

    /// Hydration checkpoints are worth 10 minus the delay while inside the
    /// grace window; the late end of the window goes below zero.
    pub fn hydration_score(&self, delay: u32) -> i32 {
        if delay > self.grace_minutes {
            return 0;
        }
        10 - delay.min(i32::MAX as u32) as i32
    }

    /// Fixes `delay` and `score` of a started entry.
    pub fn finalize(&self, entry: &mut MainEntry) {
        let started_at = entry.started_at.unwrap_or(entry.start.minutes());
        let delay = started_at.saturating_sub(entry.start.minutes());
        entry.delay = Some(delay);
        entry.score = Some(self.block_score(entry.severity, delay));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn started(severity: u32, start: &str, started_at: u32) -> MainEntry {
        MainEntry {
            name: "Focus".to_string(),
            phase: 1,
            severity,
            start: start.parse().unwrap(),
            started: true,
            started_at: Some(started_at),
            delay: None,
            score: None,
            auto_missed: false,
        }
    }

    #[test]
    fn ten_minutes_late_at_severity_five_scores_forty() {
        let rules = ScoringRules::default();
        let mut entry = started(5, "09:00", 9 * 60 + 10);
        rules.finalize(&mut entry);
        assert_eq!(entry.delay, Some(10));
        assert_eq!(entry.score, Some(40));
    }

    #[test]
    fn early_start_clamps_delay_to_zero() {
        let rules = ScoringRules::default();
        let mut entry = started(3, "09:00", 8 * 60 + 50);
        rules.finalize(&mut entry);
        assert_eq!(entry.delay, Some(0));
        assert_eq!(entry.score, Some(30));
    }

    #[test]
    fn past_grace_scores_zero() {
        let rules = ScoringRules::default();
        let mut entry = started(9, "09:00", 9 * 60 + 16);
        rules.finalize(&mut entry);
        assert_eq!(entry.delay, Some(16));
        assert_eq!(entry.score, Some(0));
    }

    #[test]
    fn low_severity_score_never_negative() {
        let rules = ScoringRules::default();
        assert_eq!(rules.block_score(1, 15), 0);
        assert_eq!(rules.block_score(1, 12), 0);
        assert_eq!(rules.block_score(2, 15), 5);
    }

    #[test]
    fn hydration_scores() {
        let rules = ScoringRules::default();
        assert_eq!(rules.hydration_score(0), 10);
        assert_eq!(rules.hydration_score(4), 6);
        assert_eq!(rules.hydration_score(15), -5);
        assert_eq!(rules.hydration_score(16), 0);
    }

    #[test]
    fn grace_window_is_configurable() {
        let rules = ScoringRules {
            grace_minutes: 5,
            ..ScoringRules::default()
        };
        assert_eq!(rules.block_score(5, 6), 0);
        assert_eq!(rules.block_score(5, 5), 45);
    }
}
