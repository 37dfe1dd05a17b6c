use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionParams {
    pub default_difficulty: u8,
    pub response_window: usize,
    pub state_history_len: usize,
    pub difficulty_history_len: usize,
    pub alert_history_len: usize,
    pub archived_sessions: usize,
}

impl Default for SessionParams {
    fn default() -> Self {
        Self {
            default_difficulty: 3,
            response_window: 10,
            state_history_len: 20,
            difficulty_history_len: 256,
            alert_history_len: 256,
            archived_sessions: 100,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierThresholds {
    pub trend_sample: usize,
    pub time_increase_ratio: f64,
    pub fatigue_min_minutes: f64,
    pub frustration_wrong_streak: u32,
    pub boredom_correct_streak: u32,
    pub boredom_success_rate: f64,
    pub boredom_max_response_secs: f64,
    pub distraction_success_rate: f64,
    pub distraction_max_response_secs: f64,
    pub distraction_max_hints: f64,
    pub struggle_success_rate: f64,
    pub struggle_min_hints: f64,
    pub confidence_correct_streak: u32,
    pub confidence_success_rate: f64,
}

impl Default for ClassifierThresholds {
    fn default() -> Self {
        Self {
            trend_sample: 5,
            time_increase_ratio: 1.5,
            fatigue_min_minutes: 20.0,
            frustration_wrong_streak: 3,
            boredom_correct_streak: 7,
            boredom_success_rate: 0.9,
            boredom_max_response_secs: 10.0,
            distraction_success_rate: 0.5,
            distraction_max_response_secs: 5.0,
            distraction_max_hints: 0.5,
            struggle_success_rate: 0.5,
            struggle_min_hints: 1.0,
            confidence_correct_streak: 4,
            confidence_success_rate: 0.75,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DifficultyParams {
    pub min_level: u8,
    pub max_level: u8,
    pub raise_success_rate: f64,
    pub raise_correct_streak: u32,
    pub lower_success_rate: f64,
    pub min_questions: u32,
    /// Emotional-path adjustments in the same direction as a metrics-path adjustment
    /// made within this many seconds are skipped. Zero disables coalescing.
    pub coalesce_window_secs: i64,
}

impl Default for DifficultyParams {
    fn default() -> Self {
        Self {
            min_level: 1,
            max_level: 5,
            raise_success_rate: 0.85,
            raise_correct_streak: 5,
            lower_success_rate: 0.4,
            min_questions: 5,
            coalesce_window_secs: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertParams {
    pub break_after_minutes: f64,
    pub break_cooldown_secs: i64,
    pub help_wrong_streak: u32,
}

impl Default for AlertParams {
    fn default() -> Self {
        Self {
            break_after_minutes: 25.0,
            break_cooldown_secs: 5 * 60,
            help_wrong_streak: 2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerParams {
    pub initial_ease: f64,
    pub min_ease: f64,
    pub max_interval_days: u32,
    pub expected_answer_secs: f64,
    pub due_limit: usize,
    pub upcoming_days: i64,
    pub mastered_ease: f64,
    pub mastered_interval_days: u32,
    pub struggling_ease: f64,
}

impl Default for SchedulerParams {
    fn default() -> Self {
        Self {
            initial_ease: 2.5,
            min_ease: 1.3,
            max_interval_days: 365,
            expected_answer_secs: 30.0,
            due_limit: 20,
            upcoming_days: 7,
            mastered_ease: 2.5,
            mastered_interval_days: 30,
            struggling_ease: 1.8,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatorParams {
    pub trend_days: i64,
    pub trend_min_reports: usize,
    pub trend_delta: f64,
    pub comparison_delta: f64,
    pub weekly_goal: u32,
    pub session_reports_kept: usize,
    pub weekly_reports_kept: usize,
    pub attempt_retention_days: i64,
}

impl Default for AggregatorParams {
    fn default() -> Self {
        Self {
            trend_days: 7,
            trend_min_reports: 3,
            trend_delta: 5.0,
            comparison_delta: 5.0,
            weekly_goal: 50,
            session_reports_kept: 100,
            weekly_reports_kept: 52,
            attempt_retention_days: 182,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    pub session: SessionParams,
    pub classifier: ClassifierThresholds,
    pub difficulty: DifficultyParams,
    pub alerts: AlertParams,
    pub scheduler: SchedulerParams,
    pub aggregator: AggregatorParams,
}

/// Longest accepted window or cooldown, in seconds (30 days).
pub const MAX_WINDOW_SECS: i64 = 30 * 24 * 3600;

/// Longest accepted review interval, in days (100 years).
pub const MAX_INTERVAL_DAYS: u32 = 36_500;

impl EngineConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads overrides through `lookup`. Unparsable or out-of-range values keep the default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(val) = lookup("TUTOR_BREAK_AFTER_MINUTES") {
            config.alerts.break_after_minutes = parse_bounded(
                "TUTOR_BREAK_AFTER_MINUTES",
                &val,
                |v: &f64| v.is_finite() && *v > 0.0,
                config.alerts.break_after_minutes,
            );
        }
        if let Some(val) = lookup("TUTOR_BREAK_COOLDOWN_SECS") {
            config.alerts.break_cooldown_secs = parse_bounded(
                "TUTOR_BREAK_COOLDOWN_SECS",
                &val,
                |v: &i64| (0..=MAX_WINDOW_SECS).contains(v),
                config.alerts.break_cooldown_secs,
            );
        }
        if let Some(val) = lookup("TUTOR_COALESCE_WINDOW_SECS") {
            config.difficulty.coalesce_window_secs = parse_bounded(
                "TUTOR_COALESCE_WINDOW_SECS",
                &val,
                |v: &i64| (0..=MAX_WINDOW_SECS).contains(v),
                config.difficulty.coalesce_window_secs,
            );
        }
        if let Some(val) = lookup("TUTOR_EXPECTED_ANSWER_SECS") {
            config.scheduler.expected_answer_secs = parse_bounded(
                "TUTOR_EXPECTED_ANSWER_SECS",
                &val,
                |v: &f64| v.is_finite() && *v > 0.0,
                config.scheduler.expected_answer_secs,
            );
        }
        if let Some(val) = lookup("TUTOR_MAX_INTERVAL_DAYS") {
            config.scheduler.max_interval_days = parse_bounded(
                "TUTOR_MAX_INTERVAL_DAYS",
                &val,
                |v: &u32| (1..=MAX_INTERVAL_DAYS).contains(v),
                config.scheduler.max_interval_days,
            );
        }

        config
    }
}

fn parse_bounded<T>(key: &str, raw: &str, valid: impl Fn(&T) -> bool, default: T) -> T
where
    T: std::str::FromStr + std::fmt::Display + Copy,
{
    match raw.trim().parse::<T>() {
        Ok(value) if valid(&value) => value,
        _ => {
            tracing::warn!(key, value = raw, default = %default, "ignoring invalid config value");
            default
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_with(vars: &[(&str, &str)]) -> EngineConfig {
        let vars: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        EngineConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn valid_overrides_apply() {
        let config = config_with(&[
            ("TUTOR_BREAK_COOLDOWN_SECS", "600"),
            ("TUTOR_COALESCE_WINDOW_SECS", " 60 "),
            ("TUTOR_MAX_INTERVAL_DAYS", "180"),
        ]);
        assert_eq!(config.alerts.break_cooldown_secs, 600);
        assert_eq!(config.difficulty.coalesce_window_secs, 60);
        assert_eq!(config.scheduler.max_interval_days, 180);
    }

    #[test]
    fn out_of_range_values_keep_defaults() {
        let config = config_with(&[
            ("TUTOR_BREAK_COOLDOWN_SECS", "9223372036854775807"),
            ("TUTOR_COALESCE_WINDOW_SECS", "-5"),
            ("TUTOR_BREAK_AFTER_MINUTES", "NaN"),
            ("TUTOR_EXPECTED_ANSWER_SECS", "abc"),
            ("TUTOR_MAX_INTERVAL_DAYS", "0"),
        ]);
        let defaults = EngineConfig::default();
        assert_eq!(config.alerts.break_cooldown_secs, defaults.alerts.break_cooldown_secs);
        assert_eq!(config.difficulty.coalesce_window_secs, defaults.difficulty.coalesce_window_secs);
        assert_eq!(config.alerts.break_after_minutes, defaults.alerts.break_after_minutes);
        assert_eq!(config.scheduler.expected_answer_secs, defaults.scheduler.expected_answer_secs);
        assert_eq!(config.scheduler.max_interval_days, defaults.scheduler.max_interval_days);
    }
}
