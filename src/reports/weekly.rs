use std::collections::BTreeMap;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::adapt::config::AggregatorParams;
use crate::patterns::ErrorPattern;
use crate::reports::session_report::SessionReport;
use crate::srs::ReviewCard;

const SKILLS_LISTED: usize = 5;
const PERSISTENT_LISTED: usize = 3;
const PERSISTENT_MIN_OCCURRENCES: u32 = 3;

pub const WEEKLY_ENCOURAGEMENTS: [&str; 5] = [
    "Keep it up, you're making great progress!",
    "Every exercise makes you stronger!",
    "Your hard work is paying off, well done!",
    "You're on the right track, keep going!",
    "Impressive! You get better every day!",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Improving,
    Stable,
    Declining,
}

impl Trend {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Improving => "improving",
            Self::Stable => "stable",
            Self::Declining => "declining",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Consistency {
    Excellent,
    Good,
    NeedsImprovement,
}

impl Consistency {
    pub fn from_active_days(days: usize) -> Self {
        match days {
            d if d >= 5 => Self::Excellent,
            d if d >= 3 => Self::Good,
            _ => Self::NeedsImprovement,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Excellent => "excellent",
            Self::Good => "good",
            Self::NeedsImprovement => "needs improvement",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayRate {
    pub date: NaiveDate,
    pub success_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalProgress {
    pub completed: u32,
    pub goal: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyReport {
    pub profile_id: String,
    pub week_start: DateTime<Utc>,
    pub week_end: DateTime<Utc>,
    pub total_sessions: usize,
    pub total_exercises: u32,
    pub total_minutes: i64,
    pub days_active: usize,
    pub average_success_rate: i64,
    pub best_day: Option<DayRate>,
    pub worst_day: Option<DayRate>,
    pub skills_mastered: Vec<String>,
    pub skills_in_progress: Vec<String>,
    pub skills_needing_attention: Vec<String>,
    pub patterns_resolved: Vec<String>,
    pub persistent_patterns: Vec<String>,
    pub trend: Trend,
    pub consistency: Consistency,
    pub weekly_goal_met: bool,
    pub exercises_vs_goal: GoalProgress,
    pub achievements: Vec<String>,
    pub encouragement: String,
}

/// Compares the mean success of the older and newer halves of `reports`.
/// `reports` must already be restricted to the trend window.
pub fn trend_of(reports: &[SessionReport], min_reports: usize, delta: f64) -> Trend {
    if reports.len() < min_reports.max(2) {
        return Trend::Stable;
    }
    let mut sorted: Vec<&SessionReport> = reports.iter().collect();
    sorted.sort_by_key(|r| r.date);

    let mid = sorted.len() / 2;
    let mean = |slice: &[&SessionReport]| slice.iter().map(|r| r.success_rate as f64).sum::<f64>() / slice.len() as f64;
    let first = mean(&sorted[..mid]);
    let second = mean(&sorted[mid..]);

    if second > first + delta {
        Trend::Improving
    } else if second < first - delta {
        Trend::Declining
    } else {
        Trend::Stable
    }
}

/// Success per calendar day, best first. Days without exercises rate 0.
fn day_rates(reports: &[SessionReport]) -> Vec<DayRate> {
    let mut by_day: BTreeMap<NaiveDate, (u32, u32)> = BTreeMap::new();
    for report in reports {
        let entry = by_day.entry(report.date.date_naive()).or_default();
        entry.0 += report.correct_answers;
        entry.1 += report.total_exercises;
    }
    let mut rates: Vec<DayRate> = by_day
        .into_iter()
        .map(|(date, (correct, total))| DayRate {
            date,
            success_rate: if total == 0 { 0.0 } else { correct as f64 / total as f64 * 100.0 },
        })
        .collect();
    rates.sort_by(|a, b| b.success_rate.total_cmp(&a.success_rate));
    rates
}

fn skills_where(cards: &[ReviewCard], keep: impl Fn(&ReviewCard) -> bool) -> Vec<String> {
    cards
        .iter()
        .filter(|c| keep(*c))
        .take(SKILLS_LISTED)
        .map(|c| c.skill.clone())
        .collect()
}

pub struct WeeklyInputs<'a> {
    pub profile_id: &'a str,
    /// Every session report of the learner; only those of the last week are counted.
    pub reports: &'a [SessionReport],
    pub cards: &'a [ReviewCard],
    pub patterns: &'a [ErrorPattern],
    pub now: DateTime<Utc>,
}

pub fn build_weekly_report<R: Rng + ?Sized>(inputs: &WeeklyInputs<'_>, params: &AggregatorParams, rng: &mut R) -> WeeklyReport {
    let week_start = inputs.now - Duration::days(7);
    let week: Vec<SessionReport> = inputs
        .reports
        .iter()
        .filter(|r| r.date >= week_start)
        .cloned()
        .collect();

    let total_exercises: u32 = week.iter().map(|r| r.total_exercises).sum();
    let total_minutes: i64 = week.iter().map(|r| r.duration_minutes).sum();
    let mut days: Vec<NaiveDate> = week.iter().map(|r| r.date.date_naive()).collect();
    days.sort();
    days.dedup();
    let days_active = days.len();

    let average_success = if week.is_empty() {
        0.0
    } else {
        week.iter().map(|r| r.success_rate as f64).sum::<f64>() / week.len() as f64
    };

    let rates = day_rates(&week);

    let patterns_resolved: Vec<String> = inputs
        .patterns
        .iter()
        .filter(|p| p.is_resolved && p.resolved_at.is_some_and(|at| at >= week_start))
        .map(|p| p.description.clone())
        .collect();
    let persistent_patterns = inputs
        .patterns
        .iter()
        .filter(|p| !p.is_resolved && p.occurrences > PERSISTENT_MIN_OCCURRENCES)
        .take(PERSISTENT_LISTED)
        .map(|p| p.description.clone())
        .collect();

    let trend_start = inputs.now - Duration::days(params.trend_days);
    let trend_window: Vec<SessionReport> = inputs.reports.iter().filter(|r| r.date >= trend_start).cloned().collect();
    let trend = trend_of(&trend_window, params.trend_min_reports, params.trend_delta);
    let consistency = Consistency::from_active_days(days_active);
    let weekly_goal_met = total_exercises >= params.weekly_goal;

    let mut achievements = Vec::new();
    if weekly_goal_met {
        achievements.push("Weekly goal reached!".to_string());
    }
    if days_active >= 5 {
        achievements.push("Active 5 days or more!".to_string());
    }
    if average_success >= 80.0 {
        achievements.push("Excellence: over 80% success!".to_string());
    }
    if !patterns_resolved.is_empty() {
        achievements.push(format!("{} difficulties overcome!", patterns_resolved.len()));
    }

    let encouragement = WEEKLY_ENCOURAGEMENTS[rng.random_range(0..WEEKLY_ENCOURAGEMENTS.len())].to_string();

    WeeklyReport {
        profile_id: inputs.profile_id.to_string(),
        week_start,
        week_end: inputs.now,
        total_sessions: week.len(),
        total_exercises,
        total_minutes,
        days_active,
        average_success_rate: average_success.round() as i64,
        best_day: rates.first().cloned(),
        worst_day: rates.last().cloned(),
        skills_mastered: skills_where(inputs.cards, |c| c.ease_factor > 2.5 && c.interval_days > 14),
        skills_in_progress: skills_where(inputs.cards, |c| (2.0..=2.5).contains(&c.ease_factor)),
        skills_needing_attention: skills_where(inputs.cards, |c| c.ease_factor < 2.0),
        patterns_resolved,
        persistent_patterns,
        trend,
        consistency,
        weekly_goal_met,
        exercises_vs_goal: GoalProgress {
            completed: total_exercises,
            goal: params.weekly_goal,
        },
        achievements,
        encouragement,
    }
}
