use std::collections::BTreeMap;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::reports::attempts::ExerciseAttempt;
use crate::reports::session_report::SessionReport;
use crate::srs::ReviewCard;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EstimatedLevel {
    Beginner,
    Progressing,
    Confirmed,
    Expert,
}

impl EstimatedLevel {
    pub fn estimate(success_rate: f64, total_exercises: u32) -> Self {
        if success_rate >= 90.0 && total_exercises > 500 {
            Self::Expert
        } else if success_rate >= 75.0 && total_exercises > 200 {
            Self::Confirmed
        } else if success_rate >= 60.0 && total_exercises > 50 {
            Self::Progressing
        } else {
            Self::Beginner
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Beginner => "beginner",
            Self::Progressing => "progressing",
            Self::Confirmed => "confirmed",
            Self::Expert => "expert",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayStats {
    pub date: NaiveDate,
    pub success_rate: f64,
    pub exercises: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectSummary {
    pub exercises: u32,
    pub success_rate: f64,
    pub average_time: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileStats {
    pub profile_id: String,
    pub total_sessions: usize,
    pub total_exercises: u32,
    pub total_correct: u32,
    pub total_minutes: i64,
    /// Percentage rounded to one decimal.
    pub average_success_rate: f64,
    pub average_session_length: i64,
    pub average_exercises_per_session: i64,
    pub best_streak: u32,
    pub current_streak: u32,
    pub longest_session: i64,
    pub best_day_ever: Option<DayStats>,
    pub by_subject: BTreeMap<String, SubjectSummary>,
    /// Most recent day first.
    pub last_7_days: Vec<DayStats>,
    pub last_30_days: Vec<DayStats>,
    pub estimated_level: EstimatedLevel,
}

fn ratio(part: f64, whole: f64) -> f64 {
    if whole == 0.0 {
        0.0
    } else {
        part / whole
    }
}

pub fn profile_stats(
    profile_id: &str,
    reports: &[SessionReport],
    cards: &[ReviewCard],
    attempts: &[ExerciseAttempt],
    now: DateTime<Utc>,
) -> ProfileStats {
    let total_sessions = reports.len();
    let total_exercises: u32 = reports.iter().map(|r| r.total_exercises).sum();
    let total_correct: u32 = reports.iter().map(|r| r.correct_answers).sum();
    let total_minutes: i64 = reports.iter().map(|r| r.duration_minutes).sum();

    let average_success = ratio(total_correct as f64, total_exercises as f64) * 100.0;

    let mut chronological: Vec<&SessionReport> = reports.iter().collect();
    chronological.sort_by_key(|r| r.date);

    let mut best_day_ever: Option<DayStats> = None;
    for report in &chronological {
        let beats = best_day_ever
            .as_ref()
            .map_or(report.success_rate > 0, |best| report.success_rate as f64 > best.success_rate);
        if beats {
            best_day_ever = Some(DayStats {
                date: report.date.date_naive(),
                success_rate: report.success_rate as f64,
                exercises: report.total_exercises,
            });
        }
    }

    let mut by_subject: BTreeMap<String, SubjectSummary> = BTreeMap::new();
    let mut correct_by_subject: BTreeMap<String, u32> = BTreeMap::new();
    for card in cards {
        by_subject.entry(card.subject.clone()).or_default().exercises += card.total_reviews;
        *correct_by_subject.entry(card.subject.clone()).or_default() += card.correct_reviews;
    }
    for (subject, summary) in by_subject.iter_mut() {
        let correct = correct_by_subject.get(subject).copied().unwrap_or(0);
        summary.success_rate = ratio(correct as f64, summary.exercises as f64) * 100.0;
        let times: Vec<f64> = attempts
            .iter()
            .filter(|a| &a.subject == subject)
            .map(|a| a.time_spent_secs)
            .collect();
        summary.average_time = ratio(times.iter().sum(), times.len() as f64);
    }

    let last_30_days: Vec<DayStats> = (0..30)
        .map(|offset| {
            let date = (now - Duration::days(offset)).date_naive();
            let (correct, exercises) = reports
                .iter()
                .filter(|r| r.date.date_naive() == date)
                .fold((0u32, 0u32), |(c, t), r| (c + r.correct_answers, t + r.total_exercises));
            DayStats {
                date,
                success_rate: ratio(correct as f64, exercises as f64) * 100.0,
                exercises,
            }
        })
        .collect();

    ProfileStats {
        profile_id: profile_id.to_string(),
        total_sessions,
        total_exercises,
        total_correct,
        total_minutes,
        average_success_rate: (average_success * 10.0).round() / 10.0,
        average_session_length: ratio(total_minutes as f64, total_sessions as f64).round() as i64,
        average_exercises_per_session: ratio(total_exercises as f64, total_sessions as f64).round() as i64,
        best_streak: reports.iter().map(|r| r.best_correct_streak).max().unwrap_or(0),
        current_streak: chronological.last().map_or(0, |r| r.final_correct_streak),
        longest_session: reports.iter().map(|r| r.duration_minutes).max().unwrap_or(0),
        best_day_ever,
        by_subject,
        last_7_days: last_30_days.iter().take(7).cloned().collect(),
        last_30_days,
        estimated_level: EstimatedLevel::estimate(average_success, total_exercises),
    }
}
