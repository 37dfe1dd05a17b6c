use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::adapt::session::SessionSummary;
use crate::adapt::types::EmotionalState;
use crate::patterns::ErrorPattern;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AverageComparison {
    Better,
    Same,
    Worse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeDirection {
    Up,
    Down,
    Same,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionReport {
    pub id: String,
    pub profile_id: String,
    pub started_at: DateTime<Utc>,
    pub date: DateTime<Utc>,
    pub duration_minutes: i64,
    pub total_exercises: u32,
    pub correct_answers: u32,
    /// Rounded percentage.
    pub success_rate: i64,
    pub average_time_per_exercise: i64,
    pub emotional_states: Vec<EmotionalState>,
    pub predominant_state: EmotionalState,
    pub fatigue_detected: bool,
    pub frustration_detected: bool,
    pub best_correct_streak: u32,
    pub final_correct_streak: u32,
    pub patterns_worked_on: Vec<String>,
    pub skills_struggled: Vec<String>,
    pub compared_to_average: AverageComparison,
    pub improvement_since_last_session: i64,
    pub highlights: Vec<String>,
    pub areas_to_improve: Vec<String>,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionComparison {
    pub change: i64,
    pub direction: ChangeDirection,
    pub message: String,
}

/// Inputs taken from the learner's history when a session is reported.
pub struct ReportContext<'a> {
    pub previous: Option<&'a SessionReport>,
    /// Mean success percentage over earlier reports, `None` when there are none.
    pub profile_average: Option<f64>,
    /// Active patterns, most significant first.
    pub patterns: &'a [ErrorPattern],
    pub delta: f64,
}

pub fn build_session_report(summary: &SessionSummary, ctx: &ReportContext<'_>) -> SessionReport {
    let success = summary.success_rate * 100.0;
    let improvement = ctx.previous.map(|p| success - p.success_rate as f64).unwrap_or(0.0);

    let compared_to_average = match ctx.profile_average {
        Some(avg) if success > avg + ctx.delta => AverageComparison::Better,
        Some(avg) if success < avg - ctx.delta => AverageComparison::Worse,
        _ => AverageComparison::Same,
    };

    let mut highlights = Vec::new();
    if success >= 80.0 {
        highlights.push("Excellent success rate!".to_string());
    }
    if summary.best_correct_streak >= 5 {
        highlights.push("Great run of correct answers!".to_string());
    }
    if improvement > 0.0 {
        highlights.push("You've improved since last time!".to_string());
    }

    let mut areas_to_improve = Vec::new();
    if summary.average_response_time > 60.0 {
        areas_to_improve.push("Try to answer a little faster".to_string());
    }
    if success < 60.0 {
        areas_to_improve.push("Review the difficult topics".to_string());
    }
    areas_to_improve.extend(ctx.patterns.iter().take(2).map(|p| p.description.clone()));

    let mut recommendations = Vec::new();
    if summary.questions_answered < 10 {
        recommendations.push("Try to do at least 10 exercises per session".to_string());
    }
    if summary.fatigue_detected {
        recommendations.push("Shorter sessions may help you stay fresh".to_string());
    }
    if let Some(first) = ctx.patterns.first() {
        recommendations.push(format!("Work on: {}", first.description));
    }
    recommendations.push("Don't forget to take regular breaks!".to_string());

    SessionReport {
        id: Uuid::new_v4().to_string(),
        profile_id: summary.profile_id.clone(),
        started_at: summary.started_at,
        date: summary.ended_at,
        duration_minutes: summary.duration_minutes.round() as i64,
        total_exercises: summary.questions_answered,
        correct_answers: summary.correct_answers,
        success_rate: success.round() as i64,
        average_time_per_exercise: summary.average_response_time.round() as i64,
        emotional_states: summary.state_history.clone(),
        predominant_state: summary.predominant_state,
        fatigue_detected: summary.fatigue_detected,
        frustration_detected: summary.frustration_detected || summary.longest_wrong_streak > 3,
        best_correct_streak: summary.best_correct_streak,
        final_correct_streak: summary.final_correct_streak,
        patterns_worked_on: ctx.patterns.iter().take(3).map(|p| p.description.clone()).collect(),
        skills_struggled: ctx
            .patterns
            .iter()
            .filter_map(|p| p.skills.first().cloned())
            .take(3)
            .collect(),
        compared_to_average,
        improvement_since_last_session: improvement.round() as i64,
        highlights,
        areas_to_improve,
        recommendations,
    }
}

/// `latest` and `previous` are the two most recent reports, newest first.
pub fn compare_reports(latest: Option<&SessionReport>, previous: Option<&SessionReport>, delta: f64) -> SessionComparison {
    let (Some(current), Some(previous)) = (latest, previous) else {
        return SessionComparison {
            change: 0,
            direction: ChangeDirection::Same,
            message: "This is your first session, keep going!".to_string(),
        };
    };

    let change = (current.success_rate - previous.success_rate) as f64;
    let (direction, message) = if change > delta {
        (
            ChangeDirection::Up,
            format!("Great! You improved by {}% since last time!", change.round() as i64),
        )
    } else if change < -delta {
        (
            ChangeDirection::Down,
            format!(
                "Today was a bit harder (-{}%), but that's normal! Keep going!",
                change.abs().round() as i64
            ),
        )
    } else {
        (
            ChangeDirection::Same,
            "You're keeping a good level, keep it up!".to_string(),
        )
    };

    SessionComparison {
        change: change.round() as i64,
        direction,
        message,
    }
}
