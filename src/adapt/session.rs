use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::adapt::config::SessionParams;
use crate::adapt::types::{AlertKind, EmotionalState, SessionAlert};
use crate::ring::RingBuffer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    pub fn between(from: u8, to: u8) -> Option<Self> {
        match to.cmp(&from) {
            std::cmp::Ordering::Greater => Some(Self::Up),
            std::cmp::Ordering::Less => Some(Self::Down),
            std::cmp::Ordering::Equal => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DifficultyChange {
    pub direction: Direction,
    pub at: DateTime<Utc>,
}

/// Live metrics of one learner's active session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearnerSession {
    pub profile_id: String,
    pub started_at: DateTime<Utc>,
    pub total_questions: u32,
    pub correct_answers: u32,
    pub consecutive_correct: u32,
    pub consecutive_wrong: u32,
    pub best_correct_streak: u32,
    pub longest_wrong_streak: u32,
    pub response_times: RingBuffer<f64>,
    pub response_time_total: f64,
    pub duration_minutes: f64,
    pub hints_used: u32,
    pub hints_per_question: f64,
    pub current_difficulty: u8,
    pub difficulty_history: RingBuffer<u8>,
    pub emotional_state: EmotionalState,
    pub state_history: RingBuffer<EmotionalState>,
    pub state_counts: HashMap<EmotionalState, u32>,
    pub alerts: RingBuffer<SessionAlert>,
    pub next_alert_seq: u64,
    pub last_fired: HashMap<AlertKind, DateTime<Utc>>,
    pub break_milestone_fired: bool,
    pub last_metrics_adjustment: Option<DifficultyChange>,
}

impl LearnerSession {
    pub fn new(profile_id: &str, start_difficulty: u8, params: &SessionParams, now: DateTime<Utc>) -> Self {
        let mut difficulty_history = RingBuffer::new(params.difficulty_history_len);
        difficulty_history.push(start_difficulty);

        let mut state_history = RingBuffer::new(params.state_history_len);
        state_history.push(EmotionalState::Engaged);

        let mut state_counts = HashMap::new();
        state_counts.insert(EmotionalState::Engaged, 1);

        Self {
            profile_id: profile_id.to_string(),
            started_at: now,
            total_questions: 0,
            correct_answers: 0,
            consecutive_correct: 0,
            consecutive_wrong: 0,
            best_correct_streak: 0,
            longest_wrong_streak: 0,
            response_times: RingBuffer::new(params.response_window),
            response_time_total: 0.0,
            duration_minutes: 0.0,
            hints_used: 0,
            hints_per_question: 0.0,
            current_difficulty: start_difficulty,
            difficulty_history,
            emotional_state: EmotionalState::Engaged,
            state_history,
            state_counts,
            alerts: RingBuffer::new(params.alert_history_len),
            next_alert_seq: 1,
            last_fired: HashMap::new(),
            break_milestone_fired: false,
            last_metrics_adjustment: None,
        }
    }

    /// Applies one answer event to the counters.
    pub fn record(&mut self, is_correct: bool, response_time_secs: f64, hints_used: u32, now: DateTime<Utc>) {
        self.total_questions += 1;
        if is_correct {
            self.correct_answers += 1;
            self.consecutive_correct += 1;
            self.consecutive_wrong = 0;
            self.best_correct_streak = self.best_correct_streak.max(self.consecutive_correct);
        } else {
            self.consecutive_wrong += 1;
            self.consecutive_correct = 0;
            self.longest_wrong_streak = self.longest_wrong_streak.max(self.consecutive_wrong);
        }

        self.response_times.push(response_time_secs);
        self.response_time_total += response_time_secs;

        self.hints_used += hints_used;
        self.hints_per_question = self.hints_used as f64 / self.total_questions as f64;
        self.duration_minutes = minutes_between(self.started_at, now);
    }

    /// Correct ratio in `[0, 1]`; 0.5 before the first answer.
    pub fn success_rate(&self) -> f64 {
        if self.total_questions == 0 {
            return 0.5;
        }
        self.correct_answers as f64 / self.total_questions as f64
    }

    /// Mean over the retained response-time window.
    pub fn window_average(&self) -> f64 {
        mean(self.response_times.iter().copied()).unwrap_or(0.0)
    }

    /// Mean over every answer of the session.
    pub fn average_response_time(&self) -> f64 {
        if self.total_questions == 0 {
            return 0.0;
        }
        self.response_time_total / self.total_questions as f64
    }

    pub fn set_state(&mut self, state: EmotionalState) {
        self.emotional_state = state;
        self.state_history.push(state);
        *self.state_counts.entry(state).or_insert(0) += 1;
    }

    pub fn apply_difficulty(&mut self, level: u8) {
        self.current_difficulty = level;
        self.difficulty_history.push(level);
    }

    pub fn push_alert(&mut self, kind: AlertKind, message: impl Into<String>, now: DateTime<Utc>) -> SessionAlert {
        let alert = SessionAlert {
            seq: self.next_alert_seq,
            kind,
            message: message.into(),
            timestamp: now,
            acknowledged: false,
        };
        self.next_alert_seq += 1;
        self.last_fired.insert(kind, now);
        self.alerts.push(alert.clone());
        alert
    }

    pub fn fired_within(&self, kind: AlertKind, window: Duration, now: DateTime<Utc>) -> bool {
        self.last_fired
            .get(&kind)
            .map(|at| now.signed_duration_since(*at) < window)
            .unwrap_or(false)
    }

    /// Marks the alert with `seq` acknowledged. Returns false for an unknown sequence number.
    pub fn acknowledge(&mut self, seq: u64) -> bool {
        match self.alerts.iter_mut().find(|alert| alert.seq == seq) {
            Some(alert) => {
                alert.acknowledged = true;
                true
            }
            None => false,
        }
    }

    pub fn pending_alerts(&self) -> Vec<SessionAlert> {
        self.alerts
            .iter()
            .filter(|alert| !alert.acknowledged)
            .cloned()
            .collect()
    }

    pub fn average_difficulty(&self) -> f64 {
        mean(self.difficulty_history.iter().map(|d| *d as f64)).unwrap_or(3.0)
    }

    /// Most frequent state over the whole session; ties go to the earlier variant.
    pub fn predominant_state(&self) -> EmotionalState {
        let mut best = EmotionalState::Engaged;
        let mut best_count = 0;
        for state in EmotionalState::ALL {
            let count = self.state_counts.get(&state).copied().unwrap_or(0);
            if count > best_count {
                best = state;
                best_count = count;
            }
        }
        best
    }

    pub fn summarize(&self, now: DateTime<Utc>) -> SessionSummary {
        let success_rate = if self.total_questions > 0 {
            self.correct_answers as f64 / self.total_questions as f64
        } else {
            0.0
        };
        let seen = |state: EmotionalState| self.state_counts.get(&state).copied().unwrap_or(0) > 0;

        SessionSummary {
            profile_id: self.profile_id.clone(),
            started_at: self.started_at,
            ended_at: now,
            duration_minutes: minutes_between(self.started_at, now),
            questions_answered: self.total_questions,
            correct_answers: self.correct_answers,
            success_rate,
            average_difficulty: self.average_difficulty(),
            average_response_time: self.average_response_time(),
            final_correct_streak: self.consecutive_correct,
            best_correct_streak: self.best_correct_streak,
            longest_wrong_streak: self.longest_wrong_streak,
            state_history: self.state_history.to_vec(),
            predominant_state: self.predominant_state(),
            fatigue_detected: seen(EmotionalState::Fatigued),
            frustration_detected: seen(EmotionalState::Frustrated),
        }
    }
}

/// Archived form of a finished session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub profile_id: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub duration_minutes: f64,
    pub questions_answered: u32,
    pub correct_answers: u32,
    pub success_rate: f64,
    pub average_difficulty: f64,
    pub average_response_time: f64,
    pub final_correct_streak: u32,
    pub best_correct_streak: u32,
    pub longest_wrong_streak: u32,
    pub state_history: Vec<EmotionalState>,
    pub predominant_state: EmotionalState,
    pub fatigue_detected: bool,
    pub frustration_detected: bool,
}

pub(crate) fn minutes_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    (to.signed_duration_since(from).num_milliseconds() as f64 / 60_000.0).max(0.0)
}

pub(crate) fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> LearnerSession {
        LearnerSession::new("p1", 3, &SessionParams::default(), Utc::now())
    }

    #[test]
    fn new_session_seeds_histories() {
        let s = session();
        assert_eq!(s.difficulty_history.to_vec(), vec![3]);
        assert_eq!(s.state_history.to_vec(), vec![EmotionalState::Engaged]);
        assert_eq!(s.success_rate(), 0.5);
    }

    #[test]
    fn streaks_are_exclusive() {
        let mut s = session();
        let now = s.started_at;
        s.record(true, 5.0, 0, now);
        s.record(true, 5.0, 0, now);
        assert_eq!((s.consecutive_correct, s.consecutive_wrong), (2, 0));
        s.record(false, 5.0, 0, now);
        assert_eq!((s.consecutive_correct, s.consecutive_wrong), (0, 1));
        assert_eq!(s.best_correct_streak, 2);
    }

    #[test]
    fn hints_per_question_uses_cumulative_hints() {
        let mut s = session();
        let now = s.started_at;
        s.record(true, 5.0, 2, now);
        s.record(false, 5.0, 1, now);
        assert!((s.hints_per_question - 1.5).abs() < 1e-9);
    }

    #[test]
    fn response_window_keeps_last_ten() {
        let mut s = session();
        let now = s.started_at;
        for i in 0..15 {
            s.record(true, i as f64, 0, now);
        }
        assert_eq!(s.response_times.len(), 10);
        assert_eq!(s.response_times.first().copied(), Some(5.0));
    }

    #[test]
    fn acknowledge_by_sequence_number() {
        let mut s = session();
        let now = s.started_at;
        let first = s.push_alert(AlertKind::Challenge, "a", now);
        s.push_alert(AlertKind::HelpOffered, "b", now);
        assert!(s.acknowledge(first.seq));
        assert!(!s.acknowledge(99));
        assert_eq!(s.pending_alerts().len(), 1);
    }

    #[test]
    fn summary_of_empty_session_has_zero_success() {
        let s = session();
        let summary = s.summarize(s.started_at + Duration::minutes(3));
        assert_eq!(summary.success_rate, 0.0);
        assert_eq!(summary.average_difficulty, 3.0);
        assert!((summary.duration_minutes - 3.0).abs() < 1e-9);
    }

    #[test]
    fn predominant_state_counts_whole_session() {
        let mut s = session();
        for _ in 0..3 {
            s.set_state(EmotionalState::Confident);
        }
        assert_eq!(s.predominant_state(), EmotionalState::Confident);
    }
}
