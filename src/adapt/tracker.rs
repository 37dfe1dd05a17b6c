use std::fmt::Write as _;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::adapt::alerts::AlertGenerator;
use crate::adapt::classifier::StateClassifier;
use crate::adapt::config::{EngineConfig, SessionParams};
use crate::adapt::difficulty::{DifficultyController, CHALLENGE_MODE_MESSAGE, EASY_MODE_MESSAGE};
use crate::adapt::session::{LearnerSession, SessionSummary};
use crate::adapt::types::{AlertKind, AnswerOutcome, EmotionalState, ModeRequest, SessionAlert};
use crate::registry::ProfileMap;
use crate::ring::RingBuffer;

struct LearnerRecord {
    active: Option<LearnerSession>,
    history: RingBuffer<SessionSummary>,
}

impl LearnerRecord {
    fn new(params: &SessionParams) -> Self {
        Self {
            active: None,
            history: RingBuffer::new(params.archived_sessions),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyStats {
    pub total_sessions: usize,
    pub total_minutes: i64,
    pub total_questions: u32,
    pub average_success_rate: i64,
}

/// Owns every learner's active session and archived summaries.
pub struct SessionTracker {
    params: SessionParams,
    classifier: StateClassifier,
    controller: DifficultyController,
    alerts: AlertGenerator,
    learners: ProfileMap<LearnerRecord>,
}

impl SessionTracker {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            params: config.session.clone(),
            classifier: StateClassifier::new(config.classifier.clone()),
            controller: DifficultyController::new(config.difficulty.clone()),
            alerts: AlertGenerator::new(config.alerts.clone()),
            learners: ProfileMap::new(),
        }
    }

    fn with_active<R>(&self, profile_id: &str, f: impl FnOnce(&mut LearnerSession) -> R) -> Option<R> {
        self.learners
            .with(profile_id, |record| record.active.as_mut().map(f))
            .flatten()
    }

    pub fn start_session(&self, profile_id: &str, start_difficulty: Option<u8>) -> LearnerSession {
        self.start_session_at(profile_id, start_difficulty, Utc::now())
    }

    /// Replaces any session already active for the learner.
    pub fn start_session_at(
        &self,
        profile_id: &str,
        start_difficulty: Option<u8>,
        now: DateTime<Utc>,
    ) -> LearnerSession {
        let level = self
            .controller
            .clamp(start_difficulty.unwrap_or(self.params.default_difficulty) as i32);
        let session = LearnerSession::new(profile_id, level, &self.params, now);

        let replaced = self.learners.with_or_insert(
            profile_id,
            || LearnerRecord::new(&self.params),
            |record| record.active.replace(session.clone()).is_some(),
        );

        tracing::info!(profile_id = %profile_id, difficulty = level, replaced, "session started");
        session
    }

    pub fn record_answer(&self, profile_id: &str, is_correct: bool, response_time_secs: f64, hints_used: u32) -> AnswerOutcome {
        self.record_answer_at(profile_id, is_correct, response_time_secs, hints_used, Utc::now())
    }

    pub fn record_answer_at(
        &self,
        profile_id: &str,
        is_correct: bool,
        response_time_secs: f64,
        hints_used: u32,
        now: DateTime<Utc>,
    ) -> AnswerOutcome {
        let outcome = self.with_active(profile_id, |session| {
            session.record(is_correct, response_time_secs, hints_used, now);

            let state = self.classifier.classify(session);
            session.set_state(state);

            let recommendation = self.controller.recommend(session);
            let mut alerts = Vec::new();
            if let Some(alert) = self.controller.apply_recommendation(session, &recommendation, now) {
                alerts.push(alert);
            }
            alerts.extend(self.alerts.evaluate(session, now));

            tracing::debug!(
                profile_id = %profile_id,
                correct = is_correct,
                state = state.as_str(),
                recommended = recommendation.level,
                alerts = alerts.len(),
                "answer recorded"
            );

            AnswerOutcome {
                emotional_state: state,
                alerts,
                recommended_difficulty: recommendation.level,
            }
        });

        outcome.unwrap_or_else(|| AnswerOutcome::neutral(self.params.default_difficulty))
    }

    pub fn end_session(&self, profile_id: &str) -> Option<SessionSummary> {
        self.end_session_at(profile_id, Utc::now())
    }

    pub fn end_session_at(&self, profile_id: &str, now: DateTime<Utc>) -> Option<SessionSummary> {
        let summary = self
            .learners
            .with(profile_id, |record| {
                let session = record.active.take()?;
                let summary = session.summarize(now);
                record.history.push(summary.clone());
                Some(summary)
            })
            .flatten()?;

        tracing::info!(
            profile_id = %profile_id,
            questions = summary.questions_answered,
            success_rate = summary.success_rate,
            minutes = summary.duration_minutes,
            "session ended"
        );
        Some(summary)
    }

    pub fn set_difficulty(&self, profile_id: &str, level: i32) -> Option<u8> {
        self.with_active(profile_id, |session| self.controller.set(session, level))
    }

    pub fn acknowledge_alert(&self, profile_id: &str, seq: u64) -> bool {
        self.with_active(profile_id, |session| session.acknowledge(seq))
            .unwrap_or(false)
    }

    pub fn update_emotional_state(&self, profile_id: &str, state: EmotionalState) -> Vec<SessionAlert> {
        self.update_emotional_state_at(profile_id, state, Utc::now())
    }

    /// Applies a mood reported from outside the answer stream (for example, detected in chat).
    pub fn update_emotional_state_at(
        &self,
        profile_id: &str,
        state: EmotionalState,
        now: DateTime<Utc>,
    ) -> Vec<SessionAlert> {
        self.with_active(profile_id, |session| {
            session.set_state(state);
            let mut alerts = Vec::new();
            if let Some(alert) = self.controller.apply_emotion(session, state, now) {
                alerts.push(alert);
            }
            if state == EmotionalState::Fatigued {
                if let Some(alert) = self.alerts.suggest_break(session, now) {
                    alerts.push(alert);
                }
            }
            tracing::debug!(profile_id = %profile_id, state = state.as_str(), "emotional state updated");
            alerts
        })
        .unwrap_or_default()
    }

    pub fn activate_challenge_mode(&self, profile_id: &str) -> Option<SessionAlert> {
        self.activate_mode_at(profile_id, ModeRequest::Challenge, Utc::now())
    }

    pub fn activate_easy_mode(&self, profile_id: &str) -> Option<SessionAlert> {
        self.activate_mode_at(profile_id, ModeRequest::Easy, Utc::now())
    }

    pub fn activate_mode_at(&self, profile_id: &str, mode: ModeRequest, now: DateTime<Utc>) -> Option<SessionAlert> {
        let (level, kind, message) = match mode {
            ModeRequest::Challenge => (self.controller.max_level(), AlertKind::Challenge, CHALLENGE_MODE_MESSAGE),
            ModeRequest::Easy => (self.controller.min_level(), AlertKind::Encouragement, EASY_MODE_MESSAGE),
        };
        let alert = self.with_active(profile_id, |session| {
            self.controller.force(session, level, kind, message, now)
        })?;
        tracing::info!(profile_id = %profile_id, mode = ?mode, level, "difficulty mode activated");
        Some(alert)
    }

    pub fn current_state(&self, profile_id: &str) -> Option<EmotionalState> {
        self.with_active(profile_id, |session| session.emotional_state)
    }

    pub fn session(&self, profile_id: &str) -> Option<LearnerSession> {
        self.with_active(profile_id, |session| session.clone())
    }

    pub fn history(&self, profile_id: &str) -> Vec<SessionSummary> {
        self.learners
            .with(profile_id, |record| record.history.to_vec())
            .unwrap_or_default()
    }

    pub fn recommendations(&self, profile_id: &str) -> Vec<String> {
        let Some(state) = self.current_state(profile_id) else {
            return Vec::new();
        };
        let advice: &[&str] = match state {
            EmotionalState::Fatigued => &[
                "Take a 5 to 10 minute break",
                "Stretch or go for a short walk",
                "Drink a glass of water",
            ],
            EmotionalState::Frustrated => &[
                "Getting stuck is normal, it's part of learning",
                "Try re-reading the lesson on this topic",
                "Don't hesitate to ask for help",
            ],
            EmotionalState::Bored => &[
                "Move up a level for more challenge",
                "Try a mini-game for some variety",
                "Set yourself a more ambitious goal",
            ],
            EmotionalState::Distracted => &[
                "Put distractions away (phone, TV...)",
                "Play some calm music if it helps",
                "Do shorter sessions (15 minutes)",
            ],
            EmotionalState::Struggling => &[
                "Review the basics of this topic",
                "Try an easier exercise first",
                "Ask for the idea to be explained another way",
            ],
            EmotionalState::Confident => &[
                "Well done! Keep it up",
                "Now is a good time to tackle a harder topic",
            ],
            EmotionalState::Engaged => &["You're working well, keep going!"],
        };
        advice.iter().map(|s| s.to_string()).collect()
    }

    pub fn weekly_stats(&self, profile_id: &str) -> WeeklyStats {
        self.weekly_stats_at(profile_id, Utc::now())
    }

    pub fn weekly_stats_at(&self, profile_id: &str, now: DateTime<Utc>) -> WeeklyStats {
        let cutoff = now - Duration::days(7);
        let week: Vec<SessionSummary> = self
            .history(profile_id)
            .into_iter()
            .filter(|summary| summary.started_at >= cutoff)
            .collect();

        if week.is_empty() {
            return WeeklyStats::default();
        }

        let minutes: f64 = week.iter().map(|s| s.duration_minutes).sum();
        let success: f64 = week.iter().map(|s| s.success_rate).sum::<f64>() / week.len() as f64;

        WeeklyStats {
            total_sessions: week.len(),
            total_minutes: minutes.round() as i64,
            total_questions: week.iter().map(|s| s.questions_answered).sum(),
            average_success_rate: (success * 100.0).round() as i64,
        }
    }

    /// Read-only session digest for the prompt-building layer. Empty without an active session.
    pub fn adaptive_context(&self, profile_id: &str) -> String {
        let Some(session) = self.session(profile_id) else {
            return String::new();
        };

        let rate = session.correct_answers as f64 / session.total_questions.max(1) as f64;
        let mut out = String::from("\nCURRENT SESSION STATE:\n");
        let _ = writeln!(out, "- Questions answered: {}", session.total_questions);
        let _ = writeln!(out, "- Success rate: {}%", (rate * 100.0).round() as i64);
        let _ = writeln!(out, "- Current difficulty: {}/5", session.current_difficulty);
        let _ = writeln!(out, "- Duration: {} minutes", session.duration_minutes.round() as i64);
        let _ = writeln!(
            out,
            "\nDETECTED EMOTIONAL STATE: {}",
            session.emotional_state.as_str().to_uppercase()
        );

        let guidance = match session.emotional_state {
            EmotionalState::Fatigued => Some("The learner seems tired. Be more concise and suggest a break."),
            EmotionalState::Frustrated => Some("The learner is frustrated. Be VERY encouraging and simplify explanations."),
            EmotionalState::Bored => Some("The learner is bored (too easy). Offer harder challenges."),
            EmotionalState::Distracted => Some("The learner seems distracted. Refocus them with direct questions."),
            EmotionalState::Struggling => Some("The learner is struggling but persevering. Help with progressive hints."),
            EmotionalState::Confident => Some("The learner is confident. Now is the time to challenge them more."),
            EmotionalState::Engaged => None,
        };
        if let Some(guidance) = guidance {
            let _ = writeln!(out, "-> {guidance}");
        }

        if session.consecutive_wrong >= 2 {
            let _ = writeln!(
                out,
                "\nWARNING: {} wrong answers in a row. Offer help.",
                session.consecutive_wrong
            );
        }
        if session.consecutive_correct >= 5 {
            let _ = writeln!(
                out,
                "\nSTREAK: {} correct answers in a row! Congratulate the learner.",
                session.consecutive_correct
            );
        }

        out
    }

    pub fn active_sessions(&self) -> Vec<LearnerSession> {
        let mut sessions = Vec::new();
        self.learners.for_each(|_, record| {
            if let Some(session) = &record.active {
                sessions.push(session.clone());
            }
        });
        sessions
    }

    pub fn archived_sessions(&self) -> Vec<SessionSummary> {
        let mut summaries = Vec::new();
        self.learners.for_each(|_, record| summaries.extend(record.history.iter().cloned()));
        summaries
    }

    /// Replaces all tracker state with previously exported sessions and summaries.
    pub fn restore(&self, sessions: Vec<LearnerSession>, summaries: Vec<SessionSummary>) {
        self.learners.clear();
        for summary in summaries {
            let profile_id = summary.profile_id.clone();
            self.learners.with_or_insert(
                &profile_id,
                || LearnerRecord::new(&self.params),
                |record| record.history.push(summary),
            );
        }
        for session in sessions {
            let profile_id = session.profile_id.clone();
            self.learners.with_or_insert(
                &profile_id,
                || LearnerRecord::new(&self.params),
                |record| record.active = Some(session),
            );
        }
    }
}

impl Default for SessionTracker {
    fn default() -> Self {
        Self::new(&EngineConfig::default())
    }
}
