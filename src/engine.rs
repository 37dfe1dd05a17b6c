//! Facade that routes one learner event through every component.
//!
//! The components stay usable on their own; the engine only decides the order in which an
//! answer reaches them and keeps their state exportable as a single snapshot.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::adapt::config::EngineConfig;
use crate::adapt::emotion::{detect_emotion, detect_mode_request};
use crate::adapt::session::LearnerSession;
use crate::adapt::tracker::SessionTracker;
use crate::adapt::types::{AnswerOutcome, EmotionalState, ModeRequest, SessionAlert};
use crate::error::{Result, TutorError};
use crate::patterns::{ErrorPattern, ErrorPatternEngine};
use crate::persistence::{EngineSnapshot, SNAPSHOT_VERSION};
use crate::registry::ProfileMap;
use crate::reports::{ExerciseAttempt, PerformanceAggregator, ProfileStats, SessionReport, WeeklyReport};
use crate::srs::{ReviewOutcome, SpacedRepetitionScheduler};

const REPORT_PATTERNS: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerSubmission {
    pub profile_id: String,
    #[serde(default)]
    pub exercise_id: Option<String>,
    pub subject: String,
    #[serde(default)]
    pub level: String,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub user_answer: String,
    #[serde(default)]
    pub correct_answer: String,
    pub is_correct: bool,
    #[serde(default)]
    pub hints_used: u32,
    pub response_time_secs: f64,
}

impl AnswerSubmission {
    pub fn validate(&self) -> Result<()> {
        if self.profile_id.trim().is_empty() {
            return Err(TutorError::invalid("profile id must not be empty"));
        }
        if !self.response_time_secs.is_finite() || self.response_time_secs < 0.0 {
            return Err(TutorError::invalid(format!(
                "response time must be a finite, non-negative number of seconds, got {}",
                self.response_time_secs
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionResult {
    pub attempt_id: String,
    pub outcome: AnswerOutcome,
    pub pattern: Option<ErrorPattern>,
    pub reviews: Vec<ReviewOutcome>,
}

/// What a free-text learner message changed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageEffects {
    pub emotion: Option<EmotionalState>,
    pub mode: Option<ModeRequest>,
    pub alerts: Vec<SessionAlert>,
}

pub struct TutorEngine {
    config: EngineConfig,
    tracker: SessionTracker,
    patterns: ErrorPatternEngine,
    scheduler: SpacedRepetitionScheduler,
    aggregator: PerformanceAggregator,
    /// Per-learner turn lock: one answer or session end at a time walks the components.
    turns: ProfileMap<()>,
}

impl Default for TutorEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl TutorEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            tracker: SessionTracker::new(&config),
            patterns: ErrorPatternEngine::default(),
            scheduler: SpacedRepetitionScheduler::new(config.scheduler.clone()),
            aggregator: PerformanceAggregator::new(config.aggregator.clone()),
            turns: ProfileMap::new(),
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn tracker(&self) -> &SessionTracker {
        &self.tracker
    }

    pub fn patterns(&self) -> &ErrorPatternEngine {
        &self.patterns
    }

    /// Mutable access for registering extra rules.
    pub fn patterns_mut(&mut self) -> &mut ErrorPatternEngine {
        &mut self.patterns
    }

    pub fn scheduler(&self) -> &SpacedRepetitionScheduler {
        &self.scheduler
    }

    pub fn aggregator(&self) -> &PerformanceAggregator {
        &self.aggregator
    }

    pub fn start_session(&self, profile_id: &str, start_difficulty: Option<u8>) -> LearnerSession {
        self.start_session_at(profile_id, start_difficulty, Utc::now())
    }

    pub fn start_session_at(&self, profile_id: &str, start_difficulty: Option<u8>, now: DateTime<Utc>) -> LearnerSession {
        self.tracker.start_session_at(profile_id, start_difficulty, now)
    }

    pub fn submit_answer(&self, submission: &AnswerSubmission) -> Result<SubmissionResult> {
        self.submit_answer_at(submission, Utc::now())
    }

    /// Feeds one answer to the session tracker, the pattern engine (wrong answers only),
    /// the review scheduler (one review per skill) and the exercise log. Answers for the
    /// same learner are applied one after another; other learners are not blocked.
    pub fn submit_answer_at(&self, submission: &AnswerSubmission, now: DateTime<Utc>) -> Result<SubmissionResult> {
        submission.validate()?;
        Ok(self
            .turns
            .with_or_insert(&submission.profile_id, || (), |_| self.apply_answer(submission, now)))
    }

    fn apply_answer(&self, submission: &AnswerSubmission, now: DateTime<Utc>) -> SubmissionResult {
        let profile_id = submission.profile_id.as_str();
        let skills: Vec<String> = submission
            .skills
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();

        let difficulty = self
            .tracker
            .session(profile_id)
            .map_or(self.config.session.default_difficulty, |s| s.current_difficulty);

        let outcome = self.tracker.record_answer_at(
            profile_id,
            submission.is_correct,
            submission.response_time_secs,
            submission.hints_used,
            now,
        );

        let pattern = if submission.is_correct {
            None
        } else {
            self.patterns.record_error_at(
                profile_id,
                &submission.question,
                &submission.user_answer,
                &submission.correct_answer,
                &submission.subject,
                &skills,
                now,
            )
        };

        let reviews = skills
            .iter()
            .filter_map(|skill| {
                self.scheduler.process_exercise_at(
                    profile_id,
                    skill,
                    &submission.subject,
                    &submission.level,
                    submission.is_correct,
                    submission.response_time_secs,
                    submission.hints_used,
                    now,
                )
            })
            .collect();

        let attempt = ExerciseAttempt {
            id: Uuid::new_v4().to_string(),
            profile_id: profile_id.to_string(),
            exercise_id: submission.exercise_id.clone(),
            subject: submission.subject.clone(),
            level: submission.level.clone(),
            skills,
            difficulty,
            question: submission.question.clone(),
            user_answer: submission.user_answer.clone(),
            correct_answer: submission.correct_answer.clone(),
            is_correct: submission.is_correct,
            hints_used: submission.hints_used,
            time_spent_secs: submission.response_time_secs,
            attempted_at: now,
        };
        let attempt_id = attempt.id.clone();
        self.aggregator.record_attempt(attempt);

        SubmissionResult {
            attempt_id,
            outcome,
            pattern,
            reviews,
        }
    }

    pub fn handle_message(&self, profile_id: &str, text: &str) -> MessageEffects {
        self.handle_message_at(profile_id, text, Utc::now())
    }

    /// Looks for a mood and a difficulty request in what the learner wrote. A mode
    /// request is applied after the mood so that it has the last word on difficulty.
    pub fn handle_message_at(&self, profile_id: &str, text: &str, now: DateTime<Utc>) -> MessageEffects {
        let mut effects = MessageEffects {
            emotion: detect_emotion(text),
            mode: detect_mode_request(text),
            alerts: Vec::new(),
        };
        if let Some(state) = effects.emotion {
            effects.alerts.extend(self.tracker.update_emotional_state_at(profile_id, state, now));
        }
        if let Some(mode) = effects.mode {
            effects.alerts.extend(self.tracker.activate_mode_at(profile_id, mode, now));
        }
        effects
    }

    pub fn finish_session(&self, profile_id: &str) -> Option<SessionReport> {
        self.finish_session_at(profile_id, Utc::now())
    }

    /// Ends the active session and files its report. `None` when no session was active.
    pub fn finish_session_at(&self, profile_id: &str, now: DateTime<Utc>) -> Option<SessionReport> {
        self.turns.with_or_insert(profile_id, || (), |_| {
            let summary = self.tracker.end_session_at(profile_id, now)?;
            let patterns = self.patterns.top_patterns(profile_id, REPORT_PATTERNS);
            Some(self.aggregator.create_session_report(&summary, &patterns))
        })
    }

    pub fn weekly_report_at(&self, profile_id: &str, now: DateTime<Utc>) -> WeeklyReport {
        let cards = self.scheduler.cards(profile_id);
        let mut patterns = self.patterns.patterns(profile_id);
        patterns.sort_by(|a, b| b.score().cmp(&a.score()));
        self.aggregator.generate_weekly_report_at(profile_id, &cards, &patterns, now)
    }

    pub fn profile_stats_at(&self, profile_id: &str, now: DateTime<Utc>) -> ProfileStats {
        self.aggregator
            .profile_stats_at(profile_id, &self.scheduler.cards(profile_id), now)
    }

    /// Everything the prompt layer needs about the learner, as text.
    pub fn tutor_context_at(&self, profile_id: &str, now: DateTime<Utc>) -> String {
        let mut context = self.tracker.adaptive_context(profile_id);
        context.push_str(&self.patterns.pattern_summary(profile_id));

        let review = self.scheduler.review_report_at(profile_id, now);
        if !review.due_today.is_empty() {
            context.push_str(&format!(
                "\nREVIEWS DUE: {}\n{}\n",
                review.due_today.join(", "),
                review.summary
            ));
        }

        context.push_str(
            &self
                .aggregator
                .report_context_at(profile_id, &self.scheduler.cards(profile_id), now),
        );
        context
    }

    pub fn snapshot_at(&self, now: DateTime<Utc>) -> EngineSnapshot {
        EngineSnapshot {
            version: SNAPSHOT_VERSION,
            saved_at: now,
            sessions: self.tracker.active_sessions(),
            session_history: self.tracker.archived_sessions(),
            patterns: self.patterns.all_patterns(),
            cards: self.scheduler.all_cards(),
            attempts: self.aggregator.all_attempts(),
            session_reports: self.aggregator.all_session_reports(),
            weekly_reports: self.aggregator.all_weekly_reports(),
        }
    }

    /// Replaces all in-memory state with the snapshot's content.
    pub fn restore(&self, snapshot: EngineSnapshot) {
        tracing::info!(
            saved_at = %snapshot.saved_at,
            sessions = snapshot.sessions.len(),
            cards = snapshot.cards.len(),
            patterns = snapshot.patterns.len(),
            "restoring engine snapshot"
        );
        self.tracker.restore(snapshot.sessions, snapshot.session_history);
        self.patterns.restore(snapshot.patterns);
        self.scheduler.restore(snapshot.cards);
        self.aggregator
            .restore(snapshot.attempts, snapshot.session_reports, snapshot.weekly_reports);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapt::types::AlertKind;

    fn submission(correct: bool) -> AnswerSubmission {
        AnswerSubmission {
            profile_id: "p1".to_string(),
            exercise_id: None,
            subject: "maths".to_string(),
            level: "CE2".to_string(),
            skills: vec!["x7".to_string()],
            question: "7 x 8".to_string(),
            user_answer: if correct { "56" } else { "54" }.to_string(),
            correct_answer: "56".to_string(),
            is_correct: correct,
            hints_used: 0,
            response_time_secs: 10.0,
        }
    }

    #[test]
    fn invalid_submissions_are_rejected() {
        let engine = TutorEngine::default();
        let mut bad = submission(true);
        bad.response_time_secs = f64::NAN;
        assert!(matches!(engine.submit_answer(&bad), Err(TutorError::InvalidInput(_))));
        bad.response_time_secs = -1.0;
        assert!(engine.submit_answer(&bad).is_err());
        let mut bad = submission(true);
        bad.profile_id = "  ".to_string();
        assert!(engine.submit_answer(&bad).is_err());
    }

    #[test]
    fn answer_reaches_every_component() {
        let engine = TutorEngine::default();
        let now = Utc::now();
        engine.start_session_at("p1", None, now);
        let result = engine.submit_answer_at(&submission(true), now).unwrap();

        assert_eq!(result.outcome.recommended_difficulty, 3);
        assert_eq!(result.reviews.len(), 1);
        assert_eq!(result.reviews[0].quality.value(), 5);
        assert!(result.pattern.is_none());
        assert_eq!(engine.aggregator().attempts("p1").len(), 1);
        assert_eq!(engine.aggregator().attempts("p1")[0].difficulty, 3);
    }

    #[test]
    fn answers_without_session_still_feed_the_log() {
        let engine = TutorEngine::default();
        let result = engine.submit_answer(&submission(false)).unwrap();
        assert_eq!(result.outcome, AnswerOutcome::neutral(3));
        assert_eq!(engine.aggregator().attempts("p1").len(), 1);
        assert_eq!(engine.scheduler().cards("p1").len(), 1);
    }

    #[test]
    fn message_mode_request_applies_after_mood() {
        let engine = TutorEngine::default();
        engine.start_session("p1", None);
        let effects = engine.handle_message("p1", "je suis nul, plus facile stp");
        assert_eq!(effects.mode, Some(ModeRequest::Easy));
        assert_eq!(engine.tracker().session("p1").unwrap().current_difficulty, 1);
        assert!(effects.alerts.iter().any(|a| a.kind == AlertKind::Encouragement));
    }

    #[test]
    fn finish_session_files_report() {
        let engine = TutorEngine::default();
        let now = Utc::now();
        engine.start_session_at("p1", None, now);
        engine.submit_answer_at(&submission(true), now).unwrap();
        let report = engine.finish_session_at("p1", now).unwrap();
        assert_eq!(report.total_exercises, 1);
        assert_eq!(report.success_rate, 100);
        assert!(engine.finish_session_at("p1", now).is_none());
        assert_eq!(engine.aggregator().session_reports("p1", 10).len(), 1);
    }

    #[test]
    fn snapshot_restores_into_fresh_engine() {
        let engine = TutorEngine::default();
        let now = Utc::now();
        engine.start_session_at("p1", None, now);
        engine.submit_answer_at(&submission(false), now).unwrap();

        let snapshot = engine.snapshot_at(now);
        let restored = TutorEngine::default();
        restored.restore(snapshot.clone());
        assert_eq!(restored.snapshot_at(now), snapshot);
    }

    #[test]
    fn concurrent_answers_for_one_learner_stay_consistent() {
        let engine = TutorEngine::default();
        let now = Utc::now();
        engine.start_session_at("p1", None, now);

        std::thread::scope(|scope| {
            for worker in 0..4 {
                let engine = &engine;
                scope.spawn(move || {
                    for i in 0..25 {
                        engine.submit_answer_at(&submission((worker + i) % 3 != 0), now).unwrap();
                    }
                });
            }
        });

        let session = engine.tracker().session("p1").unwrap();
        let attempts = engine.aggregator().attempts("p1");
        let card = engine.scheduler().card("p1", "x7").unwrap();
        assert_eq!(session.total_questions, 100);
        assert_eq!(attempts.len(), 100);
        assert_eq!(card.total_reviews, 100);
        let correct = attempts.iter().filter(|a| a.is_correct).count() as u32;
        assert_eq!(session.correct_answers, correct);
        assert_eq!(card.correct_reviews, correct);
    }
}
