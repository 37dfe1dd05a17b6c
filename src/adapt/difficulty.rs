use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::adapt::config::DifficultyParams;
use crate::adapt::session::{DifficultyChange, Direction, LearnerSession};
use crate::adapt::types::{AlertKind, EmotionalState, SessionAlert};

const RAISE_ON_RESULTS: &str = "You're doing really well! Ready for the next level?";
const LOWER_ON_RESULTS: &str = "Let's go back to simpler basics so you can move forward.";
const LOWER_ON_FRUSTRATION: &str = "Don't worry! Let's try something more accessible.";
const RAISE_ON_BOREDOM: &str = "Finding this too easy? Let's see if you can take on this challenge!";

const EMOTION_LOWER_FRUSTRATED: &str = "I can see this is hard. I lowered the level to help you!";
const EMOTION_LOWER_STRUGGLING: &str = "No problem, let's take it a bit more slowly.";
const EMOTION_RAISE_BORED: &str = "Want a challenge? Here we go, the level goes up!";
const EMOTION_RAISE_CONFIDENT: &str = "You're handling this well! Shall we go up a notch?";

pub const CHALLENGE_MODE_MESSAGE: &str = "Challenge mode on! Maximum difficulty!";
pub const EASY_MODE_MESSAGE: &str = "Easy mode on. Let's take it slowly!";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub level: u8,
    pub reason: Option<String>,
}

pub struct DifficultyController {
    params: DifficultyParams,
}

impl DifficultyController {
    pub fn new(params: DifficultyParams) -> Self {
        Self { params }
    }

    pub fn clamp(&self, level: i32) -> u8 {
        level.clamp(self.params.min_level as i32, self.params.max_level as i32) as u8
    }

    fn step(&self, current: u8, delta: i32) -> u8 {
        self.clamp(current as i32 + delta)
    }

    /// Recommendation from the metrics and the state just classified.
    pub fn recommend(&self, session: &LearnerSession) -> Recommendation {
        let p = &self.params;
        let current = session.current_difficulty;
        let success_rate = session.success_rate();
        let enough = session.total_questions >= p.min_questions;

        let (level, reason) = if success_rate > p.raise_success_rate
            && session.consecutive_correct >= p.raise_correct_streak
            && enough
        {
            (self.step(current, 1), Some(RAISE_ON_RESULTS))
        } else if success_rate < p.lower_success_rate && enough {
            (self.step(current, -1), Some(LOWER_ON_RESULTS))
        } else if session.emotional_state == EmotionalState::Frustrated {
            (self.step(current, -1), Some(LOWER_ON_FRUSTRATION))
        } else if session.emotional_state == EmotionalState::Bored {
            (self.step(current, 1), Some(RAISE_ON_BOREDOM))
        } else {
            (current, None)
        };

        Recommendation {
            level,
            reason: reason.map(str::to_string),
        }
    }

    /// Commits a recommendation when it carries a reason and changes the level.
    pub fn apply_recommendation(
        &self,
        session: &mut LearnerSession,
        recommendation: &Recommendation,
        now: DateTime<Utc>,
    ) -> Option<SessionAlert> {
        let reason = recommendation.reason.as_deref()?;
        let direction = Direction::between(session.current_difficulty, recommendation.level)?;

        tracing::debug!(
            profile_id = %session.profile_id,
            from = session.current_difficulty,
            to = recommendation.level,
            "difficulty adjusted from session metrics"
        );

        session.apply_difficulty(recommendation.level);
        session.last_metrics_adjustment = Some(DifficultyChange { direction, at: now });
        Some(session.push_alert(AlertKind::DifficultyAdjusted, reason, now))
    }

    /// Adjustment driven by an externally supplied emotional state.
    pub fn apply_emotion(
        &self,
        session: &mut LearnerSession,
        state: EmotionalState,
        now: DateTime<Utc>,
    ) -> Option<SessionAlert> {
        let current = session.current_difficulty;
        let (delta, kind, message) = match state {
            EmotionalState::Frustrated => (-1, AlertKind::DifficultyAdjusted, EMOTION_LOWER_FRUSTRATED),
            EmotionalState::Struggling => (-1, AlertKind::DifficultyAdjusted, EMOTION_LOWER_STRUGGLING),
            EmotionalState::Bored => (1, AlertKind::DifficultyAdjusted, EMOTION_RAISE_BORED),
            EmotionalState::Confident => (1, AlertKind::Challenge, EMOTION_RAISE_CONFIDENT),
            _ => return None,
        };

        let target = self.step(current, delta);
        let direction = Direction::between(current, target)?;

        if self.coalesced(session, direction, now) {
            tracing::debug!(
                profile_id = %session.profile_id,
                state = state.as_str(),
                "emotional adjustment coalesced with recent metrics adjustment"
            );
            return None;
        }

        session.apply_difficulty(target);
        Some(session.push_alert(kind, message, now))
    }

    fn coalesced(&self, session: &LearnerSession, direction: Direction, now: DateTime<Utc>) -> bool {
        if self.params.coalesce_window_secs <= 0 {
            return false;
        }
        let window = Duration::try_seconds(self.params.coalesce_window_secs).unwrap_or(Duration::MAX);
        session
            .last_metrics_adjustment
            .map(|change| change.direction == direction && now.signed_duration_since(change.at) < window)
            .unwrap_or(false)
    }

    /// Manual override. Always appends a history entry and an alert, even when the level is unchanged.
    pub fn force(
        &self,
        session: &mut LearnerSession,
        level: u8,
        kind: AlertKind,
        message: &str,
        now: DateTime<Utc>,
    ) -> SessionAlert {
        let level = self.clamp(level as i32);
        session.apply_difficulty(level);
        session.push_alert(kind, message, now)
    }

    pub fn set(&self, session: &mut LearnerSession, level: i32) -> u8 {
        let level = self.clamp(level);
        session.apply_difficulty(level);
        level
    }

    pub fn max_level(&self) -> u8 {
        self.params.max_level
    }

    pub fn min_level(&self) -> u8 {
        self.params.min_level
    }
}

impl Default for DifficultyController {
    fn default() -> Self {
        Self::new(DifficultyParams::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapt::config::SessionParams;

    fn session_at(level: u8) -> LearnerSession {
        LearnerSession::new("p1", level, &SessionParams::default(), Utc::now())
    }

    fn answer_n(session: &mut LearnerSession, correct: bool, n: usize) {
        let now = session.started_at;
        for _ in 0..n {
            session.record(correct, 8.0, 0, now);
        }
    }

    #[test]
    fn raises_after_strong_streak() {
        let c = DifficultyController::default();
        let mut s = session_at(3);
        answer_n(&mut s, true, 5);
        let rec = c.recommend(&s);
        assert_eq!(rec.level, 4);
        assert!(rec.reason.is_some());
    }

    #[test]
    fn lowers_on_poor_results() {
        let c = DifficultyController::default();
        let mut s = session_at(3);
        answer_n(&mut s, false, 5);
        assert_eq!(c.recommend(&s).level, 2);
    }

    #[test]
    fn no_reason_keeps_current_level() {
        let c = DifficultyController::default();
        let s = session_at(3);
        let rec = c.recommend(&s);
        assert_eq!(rec, Recommendation { level: 3, reason: None });
    }

    #[test]
    fn reason_at_bound_does_not_apply() {
        let c = DifficultyController::default();
        let mut s = session_at(5);
        answer_n(&mut s, true, 6);
        let rec = c.recommend(&s);
        assert_eq!(rec.level, 5);
        assert!(c.apply_recommendation(&mut s, &rec, Utc::now()).is_none());
        assert_eq!(s.difficulty_history.len(), 1);
    }

    #[test]
    fn apply_recommendation_emits_adjusted_alert() {
        let c = DifficultyController::default();
        let mut s = session_at(3);
        answer_n(&mut s, true, 5);
        let rec = c.recommend(&s);
        let alert = c.apply_recommendation(&mut s, &rec, Utc::now()).unwrap();
        assert_eq!(alert.kind, AlertKind::DifficultyAdjusted);
        assert_eq!(s.current_difficulty, 4);
        assert_eq!(s.difficulty_history.to_vec(), vec![3, 4]);
    }

    #[test]
    fn emotion_path_respects_bounds() {
        let c = DifficultyController::default();
        let mut s = session_at(1);
        assert!(c.apply_emotion(&mut s, EmotionalState::Frustrated, Utc::now()).is_none());
        let mut s = session_at(5);
        assert!(c.apply_emotion(&mut s, EmotionalState::Bored, Utc::now()).is_none());
    }

    #[test]
    fn confident_emotion_raises_with_challenge_alert() {
        let c = DifficultyController::default();
        let mut s = session_at(2);
        let alert = c.apply_emotion(&mut s, EmotionalState::Confident, Utc::now()).unwrap();
        assert_eq!(alert.kind, AlertKind::Challenge);
        assert_eq!(s.current_difficulty, 3);
    }

    #[test]
    fn coalescing_skips_same_direction_within_window() {
        let params = DifficultyParams {
            coalesce_window_secs: 60,
            ..DifficultyParams::default()
        };
        let c = DifficultyController::new(params);
        let mut s = session_at(3);
        answer_n(&mut s, false, 5);
        let now = Utc::now();
        let rec = c.recommend(&s);
        c.apply_recommendation(&mut s, &rec, now).unwrap();
        assert_eq!(s.current_difficulty, 2);

        assert!(c.apply_emotion(&mut s, EmotionalState::Frustrated, now + Duration::seconds(10)).is_none());
        assert_eq!(s.current_difficulty, 2);

        assert!(c.apply_emotion(&mut s, EmotionalState::Bored, now + Duration::seconds(10)).is_some());
        assert_eq!(s.current_difficulty, 3);

        assert!(c.apply_emotion(&mut s, EmotionalState::Frustrated, now + Duration::seconds(61)).is_some());
    }

    #[test]
    fn force_appends_even_when_unchanged() {
        let c = DifficultyController::default();
        let mut s = session_at(5);
        c.force(&mut s, 5, AlertKind::Challenge, CHALLENGE_MODE_MESSAGE, Utc::now());
        assert_eq!(s.difficulty_history.to_vec(), vec![5, 5]);
        assert_eq!(s.alerts.len(), 1);
    }

    #[test]
    fn set_clamps_into_range() {
        let c = DifficultyController::default();
        let mut s = session_at(3);
        assert_eq!(c.set(&mut s, 9), 5);
        assert_eq!(c.set(&mut s, -2), 1);
    }
}
