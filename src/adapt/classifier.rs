use crate::adapt::config::ClassifierThresholds;
use crate::adapt::session::{mean, LearnerSession};
use crate::adapt::types::EmotionalState;

/// Inputs the classifier reads from a session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionSignals {
    pub success_rate: f64,
    pub recent_avg: f64,
    pub older_avg: f64,
    pub duration_minutes: f64,
    pub consecutive_correct: u32,
    pub consecutive_wrong: u32,
    pub hints_per_question: f64,
}

impl SessionSignals {
    pub fn from_session(session: &LearnerSession, sample: usize) -> Self {
        let fallback = session.average_response_time();
        let recent_avg = mean(session.response_times.latest(sample).copied()).unwrap_or(fallback);
        let older_avg = mean(session.response_times.earliest(sample).copied()).unwrap_or(fallback);

        Self {
            success_rate: session.success_rate(),
            recent_avg,
            older_avg,
            duration_minutes: session.duration_minutes,
            consecutive_correct: session.consecutive_correct,
            consecutive_wrong: session.consecutive_wrong,
            hints_per_question: session.hints_per_question,
        }
    }
}

pub struct StateClassifier {
    thresholds: ClassifierThresholds,
}

impl StateClassifier {
    pub fn new(thresholds: ClassifierThresholds) -> Self {
        Self { thresholds }
    }

    pub fn classify(&self, session: &LearnerSession) -> EmotionalState {
        self.classify_signals(&SessionSignals::from_session(session, self.thresholds.trend_sample))
    }

    /// First matching rule wins; the order is part of the contract.
    pub fn classify_signals(&self, s: &SessionSignals) -> EmotionalState {
        let t = &self.thresholds;
        let time_increasing = s.recent_avg > s.older_avg * t.time_increase_ratio;

        if time_increasing && s.duration_minutes > t.fatigue_min_minutes {
            return EmotionalState::Fatigued;
        }

        if s.consecutive_wrong >= t.frustration_wrong_streak {
            return EmotionalState::Frustrated;
        }

        if s.consecutive_correct >= t.boredom_correct_streak
            && s.success_rate > t.boredom_success_rate
            && s.recent_avg < t.boredom_max_response_secs
        {
            return EmotionalState::Bored;
        }

        if s.success_rate < t.distraction_success_rate
            && s.recent_avg < t.distraction_max_response_secs
            && s.hints_per_question < t.distraction_max_hints
        {
            return EmotionalState::Distracted;
        }

        if s.success_rate < t.struggle_success_rate && s.hints_per_question > t.struggle_min_hints {
            return EmotionalState::Struggling;
        }

        if s.consecutive_correct >= t.confidence_correct_streak && s.success_rate > t.confidence_success_rate {
            return EmotionalState::Confident;
        }

        EmotionalState::Engaged
    }
}

impl Default for StateClassifier {
    fn default() -> Self {
        Self::new(ClassifierThresholds::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signals() -> SessionSignals {
        SessionSignals {
            success_rate: 0.6,
            recent_avg: 12.0,
            older_avg: 12.0,
            duration_minutes: 5.0,
            consecutive_correct: 0,
            consecutive_wrong: 0,
            hints_per_question: 0.0,
        }
    }

    #[test]
    fn default_is_engaged() {
        assert_eq!(StateClassifier::default().classify_signals(&signals()), EmotionalState::Engaged);
    }

    #[test]
    fn fatigue_needs_slowdown_and_long_session() {
        let c = StateClassifier::default();
        let mut s = signals();
        s.recent_avg = 20.0;
        s.older_avg = 10.0;
        assert_ne!(c.classify_signals(&s), EmotionalState::Fatigued);
        s.duration_minutes = 21.0;
        assert_eq!(c.classify_signals(&s), EmotionalState::Fatigued);
    }

    #[test]
    fn fatigue_takes_precedence_over_frustration() {
        let mut s = signals();
        s.recent_avg = 30.0;
        s.older_avg = 10.0;
        s.duration_minutes = 30.0;
        s.consecutive_wrong = 4;
        assert_eq!(StateClassifier::default().classify_signals(&s), EmotionalState::Fatigued);
    }

    #[test]
    fn three_wrong_in_a_row_is_frustrated() {
        let mut s = signals();
        s.consecutive_wrong = 3;
        assert_eq!(StateClassifier::default().classify_signals(&s), EmotionalState::Frustrated);
    }

    #[test]
    fn fast_perfect_streak_is_bored() {
        let mut s = signals();
        s.success_rate = 0.95;
        s.consecutive_correct = 7;
        s.recent_avg = 8.0;
        s.older_avg = 8.0;
        assert_eq!(StateClassifier::default().classify_signals(&s), EmotionalState::Bored);
    }

    #[test]
    fn fast_wrong_answers_without_hints_are_distracted() {
        let mut s = signals();
        s.success_rate = 0.3;
        s.recent_avg = 3.0;
        s.older_avg = 3.0;
        assert_eq!(StateClassifier::default().classify_signals(&s), EmotionalState::Distracted);
    }

    #[test]
    fn heavy_hint_use_with_low_success_is_struggling() {
        let mut s = signals();
        s.success_rate = 0.3;
        s.hints_per_question = 1.5;
        assert_eq!(StateClassifier::default().classify_signals(&s), EmotionalState::Struggling);
    }

    #[test]
    fn short_streak_with_good_rate_is_confident() {
        let mut s = signals();
        s.success_rate = 0.8;
        s.consecutive_correct = 4;
        assert_eq!(StateClassifier::default().classify_signals(&s), EmotionalState::Confident);
    }
}
