use chrono::{DateTime, Duration, Utc};
use rand::Rng;

use crate::adapt::config::AlertParams;
use crate::adapt::session::LearnerSession;
use crate::adapt::types::{AlertKind, EmotionalState, SessionAlert};

pub const ENCOURAGEMENTS: [&str; 4] = [
    "That one wasn't easy! But you're making progress, keep going!",
    "Mistakes are part of learning. You'll get there!",
    "It's normal to get stuck sometimes. Shall we try another way?",
    "Every difficulty makes you stronger. Don't give up!",
];

const FATIGUE_BREAK: &str = "You seem a little tired. How about a short break?";
const BORED_CHALLENGE: &str = "Want a real challenge? Let's try something tougher!";
const HELP_OFFER: &str = "Would you like me to explain this idea differently?";

pub struct AlertGenerator {
    params: AlertParams,
}

impl AlertGenerator {
    pub fn new(params: AlertParams) -> Self {
        Self { params }
    }

    fn break_cooldown(&self) -> Duration {
        Duration::try_seconds(self.params.break_cooldown_secs).unwrap_or(Duration::MAX)
    }

    fn break_recently_suggested(&self, session: &LearnerSession, now: DateTime<Utc>) -> bool {
        session.fired_within(AlertKind::BreakSuggested, self.break_cooldown(), now)
    }

    /// Alerts raised by an answer. The fatigue break is not part of this path.
    pub fn evaluate(&self, session: &mut LearnerSession, now: DateTime<Utc>) -> Vec<SessionAlert> {
        let mut alerts = Vec::new();

        if !session.break_milestone_fired && session.duration_minutes >= self.params.break_after_minutes {
            session.break_milestone_fired = true;
            if !self.break_recently_suggested(session, now) {
                let message = format!(
                    "You've been working for {} minutes! How about a 5-minute break?",
                    self.params.break_after_minutes.round() as i64
                );
                alerts.push(session.push_alert(AlertKind::BreakSuggested, message, now));
            }
        }

        match session.emotional_state {
            EmotionalState::Frustrated => {
                let message = pick_encouragement(&mut rand::rng());
                alerts.push(session.push_alert(AlertKind::Encouragement, message, now));
            }
            EmotionalState::Bored => {
                alerts.push(session.push_alert(AlertKind::Challenge, BORED_CHALLENGE, now));
            }
            EmotionalState::Struggling if session.consecutive_wrong >= self.params.help_wrong_streak => {
                alerts.push(session.push_alert(AlertKind::HelpOffered, HELP_OFFER, now));
            }
            _ => {}
        }

        alerts
    }

    /// Break suggestion for a learner reported as fatigued, unless one fired within the cooldown.
    pub fn suggest_break(&self, session: &mut LearnerSession, now: DateTime<Utc>) -> Option<SessionAlert> {
        if self.break_recently_suggested(session, now) {
            return None;
        }
        Some(session.push_alert(AlertKind::BreakSuggested, FATIGUE_BREAK, now))
    }
}

impl Default for AlertGenerator {
    fn default() -> Self {
        Self::new(AlertParams::default())
    }
}

pub fn pick_encouragement<R: Rng + ?Sized>(rng: &mut R) -> &'static str {
    ENCOURAGEMENTS[rng.random_range(0..ENCOURAGEMENTS.len())]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapt::config::SessionParams;

    fn session(now: DateTime<Utc>) -> LearnerSession {
        LearnerSession::new("p1", 3, &SessionParams::default(), now)
    }

    #[test]
    fn duration_break_fires_once_per_session() {
        let gen = AlertGenerator::default();
        let start = Utc::now();
        let mut s = session(start);

        s.duration_minutes = 26.0;
        let first = gen.evaluate(&mut s, start + Duration::minutes(26));
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].kind, AlertKind::BreakSuggested);

        s.duration_minutes = 40.0;
        let later = gen.evaluate(&mut s, start + Duration::minutes(40));
        assert!(later.is_empty());
    }

    #[test]
    fn fatigue_break_respects_cooldown() {
        let gen = AlertGenerator::default();
        let now = Utc::now();
        let mut s = session(now);
        assert!(gen.suggest_break(&mut s, now).is_some());
        assert!(gen.suggest_break(&mut s, now + Duration::minutes(2)).is_none());
        assert!(gen.suggest_break(&mut s, now + Duration::minutes(6)).is_some());
    }

    #[test]
    fn oversized_cooldown_saturates() {
        let gen = AlertGenerator::new(AlertParams {
            break_cooldown_secs: i64::MAX,
            ..AlertParams::default()
        });
        let now = Utc::now();
        let mut s = session(now);
        assert!(gen.suggest_break(&mut s, now).is_some());
        assert!(gen.suggest_break(&mut s, now + Duration::days(365)).is_none());
    }

    #[test]
    fn duration_milestone_suppressed_by_recent_fatigue_break() {
        let gen = AlertGenerator::default();
        let start = Utc::now();
        let mut s = session(start);
        let at = start + Duration::minutes(25);
        gen.suggest_break(&mut s, at).unwrap();
        s.duration_minutes = 26.0;
        let alerts = gen.evaluate(&mut s, at + Duration::minutes(1));
        assert!(alerts.iter().all(|a| a.kind != AlertKind::BreakSuggested));
    }

    #[test]
    fn frustrated_gets_pooled_encouragement() {
        let gen = AlertGenerator::default();
        let now = Utc::now();
        let mut s = session(now);
        s.emotional_state = EmotionalState::Frustrated;
        let alerts = gen.evaluate(&mut s, now);
        assert_eq!(alerts.len(), 1);
        assert!(ENCOURAGEMENTS.contains(&alerts[0].message.as_str()));
    }

    #[test]
    fn help_needs_wrong_streak() {
        let gen = AlertGenerator::default();
        let now = Utc::now();
        let mut s = session(now);
        s.emotional_state = EmotionalState::Struggling;
        s.consecutive_wrong = 1;
        assert!(gen.evaluate(&mut s, now).is_empty());
        s.consecutive_wrong = 2;
        let alerts = gen.evaluate(&mut s, now);
        assert_eq!(alerts[0].kind, AlertKind::HelpOffered);
    }

    #[test]
    fn alerts_start_unacknowledged() {
        let gen = AlertGenerator::default();
        let now = Utc::now();
        let mut s = session(now);
        s.emotional_state = EmotionalState::Bored;
        let alerts = gen.evaluate(&mut s, now);
        assert!(!alerts[0].acknowledged);
        assert_eq!(s.alerts.len(), 1);
    }
}
