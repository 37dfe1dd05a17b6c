//! Property-based tests for the adaptation invariants
//!
//! - Streak exclusivity: a session never has both a correct and a wrong streak
//! - Difficulty bounds: every reachable level stays within 1..=5
//! - SM-2: failing grades reset, ease rewards good grades, bounds hold
//! - Pattern confidence grows by 10 per repeat and saturates at 100
//! - Rule matching returns normally on any input, including i64-edge numbers
//! - Serde round trips of cards and patterns preserve future decisions

use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;

use tutor_adapt::adapt::config::{EngineConfig, SchedulerParams, SessionParams};
use tutor_adapt::adapt::{EmotionalState, LearnerSession, ModeRequest, SessionTracker};
use tutor_adapt::patterns::rules::find_match;
use tutor_adapt::patterns::{default_rules, ErrorPattern, ErrorPatternEngine};
use tutor_adapt::srs::{next_review, Quality, ReviewCard};

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn base_time() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 8, 9, 0, 0).unwrap()
}

fn arb_answer() -> impl Strategy<Value = (bool, f64, u32)> {
    (any::<bool>(), 0.5f64..120.0, 0u32..4)
}

fn arb_state() -> impl Strategy<Value = EmotionalState> {
    proptest::sample::select(EmotionalState::ALL.to_vec())
}

#[derive(Debug, Clone)]
enum Op {
    Answer(bool, f64, u32),
    Emotion(EmotionalState),
    Mode(ModeRequest),
    Set(i32),
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => arb_answer().prop_map(|(c, t, h)| Op::Answer(c, t, h)),
        2 => arb_state().prop_map(Op::Emotion),
        1 => prop_oneof![Just(ModeRequest::Challenge), Just(ModeRequest::Easy)].prop_map(Op::Mode),
        1 => (-10i32..15).prop_map(Op::Set),
    ]
}

fn arb_card() -> impl Strategy<Value = ReviewCard> {
    (130u32..=350, 1u32..400, 0u32..12, 0u32..30).prop_map(|(ease, interval, reps, reviews)| {
        let mut card = ReviewCard::new("p1", "skill", "maths", "CE2", ease as f64 / 100.0, base_time());
        // a card that has passed a review always carries a positive interval
        card.interval_days = if reps == 0 { 0 } else { interval };
        card.repetitions = reps;
        card.total_reviews = reviews;
        card.correct_reviews = reviews / 2;
        card
    })
}

fn arb_quality() -> impl Strategy<Value = Quality> {
    (0u8..=5).prop_map(|q| Quality::new(q).unwrap())
}

fn arb_number() -> impl Strategy<Value = String> {
    prop_oneof![
        Just(i64::MAX.to_string()),
        Just(i64::MIN.to_string()),
        Just("9000000000000000000".to_string()),
        Just("99999999999999999999999".to_string()),
        Just("-".to_string()),
        any::<i64>().prop_map(|n| n.to_string()),
    ]
}

fn arb_question() -> impl Strategy<Value = String> {
    prop_oneof![
        (arb_number(), prop::sample::select(vec!["+", "-", "×", "*"]), arb_number())
            .prop_map(|(a, op, b)| format!("{a} {op} {b} = ?")),
        ".{0,40}",
    ]
}

fn arb_reply() -> impl Strategy<Value = String> {
    prop_oneof![arb_number(), ".{0,40}"]
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn streaks_are_mutually_exclusive(answers in prop::collection::vec(arb_answer(), 0..60)) {
        let now = base_time();
        let mut session = LearnerSession::new("p1", 3, &SessionParams::default(), now);
        for (i, (correct, secs, hints)) in answers.into_iter().enumerate() {
            session.record(correct, secs, hints, now + Duration::seconds(30 * i as i64));
            prop_assert!(session.consecutive_correct == 0 || session.consecutive_wrong == 0);
        }
    }

    #[test]
    fn difficulty_stays_in_bounds(ops in prop::collection::vec(arb_op(), 1..80), start in 0u8..9) {
        let tracker = SessionTracker::new(&EngineConfig::default());
        let now = base_time();
        tracker.start_session_at("p1", Some(start), now);

        for (i, op) in ops.into_iter().enumerate() {
            let at = now + Duration::seconds(20 * i as i64);
            match op {
                Op::Answer(correct, secs, hints) => {
                    let outcome = tracker.record_answer_at("p1", correct, secs, hints, at);
                    prop_assert!((1..=5).contains(&outcome.recommended_difficulty));
                }
                Op::Emotion(state) => {
                    tracker.update_emotional_state_at("p1", state, at);
                }
                Op::Mode(mode) => {
                    tracker.activate_mode_at("p1", mode, at);
                }
                Op::Set(level) => {
                    tracker.set_difficulty("p1", level);
                }
            }
            let session = tracker.session("p1").unwrap();
            prop_assert!((1..=5).contains(&session.current_difficulty));
            prop_assert!(session.difficulty_history.iter().all(|d| (1..=5).contains(d)));
        }
    }

    #[test]
    fn failing_quality_resets_card(card in arb_card(), q in 0u8..3) {
        let schedule = next_review(&card, Quality::new(q).unwrap(), &SchedulerParams::default());
        prop_assert_eq!(schedule.repetitions, 0);
        prop_assert_eq!(schedule.interval_days, 1);
    }

    #[test]
    fn perfect_grade_raises_ease_more_than_blackout(card in arb_card()) {
        let params = SchedulerParams::default();
        let best = next_review(&card, Quality::new(5).unwrap(), &params);
        let worst = next_review(&card, Quality::new(0).unwrap(), &params);
        prop_assert!(best.ease_factor > worst.ease_factor);
    }

    #[test]
    fn schedule_respects_bounds(card in arb_card(), quality in arb_quality()) {
        let params = SchedulerParams::default();
        let schedule = next_review(&card, quality, &params);
        prop_assert!(schedule.ease_factor >= params.min_ease);
        prop_assert!(schedule.interval_days >= 1);
        prop_assert!(schedule.interval_days <= params.max_interval_days);
    }

    #[test]
    fn confidence_grows_by_ten_until_capped(repeats in 1usize..15) {
        let engine = ErrorPatternEngine::default();
        let now = base_time();
        let skills = vec!["homophones".to_string()];
        let mut last = None;
        for i in 0..repeats {
            last = engine.record_error_at(
                "p1",
                "Complète",
                "Il et grand",
                "Il est grand",
                "french",
                &skills,
                now + Duration::minutes(i as i64),
            );
        }
        let pattern = last.unwrap();
        prop_assert_eq!(pattern.occurrences as usize, repeats);
        prop_assert_eq!(pattern.confidence as usize, (30 + 10 * (repeats - 1)).min(100));
        prop_assert_eq!(pattern.examples.len(), repeats.min(10));
    }

    #[test]
    fn rule_matching_never_panics(
        question in arb_question(),
        user_answer in arb_reply(),
        correct_answer in arb_reply(),
        subject in prop::sample::select(vec!["maths", "french", "general", "sciences"]),
    ) {
        let rules = default_rules();
        let _ = find_match(&rules, &question, &user_answer, &correct_answer, subject);
    }

    #[test]
    fn card_round_trip_keeps_schedule(card in arb_card(), quality in arb_quality()) {
        let params = SchedulerParams::default();
        let json = serde_json::to_string(&card).unwrap();
        let restored: ReviewCard = serde_json::from_str(&json).unwrap();
        prop_assert_eq!(&restored, &card);
        prop_assert_eq!(next_review(&restored, quality, &params), next_review(&card, quality, &params));
    }

    #[test]
    fn pattern_round_trip_keeps_reinforcement(repeats in 1usize..12) {
        let now = base_time();
        let skills = vec!["homophones".to_string()];
        let engine = ErrorPatternEngine::default();
        for i in 0..repeats {
            engine.record_error_at("p1", "q", "Il et grand", "Il est grand", "french", &skills, now + Duration::minutes(i as i64));
        }

        let json = serde_json::to_string(&engine.all_patterns()).unwrap();
        let restored: Vec<ErrorPattern> = serde_json::from_str(&json).unwrap();
        prop_assert_eq!(&restored, &engine.all_patterns());

        let other = ErrorPatternEngine::default();
        other.restore(restored);
        let later = now + Duration::hours(1);
        let a = engine.record_error_at("p1", "q", "Il et grand", "Il est grand", "french", &skills, later).unwrap();
        let b = other.record_error_at("p1", "q", "Il et grand", "Il est grand", "french", &skills, later).unwrap();
        prop_assert_eq!(a, b);
    }
}
