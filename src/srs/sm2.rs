//! SM-2 scheduling arithmetic.
//!
//! Quality grades run from 0 (total blackout) to 5 (perfect, fast recall). Grades below 3
//! reset the repetition count.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::adapt::config::SchedulerParams;
use crate::error::{Result, TutorError};
use crate::srs::scheduler::ReviewCard;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Quality(u8);

impl Quality {
    pub const MAX: u8 = 5;
    pub const PASS: u8 = 3;

    pub fn new(value: u8) -> Result<Self> {
        if value > Self::MAX {
            return Err(TutorError::invalid(format!("quality must be 0..=5, got {value}")));
        }
        Ok(Self(value))
    }

    pub fn value(&self) -> u8 {
        self.0
    }

    pub fn is_pass(&self) -> bool {
        self.0 >= Self::PASS
    }
}

impl TryFrom<u8> for Quality {
    type Error = TutorError;

    fn try_from(value: u8) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Quality> for u8 {
    fn from(q: Quality) -> u8 {
        q.0
    }
}

/// Maps an answer to a grade. `expected_secs` is the time a comfortable answer takes.
pub fn calculate_quality(is_correct: bool, time_spent_secs: f64, hints_used: u32, expected_secs: f64) -> Quality {
    let grade = if !is_correct {
        match hints_used {
            h if h > 2 => 0,
            h if h > 0 => 1,
            _ => 2,
        }
    } else if hints_used > 1 || time_spent_secs > expected_secs * 2.0 {
        3
    } else if hints_used == 1 || time_spent_secs > expected_secs * 1.5 {
        4
    } else {
        5
    };
    Quality(grade)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schedule {
    pub interval_days: u32,
    pub ease_factor: f64,
    pub repetitions: u32,
}

/// Next interval, ease and repetition count. The interval is computed with the ease
/// factor held before this review.
pub fn next_review(card: &ReviewCard, quality: Quality, params: &SchedulerParams) -> Schedule {
    let (interval, repetitions) = if !quality.is_pass() {
        (1, 0)
    } else {
        let interval = match card.repetitions {
            0 => 1,
            1 => 3,
            _ => (card.interval_days as f64 * card.ease_factor).round() as u32,
        };
        (interval, card.repetitions + 1)
    };

    let q = (Quality::MAX - quality.value()) as f64;
    let ease_factor = (card.ease_factor + (0.1 - q * (0.08 + q * 0.02))).max(params.min_ease);

    Schedule {
        interval_days: interval.min(params.max_interval_days),
        ease_factor,
        repetitions,
    }
}

/// Higher means more urgent. Negative when the card is not due yet.
pub fn review_priority(card: &ReviewCard, now: DateTime<Utc>) -> i64 {
    let overdue_secs = now.signed_duration_since(card.next_review).num_seconds() as f64;
    let mut priority = (overdue_secs / 86_400.0).floor() as i64;

    if card.ease_factor < 2.0 {
        priority += 5;
    }
    if card.total_reviews == 0 {
        priority += 10;
    }
    if card.success_rate() < 0.5 {
        priority += 5;
    }
    priority
}
