pub mod scheduler;
pub mod sm2;

pub use scheduler::{ReviewCard, ReviewOutcome, ReviewReport, SchedulerStats, SpacedRepetitionScheduler, UpcomingReview};
pub use sm2::{calculate_quality, next_review, review_priority, Quality, Schedule};
