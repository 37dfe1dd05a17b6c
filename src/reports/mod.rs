pub mod aggregator;
pub mod attempts;
pub mod format;
pub mod session_report;
pub mod stats;
pub mod weekly;

pub use aggregator::PerformanceAggregator;
pub use attempts::{ExerciseAttempt, ProfileAnalysis, SkillLevel, SkillStat, SubjectStats};
pub use format::{format_session_report, format_weekly_report};
pub use session_report::{AverageComparison, ChangeDirection, SessionComparison, SessionReport};
pub use stats::{DayStats, EstimatedLevel, ProfileStats, SubjectSummary};
pub use weekly::{Consistency, DayRate, GoalProgress, Trend, WeeklyReport};
