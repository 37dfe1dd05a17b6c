//! Plain-text renderings of reports for display or prompt context.

use std::fmt::Write as _;

use crate::reports::session_report::{AverageComparison, SessionComparison, SessionReport};
use crate::reports::stats::ProfileStats;
use crate::reports::weekly::{Trend, WeeklyReport};

fn bullets(text: &mut String, title: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    let _ = writeln!(text, "{title}:");
    for item in items {
        let _ = writeln!(text, "  - {item}");
    }
    text.push('\n');
}

pub fn format_session_report(report: &SessionReport) -> String {
    let mut text = String::from("SESSION REPORT\n");
    let _ = writeln!(text, "{}\n", "-".repeat(40));

    let _ = writeln!(
        text,
        "{}/{} correct answers ({}%)",
        report.correct_answers, report.total_exercises, report.success_rate
    );
    let _ = writeln!(text, "Duration: {} minutes", report.duration_minutes);
    let _ = writeln!(text, "Average time per exercise: {}s\n", report.average_time_per_exercise);
    let _ = writeln!(text, "State: {}\n", report.predominant_state.as_str());

    match report.compared_to_average {
        AverageComparison::Better => text.push_str("Above your average, well done!\n"),
        AverageComparison::Worse => text.push_str("A little below your average, that's normal!\n"),
        AverageComparison::Same => {}
    }
    if report.improvement_since_last_session > 0 {
        let _ = writeln!(text, "+{}% compared to the last session!", report.improvement_since_last_session);
    }
    text.push('\n');

    bullets(&mut text, "Highlights", &report.highlights);
    bullets(&mut text, "To work on", &report.areas_to_improve);
    bullets(&mut text, "Tips", &report.recommendations);
    text
}

pub fn format_weekly_report(report: &WeeklyReport) -> String {
    let mut text = String::from("WEEKLY REPORT\n");
    let _ = writeln!(text, "{}\n", "=".repeat(40));

    text.push_str("Activity:\n");
    let _ = writeln!(text, "  - {} sessions", report.total_sessions);
    let _ = writeln!(
        text,
        "  - {} exercises (goal: {})",
        report.total_exercises, report.exercises_vs_goal.goal
    );
    let _ = writeln!(text, "  - {} minutes in total", report.total_minutes);
    let _ = writeln!(text, "  - {} active days\n", report.days_active);

    text.push_str("Performance:\n");
    let _ = writeln!(text, "  - Average success rate: {}%", report.average_success_rate);
    let _ = writeln!(text, "  - Trend: {}", report.trend.label());
    let _ = writeln!(text, "  - Consistency: {}\n", report.consistency.label());

    bullets(&mut text, "Skills mastered", &report.skills_mastered);
    bullets(&mut text, "To strengthen", &report.skills_needing_attention);
    bullets(&mut text, "This week's achievements", &report.achievements);

    let _ = writeln!(text, "{}", report.encouragement);
    text
}

/// History block appended to a tutoring prompt.
pub fn report_context(
    stats: &ProfileStats,
    last: Option<&SessionReport>,
    comparison: &SessionComparison,
    trend: Trend,
) -> String {
    let mut context = String::from("\nHISTORY AND PROGRESS:\n\nOverall statistics:\n");
    let _ = writeln!(
        context,
        "  - {} sessions, {} exercises",
        stats.total_sessions, stats.total_exercises
    );
    let _ = writeln!(context, "  - Average success rate: {}%", stats.average_success_rate);
    let _ = writeln!(context, "  - Estimated level: {}", stats.estimated_level.label());
    let _ = writeln!(context, "  - Trend: {}", trend.label());

    if let Some(last) = last {
        let _ = writeln!(context, "\nLast session ({}):", last.date.format("%Y-%m-%d"));
        let _ = writeln!(context, "  - {}% success", last.success_rate);
        let _ = writeln!(context, "  - State: {}", last.predominant_state.as_str());
        let _ = writeln!(context, "  - {}", comparison.message);
    }
    context
}
