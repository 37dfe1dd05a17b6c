use chrono::{DateTime, Duration, Utc};

use crate::adapt::config::AggregatorParams;
use crate::adapt::session::SessionSummary;
use crate::patterns::ErrorPattern;
use crate::registry::ProfileMap;
use crate::reports::attempts::{analyze_profile, ExerciseAttempt, ProfileAnalysis};
use crate::reports::format::report_context;
use crate::reports::session_report::{build_session_report, compare_reports, ReportContext, SessionComparison, SessionReport};
use crate::reports::stats::{profile_stats, ProfileStats};
use crate::reports::weekly::{build_weekly_report, trend_of, Trend, WeeklyInputs, WeeklyReport};
use crate::ring::RingBuffer;
use crate::srs::ReviewCard;

/// Per-learner exercise log and report history.
pub struct PerformanceAggregator {
    params: AggregatorParams,
    attempts: ProfileMap<Vec<ExerciseAttempt>>,
    session_reports: ProfileMap<RingBuffer<SessionReport>>,
    weekly_reports: ProfileMap<RingBuffer<WeeklyReport>>,
}

impl Default for PerformanceAggregator {
    fn default() -> Self {
        Self::new(AggregatorParams::default())
    }
}

impl PerformanceAggregator {
    pub fn new(params: AggregatorParams) -> Self {
        Self {
            params,
            attempts: ProfileMap::new(),
            session_reports: ProfileMap::new(),
            weekly_reports: ProfileMap::new(),
        }
    }

    pub fn params(&self) -> &AggregatorParams {
        &self.params
    }

    pub fn record_attempt(&self, attempt: ExerciseAttempt) {
        let profile_id = attempt.profile_id.clone();
        self.attempts.with_or_insert(&profile_id, Vec::new, |log| log.push(attempt));
    }

    pub fn attempts(&self, profile_id: &str) -> Vec<ExerciseAttempt> {
        self.attempts.with(profile_id, |log| log.clone()).unwrap_or_default()
    }

    pub fn analyze_profile(&self, profile_id: &str) -> ProfileAnalysis {
        self.analyze_profile_at(profile_id, Utc::now())
    }

    pub fn analyze_profile_at(&self, profile_id: &str, now: DateTime<Utc>) -> ProfileAnalysis {
        analyze_profile(profile_id, &self.attempts(profile_id), now)
    }

    pub fn cleanup(&self) -> usize {
        self.cleanup_at(Utc::now())
    }

    /// Drops attempts older than the retention window. Returns how many were removed.
    pub fn cleanup_at(&self, now: DateTime<Utc>) -> usize {
        let cutoff = now - Duration::days(self.params.attempt_retention_days);
        let mut removed = 0;
        self.attempts.for_each(|_, log| {
            let before = log.len();
            log.retain(|a| a.attempted_at >= cutoff);
            removed += before - log.len();
        });
        if removed > 0 {
            tracing::info!(removed, "old exercise attempts cleaned up");
        }
        removed
    }

    /// Builds and stores the report for a finished session. `patterns` are the learner's
    /// active patterns, most significant first.
    pub fn create_session_report(&self, summary: &SessionSummary, patterns: &[ErrorPattern]) -> SessionReport {
        let previous = self.last_session_report(&summary.profile_id);
        let earlier = self.session_reports(&summary.profile_id, usize::MAX);
        let profile_average = if earlier.is_empty() {
            None
        } else {
            Some(earlier.iter().map(|r| r.success_rate as f64).sum::<f64>() / earlier.len() as f64)
        };

        let ctx = ReportContext {
            previous: previous.as_ref(),
            profile_average,
            patterns,
            delta: self.params.comparison_delta,
        };
        let report = build_session_report(summary, &ctx);

        let kept = self.params.session_reports_kept;
        self.session_reports.with_or_insert(
            &summary.profile_id,
            || RingBuffer::new(kept),
            |reports| reports.push(report.clone()),
        );
        tracing::info!(
            profile_id = %report.profile_id,
            report_id = %report.id,
            success_rate = report.success_rate,
            "session report saved"
        );
        report
    }

    /// Newest first.
    pub fn session_reports(&self, profile_id: &str, limit: usize) -> Vec<SessionReport> {
        let mut reports = self
            .session_reports
            .with(profile_id, |reports| reports.to_vec())
            .unwrap_or_default();
        reports.sort_by(|a, b| b.date.cmp(&a.date));
        reports.truncate(limit);
        reports
    }

    pub fn last_session_report(&self, profile_id: &str) -> Option<SessionReport> {
        self.session_reports(profile_id, 1).into_iter().next()
    }

    pub fn trend(&self, profile_id: &str) -> Trend {
        self.trend_at(profile_id, Utc::now())
    }

    pub fn trend_at(&self, profile_id: &str, now: DateTime<Utc>) -> Trend {
        let cutoff = now - Duration::days(self.params.trend_days);
        let window: Vec<SessionReport> = self
            .session_reports(profile_id, usize::MAX)
            .into_iter()
            .filter(|r| r.date >= cutoff)
            .collect();
        trend_of(&window, self.params.trend_min_reports, self.params.trend_delta)
    }

    pub fn compare_with_previous(&self, profile_id: &str) -> SessionComparison {
        let latest = self.session_reports(profile_id, 2);
        compare_reports(latest.first(), latest.get(1), self.params.comparison_delta)
    }

    pub fn profile_stats_at(&self, profile_id: &str, cards: &[ReviewCard], now: DateTime<Utc>) -> ProfileStats {
        let reports = self.session_reports(profile_id, usize::MAX);
        profile_stats(profile_id, &reports, cards, &self.attempts(profile_id), now)
    }

    pub fn generate_weekly_report_at(
        &self,
        profile_id: &str,
        cards: &[ReviewCard],
        patterns: &[ErrorPattern],
        now: DateTime<Utc>,
    ) -> WeeklyReport {
        let reports = self.session_reports(profile_id, usize::MAX);
        let inputs = WeeklyInputs {
            profile_id,
            reports: &reports,
            cards,
            patterns,
            now,
        };
        let report = build_weekly_report(&inputs, &self.params, &mut rand::rng());

        let kept = self.params.weekly_reports_kept;
        self.weekly_reports.with_or_insert(
            profile_id,
            || RingBuffer::new(kept),
            |reports| reports.push(report.clone()),
        );
        tracing::info!(
            profile_id = %profile_id,
            sessions = report.total_sessions,
            trend = report.trend.label(),
            "weekly report generated"
        );
        report
    }

    /// Newest first.
    pub fn weekly_reports(&self, profile_id: &str, limit: usize) -> Vec<WeeklyReport> {
        let mut reports = self
            .weekly_reports
            .with(profile_id, |reports| reports.to_vec())
            .unwrap_or_default();
        reports.sort_by(|a, b| b.week_end.cmp(&a.week_end));
        reports.truncate(limit);
        reports
    }

    pub fn report_context_at(&self, profile_id: &str, cards: &[ReviewCard], now: DateTime<Utc>) -> String {
        let stats = self.profile_stats_at(profile_id, cards, now);
        let last = self.last_session_report(profile_id);
        let comparison = self.compare_with_previous(profile_id);
        report_context(&stats, last.as_ref(), &comparison, self.trend_at(profile_id, now))
    }

    pub fn all_attempts(&self) -> Vec<ExerciseAttempt> {
        let mut all = Vec::new();
        self.attempts.for_each(|_, log| all.extend(log.iter().cloned()));
        all
    }

    pub fn all_session_reports(&self) -> Vec<SessionReport> {
        let mut all = Vec::new();
        self.session_reports.for_each(|_, reports| all.extend(reports.iter().cloned()));
        all
    }

    pub fn all_weekly_reports(&self) -> Vec<WeeklyReport> {
        let mut all = Vec::new();
        self.weekly_reports.for_each(|_, reports| all.extend(reports.iter().cloned()));
        all
    }

    /// Replaces all stored data. Report histories keep their configured bounds.
    pub fn restore(&self, attempts: Vec<ExerciseAttempt>, sessions: Vec<SessionReport>, weekly: Vec<WeeklyReport>) {
        self.attempts.clear();
        self.session_reports.clear();
        self.weekly_reports.clear();

        for attempt in attempts {
            self.record_attempt(attempt);
        }

        let session_kept = self.params.session_reports_kept;
        for report in sessions {
            let profile_id = report.profile_id.clone();
            self.session_reports
                .with_or_insert(&profile_id, || RingBuffer::new(session_kept), |r| r.push(report));
        }

        let weekly_kept = self.params.weekly_reports_kept;
        for report in weekly {
            let profile_id = report.profile_id.clone();
            self.weekly_reports
                .with_or_insert(&profile_id, || RingBuffer::new(weekly_kept), |r| r.push(report));
        }
    }
}
