use std::collections::BTreeMap;
use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::patterns::rules::{default_rules, find_match, PatternKind, PatternRule};
use crate::registry::ProfileMap;
use crate::ring::RingBuffer;

const MAX_EXAMPLES: usize = 10;
const INITIAL_CONFIDENCE: u8 = 30;
const CONFIDENCE_STEP: u8 = 10;
const MAX_CONFIDENCE: u8 = 100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternExample {
    pub question: String,
    pub user_answer: String,
    pub correct_answer: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorPattern {
    pub id: String,
    pub profile_id: String,
    #[serde(rename = "type")]
    pub kind: PatternKind,
    pub description: String,
    pub subject: String,
    pub skills: Vec<String>,
    pub occurrences: u32,
    pub confidence: u8,
    pub examples: RingBuffer<PatternExample>,
    pub recommendations: Vec<String>,
    pub first_occurrence: DateTime<Utc>,
    pub last_occurrence: DateTime<Utc>,
    pub is_resolved: bool,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl ErrorPattern {
    fn from_rule(profile_id: &str, rule: &PatternRule, skills: &[String], example: PatternExample) -> Self {
        let mut merged = rule.skills.clone();
        for skill in skills {
            if !merged.contains(skill) {
                merged.push(skill.clone());
            }
        }
        let now = example.timestamp;
        let mut examples = RingBuffer::new(MAX_EXAMPLES);
        examples.push(example);

        Self {
            id: Uuid::new_v4().to_string(),
            profile_id: profile_id.to_string(),
            kind: rule.kind,
            description: rule.description.clone(),
            subject: rule.subject.clone(),
            skills: merged,
            occurrences: 1,
            confidence: INITIAL_CONFIDENCE,
            examples,
            recommendations: rule.recommendations.clone(),
            first_occurrence: now,
            last_occurrence: now,
            is_resolved: false,
            resolved_at: None,
        }
    }

    fn reinforce(&mut self, example: PatternExample) {
        self.occurrences += 1;
        self.last_occurrence = example.timestamp;
        self.examples.push(example);
        self.confidence = self.confidence.saturating_add(CONFIDENCE_STEP).min(MAX_CONFIDENCE);
    }

    /// Ranking key for `top_patterns`.
    pub fn score(&self) -> u64 {
        self.occurrences as u64 * self.confidence as u64
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternStats {
    pub total: usize,
    pub active: usize,
    pub resolved: usize,
    pub by_type: BTreeMap<PatternKind, usize>,
    pub top_subject: String,
}

/// Matches wrong answers against the rule registry and keeps per-learner patterns.
pub struct ErrorPatternEngine {
    rules: Vec<PatternRule>,
    patterns: ProfileMap<Vec<ErrorPattern>>,
}

impl Default for ErrorPatternEngine {
    fn default() -> Self {
        Self::new(default_rules())
    }
}

impl ErrorPatternEngine {
    pub fn new(rules: Vec<PatternRule>) -> Self {
        Self {
            rules,
            patterns: ProfileMap::new(),
        }
    }

    /// Appends a rule after the existing ones; earlier rules keep precedence.
    pub fn register_rule(&mut self, rule: PatternRule) {
        self.rules.push(rule);
    }

    pub fn rules(&self) -> &[PatternRule] {
        &self.rules
    }

    pub fn record_error(
        &self,
        profile_id: &str,
        question: &str,
        user_answer: &str,
        correct_answer: &str,
        subject: &str,
        skills: &[String],
    ) -> Option<ErrorPattern> {
        self.record_error_at(profile_id, question, user_answer, correct_answer, subject, skills, Utc::now())
    }

    #[allow(clippy::too_many_arguments)]
    pub fn record_error_at(
        &self,
        profile_id: &str,
        question: &str,
        user_answer: &str,
        correct_answer: &str,
        subject: &str,
        skills: &[String],
        now: DateTime<Utc>,
    ) -> Option<ErrorPattern> {
        let Some(rule) = find_match(&self.rules, question, user_answer, correct_answer, subject) else {
            tracing::debug!(profile_id = %profile_id, subject = %subject, "no error pattern matched");
            return None;
        };

        let example = PatternExample {
            question: question.to_string(),
            user_answer: user_answer.to_string(),
            correct_answer: correct_answer.to_string(),
            timestamp: now,
        };

        let pattern = self.patterns.with_or_insert(profile_id, Vec::new, |patterns| {
            let active = patterns
                .iter_mut()
                .find(|p| !p.is_resolved && p.description == rule.description);
            match active {
                Some(existing) => {
                    existing.reinforce(example);
                    tracing::debug!(
                        profile_id = %profile_id,
                        pattern = %existing.description,
                        occurrences = existing.occurrences,
                        confidence = existing.confidence,
                        "error pattern reinforced"
                    );
                    existing.clone()
                }
                None => {
                    let created = ErrorPattern::from_rule(profile_id, rule, skills, example);
                    tracing::info!(
                        profile_id = %profile_id,
                        pattern = %created.description,
                        kind = created.kind.as_str(),
                        "new error pattern detected"
                    );
                    patterns.push(created.clone());
                    created
                }
            }
        });

        Some(pattern)
    }

    pub fn patterns(&self, profile_id: &str) -> Vec<ErrorPattern> {
        self.patterns
            .with(profile_id, |patterns| patterns.clone())
            .unwrap_or_default()
    }

    pub fn active_patterns(&self, profile_id: &str) -> Vec<ErrorPattern> {
        self.patterns
            .with(profile_id, |patterns| patterns.iter().filter(|p| !p.is_resolved).cloned().collect())
            .unwrap_or_default()
    }

    /// Active patterns by descending `occurrences × confidence`; ties keep detection order.
    pub fn top_patterns(&self, profile_id: &str, count: usize) -> Vec<ErrorPattern> {
        let mut active = self.active_patterns(profile_id);
        active.sort_by(|a, b| b.score().cmp(&a.score()));
        active.truncate(count);
        active
    }

    pub fn mark_as_resolved(&self, pattern_id: &str) -> bool {
        self.mark_as_resolved_at(pattern_id, Utc::now())
    }

    /// Unknown ids are ignored.
    pub fn mark_as_resolved_at(&self, pattern_id: &str, now: DateTime<Utc>) -> bool {
        let mut found = false;
        self.patterns.for_each(|profile_id, patterns| {
            if let Some(pattern) = patterns.iter_mut().find(|p| p.id == pattern_id) {
                pattern.is_resolved = true;
                pattern.resolved_at = Some(now);
                found = true;
                tracing::info!(profile_id = %profile_id, pattern = %pattern.description, "error pattern resolved");
            }
        });
        found
    }

    pub fn pattern_stats(&self, profile_id: &str) -> PatternStats {
        let patterns = self.patterns(profile_id);
        let mut by_type: BTreeMap<PatternKind, usize> = PatternKind::ALL.iter().map(|k| (*k, 0)).collect();
        let mut subject_weight: Vec<(String, u32)> = Vec::new();

        let mut active = 0;
        for pattern in patterns.iter().filter(|p| !p.is_resolved) {
            active += 1;
            *by_type.entry(pattern.kind).or_insert(0) += 1;
            match subject_weight.iter_mut().find(|(s, _)| *s == pattern.subject) {
                Some((_, weight)) => *weight += pattern.occurrences,
                None => subject_weight.push((pattern.subject.clone(), pattern.occurrences)),
            }
        }

        let mut top_subject = String::new();
        let mut top_weight = 0;
        for (subject, weight) in subject_weight {
            if weight > top_weight {
                top_subject = subject;
                top_weight = weight;
            }
        }

        PatternStats {
            total: patterns.len(),
            active,
            resolved: patterns.len() - active,
            by_type,
            top_subject,
        }
    }

    /// Advice from the three highest-ranked active patterns.
    pub fn recommendations(&self, profile_id: &str) -> Vec<String> {
        let mut out = Vec::new();
        for pattern in self.top_patterns(profile_id, 3) {
            out.push(format!("{}:", pattern.description));
            out.extend(pattern.recommendations.iter().map(|r| format!("   - {r}")));
        }
        out
    }

    /// Digest of the top five active patterns for the prompt-building layer.
    pub fn pattern_summary(&self, profile_id: &str) -> String {
        let top = self.top_patterns(profile_id, 5);
        if top.is_empty() {
            return "No recurring error pattern detected so far.".to_string();
        }

        let mut out = String::from("DETECTED ERROR PATTERNS:\n");
        for pattern in &top {
            let _ = writeln!(
                out,
                "\n- {} ({} times, confidence: {}%)",
                pattern.description, pattern.occurrences, pattern.confidence
            );
            let _ = writeln!(out, "  Type: {}, Subject: {}", pattern.kind.as_str(), pattern.subject);
            if let Some(last) = pattern.examples.last() {
                let _ = writeln!(
                    out,
                    "  Last example: \"{}\" -> answered \"{}\" instead of \"{}\"",
                    last.question, last.user_answer, last.correct_answer
                );
            }
        }
        out
    }

    pub fn all_patterns(&self) -> Vec<ErrorPattern> {
        let mut all = Vec::new();
        self.patterns.for_each(|_, patterns| all.extend(patterns.iter().cloned()));
        all
    }

    pub fn restore(&self, patterns: Vec<ErrorPattern>) {
        self.patterns.clear();
        for pattern in patterns {
            let profile_id = pattern.profile_id.clone();
            self.patterns.with_or_insert(&profile_id, Vec::new, |list| list.push(pattern));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record_homophone(engine: &ErrorPatternEngine, profile: &str) -> Option<ErrorPattern> {
        engine.record_error(
            profile,
            "Complète la phrase",
            "le chat est le chien",
            "le chat et le chien",
            "français",
            &["homophones".to_string(), "dictation".to_string()],
        )
    }

    #[test]
    fn repeat_match_reinforces_pattern() {
        let engine = ErrorPatternEngine::default();
        let first = record_homophone(&engine, "p1").unwrap();
        assert_eq!(first.confidence, 30);
        assert_eq!(first.occurrences, 1);

        let second = record_homophone(&engine, "p1").unwrap();
        assert_eq!(second.id, first.id);
        assert_eq!(second.occurrences, 2);
        assert_eq!(second.confidence, 40);
        assert_eq!(second.examples.len(), 2);
        assert_eq!(engine.patterns("p1").len(), 1);
    }

    #[test]
    fn skills_are_merged_without_duplicates() {
        let engine = ErrorPatternEngine::default();
        let pattern = record_homophone(&engine, "p1").unwrap();
        assert_eq!(pattern.skills, vec!["homophones", "grammar", "dictation"]);
    }

    #[test]
    fn confidence_caps_at_hundred_and_examples_at_ten() {
        let engine = ErrorPatternEngine::default();
        let mut last = None;
        for _ in 0..12 {
            last = record_homophone(&engine, "p1");
        }
        let pattern = last.unwrap();
        assert_eq!(pattern.confidence, 100);
        assert_eq!(pattern.occurrences, 12);
        assert_eq!(pattern.examples.len(), 10);
    }

    #[test]
    fn resolved_pattern_starts_fresh_on_next_match() {
        let engine = ErrorPatternEngine::default();
        let first = record_homophone(&engine, "p1").unwrap();
        assert!(engine.mark_as_resolved(&first.id));
        let next = record_homophone(&engine, "p1").unwrap();
        assert_ne!(next.id, first.id);
        assert_eq!(next.confidence, 30);
        assert_eq!(engine.patterns("p1").len(), 2);
        assert_eq!(engine.active_patterns("p1").len(), 1);
    }

    #[test]
    fn resolving_unknown_id_is_noop() {
        let engine = ErrorPatternEngine::default();
        record_homophone(&engine, "p1");
        assert!(!engine.mark_as_resolved("missing"));
        assert_eq!(engine.active_patterns("p1").len(), 1);
    }

    #[test]
    fn no_match_leaves_state_untouched() {
        let engine = ErrorPatternEngine::default();
        let none = engine.record_error("p1", "2 + 2", "banana", "4", "maths", &[]);
        assert!(none.is_none());
        assert!(engine.patterns("p1").is_empty());
    }

    #[test]
    fn top_patterns_rank_by_score() {
        let engine = ErrorPatternEngine::default();
        record_homophone(&engine, "p1");
        for _ in 0..3 {
            engine.record_error("p1", "3 × 4", "7", "12", "maths", &[]);
        }
        let top = engine.top_patterns("p1", 5);
        assert_eq!(top[0].description, "Confuses multiplication and addition");
        assert_eq!(engine.top_patterns("p1", 1).len(), 1);
    }

    #[test]
    fn stats_count_active_by_type() {
        let engine = ErrorPatternEngine::default();
        record_homophone(&engine, "p1");
        engine.record_error("p1", "3 × 4", "7", "12", "maths", &[]);
        engine.record_error("p1", "3 × 4", "7", "12", "maths", &[]);
        let stats = engine.pattern_stats("p1");
        assert_eq!(stats.total, 2);
        assert_eq!(stats.active, 2);
        assert_eq!(stats.by_type[&PatternKind::Confusion], 2);
        assert_eq!(stats.by_type[&PatternKind::Memory], 0);
        assert_eq!(stats.top_subject, "maths");
    }

    #[test]
    fn patterns_are_isolated_per_profile() {
        let engine = ErrorPatternEngine::default();
        record_homophone(&engine, "p1");
        assert!(engine.patterns("p2").is_empty());
    }

    #[test]
    fn summary_mentions_last_example() {
        let engine = ErrorPatternEngine::default();
        assert_eq!(engine.pattern_summary("p1"), "No recurring error pattern detected so far.");
        record_homophone(&engine, "p1");
        let summary = engine.pattern_summary("p1");
        assert!(summary.contains("answered \"le chat est le chien\""));
    }
}
