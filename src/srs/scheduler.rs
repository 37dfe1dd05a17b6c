use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::adapt::config::SchedulerParams;
use crate::registry::ProfileMap;
use crate::srs::sm2::{calculate_quality, next_review, review_priority, Quality};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewCard {
    pub id: String,
    pub profile_id: String,
    pub skill: String,
    pub subject: String,
    pub level: String,
    pub ease_factor: f64,
    pub interval_days: u32,
    pub repetitions: u32,
    pub next_review: DateTime<Utc>,
    pub last_review: DateTime<Utc>,
    pub total_reviews: u32,
    pub correct_reviews: u32,
    pub created_at: DateTime<Utc>,
}

impl ReviewCard {
    pub fn new(profile_id: &str, skill: &str, subject: &str, level: &str, ease: f64, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            profile_id: profile_id.to_string(),
            skill: skill.to_string(),
            subject: subject.to_string(),
            level: level.to_string(),
            ease_factor: ease,
            interval_days: 0,
            repetitions: 0,
            next_review: now,
            last_review: now,
            total_reviews: 0,
            correct_reviews: 0,
            created_at: now,
        }
    }

    /// Share of passing reviews; 0.5 for a card never reviewed.
    pub fn success_rate(&self) -> f64 {
        if self.total_reviews == 0 {
            return 0.5;
        }
        self.correct_reviews as f64 / self.total_reviews as f64
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.next_review <= now
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulerStats {
    pub total_cards: usize,
    pub due_today: usize,
    pub mastered: usize,
    pub struggling: usize,
    pub average_ease_factor: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpcomingReview {
    pub skill: String,
    pub days_until: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewReport {
    pub summary: String,
    pub due_today: Vec<String>,
    pub upcoming: Vec<UpcomingReview>,
    pub mastered: Vec<String>,
    pub needs_work: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewOutcome {
    pub card: ReviewCard,
    pub quality: Quality,
}

/// One review card per (learner, skill), scheduled with SM-2.
pub struct SpacedRepetitionScheduler {
    params: SchedulerParams,
    cards: ProfileMap<Vec<ReviewCard>>,
}

impl SpacedRepetitionScheduler {
    pub fn new(params: SchedulerParams) -> Self {
        Self {
            params,
            cards: ProfileMap::new(),
        }
    }

    pub fn params(&self) -> &SchedulerParams {
        &self.params
    }

    pub fn card(&self, profile_id: &str, skill: &str) -> Option<ReviewCard> {
        self.cards
            .with(profile_id, |cards| cards.iter().find(|c| c.skill == skill).cloned())
            .flatten()
    }

    pub fn cards(&self, profile_id: &str) -> Vec<ReviewCard> {
        self.cards
            .with(profile_id, |cards| cards.clone())
            .unwrap_or_default()
    }

    pub fn get_or_create_card(&self, profile_id: &str, skill: &str, subject: &str, level: &str) -> ReviewCard {
        self.get_or_create_card_at(profile_id, skill, subject, level, Utc::now())
    }

    pub fn get_or_create_card_at(
        &self,
        profile_id: &str,
        skill: &str,
        subject: &str,
        level: &str,
        now: DateTime<Utc>,
    ) -> ReviewCard {
        self.cards.with_or_insert(profile_id, Vec::new, |cards| {
            if let Some(card) = cards.iter().find(|c| c.skill == skill) {
                return card.clone();
            }
            let card = ReviewCard::new(profile_id, skill, subject, level, self.params.initial_ease, now);
            tracing::debug!(profile_id = %profile_id, skill = %skill, "review card created");
            cards.push(card.clone());
            card
        })
    }

    pub fn record_review(&self, profile_id: &str, skill: &str, quality: Quality) -> Option<ReviewCard> {
        self.record_review_at(profile_id, skill, quality, Utc::now())
    }

    /// Applies a graded review to the learner's card for `skill`. Unknown cards are ignored.
    pub fn record_review_at(
        &self,
        profile_id: &str,
        skill: &str,
        quality: Quality,
        now: DateTime<Utc>,
    ) -> Option<ReviewCard> {
        self.cards
            .with(profile_id, |cards| {
                let card = cards.iter_mut().find(|c| c.skill == skill)?;
                let schedule = next_review(card, quality, &self.params);

                card.ease_factor = schedule.ease_factor;
                card.interval_days = schedule.interval_days;
                card.repetitions = schedule.repetitions;
                card.last_review = now;
                card.next_review = now + Duration::days(schedule.interval_days as i64);
                card.total_reviews += 1;
                if quality.is_pass() {
                    card.correct_reviews += 1;
                }

                tracing::debug!(
                    profile_id = %profile_id,
                    skill = %skill,
                    quality = quality.value(),
                    interval_days = schedule.interval_days,
                    "review recorded"
                );
                Some(card.clone())
            })
            .flatten()
    }

    #[allow(clippy::too_many_arguments)]
    pub fn process_exercise(
        &self,
        profile_id: &str,
        skill: &str,
        subject: &str,
        level: &str,
        is_correct: bool,
        time_spent_secs: f64,
        hints_used: u32,
    ) -> Option<ReviewOutcome> {
        self.process_exercise_at(profile_id, skill, subject, level, is_correct, time_spent_secs, hints_used, Utc::now())
    }

    /// Get-or-create, grade and review in one step.
    #[allow(clippy::too_many_arguments)]
    pub fn process_exercise_at(
        &self,
        profile_id: &str,
        skill: &str,
        subject: &str,
        level: &str,
        is_correct: bool,
        time_spent_secs: f64,
        hints_used: u32,
        now: DateTime<Utc>,
    ) -> Option<ReviewOutcome> {
        self.get_or_create_card_at(profile_id, skill, subject, level, now);
        let quality = calculate_quality(is_correct, time_spent_secs, hints_used, self.params.expected_answer_secs);
        let card = self.record_review_at(profile_id, skill, quality, now)?;
        Some(ReviewOutcome { card, quality })
    }

    pub fn due_cards(&self, profile_id: &str, limit: usize) -> Vec<ReviewCard> {
        self.due_cards_at(profile_id, limit, Utc::now())
    }

    /// Due cards, most urgent first.
    pub fn due_cards_at(&self, profile_id: &str, limit: usize, now: DateTime<Utc>) -> Vec<ReviewCard> {
        let mut due: Vec<(i64, ReviewCard)> = self
            .cards(profile_id)
            .into_iter()
            .filter(|c| c.is_due(now))
            .map(|c| (review_priority(&c, now), c))
            .collect();
        due.sort_by(|a, b| b.0.cmp(&a.0));
        due.into_iter().take(limit).map(|(_, c)| c).collect()
    }

    pub fn upcoming_cards(&self, profile_id: &str, days: i64) -> Vec<ReviewCard> {
        self.upcoming_cards_at(profile_id, days, Utc::now())
    }

    pub fn stats(&self, profile_id: &str) -> SchedulerStats {
        self.stats_at(profile_id, Utc::now())
    }

    pub fn suggested_skills(&self, profile_id: &str, count: usize) -> Vec<String> {
        self.suggested_skills_at(profile_id, count, Utc::now())
    }

    pub fn review_report(&self, profile_id: &str) -> ReviewReport {
        self.review_report_at(profile_id, Utc::now())
    }

    pub fn upcoming_cards_at(&self, profile_id: &str, days: i64, now: DateTime<Utc>) -> Vec<ReviewCard> {
        let horizon = now + Duration::days(days);
        let mut upcoming: Vec<ReviewCard> = self
            .cards(profile_id)
            .into_iter()
            .filter(|c| c.next_review > now && c.next_review <= horizon)
            .collect();
        upcoming.sort_by_key(|c| c.next_review);
        upcoming
    }

    fn is_mastered(&self, card: &ReviewCard) -> bool {
        card.ease_factor > self.params.mastered_ease && card.interval_days > self.params.mastered_interval_days
    }

    fn is_struggling(&self, card: &ReviewCard) -> bool {
        card.ease_factor < self.params.struggling_ease
    }

    pub fn stats_at(&self, profile_id: &str, now: DateTime<Utc>) -> SchedulerStats {
        let cards = self.cards(profile_id);
        let average = if cards.is_empty() {
            self.params.initial_ease
        } else {
            cards.iter().map(|c| c.ease_factor).sum::<f64>() / cards.len() as f64
        };

        SchedulerStats {
            total_cards: cards.len(),
            due_today: cards.iter().filter(|c| c.is_due(now)).count(),
            mastered: cards.iter().filter(|c| self.is_mastered(c)).count(),
            struggling: cards.iter().filter(|c| self.is_struggling(c)).count(),
            average_ease_factor: (average * 100.0).round() / 100.0,
        }
    }

    pub fn suggested_skills_at(&self, profile_id: &str, count: usize, now: DateTime<Utc>) -> Vec<String> {
        self.due_cards_at(profile_id, count, now)
            .into_iter()
            .map(|c| c.skill)
            .collect()
    }

    pub fn review_report_at(&self, profile_id: &str, now: DateTime<Utc>) -> ReviewReport {
        let stats = self.stats_at(profile_id, now);
        let cards = self.cards(profile_id);

        let upcoming = self
            .upcoming_cards_at(profile_id, self.params.upcoming_days, now)
            .into_iter()
            .map(|c| {
                let secs = c.next_review.signed_duration_since(now).num_seconds() as f64;
                UpcomingReview {
                    skill: c.skill,
                    days_until: (secs / 86_400.0).ceil() as i64,
                }
            })
            .collect();

        ReviewReport {
            summary: format!(
                "{} to review today, {} mastered, {} struggling",
                stats.due_today, stats.mastered, stats.struggling
            ),
            due_today: self
                .due_cards_at(profile_id, self.params.due_limit, now)
                .into_iter()
                .map(|c| c.skill)
                .collect(),
            upcoming,
            mastered: cards.iter().filter(|c| self.is_mastered(c)).map(|c| c.skill.clone()).collect(),
            needs_work: cards.iter().filter(|c| self.is_struggling(c)).map(|c| c.skill.clone()).collect(),
        }
    }

    pub fn all_cards(&self) -> Vec<ReviewCard> {
        let mut all = Vec::new();
        self.cards.for_each(|_, cards| all.extend(cards.iter().cloned()));
        all
    }

    /// Replaces every card. A later duplicate (same learner and skill) overrides an earlier one.
    pub fn restore(&self, cards: Vec<ReviewCard>) {
        self.cards.clear();
        for card in cards {
            let profile_id = card.profile_id.clone();
            self.cards.with_or_insert(&profile_id, Vec::new, |list| {
                match list.iter_mut().find(|c| c.skill == card.skill) {
                    Some(existing) => *existing = card,
                    None => list.push(card),
                }
            });
        }
    }
}

impl Default for SpacedRepetitionScheduler {
    fn default() -> Self {
        Self::new(SchedulerParams::default())
    }
}
