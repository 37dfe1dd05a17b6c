use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseAttempt {
    pub id: String,
    pub profile_id: String,
    #[serde(default)]
    pub exercise_id: Option<String>,
    pub subject: String,
    pub level: String,
    pub skills: Vec<String>,
    pub difficulty: u8,
    pub question: String,
    pub user_answer: String,
    pub correct_answer: String,
    pub is_correct: bool,
    pub hints_used: u32,
    pub time_spent_secs: f64,
    pub attempted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkillLevel {
    Mastered,
    Good,
    NeedsPractice,
    Struggling,
}

impl SkillLevel {
    pub fn from_rate(rate: u32) -> Self {
        if rate >= 90 {
            Self::Mastered
        } else if rate >= 70 {
            Self::Good
        } else if rate < 50 {
            Self::Struggling
        } else {
            Self::NeedsPractice
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillStat {
    pub skill: String,
    pub subject: String,
    pub total_attempts: u32,
    pub correct_attempts: u32,
    /// Rounded percentage.
    pub success_rate: u32,
    pub last_attempted_at: DateTime<Utc>,
    pub level: SkillLevel,
    pub is_weakness: bool,
    pub is_strength: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectStats {
    pub attempts: u32,
    pub success_rate: u32,
    pub skills: Vec<SkillStat>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileAnalysis {
    pub profile_id: String,
    pub total_attempts: usize,
    pub correct_answers: usize,
    pub success_rate: u32,
    pub subject_stats: BTreeMap<String, SubjectStats>,
    pub top_strengths: Vec<SkillStat>,
    pub top_weaknesses: Vec<SkillStat>,
    pub recommended_skills: Vec<String>,
    pub last_updated: DateTime<Utc>,
}

const MIN_ATTEMPTS_FOR_FLAG: u32 = 3;
const TOP_N: usize = 5;

fn percent(part: u32, whole: u32) -> u32 {
    if whole == 0 {
        return 0;
    }
    (part as f64 / whole as f64 * 100.0).round() as u32
}

/// Per (subject, skill) statistics, in order of first appearance in the log.
pub fn skill_stats(attempts: &[ExerciseAttempt]) -> Vec<SkillStat> {
    struct Tally {
        skill: String,
        subject: String,
        correct: u32,
        total: u32,
        last: DateTime<Utc>,
    }

    let mut index: HashMap<(String, String), usize> = HashMap::new();
    let mut tallies: Vec<Tally> = Vec::new();

    for attempt in attempts {
        for skill in &attempt.skills {
            let key = (attempt.subject.clone(), skill.clone());
            let slot = *index.entry(key).or_insert_with(|| {
                tallies.push(Tally {
                    skill: skill.clone(),
                    subject: attempt.subject.clone(),
                    correct: 0,
                    total: 0,
                    last: attempt.attempted_at,
                });
                tallies.len() - 1
            });
            let tally = &mut tallies[slot];
            tally.total += 1;
            if attempt.is_correct {
                tally.correct += 1;
            }
            if attempt.attempted_at > tally.last {
                tally.last = attempt.attempted_at;
            }
        }
    }

    tallies
        .into_iter()
        .map(|t| {
            let rate = percent(t.correct, t.total);
            SkillStat {
                skill: t.skill,
                subject: t.subject,
                total_attempts: t.total,
                correct_attempts: t.correct,
                success_rate: rate,
                last_attempted_at: t.last,
                level: SkillLevel::from_rate(rate),
                is_weakness: rate < 60 && t.total >= MIN_ATTEMPTS_FOR_FLAG,
                is_strength: rate >= 80 && t.total >= MIN_ATTEMPTS_FOR_FLAG,
            }
        })
        .collect()
}

pub fn analyze_profile(profile_id: &str, attempts: &[ExerciseAttempt], now: DateTime<Utc>) -> ProfileAnalysis {
    let correct = attempts.iter().filter(|a| a.is_correct).count();
    let stats = skill_stats(attempts);

    let mut subject_stats: BTreeMap<String, SubjectStats> = BTreeMap::new();
    for stat in &stats {
        subject_stats
            .entry(stat.subject.clone())
            .or_insert_with(|| SubjectStats {
                attempts: 0,
                success_rate: 0,
                skills: Vec::new(),
            })
            .skills
            .push(stat.clone());
    }
    for subject in subject_stats.values_mut() {
        subject.attempts = subject.skills.iter().map(|s| s.total_attempts).sum();
        let mean = subject.skills.iter().map(|s| s.success_rate as f64).sum::<f64>() / subject.skills.len() as f64;
        subject.success_rate = mean.round() as u32;
    }

    let mut top_strengths: Vec<SkillStat> = stats.iter().filter(|s| s.is_strength).cloned().collect();
    top_strengths.sort_by(|a, b| b.success_rate.cmp(&a.success_rate));
    top_strengths.truncate(TOP_N);

    let mut top_weaknesses: Vec<SkillStat> = stats.iter().filter(|s| s.is_weakness).cloned().collect();
    top_weaknesses.sort_by(|a, b| a.success_rate.cmp(&b.success_rate));
    top_weaknesses.truncate(TOP_N);

    let mut practice: Vec<&SkillStat> = stats
        .iter()
        .filter(|s| (40..70).contains(&s.success_rate) && s.total_attempts >= 2)
        .collect();
    practice.sort_by(|a, b| a.success_rate.cmp(&b.success_rate));
    let recommended_skills = practice.into_iter().take(3).map(|s| s.skill.clone()).collect();

    ProfileAnalysis {
        profile_id: profile_id.to_string(),
        total_attempts: attempts.len(),
        correct_answers: correct,
        success_rate: percent(correct as u32, attempts.len() as u32),
        subject_stats,
        top_strengths,
        top_weaknesses,
        recommended_skills,
        last_updated: now,
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use chrono::Duration;

    pub fn attempt(subject: &str, skills: &[&str], correct: bool, at: DateTime<Utc>) -> ExerciseAttempt {
        ExerciseAttempt {
            id: uuid::Uuid::new_v4().to_string(),
            profile_id: "p1".to_string(),
            exercise_id: None,
            subject: subject.to_string(),
            level: "CE2".to_string(),
            skills: skills.iter().map(|s| s.to_string()).collect(),
            difficulty: 3,
            question: "q".to_string(),
            user_answer: "a".to_string(),
            correct_answer: if correct { "a" } else { "b" }.to_string(),
            is_correct: correct,
            hints_used: 0,
            time_spent_secs: 12.0,
            attempted_at: at,
        }
    }

    /// `correct` right answers followed by `wrong` wrong ones, one minute apart.
    pub fn series(subject: &str, skill: &str, correct: usize, wrong: usize, start: DateTime<Utc>) -> Vec<ExerciseAttempt> {
        (0..correct + wrong)
            .map(|i| attempt(subject, &[skill], i < correct, start + Duration::minutes(i as i64)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn skill_levels_follow_thresholds() {
        assert_eq!(SkillLevel::from_rate(90), SkillLevel::Mastered);
        assert_eq!(SkillLevel::from_rate(70), SkillLevel::Good);
        assert_eq!(SkillLevel::from_rate(55), SkillLevel::NeedsPractice);
        assert_eq!(SkillLevel::from_rate(49), SkillLevel::Struggling);
    }

    #[test]
    fn same_skill_in_two_subjects_is_separate() {
        let now = Utc::now();
        let mut log = series("maths", "logic", 2, 0, now);
        log.extend(series("french", "logic", 0, 2, now));
        let stats = skill_stats(&log);
        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].success_rate, 100);
        assert_eq!(stats[1].success_rate, 0);
    }

    #[test]
    fn flags_need_three_attempts() {
        let now = Utc::now();
        let stats = skill_stats(&series("maths", "x7", 0, 2, now));
        assert!(!stats[0].is_weakness);
        let stats = skill_stats(&series("maths", "x7", 0, 3, now));
        assert!(stats[0].is_weakness);
        let stats = skill_stats(&series("maths", "x7", 4, 1, now));
        assert!(stats[0].is_strength);
    }

    #[test]
    fn analysis_picks_strengths_weaknesses_and_practice() {
        let now = Utc::now();
        let mut log = series("maths", "addition", 9, 1, now);
        log.extend(series("maths", "x7", 1, 4, now));
        log.extend(series("french", "homophones", 1, 1, now));
        log.extend(series("french", "agreement", 3, 2, now));

        let analysis = analyze_profile("p1", &log, now);
        assert_eq!(analysis.total_attempts, 22);
        assert_eq!(analysis.top_strengths[0].skill, "addition");
        assert_eq!(analysis.top_weaknesses[0].skill, "x7");
        assert_eq!(analysis.recommended_skills, vec!["homophones", "agreement"]);
        assert_eq!(analysis.subject_stats["maths"].attempts, 15);
        assert_eq!(analysis.subject_stats["maths"].success_rate, 55);
    }

    #[test]
    fn empty_log_analysis() {
        let analysis = analyze_profile("p1", &[], Utc::now());
        assert_eq!(analysis.success_rate, 0);
        assert!(analysis.subject_stats.is_empty());
    }
}
