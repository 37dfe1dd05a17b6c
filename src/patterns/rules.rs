use serde::{Deserialize, Serialize};

use crate::text::{digit_runs, fold, leading_int};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatternKind {
    Confusion,
    Calculation,
    Concept,
    Attention,
    Method,
    Memory,
}

impl PatternKind {
    pub const ALL: [PatternKind; 6] = [
        Self::Confusion,
        Self::Calculation,
        Self::Concept,
        Self::Attention,
        Self::Method,
        Self::Memory,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Confusion => "confusion",
            Self::Calculation => "calculation",
            Self::Concept => "concept",
            Self::Attention => "attention",
            Self::Method => "method",
            Self::Memory => "memory",
        }
    }
}

pub const GENERAL: &str = "general";
pub const FRENCH: &str = "french";
pub const MATHS: &str = "maths";

/// Canonical subject key: case and accents are ignored and common aliases collapse.
pub fn normalize_subject(subject: &str) -> String {
    let folded = fold(subject.trim());
    match folded.as_str() {
        "" | "general" | "all" => GENERAL.to_string(),
        "francais" | "french" | "fr" => FRENCH.to_string(),
        "math" | "maths" | "mathematiques" | "mathematics" => MATHS.to_string(),
        _ => folded,
    }
}

pub type DetectorFn = fn(question: &str, user_answer: &str, correct_answer: &str) -> bool;

#[derive(Clone)]
pub enum Detector {
    /// Hit when, for any pair, the first needle occurs in the correct answer and the
    /// second in the learner's answer.
    CrossSubstring {
        pairs: &'static [(&'static str, &'static str)],
        fold_case: bool,
    },
    /// Addition where the answer is off by exactly one of `offsets`.
    CarryOmission { offsets: &'static [i64] },
    /// Multiplication answered with the sum of its first two operands.
    SumForProduct,
    /// Wrong answer to a multiplication involving one of `tables`.
    WeakTables { tables: &'static [char] },
    /// Subtraction answered as second operand minus first.
    ReversedSubtraction,
    /// Same length as the correct answer with exactly one differing character.
    SingleCharSlip,
    Custom(DetectorFn),
}

impl std::fmt::Debug for Detector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CrossSubstring { pairs, fold_case } => f
                .debug_struct("CrossSubstring")
                .field("pairs", pairs)
                .field("fold_case", fold_case)
                .finish(),
            Self::CarryOmission { offsets } => f.debug_struct("CarryOmission").field("offsets", offsets).finish(),
            Self::SumForProduct => f.write_str("SumForProduct"),
            Self::WeakTables { tables } => f.debug_struct("WeakTables").field("tables", tables).finish(),
            Self::ReversedSubtraction => f.write_str("ReversedSubtraction"),
            Self::SingleCharSlip => f.write_str("SingleCharSlip"),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

impl Detector {
    pub fn matches(&self, question: &str, user_answer: &str, correct_answer: &str) -> bool {
        match self {
            Self::CrossSubstring { pairs, fold_case } => {
                let (ua, ca) = if *fold_case {
                    (user_answer.to_lowercase(), correct_answer.to_lowercase())
                } else {
                    (user_answer.to_string(), correct_answer.to_string())
                };
                pairs
                    .iter()
                    .any(|(in_correct, in_user)| ca.contains(in_correct) && ua.contains(in_user))
            }
            Self::CarryOmission { offsets } => {
                if !question.contains('+') {
                    return false;
                }
                match (leading_int(correct_answer), leading_int(user_answer)) {
                    (Some(ca), Some(ua)) => ca
                        .checked_sub(ua)
                        .and_then(i64::checked_abs)
                        .is_some_and(|d| offsets.contains(&d)),
                    _ => false,
                }
            }
            Self::SumForProduct => {
                if !has_times_operator(question) {
                    return false;
                }
                let operands = digit_runs(question);
                if operands.len() < 2 {
                    return false;
                }
                let ua = leading_int(user_answer);
                ua.is_some() && ua == operands[0].checked_add(operands[1]) && ua != leading_int(correct_answer)
            }
            Self::WeakTables { tables } => {
                involves_table(question, tables) && user_answer.trim() != correct_answer.trim()
            }
            Self::ReversedSubtraction => {
                if !question.contains('-') {
                    return false;
                }
                let operands = digit_runs(question);
                if operands.len() < 2 {
                    return false;
                }
                let ua = leading_int(user_answer);
                ua.is_some() && ua == operands[1].checked_sub(operands[0]) && ua != leading_int(correct_answer)
            }
            Self::SingleCharSlip => {
                let ua: Vec<char> = user_answer.chars().collect();
                let ca: Vec<char> = correct_answer.chars().collect();
                ua.len() == ca.len() && ua.iter().zip(&ca).filter(|(a, b)| a != b).count() == 1
            }
            Self::Custom(f) => f(question, user_answer, correct_answer),
        }
    }
}

fn is_times(ch: char) -> bool {
    ch == '×' || ch == '*'
}

fn has_times_operator(question: &str) -> bool {
    question.chars().any(is_times)
}

/// True when a `×`/`*` sits between two digits (spaces allowed) and either digit
/// adjacent to the operator is one of `tables`.
fn involves_table(question: &str, tables: &[char]) -> bool {
    let chars: Vec<char> = question.chars().collect();
    chars.iter().enumerate().any(|(i, ch)| {
        if !is_times(*ch) {
            return false;
        }
        let left = chars[..i].iter().rev().find(|c| !c.is_whitespace());
        let right = chars[i + 1..].iter().find(|c| !c.is_whitespace());
        match (left, right) {
            (Some(l), Some(r)) if l.is_ascii_digit() && r.is_ascii_digit() => {
                tables.contains(l) || tables.contains(r)
            }
            _ => false,
        }
    })
}

#[derive(Debug, Clone)]
pub struct PatternRule {
    pub detector: Detector,
    pub kind: PatternKind,
    /// Stable key: at most one active pattern per learner and description.
    pub description: String,
    pub subject: String,
    pub skills: Vec<String>,
    pub recommendations: Vec<String>,
}

impl PatternRule {
    pub fn new(
        detector: Detector,
        kind: PatternKind,
        description: &str,
        subject: &str,
        skills: &[&str],
        recommendations: &[&str],
    ) -> Self {
        Self {
            detector,
            kind,
            description: description.to_string(),
            subject: normalize_subject(subject),
            skills: skills.iter().map(|s| s.to_string()).collect(),
            recommendations: recommendations.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn applies_to(&self, subject: &str) -> bool {
        self.subject == GENERAL || self.subject == subject
    }
}

/// First rule (in registration order) that applies to `subject` and matches the answer.
pub fn find_match<'a>(
    rules: &'a [PatternRule],
    question: &str,
    user_answer: &str,
    correct_answer: &str,
    subject: &str,
) -> Option<&'a PatternRule> {
    let subject = normalize_subject(subject);
    rules
        .iter()
        .filter(|rule| rule.applies_to(&subject))
        .find(|rule| rule.detector.matches(question, user_answer, correct_answer))
}

pub fn default_rules() -> Vec<PatternRule> {
    vec![
        PatternRule::new(
            Detector::CrossSubstring {
                pairs: &[("a ", " à "), ("à ", " a ")],
                fold_case: false,
            },
            PatternKind::Confusion,
            "Confuses 'a' (verb avoir) and 'à' (preposition)",
            FRENCH,
            &["homophones", "grammar", "conjugation"],
            &[
                "Tip: replace it with 'avait'. If that works, it's 'a' (verb avoir)",
                "Exercise: write 5 sentences with 'a' and 5 with 'à'",
                "Reminder: 'à' marks a place, a recipient or a moment",
            ],
        ),
        PatternRule::new(
            Detector::CrossSubstring {
                pairs: &[(" et ", " est "), (" est ", " et ")],
                fold_case: false,
            },
            PatternKind::Confusion,
            "Confuses 'et' (conjunction) and 'est' (verb être)",
            FRENCH,
            &["homophones", "grammar"],
            &[
                "Tip: replace it with 'était'. If that works, it's 'est' (verb être)",
                "Tip: replace it with 'et puis'. If that works, it's 'et'",
                "Exercise: put sentences in the past tense to spot 'est'",
            ],
        ),
        PatternRule::new(
            Detector::CrossSubstring {
                pairs: &[
                    ("ces ", "ses "),
                    ("ses ", "ces "),
                    ("c'est ", "s'est "),
                    ("s'est ", "c'est "),
                ],
                fold_case: true,
            },
            PatternKind::Confusion,
            "Confuses ces/ses or c'est/s'est",
            FRENCH,
            &["homophones", "grammar", "determiners"],
            &[
                "'Ses' = his/hers (possessive). 'Ces' = these (demonstrative)",
                "'C'est' = cela est. 'S'est' = pronominal verb (il s'est)",
                "Exercise: replace with 'les siens' to check 'ses'",
            ],
        ),
        PatternRule::new(
            Detector::CrossSubstring {
                pairs: &[("leur ", "leurs "), ("leurs ", "leur ")],
                fold_case: false,
            },
            PatternKind::Confusion,
            "Confuses 'leur' and 'leurs' (plural agreement)",
            FRENCH,
            &["agreement", "grammar", "plural"],
            &[
                "'Leur' before a verb never takes an S",
                "'Leurs' before a plural noun takes an S",
                "Tip: if you can replace it with 'lui', it's 'leur' without an S",
            ],
        ),
        PatternRule::new(
            Detector::CarryOmission { offsets: &[10, 100] },
            PatternKind::Calculation,
            "Forgets to carry in additions",
            MATHS,
            &["addition", "column arithmetic", "carrying"],
            &[
                "Set the sum out neatly in columns",
                "Write the carry above the next column",
                "Check by adding in the other order",
            ],
        ),
        PatternRule::new(
            Detector::SumForProduct,
            PatternKind::Confusion,
            "Confuses multiplication and addition",
            MATHS,
            &["multiplication", "operations"],
            &[
                "× means 'times', a repetition. + means 'and', an addition",
                "3 × 4 = 3 + 3 + 3 + 3 (four times three)",
                "Picture it with objects: 3 groups of 4",
            ],
        ),
        PatternRule::new(
            Detector::WeakTables { tables: &['7', '8', '9'] },
            PatternKind::Memory,
            "Has trouble with the 7, 8 or 9 times tables",
            MATHS,
            &["times tables", "mental arithmetic"],
            &[
                "Review the hard tables for 5 minutes every day",
                "Use your fingers for the 9 times table",
                "Make flash cards for the tables",
            ],
        ),
        PatternRule::new(
            Detector::ReversedSubtraction,
            PatternKind::Method,
            "Reverses the order in subtractions",
            MATHS,
            &["subtraction", "operations"],
            &[
                "In a - b, you take b away from a (not the other way round)",
                "The bigger number always comes first",
                "Picture it: I have 10 sweets, I eat 3, 7 are left",
            ],
        ),
        PatternRule::new(
            Detector::SingleCharSlip,
            PatternKind::Attention,
            "Makes typing or attention slips",
            GENERAL,
            &["attention", "proofreading"],
            &[
                "Always re-read your answer before submitting",
                "Take your time, don't rush",
                "Check difficult words letter by letter",
            ],
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matched(question: &str, ua: &str, ca: &str, subject: &str) -> Option<String> {
        let rules = default_rules();
        find_match(&rules, question, ua, ca, subject).map(|r| r.description.clone())
    }

    #[test]
    fn subject_aliases_collapse() {
        assert_eq!(normalize_subject("Français"), FRENCH);
        assert_eq!(normalize_subject("Math"), MATHS);
        assert_eq!(normalize_subject("Général"), GENERAL);
        assert_eq!(normalize_subject("Sciences"), "sciences");
    }

    #[test]
    fn a_accent_confusion() {
        let hit = matched("Complète", "il va à la plage", "il a une plage", "français");
        assert_eq!(hit.as_deref(), Some("Confuses 'a' (verb avoir) and 'à' (preposition)"));
    }

    #[test]
    fn et_est_confusion() {
        let hit = matched("?", "le chat est le chien", "le chat et le chien", "french");
        assert_eq!(hit.as_deref(), Some("Confuses 'et' (conjunction) and 'est' (verb être)"));
    }

    #[test]
    fn ces_ses_is_case_insensitive() {
        let hit = matched("?", "Ses livres sont là", "Ces livres sont là", "french");
        assert_eq!(hit.as_deref(), Some("Confuses ces/ses or c'est/s'est"));
    }

    #[test]
    fn french_rules_skip_other_subjects() {
        let hit = matched("?", "le chat est le chien", "le chat et le chien", "maths");
        assert_ne!(hit.as_deref(), Some("Confuses 'et' (conjunction) and 'est' (verb être)"));
    }

    #[test]
    fn carry_omission() {
        let hit = matched("27 + 15 = ?", "32", "42", "maths");
        assert_eq!(hit.as_deref(), Some("Forgets to carry in additions"));
    }

    #[test]
    fn sum_for_product() {
        let hit = matched("3 × 4 = ?", "7", "12", "maths");
        assert_eq!(hit.as_deref(), Some("Confuses multiplication and addition"));
    }

    #[test]
    fn weak_tables_on_either_side() {
        assert_eq!(
            matched("6 × 7 = ?", "40", "42", "maths").as_deref(),
            Some("Has trouble with the 7, 8 or 9 times tables")
        );
        assert_eq!(
            matched("8*6", "46", "48", "maths").as_deref(),
            Some("Has trouble with the 7, 8 or 9 times tables")
        );
        assert!(!involves_table("6 × 5", &['7', '8', '9']));
    }

    #[test]
    fn reversed_subtraction() {
        let hit = matched("3 - 10 = ?", "7", "-7", "maths");
        assert_eq!(hit.as_deref(), Some("Reverses the order in subtractions"));
    }

    #[test]
    fn single_char_slip_applies_to_any_subject() {
        let hit = matched("Capital of France?", "Parys", "Paris", "geography");
        assert_eq!(hit.as_deref(), Some("Makes typing or attention slips"));
    }

    #[test]
    fn unmatched_error_returns_none() {
        assert!(matched("2 + 2", "banana", "4", "maths").is_none());
    }

    #[test]
    fn huge_operands_do_not_overflow() {
        let huge = "9000000000000000000";
        assert_eq!(
            matched(&format!("{huge} × {huge} = ?"), "1", "2", "maths").as_deref(),
            Some("Has trouble with the 7, 8 or 9 times tables")
        );
        assert!(matched("1 + 1 = ?", &format!("-{huge}"), huge, "maths").is_none());
        assert!(!Detector::SumForProduct.matches(&format!("{huge} × {huge}"), "-1", "0"));
        assert!(!Detector::ReversedSubtraction.matches(&format!("{huge} - 1"), "1", "0"));
        assert!(matched("-", "-", "", "maths").is_none());
        assert!(matched("99999999999999999999 + 1", "1", "99999999999999999999", "maths").is_none());
    }

    #[test]
    fn custom_detector_runs() {
        fn always(_: &str, _: &str, _: &str) -> bool {
            true
        }
        assert!(Detector::Custom(always).matches("", "", ""));
    }
}
