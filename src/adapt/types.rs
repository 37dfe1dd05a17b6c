use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmotionalState {
    #[default]
    Engaged,
    Confident,
    Struggling,
    Frustrated,
    Fatigued,
    Bored,
    Distracted,
}

impl EmotionalState {
    pub const ALL: [EmotionalState; 7] = [
        Self::Engaged,
        Self::Confident,
        Self::Struggling,
        Self::Frustrated,
        Self::Fatigued,
        Self::Bored,
        Self::Distracted,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Engaged => "engaged",
            Self::Confident => "confident",
            Self::Struggling => "struggling",
            Self::Frustrated => "frustrated",
            Self::Fatigued => "fatigued",
            Self::Bored => "bored",
            Self::Distracted => "distracted",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "engaged" => Some(Self::Engaged),
            "confident" => Some(Self::Confident),
            "struggling" => Some(Self::Struggling),
            "frustrated" => Some(Self::Frustrated),
            "fatigued" => Some(Self::Fatigued),
            "bored" => Some(Self::Bored),
            "distracted" => Some(Self::Distracted),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Engaged => "Motivated",
            Self::Confident => "Confident",
            Self::Struggling => "Having a hard time",
            Self::Frustrated => "Discouraged",
            Self::Fatigued => "Tired",
            Self::Bored => "Bored",
            Self::Distracted => "Distracted",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    BreakSuggested,
    DifficultyAdjusted,
    Encouragement,
    Challenge,
    HelpOffered,
}

impl AlertKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BreakSuggested => "break_suggested",
            Self::DifficultyAdjusted => "difficulty_adjusted",
            Self::Encouragement => "encouragement",
            Self::Challenge => "challenge",
            Self::HelpOffered => "help_offered",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionAlert {
    pub seq: u64,
    #[serde(rename = "type")]
    pub kind: AlertKind,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub acknowledged: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerOutcome {
    pub emotional_state: EmotionalState,
    pub alerts: Vec<SessionAlert>,
    pub recommended_difficulty: u8,
}

impl AnswerOutcome {
    /// Returned when no session is active for the learner.
    pub fn neutral(default_difficulty: u8) -> Self {
        Self {
            emotional_state: EmotionalState::Engaged,
            alerts: Vec::new(),
            recommended_difficulty: default_difficulty,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModeRequest {
    Challenge,
    Easy,
}
