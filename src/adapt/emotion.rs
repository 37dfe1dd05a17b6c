//! Keyword detection of a learner's mood and of explicit mode requests in chat text.
//!
//! Matching is accent- and case-insensitive. When several categories match, the one
//! with the highest priority wins.

use crate::adapt::types::{EmotionalState, ModeRequest};
use crate::text::fold;

struct KeywordGroup {
    state: EmotionalState,
    priority: u8,
    keywords: &'static [&'static str],
}

const EMOTION_KEYWORDS: &[KeywordGroup] = &[
    KeywordGroup {
        state: EmotionalState::Frustrated,
        priority: 10,
        keywords: &[
            "j'y arrive pas", "j'arrive pas", "je n'y arrive pas", "j'comprends pas",
            "je comprends pas", "je comprends rien", "c'est trop dur", "trop difficile",
            "j'en ai marre", "j'abandonne", "c'est nul", "je suis nul", "énervé",
            "en colère", "je déteste", "je peux pas", "impossible", "ça m'énerve",
            "ça me saoule", "je rage", "c'est chiant", "pfff", "grrr", "j'en peux plus",
            "laisse tomber", "tant pis", "i give up", "too hard", "i can't do it", "i hate this",
        ],
    },
    KeywordGroup {
        state: EmotionalState::Fatigued,
        priority: 9,
        keywords: &[
            "fatigué", "épuisé", "crevé", "j'ai sommeil", "je dors", "baille", "pause",
            "j'ai besoin d'une pause", "stop", "j'arrête", "on arrête", "tired", "sleepy",
            "need a break",
        ],
    },
    KeywordGroup {
        state: EmotionalState::Bored,
        priority: 7,
        keywords: &[
            "c'est facile", "trop facile", "je m'ennuie", "ennuyeux", "boring", "c'est long",
            "c'est lent", "plus dur", "un défi", "challenge", "je connais déjà", "je sais déjà",
            "répétitif", "too easy", "i'm bored",
        ],
    },
    KeywordGroup {
        state: EmotionalState::Struggling,
        priority: 6,
        keywords: &[
            "je ne sais pas", "je sais pas", "c'est quoi", "comment on fait", "aide-moi",
            "aidez-moi", "help", "je suis perdu", "perdue", "explique", "tu peux m'aider",
            "pas compris", "i don't know", "i'm lost", "don't understand",
        ],
    },
    KeywordGroup {
        state: EmotionalState::Confident,
        priority: 5,
        keywords: &[
            "c'est bon", "j'ai compris", "facile", "trop bien", "génial", "je gère", "easy",
            "tranquille", "pas de problème", "nickel", "yes", "youpi", "super", "cool",
            "parfait", "got it",
        ],
    },
    KeywordGroup {
        state: EmotionalState::Engaged,
        priority: 4,
        keywords: &[
            "allons-y", "on y va", "c'est parti", "encore", "un autre", "suivant", "prochain",
            "continue", "j'aime bien", "intéressant", "ok", "d'accord", "prêt", "prête", "go",
            "next", "let's go",
        ],
    },
];

const CHALLENGE_MODE_KEYWORDS: &[&str] = &[
    "mode défi", "difficulté max", "niveau max", "le plus dur", "maximum", "je veux un défi",
    "donne-moi un défi", "mets le max", "niveau 5", "difficulté 5", "challenge mode",
    "hardest level",
];

const EASY_MODE_KEYWORDS: &[&str] = &[
    "mode facile", "plus facile", "trop dur pour moi", "niveau 1", "difficulté 1",
    "le plus simple", "niveau débutant", "niveau facile", "easy mode", "easiest level",
];

fn contains_any(folded: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|keyword| folded.contains(&fold(keyword)))
}

/// Highest-priority mood named in `text`, if any.
pub fn detect_emotion(text: &str) -> Option<EmotionalState> {
    let folded = fold(text);
    EMOTION_KEYWORDS
        .iter()
        .filter(|group| contains_any(&folded, group.keywords))
        .max_by_key(|group| group.priority)
        .map(|group| group.state)
}

/// Challenge requests are checked before easy ones.
pub fn detect_mode_request(text: &str) -> Option<ModeRequest> {
    let folded = fold(text);
    if contains_any(&folded, CHALLENGE_MODE_KEYWORDS) {
        Some(ModeRequest::Challenge)
    } else if contains_any(&folded, EASY_MODE_KEYWORDS) {
        Some(ModeRequest::Easy)
    } else {
        None
    }
}
