pub mod engine;
pub mod rules;

pub use engine::{ErrorPattern, ErrorPatternEngine, PatternExample, PatternStats};
pub use rules::{default_rules, normalize_subject, Detector, PatternKind, PatternRule};
