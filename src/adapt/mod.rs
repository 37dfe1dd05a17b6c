pub mod alerts;
pub mod classifier;
pub mod config;
pub mod difficulty;
pub mod emotion;
pub mod session;
pub mod tracker;
pub mod types;

pub use alerts::AlertGenerator;
pub use classifier::{SessionSignals, StateClassifier};
pub use config::EngineConfig;
pub use difficulty::{DifficultyController, Recommendation};
pub use emotion::{detect_emotion, detect_mode_request};
pub use session::{LearnerSession, SessionSummary};
pub use tracker::{SessionTracker, WeeklyStats};
pub use types::{AlertKind, AnswerOutcome, EmotionalState, ModeRequest, SessionAlert};
