pub mod adapt;
pub mod config;
pub mod engine;
pub mod error;
pub mod logging;
pub mod patterns;
pub mod persistence;
pub mod registry;
pub mod reports;
pub mod ring;
pub mod srs;
pub mod text;

pub use engine::{AnswerSubmission, MessageEffects, SubmissionResult, TutorEngine};
pub use error::{Result, TutorError};
