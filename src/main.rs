use std::process::ExitCode;

use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};

use tutor_adapt::adapt::config::EngineConfig;
use tutor_adapt::adapt::types::{EmotionalState, ModeRequest};
use tutor_adapt::config::Config;
use tutor_adapt::logging::init_tracing;
use tutor_adapt::persistence::{JsonFileStore, SnapshotStore};
use tutor_adapt::reports::{format_session_report, format_weekly_report};
use tutor_adapt::{AnswerSubmission, Result, TutorEngine, TutorError};

#[derive(Debug, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
enum Command {
    StartSession {
        profile_id: String,
        #[serde(default)]
        difficulty: Option<u8>,
    },
    Answer(AnswerSubmission),
    Emotion {
        profile_id: String,
        #[serde(default)]
        state: Option<EmotionalState>,
        #[serde(default)]
        text: Option<String>,
    },
    Mode {
        profile_id: String,
        mode: ModeRequest,
    },
    EndSession {
        profile_id: String,
    },
    Acknowledge {
        profile_id: String,
        seq: u64,
    },
    ResolvePattern {
        pattern_id: String,
    },
    Report {
        profile_id: String,
        #[serde(default)]
        kind: ReportKind,
    },
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
enum ReportKind {
    #[default]
    Stats,
    Weekly,
    Review,
    Patterns,
    Context,
}

fn run_command(engine: &TutorEngine, command: Command) -> Result<Value> {
    let now = Utc::now();
    let value = match command {
        Command::StartSession { profile_id, difficulty } => {
            serde_json::to_value(engine.start_session_at(&profile_id, difficulty, now))?
        }
        Command::Answer(submission) => serde_json::to_value(engine.submit_answer_at(&submission, now)?)?,
        Command::Emotion { profile_id, state, text } => match (state, text) {
            (Some(state), _) => {
                serde_json::to_value(engine.tracker().update_emotional_state_at(&profile_id, state, now))?
            }
            (None, Some(text)) => serde_json::to_value(engine.handle_message_at(&profile_id, &text, now))?,
            (None, None) => return Err(TutorError::invalid("emotion needs either a state or a text")),
        },
        Command::Mode { profile_id, mode } => {
            serde_json::to_value(engine.tracker().activate_mode_at(&profile_id, mode, now))?
        }
        Command::EndSession { profile_id } => match engine.finish_session_at(&profile_id, now) {
            Some(report) => json!({ "report": report, "text": format_session_report(&report) }),
            None => Value::Null,
        },
        Command::Acknowledge { profile_id, seq } => {
            json!({ "acknowledged": engine.tracker().acknowledge_alert(&profile_id, seq) })
        }
        Command::ResolvePattern { pattern_id } => {
            json!({ "resolved": engine.patterns().mark_as_resolved_at(&pattern_id, now) })
        }
        Command::Report { profile_id, kind } => match kind {
            ReportKind::Stats => serde_json::to_value(engine.profile_stats_at(&profile_id, now))?,
            ReportKind::Weekly => {
                let report = engine.weekly_report_at(&profile_id, now);
                json!({ "report": report, "text": format_weekly_report(&report) })
            }
            ReportKind::Review => serde_json::to_value(engine.scheduler().review_report_at(&profile_id, now))?,
            ReportKind::Patterns => serde_json::to_value(engine.patterns().pattern_stats(&profile_id))?,
            ReportKind::Context => Value::String(engine.tutor_context_at(&profile_id, now)),
        },
    };
    Ok(value)
}

fn replay(engine: &TutorEngine, script: &str) -> Result<usize> {
    let content = std::fs::read_to_string(script).map_err(|e| TutorError::Io {
        path: script.into(),
        source: e,
    })?;

    let mut executed = 0;
    for (index, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let result = serde_json::from_str::<Command>(line)
            .map_err(TutorError::from)
            .and_then(|command| run_command(engine, command));
        match result {
            Ok(value) => {
                println!("{value}");
                executed += 1;
            }
            Err(e) => {
                tracing::warn!(line = index + 1, error = %e, "command failed");
                println!("{}", json!({ "line": index + 1, "error": e.to_string() }));
            }
        }
    }
    Ok(executed)
}

fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    let config = Config::from_env();
    let _log_guard = init_tracing(&config.log);

    let Some(script) = std::env::args().nth(1) else {
        eprintln!("usage: tutor-adapt <commands.jsonl>");
        return ExitCode::from(2);
    };

    let engine = TutorEngine::new(EngineConfig::from_env());
    let store = JsonFileStore::new(&config.snapshot_path);
    match store.load() {
        Ok(Some(snapshot)) => engine.restore(snapshot),
        Ok(None) => tracing::info!(path = %store.path().display(), "no snapshot found, starting empty"),
        Err(e) => {
            tracing::error!(error = %e, "failed to load snapshot");
            return ExitCode::FAILURE;
        }
    }

    let executed = match replay(&engine, &script) {
        Ok(count) => count,
        Err(e) => {
            tracing::error!(error = %e, "failed to read command file");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = store.save(&engine.snapshot_at(Utc::now())) {
        tracing::error!(error = %e, "failed to save snapshot");
        return ExitCode::FAILURE;
    }

    tracing::info!(executed, "command file replayed");
    ExitCode::SUCCESS
}
