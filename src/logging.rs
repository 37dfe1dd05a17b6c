use std::io::IsTerminal;
use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Engine events at info, everything else (dependencies) only when it warns.
pub const DEFAULT_FILTER: &str = "tutor_adapt=info,warn";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    pub filter: String,
    /// Daily-rotated copy of the replay log, written next to the stderr output.
    pub file_dir: Option<PathBuf>,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            filter: DEFAULT_FILTER.to_string(),
            file_dir: None,
        }
    }
}

/// Keeps the non-blocking file writer alive; drop it last so buffered lines are flushed.
pub struct FileLogGuard {
    _guard: WorkerGuard,
}

fn env_filter(filter: &str) -> EnvFilter {
    EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Installs the global subscriber. Command results own stdout, so log lines go to stderr,
/// without colour when stderr is redirected.
pub fn init_tracing(settings: &LogSettings) -> Option<FileLogGuard> {
    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .with_target(false);

    let file = settings.file_dir.as_ref().and_then(|dir| match std::fs::create_dir_all(dir) {
        Ok(()) => Some(tracing_appender::non_blocking(RollingFileAppender::new(
            Rotation::DAILY,
            dir,
            "tutor-adapt.log",
        ))),
        Err(err) => {
            eprintln!("failed to create log directory {}: {err}", dir.display());
            None
        }
    });

    let (file_layer, guard) = match file {
        Some((writer, guard)) => (
            Some(fmt::layer().with_writer(writer).with_ansi(false).with_target(true)),
            Some(FileLogGuard { _guard: guard }),
        ),
        None => (None, None),
    };

    if let Err(err) = tracing_subscriber::registry()
        .with(env_filter(&settings.filter))
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
    {
        eprintln!("tracing already initialised: {err}");
    }

    guard
}
