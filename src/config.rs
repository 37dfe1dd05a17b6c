use std::path::PathBuf;

use crate::logging::{LogSettings, DEFAULT_FILTER};

#[derive(Debug, Clone)]
pub struct Config {
    pub log: LogSettings,
    pub snapshot_path: PathBuf,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let filter = non_empty("RUST_LOG").unwrap_or_else(|| DEFAULT_FILTER.to_string());
        let file_logs = lookup("ENABLE_FILE_LOGS").is_some_and(|v| v == "true" || v == "1");
        let file_dir = file_logs.then(|| non_empty("LOG_DIR").map(PathBuf::from).unwrap_or_else(|| PathBuf::from("./logs")));

        let snapshot_path = non_empty("TUTOR_SNAPSHOT_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(default_snapshot_path);

        Self {
            log: LogSettings { filter, file_dir },
            snapshot_path,
        }
    }
}

fn default_snapshot_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tutor-adapt")
        .join("snapshot.json")
}
