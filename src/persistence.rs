use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::adapt::session::{LearnerSession, SessionSummary};
use crate::error::{Result, TutorError};
use crate::patterns::ErrorPattern;
use crate::reports::{ExerciseAttempt, SessionReport, WeeklyReport};
use crate::srs::ReviewCard;

pub const SNAPSHOT_VERSION: u32 = 1;

/// Everything the engine knows about its learners, in a serializable form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineSnapshot {
    pub version: u32,
    pub saved_at: DateTime<Utc>,
    #[serde(default)]
    pub sessions: Vec<LearnerSession>,
    #[serde(default)]
    pub session_history: Vec<SessionSummary>,
    #[serde(default)]
    pub patterns: Vec<ErrorPattern>,
    #[serde(default)]
    pub cards: Vec<ReviewCard>,
    #[serde(default)]
    pub attempts: Vec<ExerciseAttempt>,
    #[serde(default)]
    pub session_reports: Vec<SessionReport>,
    #[serde(default)]
    pub weekly_reports: Vec<WeeklyReport>,
}

pub trait SnapshotStore {
    /// `Ok(None)` when nothing has been saved yet.
    fn load(&self) -> Result<Option<EngineSnapshot>>;
    fn save(&self, snapshot: &EngineSnapshot) -> Result<()>;
}

/// Stores the snapshot as one JSON document. Writes go to a sibling temp file first.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SnapshotStore for JsonFileStore {
    fn load(&self) -> Result<Option<EngineSnapshot>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(TutorError::io(&self.path, e)),
        };
        let snapshot: EngineSnapshot = serde_json::from_str(&content)?;
        if snapshot.version > SNAPSHOT_VERSION {
            return Err(TutorError::invalid(format!(
                "snapshot version {} is newer than supported version {SNAPSHOT_VERSION}",
                snapshot.version
            )));
        }
        Ok(Some(snapshot))
    }

    fn save(&self, snapshot: &EngineSnapshot) -> Result<()> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|e| TutorError::io(dir, e))?;
        }

        let json = serde_json::to_string_pretty(snapshot)?;
        let temp = self.path.with_extension("json.tmp");
        fs::write(&temp, json).map_err(|e| TutorError::io(&temp, e))?;
        fs::rename(&temp, &self.path).map_err(|e| {
            let _ = fs::remove_file(&temp);
            TutorError::io(&self.path, e)
        })?;

        tracing::debug!(path = %self.path.display(), "snapshot saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty(version: u32) -> EngineSnapshot {
        EngineSnapshot {
            version,
            saved_at: Utc::now(),
            sessions: Vec::new(),
            session_history: Vec::new(),
            patterns: Vec::new(),
            cards: Vec::new(),
            attempts: Vec::new(),
            session_reports: Vec::new(),
            weekly_reports: Vec::new(),
        }
    }

    #[test]
    fn missing_file_loads_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("absent.json"));
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn save_creates_parent_dirs_and_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("nested/deeper/snapshot.json"));
        let mut snapshot = empty(SNAPSHOT_VERSION);
        snapshot.cards.push(ReviewCard::new("p1", "x7", "maths", "CE2", 2.5, Utc::now()));

        store.save(&snapshot).unwrap();
        assert!(!store.path().with_extension("json.tmp").exists());
        assert_eq!(store.load().unwrap(), Some(snapshot));
    }

    #[test]
    fn newer_version_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("snapshot.json"));
        store.save(&empty(SNAPSHOT_VERSION + 1)).unwrap();
        assert!(matches!(store.load(), Err(TutorError::InvalidInput(_))));
    }

    #[test]
    fn corrupt_file_is_a_serialization_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshot.json");
        fs::write(&path, "{not json").unwrap();
        assert!(matches!(JsonFileStore::new(path).load(), Err(TutorError::Serialization(_))));
    }
}
