use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The stages of a packaging run.
///
/// Each run flows through: PRECHECK → BUILD → STAMP → ARCHIVE → DONE
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stage {
    Precheck,
    Build,
    Stamp,
    Archive,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Precheck => write!(f, "PRECHECK"),
            Stage::Build => write!(f, "BUILD"),
            Stage::Stamp => write!(f, "STAMP"),
            Stage::Archive => write!(f, "ARCHIVE"),
            Stage::Done => write!(f, "DONE"),
        }
    }
}

impl Stage {
    /// The stage that follows a successful `self`. `Done` is terminal.
    pub fn next(self) -> Option<Stage> {
        match self {
            Stage::Precheck => Some(Stage::Build),
            Stage::Build => Some(Stage::Stamp),
            Stage::Stamp => Some(Stage::Archive),
            Stage::Archive => Some(Stage::Done),
            Stage::Done => None,
        }
    }
}

/// Terminal signal handed back to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BuildResult {
    Success,
    Failure,
}

impl BuildResult {
    /// 0 on success, -1 on any failure.
    pub fn exit_code(self) -> i32 {
        match self {
            BuildResult::Success => 0,
            BuildResult::Failure => -1,
        }
    }
}

/// Structured record of a packaging run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildReport {
    pub stage: Stage,
    pub completed: Vec<Stage>,
    pub failed_at: Option<Stage>,
    pub error: Option<String>,
    pub version_name: Option<String>,
    pub version: Option<u64>,
    pub archive: Option<PathBuf>,
    pub archive_exit_code: Option<i32>,
    /// The run stopped after the precheck on purpose.
    pub dry_run: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl BuildReport {
    pub fn new() -> Self {
        Self {
            stage: Stage::Precheck,
            completed: Vec::new(),
            failed_at: None,
            error: None,
            version_name: None,
            version: None,
            archive: None,
            archive_exit_code: None,
            dry_run: false,
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    /// Marks the current stage as completed and moves to the next one.
    pub fn advance(&mut self) {
        if let Some(next) = self.stage.next() {
            self.completed.push(self.stage);
            self.stage = next;
            if next == Stage::Done {
                self.finished_at = Some(Utc::now());
            }
        }
    }

    /// Records a failure in the current stage. The run ends here.
    pub fn fail(&mut self, error: impl fmt::Display) {
        self.failed_at = Some(self.stage);
        self.error = Some(error.to_string());
        self.finished_at = Some(Utc::now());
    }

    pub fn result(&self) -> BuildResult {
        if self.failed_at.is_none() && (self.stage == Stage::Done || self.dry_run) {
            BuildResult::Success
        } else {
            BuildResult::Failure
        }
    }

    pub fn duration_ms(&self) -> Option<i64> {
        self.finished_at
            .map(|end| (end - self.started_at).num_milliseconds())
    }
}

impl Default for BuildReport {
    fn default() -> Self {
        Self::new()
    }
}
