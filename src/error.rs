use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PackError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Precondition failed: {0}")]
    Precondition(#[from] PreconditionViolation),

    #[error("{tool} failed with {}", exit_label(.code))]
    ToolFailed { tool: String, code: Option<i32> },

    #[error("Missing file: {}", .0.display())]
    MissingFile(PathBuf),

    #[error("Malformed JSON in {}: {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Field `{field}` missing from {}", .path.display())]
    MissingField { path: PathBuf, field: String },

    #[error("Field `{field}` in {} is not {expected}", .path.display())]
    InvalidField {
        path: PathBuf,
        field: String,
        expected: &'static str,
    },

    #[error("Revision `{0}` is shorter than 7 characters")]
    ShortRevision(String),

    #[error("Git error: {0}")]
    Git(#[from] git2::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {code}"),
        None => "no exit code (terminated by signal)".to_string(),
    }
}

impl PackError {
    /// True for failures caused by absent or malformed stamping inputs.
    pub fn is_data_integrity(&self) -> bool {
        matches!(
            self,
            PackError::MissingFile(_)
                | PackError::Json { .. }
                | PackError::MissingField { .. }
                | PackError::InvalidField { .. }
                | PackError::ShortRevision(_)
        )
    }
}

/// Why the environment is not safe to build into.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PreconditionViolation {
    #[error("plugin already installed at {}", .0.display())]
    PluginAlreadyInstalled(PathBuf),

    #[error("stale IDE user settings found at {}", .0.display())]
    StaleIdeSettings(PathBuf),

    #[error("IDE Engine folder missing at {}", .0.display())]
    MissingIdeEngine(PathBuf),
}
