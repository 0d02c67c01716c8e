//! Compression of the finished output folder into a versioned archive.

use std::path::PathBuf;

use tracing::{info, warn};

use crate::config::PackConfig;
use crate::error::PackError;
use crate::runner::{Invocation, ToolRunner};

/// `<archive_dir>/<product>-<version>.<ext>`
pub fn archive_path(config: &PackConfig, version_name: &str) -> PathBuf {
    config.archive_dir.join(format!(
        "{}-{}.{}",
        config.product_name, version_name, config.archive_ext
    ))
}

/// Adds everything under the output folder to the archive, recursively.
pub fn archive_command(config: &PackConfig, version_name: &str) -> Invocation {
    Invocation::new(&config.archiver)
        .args(["a", "-r"])
        .arg(archive_path(config, version_name).display().to_string())
        .arg(config.out_folder.join("*").display().to_string())
        .quiet()
}

/// Result of the archiving step. The exit code is always reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveOutcome {
    pub path: PathBuf,
    pub exit_code: Option<i32>,
}

impl ArchiveOutcome {
    pub fn succeeded(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Runs the archiver once.
///
/// A non-zero exit is an error when `archive_failure_fatal` is set, otherwise
/// it is logged and returned in the outcome.
pub fn create_archive(
    config: &PackConfig,
    version_name: &str,
    runner: &impl ToolRunner,
) -> Result<ArchiveOutcome, PackError> {
    let invocation = archive_command(config, version_name);
    let path = archive_path(config, version_name);
    info!(archive = %path.display(), "archiving output");

    let exit_code = runner.run(&invocation)?;
    let outcome = ArchiveOutcome { path, exit_code };
    if !outcome.succeeded() {
        if config.archive_failure_fatal {
            return Err(PackError::ToolFailed {
                tool: invocation.tool_name(),
                code: exit_code,
            });
        }
        warn!(?exit_code, "archiver failed; continuing");
    }
    Ok(outcome)
}
