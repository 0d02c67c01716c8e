//! Invocation of the engine's plugin packaging command.

use tracing::{info, warn};

use crate::config::PackConfig;
use crate::error::PackError;
use crate::runner::{Invocation, ToolRunner};

/// Builds the `BuildPlugin` command line for the configured plugin.
pub fn build_command(config: &PackConfig) -> Invocation {
    Invocation::new(config.run_uat())
        .arg("BuildPlugin")
        .arg(format!("-Plugin={}", config.plugin_descriptor().display()))
        .arg(format!("-Package={}", config.out_folder.display()))
        .arg("-CreateSubFolder")
        .arg(format!("-TargetPlatforms={}", config.target_platforms.join("+")))
        .arg("-Rocket")
        .args(config.extra_build_flags.iter().cloned())
        .current_dir(config.batch_files_dir())
}

/// Runs the packaging tool once. Any non-zero exit is a definitive failure.
pub fn run_build(config: &PackConfig, runner: &impl ToolRunner) -> Result<(), PackError> {
    let invocation = build_command(config);
    println!("{invocation}");
    info!(plugin = %config.plugin_descriptor().display(), "starting plugin build");

    match runner.run(&invocation)? {
        Some(0) => Ok(()),
        code => {
            warn!(?code, "plugin build failed");
            Err(PackError::ToolFailed {
                tool: invocation.tool_name(),
                code,
            })
        }
    }
}
