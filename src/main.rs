mod archive;
mod builder;
mod cli;
mod config;
mod error;
mod git;
mod pipeline;
mod precheck;
mod runner;
mod stamp;
mod ui;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Command};
use config::PackConfig;
use git::GitRevisionSource;
use pipeline::{BuildResult, Pipeline, Stage};
use precheck::PreconditionChecker;
use runner::SystemRunner;
use tracing_subscriber::EnvFilter;
use ui::StageProgress;

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match run(cli) {
        Ok(result) => result,
        Err(err) => {
            println!("Error: {err:#}");
            BuildResult::Failure
        }
    };
    std::process::exit(result.exit_code());
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

fn run(cli: Cli) -> Result<BuildResult> {
    let config = PackConfig::load(cli.config.as_deref())?;
    let ui = StageProgress::default();

    match cli.command {
        Command::Build { dry_run, branch } => {
            let config = config.with_revision_branch(branch);
            let revisions = GitRevisionSource::new(&config.plugin_path);
            let mut pipeline = Pipeline::new(&config, SystemRunner, revisions);
            pipeline.dry_run = dry_run;

            let report = pipeline.run();
            if cli.verbose {
                ui.print_report(&report);
            }
            Ok(report.result())
        }
        Command::Check => {
            let violations = PreconditionChecker::check_all(&config);
            if violations.is_empty() {
                ui.success("All preconditions passed");
                Ok(BuildResult::Success)
            } else {
                ui.violations(&violations);
                Ok(BuildResult::Failure)
            }
        }
        Command::Stamp { branch } => {
            let config = config.with_revision_branch(branch);
            let revisions = GitRevisionSource::new(&config.plugin_path);
            ui.stage(Stage::Stamp, "Setting BuildId and VersionName");
            let version_name = stamp::resolve_version(&config, &revisions)?;
            let outcome = stamp::stamp_output(&config, &version_name)?;
            ui.success(&format!("BuildId set in {} manifests", outcome.manifests.len()));
            ui.success(&format!(
                "VersionName {} (Version {})",
                outcome.version_name, outcome.version
            ));
            Ok(BuildResult::Success)
        }
        Command::Version { branch } => {
            let config = config.with_revision_branch(branch);
            let revisions = GitRevisionSource::new(&config.plugin_path);
            println!("{}", stamp::resolve_version(&config, &revisions)?);
            Ok(BuildResult::Success)
        }
    }
}
