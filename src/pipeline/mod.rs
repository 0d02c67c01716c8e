//! The packaging pipeline: precheck, build, stamp, archive.
//!
//! Every stage takes the shared [`PackConfig`] and reports into a
//! [`BuildReport`]. Stamping and archiving only run after a successful build,
//! and the build only runs after every precondition passes and the version
//! string has been resolved.

mod stage;

pub use stage::{BuildReport, BuildResult, Stage};

use tracing::{error, info};

use crate::archive::create_archive;
use crate::builder::{build_command, run_build};
use crate::config::PackConfig;
use crate::error::PackError;
use crate::git::RevisionSource;
use crate::precheck::PreconditionChecker;
use crate::runner::ToolRunner;
use crate::stamp::{resolve_version, stamp_output};
use crate::ui::StageProgress;

/// Drives one packaging run through every stage.
pub struct Pipeline<'a, R, V> {
    config: &'a PackConfig,
    runner: R,
    revisions: V,
    ui: StageProgress,
    /// Print the build command and stop before touching anything.
    pub dry_run: bool,
}

impl<'a, R: ToolRunner, V: RevisionSource> Pipeline<'a, R, V> {
    pub fn new(config: &'a PackConfig, runner: R, revisions: V) -> Self {
        Self {
            config,
            runner,
            revisions,
            ui: StageProgress::default(),
            dry_run: false,
        }
    }

    /// Runs all stages, stopping at the first failure.
    pub fn run(&self) -> BuildReport {
        let mut report = BuildReport::new();
        match self.run_stages(&mut report) {
            Ok(()) => {
                self.ui.success("Build Success");
                info!(
                    version = ?report.version_name,
                    duration_ms = ?report.duration_ms(),
                    "packaging finished"
                );
            }
            Err(err) => {
                self.ui.failure(report.stage, &err.to_string());
                if err.is_data_integrity() {
                    self.ui.warn(&format!(
                        "{} may be partially stamped; do not ship it",
                        self.config.out_folder.display()
                    ));
                }
                error!(stage = %report.stage, error = %err, "packaging aborted");
                report.fail(&err);
            }
        }
        report
    }

    fn run_stages(&self, report: &mut BuildReport) -> Result<(), PackError> {
        self.ui.stage(Stage::Precheck, "Checking environment");
        PreconditionChecker::check(self.config)?;
        let version_name = resolve_version(self.config, &self.revisions)?;
        info!(%version_name, "resolved version");
        report.version_name = Some(version_name.clone());
        report.advance();

        if self.dry_run {
            self.ui.stage(Stage::Build, "Dry run, not building");
            println!("{}", build_command(self.config));
            report.dry_run = true;
            report.finished_at = Some(chrono::Utc::now());
            return Ok(());
        }

        self.ui.stage(Stage::Build, "Building plugin");
        run_build(self.config, &self.runner)?;
        report.advance();

        self.ui.stage(Stage::Stamp, "Setting BuildId and VersionName");
        let stamped = stamp_output(self.config, &version_name)?;
        report.version = Some(stamped.version);
        report.advance();

        self.ui.stage(Stage::Archive, "Archiving");
        let spinner = self.ui.spinner(format!("{} a -r", self.config.archiver));
        let archived = create_archive(self.config, &stamped.version_name, &self.runner);
        spinner.finish_and_clear();
        if let Err(PackError::ToolFailed { code, .. }) = &archived {
            report.archive_exit_code = *code;
        }
        let archived = archived?;
        report.archive_exit_code = archived.exit_code;
        report.archive = Some(archived.path.clone());
        if !archived.succeeded() {
            self.ui.warn(&format!(
                "archiver exited with {:?}; archive may be incomplete",
                archived.exit_code
            ));
        }
        report.advance();

        Ok(())
    }
}
