//! Read-only checks that gate the build.

use tracing::debug;

use crate::config::PackConfig;
use crate::error::PreconditionViolation;

/// Verifies the environment before any build resource is touched.
pub struct PreconditionChecker;

impl PreconditionChecker {
    /// Returns the first violation found, in check order.
    pub fn check(config: &PackConfig) -> Result<(), PreconditionViolation> {
        match Self::check_all(config).into_iter().next() {
            Some(violation) => Err(violation),
            None => Ok(()),
        }
    }

    /// Runs every check and collects all violations.
    ///
    /// Order: existing installs (binary runtime, binary top-level, source
    /// runtime, source top-level), stale IDE user settings, IDE Engine folder.
    pub fn check_all(config: &PackConfig) -> Vec<PreconditionViolation> {
        let mut violations = Vec::new();

        for dir in config.installed_plugin_dirs() {
            debug!(path = %dir.display(), "checking for installed plugin");
            if dir.exists() {
                violations.push(PreconditionViolation::PluginAlreadyInstalled(dir));
            }
        }

        let ide_dir = config.ide_dir();
        let user_settings = ide_dir.join(&config.ide_user_settings);
        if user_settings.exists() {
            violations.push(PreconditionViolation::StaleIdeSettings(user_settings));
        }

        let ide_engine = ide_dir.join("Engine");
        if !ide_engine.is_dir() {
            violations.push(PreconditionViolation::MissingIdeEngine(ide_engine));
        }

        violations
    }
}
