//! Execution of external tools behind the [`ToolRunner`] seam.

use std::fmt;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use tracing::debug;

use crate::error::PackError;

/// A single external command: program, arguments and working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    /// Capture output instead of inheriting the terminal.
    pub quiet: bool,
}

impl Invocation {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            quiet: false,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    pub fn quiet(mut self) -> Self {
        self.quiet = true;
        self
    }

    /// Short tool name for messages (file name of the program).
    pub fn tool_name(&self) -> String {
        self.program
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.program.display().to_string())
    }
}

impl fmt::Display for Invocation {
    /// Command line as it would be typed, quoting arguments with spaces.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", quote(&self.program.display().to_string()))?;
        for arg in &self.args {
            write!(f, " {}", quote(arg))?;
        }
        Ok(())
    }
}

fn quote(s: &str) -> String {
    if s.contains(' ') || s.contains('\t') {
        format!("\"{s}\"")
    } else {
        s.to_string()
    }
}

/// Runs an external tool to completion and reports its exit code.
///
/// `Ok(None)` means the process ended without an exit code (killed by a signal).
pub trait ToolRunner {
    fn run(&self, invocation: &Invocation) -> Result<Option<i32>, PackError>;
}

/// Runs tools as real child processes, blocking until they exit.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl ToolRunner for SystemRunner {
    fn run(&self, invocation: &Invocation) -> Result<Option<i32>, PackError> {
        let mut command = Command::new(&invocation.program);
        command.args(&invocation.args);
        if let Some(cwd) = &invocation.cwd {
            command.current_dir(cwd);
        }
        debug!(command = %invocation, cwd = ?invocation.cwd, "spawning process");

        if invocation.quiet {
            let output = command.stdin(Stdio::null()).output()?;
            let stdout = String::from_utf8_lossy(&output.stdout);
            let stderr = String::from_utf8_lossy(&output.stderr);
            if !stdout.trim().is_empty() {
                debug!(stdout = %stdout.trim(), "command stdout");
            }
            if !stderr.trim().is_empty() {
                debug!(stderr = %stderr.trim(), "command stderr");
            }
            Ok(output.status.code())
        } else {
            let status = command.status()?;
            Ok(status.code())
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_quotes_arguments_with_spaces() {
        let inv = Invocation::new("C:/Epic Games/RunUAT.bat")
            .arg("BuildPlugin")
            .arg("-Plugin=C:/My Plugin/P.uplugin");
        assert_eq!(
            inv.to_string(),
            "\"C:/Epic Games/RunUAT.bat\" BuildPlugin \"-Plugin=C:/My Plugin/P.uplugin\""
        );
    }

    #[test]
    fn tool_name_is_file_name() {
        let inv = Invocation::new("/opt/engine/RunUAT.sh");
        assert_eq!(inv.tool_name(), "RunUAT.sh");
    }

    #[cfg(unix)]
    #[test]
    fn system_runner_reports_exit_codes() {
        let ok = Invocation::new("sh").args(["-c", "exit 0"]).quiet();
        assert_eq!(SystemRunner.run(&ok).unwrap(), Some(0));

        let failed = Invocation::new("sh").args(["-c", "exit 3"]).quiet();
        assert_eq!(SystemRunner.run(&failed).unwrap(), Some(3));
    }

    #[cfg(unix)]
    #[test]
    fn system_runner_honours_working_directory() {
        let tmp = tempfile::TempDir::new().unwrap();
        let inv = Invocation::new("sh")
            .args(["-c", "touch marker"])
            .current_dir(tmp.path())
            .quiet();
        assert_eq!(SystemRunner.run(&inv).unwrap(), Some(0));
        assert!(tmp.path().join("marker").exists());
    }

    #[test]
    fn system_runner_errors_on_missing_program() {
        let inv = Invocation::new("/definitely/not/a/program").quiet();
        assert!(matches!(SystemRunner.run(&inv), Err(PackError::Io(_))));
    }
}
