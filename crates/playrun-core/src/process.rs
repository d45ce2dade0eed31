//! External command model
//!
//! Every program playrun starts (python, pip, pytest, the upload CLI) is
//! described by a [`CommandSpec`] and executed through a [`CommandRunner`].
//! [`SystemRunner`] is the real implementation; tests substitute their own.

use async_trait::async_trait;
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use tokio::process::Command;

use crate::error::{Error, Result};

/// A program invocation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandSpec {
    /// Program to execute
    pub program: String,

    /// Arguments, in order
    pub args: Vec<String>,

    /// Working directory, inherited when `None`
    pub current_dir: Option<PathBuf>,

    /// Indices into `args` that are masked when displayed
    secret_args: BTreeSet<usize>,
}

impl CommandSpec {
    /// Start a new invocation of `program`
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Default::default()
        }
    }

    /// Append one argument
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Append a path argument
    pub fn path_arg(self, path: impl AsRef<Path>) -> Self {
        let arg = path.as_ref().display().to_string();
        self.arg(arg)
    }

    /// Append an argument that must never appear in logs
    pub fn secret_arg(mut self, arg: impl Into<String>) -> Self {
        self.secret_args.insert(self.args.len());
        self.args.push(arg.into());
        self
    }

    /// Run the child in `dir`
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    /// Whether the argument at `index` is masked
    pub fn is_secret(&self, index: usize) -> bool {
        self.secret_args.contains(&index)
    }

    /// Position of the first argument equal to `flag`
    pub fn position(&self, flag: &str) -> Option<usize> {
        self.args.iter().position(|a| a == flag)
    }

    /// Value following `flag`, if both are present
    pub fn value_of(&self, flag: &str) -> Option<&str> {
        self.position(flag)
            .and_then(|i| self.args.get(i + 1))
            .map(String::as_str)
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for (i, arg) in self.args.iter().enumerate() {
            if self.is_secret(i) {
                write!(f, " ***")?;
            } else if arg.is_empty() || arg.contains(char::is_whitespace) {
                write!(f, " {arg:?}")?;
            } else {
                write!(f, " {arg}")?;
            }
        }
        Ok(())
    }
}

/// How a child process ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunStatus {
    /// Exit code; `None` when the process was killed by a signal
    pub code: Option<i32>,
}

impl RunStatus {
    /// Status for a process that exited with `code`
    pub fn exited(code: i32) -> Self {
        Self { code: Some(code) }
    }

    /// Whether the process exited with code 0
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

impl From<ExitStatus> for RunStatus {
    fn from(status: ExitStatus) -> Self {
        Self {
            code: status.code(),
        }
    }
}

/// Executes external commands
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `spec` to completion and report how it ended.
    ///
    /// A non-zero exit is not an error at this level; only failing to start
    /// the program is.
    async fn run(&self, spec: &CommandSpec) -> Result<RunStatus>;
}

/// Runs commands as real child processes with inherited stdio
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn run(&self, spec: &CommandSpec) -> Result<RunStatus> {
        tracing::debug!("Running: {}", spec);

        let mut command = Command::new(&spec.program);
        command
            .args(&spec.args)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());
        if let Some(dir) = &spec.current_dir {
            command.current_dir(dir);
        }

        let status = command.status().await.map_err(|source| Error::Spawn {
            program: spec.program.clone(),
            source,
        })?;

        tracing::debug!("{} exited with {:?}", spec.program, status.code());
        Ok(status.into())
    }
}

/// Run one step and fail the phase when it exits unsuccessfully
pub async fn run_step(runner: &dyn CommandRunner, step: &str, spec: &CommandSpec) -> Result<()> {
    tracing::info!("{}", step);
    tracing::debug!("  {}", spec);

    let status = runner.run(spec).await?;
    if !status.success() {
        return Err(Error::StepFailed {
            step: step.to_string(),
            code: status.code,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_masks_secrets() {
        let spec = CommandSpec::new("testdino")
            .args(["upload", "report.json", "--token"])
            .secret_arg("s3cr3t");
        assert_eq!(spec.to_string(), "testdino upload report.json --token ***");
        assert_eq!(spec.value_of("--token"), Some("s3cr3t"));
    }

    #[test]
    fn test_display_quotes_whitespace() {
        let spec = CommandSpec::new("python").arg("-m").arg("my tests");
        assert_eq!(spec.to_string(), "python -m \"my tests\"");
    }

    #[test]
    fn test_run_status() {
        assert!(RunStatus::exited(0).success());
        assert!(!RunStatus::exited(1).success());
        assert!(!RunStatus { code: None }.success());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_system_runner_reports_exit_code() {
        let spec = CommandSpec::new("sh").args(["-c", "exit 3"]);
        let status = SystemRunner.run(&spec).await.unwrap();
        assert_eq!(status.code, Some(3));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_system_runner_runs_in_dir() {
        let dir = tempfile::tempdir().unwrap();
        let spec = CommandSpec::new("sh")
            .args(["-c", "printf %s \"$1\" > out.txt", "sh", "hello"])
            .current_dir(dir.path());
        let status = SystemRunner.run(&spec).await.unwrap();
        assert!(status.success());
        let written = std::fs::read_to_string(dir.path().join("out.txt")).unwrap();
        assert_eq!(written, "hello");
    }

    #[tokio::test]
    async fn test_system_runner_spawn_failure() {
        let spec = CommandSpec::new("playrun-no-such-program-xyz");
        let err = SystemRunner.run(&spec).await.unwrap_err();
        assert!(matches!(err, Error::Spawn { .. }));
    }
}
