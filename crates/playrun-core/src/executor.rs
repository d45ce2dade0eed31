//! pytest execution
//!
//! Recreates the results directory, runs pytest with the Playwright JSON and
//! HTML reporters, and checks that the JSON report was written. Test
//! failures are not errors here: pytest's exit status is returned to the
//! caller, and only a missing report fails the phase.

use std::path::Path;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::process::{CommandRunner, CommandSpec, RunStatus};

/// Per-run settings taken from the command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecuteOptions {
    /// Test file or directory handed to pytest
    pub test_path: String,
    /// Parallel workers (`-n`)
    pub workers: u32,
    /// Per-test timeout in seconds
    pub timeout: u32,
    /// Show the browser window
    pub headed: bool,
}

/// Runs the test suite for one project
pub struct TestExecutor<'a> {
    config: &'a Config,
    runner: &'a dyn CommandRunner,
}

impl<'a> TestExecutor<'a> {
    /// Create an executor for `config`
    pub fn new(config: &'a Config, runner: &'a dyn CommandRunner) -> Self {
        Self { config, runner }
    }

    /// Run pytest and return its exit status.
    ///
    /// Fails with [`Error::ReportMissing`] when no JSON report exists
    /// afterwards, whatever pytest's own status was.
    pub async fn run(&self, options: &ExecuteOptions) -> Result<RunStatus> {
        let results = self.config.results_dir();
        reset_dir(&results)?;

        let spec = self.command(options);
        tracing::info!(
            "Running tests in {} ({} workers, {}s timeout{})",
            options.test_path,
            options.workers,
            options.timeout,
            if options.headed { ", headed" } else { "" }
        );
        tracing::debug!("  {}", spec);

        let status = self.runner.run(&spec).await?;
        if status.success() {
            tracing::info!("pytest finished");
        } else {
            tracing::info!("pytest finished with {:?}; see summary", status.code);
        }

        let report = self.config.report_path();
        if !report.exists() {
            return Err(Error::ReportMissing { path: report });
        }

        Ok(status)
    }

    /// Build the pytest invocation
    pub fn command(&self, options: &ExecuteOptions) -> CommandSpec {
        let run = &self.config.project.run;
        let results = self.config.results_dir();

        let mut spec = CommandSpec::new(self.python())
            .args(["-m", "pytest"])
            .arg(&options.test_path)
            .arg(format!(
                "--playwright-json={}",
                self.config.report_path().display()
            ))
            .arg(format!(
                "--playwright-html={}",
                self.config.html_report_path().display()
            ))
            .arg("-n")
            .arg(options.workers.to_string())
            .arg(format!("--timeout={}", options.timeout))
            .args(["--browser", run.browser.as_str()])
            .args(["--tracing", run.tracing.as_str()])
            .arg("--output")
            .path_arg(&results)
            .current_dir(&self.config.base_path);

        if options.headed {
            spec = spec.arg("--headed");
        }
        spec
    }

    /// Explicit interpreter, then the venv, then `python3` from `PATH`
    fn python(&self) -> String {
        if let Some(python) = &self.config.project.run.python {
            return python.clone();
        }
        let venv_python = self.config.venv_python();
        if venv_python.exists() {
            venv_python.display().to_string()
        } else {
            "python3".to_string()
        }
    }
}

/// Remove `dir` and everything in it, then recreate it empty
fn reset_dir(dir: &Path) -> Result<()> {
    if dir.exists() {
        tracing::debug!("Clearing {}", dir.display());
        std::fs::remove_dir_all(dir)?;
    }
    std::fs::create_dir_all(dir)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProjectConfig;
    use crate::test_support::RecordingRunner;
    use rstest::rstest;
    use std::path::PathBuf;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn options() -> ExecuteOptions {
        ExecuteOptions {
            test_path: "tests".to_string(),
            workers: 10,
            timeout: 30,
            headed: false,
        }
    }

    fn writes_report(report: PathBuf) -> impl Fn(&CommandSpec) + Send + Sync + 'static {
        move |_: &CommandSpec| std::fs::write(&report, r#"{"stats":{}}"#).unwrap()
    }

    #[rstest]
    #[case(false)]
    #[case(true)]
    fn test_command_line(#[case] headed: bool) {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::new(ProjectConfig::default(), dir.path()).unwrap();
        let runner = RecordingRunner::new();
        let executor = TestExecutor::new(&config, &runner);

        let spec = executor.command(&ExecuteOptions {
            headed,
            workers: 4,
            timeout: 90,
            ..options()
        });

        assert_eq!(spec.program, "python3");
        assert_eq!(spec.args[..3], ["-m", "pytest", "tests"]);
        assert_eq!(spec.value_of("-n"), Some("4"));
        assert!(spec.args.contains(&"--timeout=90".to_string()));
        assert_eq!(spec.value_of("--browser"), Some("chromium"));
        assert_eq!(spec.value_of("--tracing"), Some("retain-on-failure"));
        let json_flag = format!("--playwright-json={}", config.report_path().display());
        assert!(spec.args.contains(&json_flag));
        assert_eq!(spec.position("--headed").is_some(), headed);
        assert_eq!(spec.current_dir.as_deref(), Some(dir.path()));
    }

    #[test]
    fn test_python_preference() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::new(ProjectConfig::default(), dir.path()).unwrap();
        let runner = RecordingRunner::new();
        assert_eq!(TestExecutor::new(&config, &runner).python(), "python3");

        let venv_python = config.venv_python();
        std::fs::create_dir_all(venv_python.parent().unwrap()).unwrap();
        std::fs::write(&venv_python, "").unwrap();
        assert_eq!(
            TestExecutor::new(&config, &runner).python(),
            venv_python.display().to_string()
        );

        let mut project = ProjectConfig::default();
        project.run.python = Some("/usr/bin/python3.12".to_string());
        let config = Config::new(project, dir.path()).unwrap();
        assert_eq!(
            TestExecutor::new(&config, &runner).python(),
            "/usr/bin/python3.12"
        );
    }

    #[tokio::test]
    async fn test_failing_tests_are_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::new(ProjectConfig::default(), dir.path()).unwrap();
        let runner = RecordingRunner::new()
            .fail_when("pytest", 1)
            .on_run(writes_report(config.report_path()));

        let status = TestExecutor::new(&config, &runner)
            .run(&options())
            .await
            .unwrap();
        assert_eq!(status.code, Some(1));
    }

    #[tokio::test]
    async fn test_missing_report_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::new(ProjectConfig::default(), dir.path()).unwrap();
        let runner = RecordingRunner::new();

        let err = TestExecutor::new(&config, &runner)
            .run(&options())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ReportMissing { path } if path == config.report_path()));
    }

    #[tokio::test]
    async fn test_results_dir_is_emptied_before_run() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::new(ProjectConfig::default(), dir.path()).unwrap();
        let stale = config.results_dir().join("traces").join("old.zip");
        std::fs::create_dir_all(stale.parent().unwrap()).unwrap();
        std::fs::write(&stale, "old").unwrap();

        let results = config.results_dir();
        let seen_empty = Arc::new(AtomicBool::new(false));
        let flag = seen_empty.clone();
        let runner = RecordingRunner::new()
            .on_run(move |_| {
                let empty = std::fs::read_dir(&results).unwrap().next().is_none();
                flag.store(empty, Ordering::SeqCst);
            })
            .on_run(writes_report(config.report_path()));

        TestExecutor::new(&config, &runner)
            .run(&options())
            .await
            .unwrap();

        assert!(seen_empty.load(Ordering::SeqCst));
        assert!(!stale.exists());
    }
}
