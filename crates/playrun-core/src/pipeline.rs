//! Run orchestration
//!
//! ```text
//! [Setup]? -> Execute -> Summary -> [Upload]? -> Done
//! ```
//!
//! Phases run strictly one after another. Setup and upload failures abort
//! the run; failing tests do not.

use crate::bootstrap::Bootstrapper;
use crate::config::Config;
use crate::error::Result;
use crate::executor::{ExecuteOptions, TestExecutor};
use crate::process::{CommandRunner, RunStatus};
use crate::report::Stats;
use crate::upload::{UploadOutcome, Uploader};

/// Everything a single run needs beyond the project configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    /// Bootstrap the environment first
    pub setup: bool,
    /// Upload results afterwards
    pub upload: bool,
    /// API token for the upload; only consulted when `upload` is set
    pub token: Option<String>,
    /// pytest settings
    pub execute: ExecuteOptions,
}

impl RunOptions {
    /// Options with every value taken from the configuration
    pub fn from_config(config: &Config) -> Self {
        let project = &config.project;
        Self {
            setup: false,
            upload: false,
            token: None,
            execute: ExecuteOptions {
                test_path: project.paths.tests.clone(),
                workers: project.run.workers,
                timeout: project.run.timeout,
                headed: false,
            },
        }
    }
}

/// Result of a completed run
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    /// pytest's exit status
    pub test_status: RunStatus,
    /// Summary read from the JSON report
    pub stats: Stats,
    /// `None` when upload was not requested
    pub upload: Option<UploadOutcome>,
}

/// Sequences the phases of a run
pub struct Pipeline<'a> {
    config: &'a Config,
    runner: &'a dyn CommandRunner,
}

impl<'a> Pipeline<'a> {
    /// Create a pipeline for `config`
    pub fn new(config: &'a Config, runner: &'a dyn CommandRunner) -> Self {
        Self { config, runner }
    }

    /// Run all requested phases.
    ///
    /// `on_summary` is called with the report summary right after the tests,
    /// before any upload starts.
    pub async fn run(
        &self,
        options: &RunOptions,
        mut on_summary: impl FnMut(&Stats),
    ) -> Result<RunReport> {
        if options.setup {
            Bootstrapper::new(self.config, self.runner).run().await?;
        }

        let test_status = TestExecutor::new(self.config, self.runner)
            .run(&options.execute)
            .await?;

        let stats = Stats::read(self.config.report_path())?;
        if stats.has_failures() {
            tracing::warn!("{} test(s) failed", stats.unexpected);
        }
        on_summary(&stats);

        let upload = if options.upload {
            let outcome = Uploader::new(self.config, self.runner)
                .run(options.token.as_deref())
                .await?;
            Some(outcome)
        } else {
            None
        };

        Ok(RunReport {
            test_status,
            stats,
            upload,
        })
    }
}
