//! Result upload through the TestDino CLI
//!
//! Without a token the upload is skipped, not failed. With one, the CLI is
//! called once with the report, the trace directory and, when it exists, the
//! HTML report. A failing upload is reported with the CLI's own exit code.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::process::{CommandRunner, CommandSpec};

/// Step name reported when the upload CLI fails
pub const UPLOAD_STEP: &str = "upload";

/// What the upload phase did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadOutcome {
    /// No token was configured
    Skipped,
    /// The upload CLI exited successfully
    Uploaded,
}

/// Sends results to TestDino
pub struct Uploader<'a> {
    config: &'a Config,
    runner: &'a dyn CommandRunner,
}

impl<'a> Uploader<'a> {
    /// Create an uploader for `config`
    pub fn new(config: &'a Config, runner: &'a dyn CommandRunner) -> Self {
        Self { config, runner }
    }

    /// Upload the current results, or skip when `token` is absent or empty
    pub async fn run(&self, token: Option<&str>) -> Result<UploadOutcome> {
        let Some(token) = token.filter(|t| !t.trim().is_empty()) else {
            tracing::info!(
                "{} is not set, skipping upload",
                self.config.project.upload.token_env
            );
            return Ok(UploadOutcome::Skipped);
        };

        let spec = self.command(token);
        tracing::info!("Uploading results to TestDino");
        tracing::debug!("  {}", spec);

        let status = self.runner.run(&spec).await?;
        if !status.success() {
            return Err(Error::StepFailed {
                step: UPLOAD_STEP.to_string(),
                code: status.code,
            });
        }

        tracing::info!("✓ Results uploaded");
        Ok(UploadOutcome::Uploaded)
    }

    /// Build the upload invocation
    pub fn command(&self, token: &str) -> CommandSpec {
        let mut spec = CommandSpec::new(&self.config.project.upload.cli)
            .arg("upload")
            .path_arg(self.config.report_path())
            .arg("--trace-dir")
            .path_arg(self.config.results_dir())
            .arg("--token")
            .secret_arg(token)
            .current_dir(&self.config.base_path);

        let html = self.config.html_report_path();
        if html.exists() {
            spec = spec.arg("--html").path_arg(html);
        } else {
            tracing::debug!("No HTML report at {}", html.display());
        }
        spec
    }
}
