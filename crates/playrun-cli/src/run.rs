//! Run the test pipeline

use anyhow::{Context, Result};
use std::process::ExitCode;

use playrun_core::config::DEFAULT_CONFIG_FILE;
use playrun_core::upload::UPLOAD_STEP;
use playrun_core::{Config, Error, Pipeline, RunOptions, SystemRunner, UploadOutcome};

use crate::Cli;

/// Run the pipeline and decide the process exit code
pub async fn run(cli: &Cli) -> Result<ExitCode> {
    let config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from {}", path);
            Config::load(path)
        }
        None => Config::load_or_default(DEFAULT_CONFIG_FILE),
    }
    .context("Failed to load configuration")?;

    let options = run_options(cli, &config);

    let result = Pipeline::new(&config, &SystemRunner)
        .run(&options, |stats| println!("\n{stats}\n"))
        .await;

    let report = match result {
        Ok(report) => report,
        Err(Error::StepFailed { step, code }) if step == UPLOAD_STEP => {
            tracing::error!("Upload failed (exit code {:?})", code);
            return Ok(exit_code(code));
        }
        Err(e) => return Err(e).context("Test run failed"),
    };

    if report.upload == Some(UploadOutcome::Skipped) {
        tracing::info!("Upload skipped");
    }

    if cli.fail_on_test_failure && !report.test_status.success() {
        return Ok(exit_code(report.test_status.code));
    }
    Ok(ExitCode::SUCCESS)
}

/// Command-line flags override the configuration
fn run_options(cli: &Cli, config: &Config) -> RunOptions {
    let mut options = RunOptions::from_config(config);
    options.setup = cli.setup;
    options.upload = cli.upload;
    options.execute.headed = cli.headed;

    if let Some(path) = &cli.test_path {
        options.execute.test_path = path.clone();
    }
    if !cli.extra_paths.is_empty() {
        tracing::debug!("Ignoring extra test paths: {}", cli.extra_paths.join(" "));
    }
    if let Some(workers) = cli.workers {
        options.execute.workers = workers;
    }
    if let Some(timeout) = cli.timeout {
        options.execute.timeout = timeout;
    }
    if cli.upload {
        options.token = config.project.upload.token_from_env();
    }
    options
}

fn exit_code(code: Option<i32>) -> ExitCode {
    ExitCode::from(failure_code(code))
}

/// Map a child's exit code onto ours; signals and odd codes become 1
fn failure_code(code: Option<i32>) -> u8 {
    match code.and_then(|c| u8::try_from(c).ok()) {
        Some(c) if c != 0 => c,
        _ => 1,
    }
}
