//! playrun CLI
//!
//! Runs a Playwright pytest suite, prints a summary of the JSON report and
//! optionally uploads the results to TestDino.

use anyhow::Result;
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use std::process::ExitCode;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod run;

/// playrun - Playwright test runner with TestDino upload
#[derive(Parser, Debug)]
#[command(name = "playrun")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Test file or directory [default: tests]
    test_path: Option<String>,

    /// Further positional tokens; only the first one is used
    #[arg(hide = true)]
    extra_paths: Vec<String>,

    /// Create the virtual environment and install dependencies first
    #[arg(long)]
    setup: bool,

    /// Upload results to TestDino (needs TESTDINO_TOKEN)
    #[arg(long)]
    upload: bool,

    /// Run browsers with a visible window
    #[arg(long)]
    headed: bool,

    /// Number of parallel workers [default: 10]
    #[arg(short, long, value_name = "N")]
    workers: Option<u32>,

    /// Per-test timeout in seconds [default: 30]
    #[arg(short, long, value_name = "SECONDS")]
    timeout: Option<u32>,

    /// Configuration file path [default: playrun.yaml]
    #[arg(short, long, value_name = "FILE")]
    config: Option<String>,

    /// Exit with pytest's exit code when tests fail
    #[arg(long)]
    fail_on_test_failure: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

/// Parse arguments; on a usage error print the full help and exit 2
fn parse_args() -> Cli {
    match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => e.exit(),
        Err(e) => {
            let _ = e.print();
            eprintln!();
            let _ = Cli::command().write_long_help(&mut std::io::stderr());
            std::process::exit(2);
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // .env is loaded before anything reads the environment
    let dotenv = dotenvy::from_path(".env");

    let cli = parse_args();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    match dotenv {
        Ok(()) => tracing::debug!("Loaded environment from .env"),
        Err(e) if e.not_found() => {}
        Err(e) => tracing::warn!("Ignoring .env: {}", e),
    }

    run::run(&cli).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_no_flags() {
        let cli = Cli::try_parse_from(["playrun"]).unwrap();
        assert_eq!(cli.test_path, None);
        assert!(!cli.setup && !cli.upload && !cli.headed);
        assert_eq!(cli.workers, None);
        assert_eq!(cli.timeout, None);
    }

    #[test]
    fn test_all_flags() {
        let cli = Cli::try_parse_from([
            "playrun",
            "--setup",
            "--upload",
            "--headed",
            "--workers",
            "4",
            "-t",
            "120",
            "tests/test_login.py",
        ])
        .unwrap();
        assert!(cli.setup && cli.upload && cli.headed);
        assert_eq!(cli.workers, Some(4));
        assert_eq!(cli.timeout, Some(120));
        assert_eq!(cli.test_path.as_deref(), Some("tests/test_login.py"));
    }

    #[test]
    fn test_workers_not_range_checked() {
        let cli = Cli::try_parse_from(["playrun", "-w", "0", "--timeout", "0"]).unwrap();
        assert_eq!(cli.workers, Some(0));
        assert_eq!(cli.timeout, Some(0));
    }

    #[rstest]
    #[case(&["playrun", "--bogus"], ErrorKind::UnknownArgument)]
    #[case(&["playrun", "-x"], ErrorKind::UnknownArgument)]
    #[case(&["playrun", "--workers", "many"], ErrorKind::ValueValidation)]
    fn test_usage_errors(#[case] args: &[&str], #[case] kind: ErrorKind) {
        let err = Cli::try_parse_from(args).unwrap_err();
        assert_eq!(err.kind(), kind);
    }

    #[rstest]
    #[case(&["playrun", "tests/a.py", "tests/b.py"])]
    #[case(&["playrun", "tests/a.py", "--headed", "tests/b.py", "tests/c.py"])]
    fn test_first_positional_wins(#[case] args: &[&str]) {
        let cli = Cli::try_parse_from(args).unwrap();
        assert_eq!(cli.test_path.as_deref(), Some("tests/a.py"));
        assert!(cli.extra_paths.iter().all(|p| p != "tests/a.py"));
    }

    #[test]
    fn test_flag_after_extra_paths_still_parsed() {
        let cli = Cli::try_parse_from(["playrun", "smoke", "more", "--workers", "2"]).unwrap();
        assert_eq!(cli.test_path.as_deref(), Some("smoke"));
        assert_eq!(cli.extra_paths, ["more"]);
        assert_eq!(cli.workers, Some(2));
    }
}
