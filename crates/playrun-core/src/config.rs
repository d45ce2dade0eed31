//! Configuration parsing and validation
//!
//! This module handles loading the optional `playrun.yaml` project file.
//! Every key has a default, so a project without the file runs with the
//! conventional layout:
//!
//! - `tests/` - test path handed to pytest
//! - `test-results/` - report, HTML report and traces (recreated every run)
//! - `.venv/` - virtual environment created by `--setup`
//! - `wheels/` - optional pre-built packages for offline installs

use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};

use crate::error::{Error, Result};

/// Default project file name
pub const DEFAULT_CONFIG_FILE: &str = "playrun.yaml";

/// Root project configuration from `playrun.yaml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// File-system layout
    #[serde(default)]
    pub paths: PathsConfig,

    /// Test execution settings
    #[serde(default)]
    pub run: RunConfig,

    /// Environment bootstrap settings
    #[serde(default)]
    pub setup: SetupConfig,

    /// Result upload settings
    #[serde(default)]
    pub upload: UploadConfig,
}

/// File-system layout, relative to the project root
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Default test path when none is given on the command line
    #[serde(default = "default_tests")]
    pub tests: String,

    /// Results directory; also where Playwright writes traces
    #[serde(default = "default_results")]
    pub results: String,

    /// JSON report file name inside the results directory
    #[serde(default = "default_report")]
    pub report: String,

    /// HTML report file name inside the results directory
    #[serde(default = "default_html_report")]
    pub html_report: String,

    /// Virtual environment directory
    #[serde(default = "default_venv")]
    pub venv: String,

    /// Directory searched for local `*.whl` files
    #[serde(default = "default_wheels")]
    pub wheels: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            tests: default_tests(),
            results: default_results(),
            report: default_report(),
            html_report: default_html_report(),
            venv: default_venv(),
            wheels: default_wheels(),
        }
    }
}

fn default_tests() -> String {
    "tests".to_string()
}

fn default_results() -> String {
    "test-results".to_string()
}

fn default_report() -> String {
    "report.json".to_string()
}

fn default_html_report() -> String {
    "report.html".to_string()
}

fn default_venv() -> String {
    ".venv".to_string()
}

fn default_wheels() -> String {
    "wheels".to_string()
}

/// Test execution settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Number of parallel pytest workers
    #[serde(default = "default_workers")]
    pub workers: u32,

    /// Per-test timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout: u32,

    /// Browser engine passed to pytest-playwright
    #[serde(default = "default_browser")]
    pub browser: String,

    /// Playwright tracing mode
    #[serde(default = "default_tracing")]
    pub tracing: String,

    /// Interpreter override; when unset the venv interpreter is preferred
    #[serde(default)]
    pub python: Option<String>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            timeout: default_timeout(),
            browser: default_browser(),
            tracing: default_tracing(),
            python: None,
        }
    }
}

fn default_workers() -> u32 {
    10
}

fn default_timeout() -> u32 {
    30
}

fn default_browser() -> String {
    "chromium".to_string()
}

fn default_tracing() -> String {
    "retain-on-failure".to_string()
}

/// Environment bootstrap settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetupConfig {
    /// Interpreter used to create the virtual environment
    #[serde(default = "default_base_python")]
    pub base_python: String,

    /// Install the project itself in editable mode
    #[serde(default = "default_editable")]
    pub editable: bool,

    /// Packages installed from the public index when no local wheels exist
    #[serde(default = "default_plugins")]
    pub plugins: Vec<String>,
}

impl Default for SetupConfig {
    fn default() -> Self {
        Self {
            base_python: default_base_python(),
            editable: default_editable(),
            plugins: default_plugins(),
        }
    }
}

fn default_base_python() -> String {
    "python3".to_string()
}

fn default_editable() -> bool {
    true
}

fn default_plugins() -> Vec<String> {
    [
        "pytest",
        "pytest-playwright",
        "pytest-xdist",
        "pytest-timeout",
        "pytest-rerunfailures",
        "pytest-playwright-json",
        "testdino",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

/// Result upload settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Upload CLI executable
    #[serde(default = "default_upload_cli")]
    pub cli: String,

    /// Environment variable holding the API token
    #[serde(default = "default_token_env")]
    pub token_env: String,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            cli: default_upload_cli(),
            token_env: default_token_env(),
        }
    }
}

impl UploadConfig {
    /// Token from the configured environment variable, if set
    pub fn token_from_env(&self) -> Option<String> {
        std::env::var(&self.token_env).ok()
    }
}

fn default_upload_cli() -> String {
    "testdino".to_string()
}

fn default_token_env() -> String {
    "TESTDINO_TOKEN".to_string()
}

/// Main configuration container
#[derive(Debug, Clone)]
pub struct Config {
    /// Project configuration
    pub project: ProjectConfig,

    /// Project root; relative paths resolve against it
    pub base_path: PathBuf,
}

impl Config {
    /// Load configuration from a directory or a config file.
    ///
    /// Fails with [`Error::ConfigNotFound`] when the file does not exist.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let (config_path, base_path) = split_config_path(path.as_ref());

        if !config_path.exists() {
            return Err(Error::ConfigNotFound {
                path: config_path.display().to_string(),
            });
        }

        let contents = std::fs::read_to_string(&config_path)?;
        let project: ProjectConfig = if contents.trim().is_empty() {
            ProjectConfig::default()
        } else {
            serde_yaml::from_str(&contents)?
        };

        tracing::debug!("Loaded configuration from {}", config_path.display());
        Self::new(project, base_path)
    }

    /// Like [`Config::load`], but a missing file yields the defaults
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let (config_path, base_path) = split_config_path(path.as_ref());

        if config_path.exists() {
            Self::load(&config_path)
        } else {
            tracing::debug!(
                "No {} found, using default configuration",
                config_path.display()
            );
            Self::new(ProjectConfig::default(), base_path)
        }
    }

    /// Build a validated configuration rooted at `base_path`
    pub fn new(project: ProjectConfig, base_path: impl Into<PathBuf>) -> Result<Self> {
        let config = Self {
            project,
            base_path: base_path.into(),
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        let paths = &self.project.paths;
        for (key, value) in [
            ("paths.report", &paths.report),
            ("paths.html_report", &paths.html_report),
            ("paths.results", &paths.results),
        ] {
            if value.trim().is_empty() {
                return Err(Error::ConfigInvalid {
                    message: format!("{key} must not be empty"),
                });
            }
        }

        // The results dir is wiped before every run
        let root = normalize(&self.base_path);
        let results = normalize(&self.results_dir());
        if root.starts_with(&results) {
            return Err(Error::ConfigInvalid {
                message: format!(
                    "paths.results ({}) must not be the project root or one of its parents",
                    paths.results
                ),
            });
        }
        Ok(())
    }

    /// Resolve a project-relative path against the project root
    pub fn resolve(&self, path: impl AsRef<Path>) -> PathBuf {
        let path = path.as_ref();
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_path.join(path)
        }
    }

    /// Results directory (also the trace directory)
    pub fn results_dir(&self) -> PathBuf {
        self.resolve(&self.project.paths.results)
    }

    /// JSON report location
    pub fn report_path(&self) -> PathBuf {
        self.results_dir().join(&self.project.paths.report)
    }

    /// HTML report location
    pub fn html_report_path(&self) -> PathBuf {
        self.results_dir().join(&self.project.paths.html_report)
    }

    /// Virtual environment directory
    pub fn venv_dir(&self) -> PathBuf {
        self.resolve(&self.project.paths.venv)
    }

    /// Local wheels directory
    pub fn wheels_dir(&self) -> PathBuf {
        self.resolve(&self.project.paths.wheels)
    }

    /// Interpreter inside the virtual environment
    pub fn venv_python(&self) -> PathBuf {
        let venv = self.venv_dir();
        if cfg!(windows) {
            venv.join("Scripts").join("python.exe")
        } else {
            venv.join("bin").join("python")
        }
    }
}

/// Split a user-supplied path into (config file, project root)
fn split_config_path(path: &Path) -> (PathBuf, PathBuf) {
    if path.is_dir() {
        (path.join(DEFAULT_CONFIG_FILE), path.to_path_buf())
    } else {
        let base = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        (path.to_path_buf(), base)
    }
}

/// Absolute form of `path` with `.` and `..` folded away and symlinks
/// resolved on the part of it that exists
fn normalize(path: &Path) -> PathBuf {
    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    let mut lexical = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                lexical.pop();
            }
            other => lexical.push(other),
        }
    }

    let mut existing = lexical.as_path();
    let mut missing = Vec::new();
    loop {
        if let Ok(canonical) = std::fs::canonicalize(existing) {
            return missing
                .iter()
                .rev()
                .fold(canonical, |acc, name| acc.join(name));
        }
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                missing.push(name);
                existing = parent;
            }
            _ => return lexical.clone(),
        }
    }
}
