//! Virtual-environment bootstrap
//!
//! Brings the project's Python environment to a runnable state:
//!
//! 1. create the venv (skipped when it already exists)
//! 2. upgrade pip
//! 3. install the project in editable mode (when it is a package)
//! 4. install the pytest plugins, from local wheels when present
//! 5. install the Playwright browser
//!
//! The first failing step aborts the bootstrap. Nothing is rolled back.

use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::error::Result;
use crate::process::{CommandRunner, CommandSpec, run_step};

/// Where the plugin packages come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PluginSource {
    /// Pre-built wheel files found in the wheels directory
    LocalWheels(Vec<PathBuf>),
    /// The public package index
    Index(Vec<String>),
}

/// Runs the bootstrap steps for one project
pub struct Bootstrapper<'a> {
    config: &'a Config,
    runner: &'a dyn CommandRunner,
}

impl<'a> Bootstrapper<'a> {
    /// Create a bootstrapper for `config`
    pub fn new(config: &'a Config, runner: &'a dyn CommandRunner) -> Self {
        Self { config, runner }
    }

    /// Run every step, stopping at the first failure
    pub async fn run(&self) -> Result<()> {
        let setup = &self.config.project.setup;
        let venv = self.config.venv_dir();
        let python = self.config.venv_python();

        if python.exists() {
            tracing::info!("Virtual environment exists at {}", venv.display());
        } else {
            let spec = CommandSpec::new(&setup.base_python)
                .args(["-m", "venv"])
                .path_arg(&venv)
                .current_dir(&self.config.base_path);
            run_step(self.runner, "Creating virtual environment", &spec).await?;
        }

        let pip = || self.pip(&python);

        run_step(
            self.runner,
            "Upgrading pip",
            &pip().args(["install", "--upgrade", "pip"]),
        )
        .await?;

        if setup.editable && is_python_project(&self.config.base_path) {
            let spec = pip()
                .args(["install", "-e"])
                .path_arg(&self.config.base_path);
            run_step(self.runner, "Installing project (editable)", &spec).await?;
        } else {
            tracing::debug!("Skipping editable install: no pyproject.toml or setup.py");
        }

        let spec = match self.plugin_source()? {
            PluginSource::LocalWheels(wheels) => {
                tracing::info!(
                    "Found {} local wheel(s) in {}",
                    wheels.len(),
                    self.config.wheels_dir().display()
                );
                let mut spec = pip()
                    .args(["install", "--no-index", "--find-links"])
                    .path_arg(self.config.wheels_dir());
                for wheel in &wheels {
                    spec = spec.path_arg(wheel);
                }
                spec
            }
            PluginSource::Index(packages) => pip().arg("install").args(packages),
        };
        run_step(self.runner, "Installing test plugins", &spec).await?;

        let spec = CommandSpec::new(python.display().to_string())
            .args(["-m", "playwright", "install"])
            .arg(&self.config.project.run.browser)
            .current_dir(&self.config.base_path);
        run_step(self.runner, "Installing Playwright browser", &spec).await?;

        tracing::info!("✓ Environment ready");
        Ok(())
    }

    /// Local wheels win over the package index
    pub fn plugin_source(&self) -> Result<PluginSource> {
        let wheels = find_wheels(&self.config.wheels_dir())?;
        if wheels.is_empty() {
            Ok(PluginSource::Index(self.config.project.setup.plugins.clone()))
        } else {
            Ok(PluginSource::LocalWheels(wheels))
        }
    }

    fn pip(&self, python: &Path) -> CommandSpec {
        CommandSpec::new(python.display().to_string())
            .args(["-m", "pip"])
            .current_dir(&self.config.base_path)
    }
}

fn is_python_project(root: &Path) -> bool {
    root.join("pyproject.toml").exists() || root.join("setup.py").exists()
}

/// `*.whl` files directly inside `dir`, sorted by path
fn find_wheels(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Ok(vec![]);
    }

    let mut wheels = Vec::new();
    for entry in walkdir::WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry.map_err(std::io::Error::from)?;
        if entry.file_type().is_file() && entry.path().extension().is_some_and(|ext| ext == "whl")
        {
            wheels.push(entry.into_path());
        }
    }
    wheels.sort();
    Ok(wheels)
}
