//! playrun Core Library
//!
//! This crate provides everything behind the `playrun` binary:
//! - Project configuration (`playrun.yaml`)
//! - Virtual-environment bootstrap
//! - pytest execution and the JSON report summary
//! - Upload of results through the TestDino CLI
//!
//! # Architecture
//!
//! ```text
//! ┌─────────┐     ┌─────────┐     ┌─────────┐     ┌─────────┐
//! │ [Setup] │────▶│ Execute │────▶│ Summary │────▶│[Upload] │
//! │  (pip)  │     │(pytest) │     │ (JSON)  │     │(testdino)│
//! └─────────┘     └─────────┘     └─────────┘     └─────────┘
//! ```
//!
//! External programs are only ever started through a [`CommandRunner`], so
//! every phase can be driven by a fake runner in tests.
//!
//! # Example
//!
//! ```rust,ignore
//! use playrun_core::{Config, Pipeline, RunOptions, SystemRunner};
//!
//! let config = Config::load_or_default("playrun.yaml")?;
//! let options = RunOptions::from_config(&config);
//! let report = Pipeline::new(&config, &SystemRunner)
//!     .run(&options, |stats| println!("{stats}"))
//!     .await?;
//! assert!(report.upload.is_none());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod bootstrap;
pub mod config;
pub mod error;
pub mod executor;
pub mod pipeline;
pub mod process;
pub mod report;
pub mod upload;

#[cfg(test)]
mod test_support;

pub use config::{Config, ProjectConfig};
pub use error::{Error, Result};
pub use pipeline::{Pipeline, RunOptions, RunReport};
pub use process::{CommandRunner, CommandSpec, RunStatus, SystemRunner};
pub use report::Stats;
pub use upload::UploadOutcome;
