//! Fake command runner shared by the unit tests

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::Result;
use crate::process::{CommandRunner, CommandSpec, RunStatus};

type Hook = Box<dyn Fn(&CommandSpec) + Send + Sync>;

/// Records every command and answers with scripted exit codes
#[derive(Default)]
pub struct RecordingRunner {
    pub calls: Mutex<Vec<CommandSpec>>,
    exit_codes: HashMap<String, i32>,
    hooks: Vec<Hook>,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Commands whose args contain `needle` exit with `code`
    pub fn fail_when(mut self, needle: &str, code: i32) -> Self {
        self.exit_codes.insert(needle.to_string(), code);
        self
    }

    /// Run `hook` for every command, e.g. to fake files a tool would write
    pub fn on_run(mut self, hook: impl Fn(&CommandSpec) + Send + Sync + 'static) -> Self {
        self.hooks.push(Box::new(hook));
        self
    }

    pub fn calls(&self) -> Vec<CommandSpec> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CommandRunner for RecordingRunner {
    async fn run(&self, spec: &CommandSpec) -> Result<RunStatus> {
        self.calls.lock().unwrap().push(spec.clone());
        for hook in &self.hooks {
            hook(spec);
        }
        let code = self
            .exit_codes
            .iter()
            .find(|(needle, _)| spec.args.iter().any(|a| a == *needle))
            .map(|(_, code)| *code)
            .unwrap_or(0);
        Ok(RunStatus::exited(code))
    }
}
