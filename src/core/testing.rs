//! Shared doubles for unit tests.

use std::sync::Mutex;

use crate::error::Result;
use crate::exec::{CommandOutput, CommandRunner, Env, Spinner};

/// Records every command and answers from a list of `(needle, output)`
/// pairs; the first needle contained in the command wins, anything else
/// exits 0 with no output.
#[derive(Default)]
pub struct RecordingRunner {
    responses: Vec<(String, CommandOutput)>,
    commands: Mutex<Vec<String>>,
    envs: Mutex<Vec<Vec<(String, String)>>>,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(mut self, needle: &str, lines: &[&str], exit_status: i32) -> Self {
        let lines = lines.iter().map(|l| l.to_string()).collect();
        self.responses
            .push((needle.to_string(), CommandOutput::new(lines, exit_status)));
        self
    }

    pub fn commands(&self) -> Vec<String> {
        self.commands.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Child environment of each recorded command, in the same order.
    pub fn envs(&self) -> Vec<Vec<(String, String)>> {
        self.envs.lock().map(|e| e.clone()).unwrap_or_default()
    }
}

impl CommandRunner for RecordingRunner {
    fn execute(
        &self,
        command: &str,
        env: Env<'_>,
        _spinner: Option<&mut dyn Spinner>,
    ) -> Result<CommandOutput> {
        if let Ok(mut commands) = self.commands.lock() {
            commands.push(command.to_string());
        }
        if let Ok(mut envs) = self.envs.lock() {
            envs.push(env.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect());
        }

        let output = self
            .responses
            .iter()
            .find(|(needle, _)| command.contains(needle.as_str()))
            .map(|(_, output)| output.clone())
            .unwrap_or_default();

        Ok(output)
    }
}
