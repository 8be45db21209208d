//! Shell command execution with merged output, liveness feedback and timing.
//!
//! Every call to [`ProcessRunner`] builds its own current-thread tokio
//! runtime, drives the child process to completion on it and tears it down
//! again, so callers stay fully synchronous and no scheduler is shared
//! between calls. Components receive the runner as an
//! `Arc<dyn CommandRunner>` so tests can swap in a fake.

use std::io::{IsTerminal, Write};
use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::debug;

use crate::defaults::ExecConfig;
use crate::error::{Error, Result};

#[cfg(windows)]
pub const LINE_ENDING: &str = "\r\n";
#[cfg(not(windows))]
pub const LINE_ENDING: &str = "\n";

/// Default cadence of the liveness indicator.
pub const DEFAULT_SPINNER_INTERVAL: Duration = Duration::from_millis(250);

/// Total time allowed for reading buffered output once the child has
/// exited. A detached grandchild (e.g. a persisted ssh master) may hold the
/// pipes open forever; whatever it writes after this is dropped.
const DRAIN_GRACE: Duration = Duration::from_millis(200);

/// Captured output of one command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub lines: Vec<String>,
    pub exit_status: i32,
}

impl CommandOutput {
    pub fn new(lines: Vec<String>, exit_status: i32) -> Self {
        Self { lines, exit_status }
    }

    pub fn success(&self) -> bool {
        self.exit_status == 0
    }
}

/// Liveness indicator driven while a command runs.
pub trait Spinner {
    fn spin(&mut self);
    fn clear(&mut self);
}

/// Variables set on the child process only. Values never appear in the
/// command line, in logs or in errors.
pub type Env<'a> = &'a [(&'a str, &'a str)];

/// Anything that can run a shell command line.
pub trait CommandRunner: Send + Sync {
    fn execute(
        &self,
        command: &str,
        env: Env<'_>,
        spinner: Option<&mut dyn Spinner>,
    ) -> Result<CommandOutput>;

    fn run_with_spinner(
        &self,
        command: &str,
        spinner: Option<&mut dyn Spinner>,
    ) -> Result<CommandOutput> {
        self.execute(command, &[], spinner)
    }

    fn run_with_env(&self, command: &str, env: Env<'_>) -> Result<CommandOutput> {
        self.execute(command, env, None)
    }

    fn run(&self, command: &str) -> Result<CommandOutput> {
        self.execute(command, &[], None)
    }
}

/// Adapts a plain function into a [`CommandRunner`]. The function sees the
/// command line only, not the environment.
pub struct FnRunner<F>(pub F);

impl<F> CommandRunner for FnRunner<F>
where
    F: Fn(&str) -> Result<CommandOutput> + Send + Sync,
{
    fn execute(
        &self,
        command: &str,
        _env: Env<'_>,
        _spinner: Option<&mut dyn Spinner>,
    ) -> Result<CommandOutput> {
        (self.0)(command)
    }
}

#[derive(Debug, Clone)]
pub struct ProcessRunner {
    spinner_interval: Duration,
}

impl Default for ProcessRunner {
    fn default() -> Self {
        Self::fresh()
    }
}

impl ProcessRunner {
    pub fn new(spinner_interval: Duration) -> Self {
        Self { spinner_interval }
    }

    /// A runner with built-in settings, independent of any other instance.
    pub fn fresh() -> Self {
        Self::new(DEFAULT_SPINNER_INTERVAL)
    }

    pub fn from_config(config: &ExecConfig) -> Self {
        Self::new(Duration::from_millis(config.spinner_interval_ms.max(1)))
    }

    /// The run operation bound to this runner, for injection as a function.
    pub fn runner_fn(&self) -> impl Fn(&str) -> Result<CommandOutput> + '_ {
        move |command: &str| self.run(command)
    }
}

impl CommandRunner for ProcessRunner {
    fn execute(
        &self,
        command: &str,
        env: Env<'_>,
        spinner: Option<&mut dyn Spinner>,
    ) -> Result<CommandOutput> {
        let env_names: Vec<&str> = env.iter().map(|(name, _)| *name).collect();
        debug!(command, env = ?env_names, "running command");
        let started = Instant::now();

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| Error::internal_io(e.to_string(), Some("start process runtime".to_string())))?;

        let outcome = runtime.block_on(capture(command, env, self.spinner_interval, spinner));
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match outcome {
            Ok((buffer, exit_status)) => {
                debug!(command, exit_status, elapsed_ms, "command exited");
                Ok(CommandOutput::new(split_output(&buffer), exit_status))
            }
            Err(err) => {
                debug!(command, elapsed_ms, error = %err, "command could not run");
                Err(err)
            }
        }
    }
}

fn shell_command(command: &str) -> Command {
    #[cfg(windows)]
    let cmd = {
        let mut cmd = Command::new("cmd");
        cmd.args(["/C", command]);
        cmd
    };

    #[cfg(not(windows))]
    let cmd = {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", command]);
        cmd
    };

    cmd
}

async fn capture(
    command: &str,
    env: Env<'_>,
    interval: Duration,
    mut spinner: Option<&mut dyn Spinner>,
) -> Result<(Vec<u8>, i32)> {
    // Pipes are attached at spawn time, before the child can write anything.
    let mut child = shell_command(command)
        .envs(env.iter().copied())
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| Error::internal_io(e.to_string(), Some(format!("spawn `{}`", command))))?;

    let (tx, mut rx) = mpsc::unbounded_channel::<Vec<u8>>();
    if let Some(stdout) = child.stdout.take() {
        tokio::spawn(forward(stdout, tx.clone()));
    }
    if let Some(stderr) = child.stderr.take() {
        tokio::spawn(forward(stderr, tx.clone()));
    }
    drop(tx);

    let mut buffer = Vec::new();
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // The first tick of a tokio interval completes immediately.
    ticker.tick().await;

    let status = loop {
        tokio::select! {
            status = child.wait() => {
                break status.map_err(|e| {
                    Error::internal_io(e.to_string(), Some(format!("wait for `{}`", command)))
                })?;
            }
            Some(chunk) = rx.recv() => buffer.extend_from_slice(&chunk),
            _ = ticker.tick(), if spinner.is_some() => {
                if let Some(spinner) = spinner.as_deref_mut() {
                    spinner.spin();
                }
            }
        }
    };

    if let Some(spinner) = spinner.as_deref_mut() {
        spinner.clear();
    }

    let drain = async {
        while let Some(chunk) = rx.recv().await {
            buffer.extend_from_slice(&chunk);
        }
    };
    if tokio::time::timeout(DRAIN_GRACE, drain).await.is_err() {
        debug!(command, "output pipes still open after exit, stopped reading");
    }

    Ok((buffer, status.code().unwrap_or(-1)))
}

async fn forward<R>(mut reader: R, tx: mpsc::UnboundedSender<Vec<u8>>)
where
    R: AsyncRead + Unpin,
{
    let mut chunk = [0u8; 8192];
    loop {
        match reader.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                if tx.send(chunk[..n].to_vec()).is_err() {
                    break;
                }
            }
        }
    }
}

/// Split captured bytes into lines. Blank output yields no lines at all.
pub fn split_output(buffer: &[u8]) -> Vec<String> {
    let text = String::from_utf8_lossy(buffer);
    if text.trim().is_empty() {
        return Vec::new();
    }

    text.trim_end()
        .split(LINE_ENDING)
        .map(|line| line.to_string())
        .collect()
}

/// Braille spinner drawn on stderr when it is a terminal.
pub struct TerminalSpinner {
    label: String,
    frame: usize,
    enabled: bool,
}

impl TerminalSpinner {
    const FRAMES: [char; 10] = ['⠋', '⠙', '⠹', '⠸', '⠼', '⠴', '⠦', '⠧', '⠇', '⠏'];

    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            frame: 0,
            enabled: std::io::stderr().is_terminal(),
        }
    }
}

impl Spinner for TerminalSpinner {
    fn spin(&mut self) {
        if !self.enabled {
            return;
        }
        let frame = Self::FRAMES[self.frame % Self::FRAMES.len()];
        self.frame += 1;
        eprint!("\r{} {}", frame, self.label);
        std::io::stderr().flush().ok();
    }

    fn clear(&mut self) {
        if !self.enabled || self.frame == 0 {
            return;
        }
        let width = self.label.chars().count() + 2;
        eprint!("\r{}\r", " ".repeat(width));
        std::io::stderr().flush().ok();
    }
}
