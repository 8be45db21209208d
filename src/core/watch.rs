//! Re-run a script when files under the project root change.

use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::time::Duration;

use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use serde::Serialize;
use tracing::{debug, warn};

use crate::defaults::WatchConfig;
use crate::error::{Error, Result};
use crate::exec::CommandRunner;
use crate::options::Options;
use crate::script::{Script, ScriptReport};
use crate::utils::shell;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    FsEvents,
    Inotify,
    Null,
}

pub fn select_backend() -> Backend {
    if cfg!(target_os = "macos") {
        Backend::FsEvents
    } else if cfg!(target_os = "linux") && Path::new("/proc/sys/fs/inotify").exists() {
        Backend::Inotify
    } else {
        Backend::Null
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchControl {
    Continue,
    Stop,
}

pub trait FileWatcher {
    /// Block, calling `on_change` once per debounced batch of changes until
    /// it returns [`WatchControl::Stop`] or the event source goes away.
    fn watch(&mut self, root: &Path, on_change: &mut dyn FnMut() -> WatchControl) -> Result<()>;

    fn display_notification(&self, script: &str, report: &ScriptReport);
}

pub fn watcher_for(
    backend: Backend,
    settings: &WatchConfig,
    runner: Arc<dyn CommandRunner>,
) -> Box<dyn FileWatcher> {
    match backend {
        Backend::Null => Box::new(NullWatcher),
        backend => Box::new(NotifyWatcher {
            backend,
            settings: settings.clone(),
            runner,
        }),
    }
}

/// Used where no native file-change API is available.
pub struct NullWatcher;

impl FileWatcher for NullWatcher {
    fn watch(&mut self, root: &Path, _on_change: &mut dyn FnMut() -> WatchControl) -> Result<()> {
        warn!(root = %root.display(), "no file watch backend available on this system");
        log_status!("watch", "File watching is not supported on this system");
        Ok(())
    }

    fn display_notification(&self, _script: &str, _report: &ScriptReport) {}
}

/// `notify`'s native watcher plus desktop notifications via `osascript` or
/// `notify-send`.
pub struct NotifyWatcher {
    backend: Backend,
    settings: WatchConfig,
    runner: Arc<dyn CommandRunner>,
}

impl NotifyWatcher {
    fn notification_command(&self, title: &str, message: &str) -> Option<String> {
        match self.backend {
            Backend::FsEvents => {
                let script = format!(
                    "display notification \"{}\" with title \"{}\"",
                    message.replace('"', "'"),
                    title.replace('"', "'")
                );
                Some(format!("osascript -e {}", shell::quote_arg(&script)))
            }
            Backend::Inotify => Some(format!(
                "notify-send {} {}",
                shell::quote_arg(title),
                shell::quote_arg(message)
            )),
            Backend::Null => None,
        }
    }
}

impl FileWatcher for NotifyWatcher {
    fn watch(&mut self, root: &Path, on_change: &mut dyn FnMut() -> WatchControl) -> Result<()> {
        let root = root.canonicalize().unwrap_or_else(|_| root.to_path_buf());
        let (tx, rx) = mpsc::channel();

        let mut watcher =
            RecommendedWatcher::new(tx, notify::Config::default()).map_err(|e| Error::watch_failed(e.to_string()))?;
        watcher
            .watch(&root, RecursiveMode::Recursive)
            .map_err(|e| Error::watch_failed(e.to_string()))?;

        log_status!("watch", "Watching {} for changes...", root.display());

        let debounce = Duration::from_millis(self.settings.debounce_ms);
        while let Some(paths) = next_batch(&rx, &root, &self.settings.ignore, debounce) {
            debug!(count = paths.len(), first = %paths[0].display(), "change batch");
            if on_change() == WatchControl::Stop {
                break;
            }
        }

        Ok(())
    }

    fn display_notification(&self, script: &str, report: &ScriptReport) {
        let title = format!("stagehand: {}", script);
        let Some(command) = self.notification_command(&title, &report.headline()) else {
            return;
        };

        match self.runner.run(&command) {
            Ok(output) if output.success() => {}
            Ok(output) => debug!(exit = output.exit_status, "desktop notification failed"),
            Err(err) => debug!(error = %err.describe(), "desktop notification failed"),
        }
    }
}

/// Path relative to `root` with forward slashes, or `None` outside it.
fn relative_path(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    Some(relative.to_string_lossy().replace('\\', "/"))
}

pub fn is_ignored(root: &Path, path: &Path, ignore: &[String]) -> bool {
    match relative_path(root, path) {
        Some(relative) => ignore.iter().any(|glob| glob_match::glob_match(glob, &relative)),
        None => true,
    }
}

fn relevant_paths(event: notify::Result<Event>, root: &Path, ignore: &[String]) -> Vec<PathBuf> {
    match event {
        Ok(event) => event
            .paths
            .into_iter()
            .filter(|path| !is_ignored(root, path, ignore))
            .collect(),
        Err(err) => {
            warn!(error = %err, "file watch error");
            Vec::new()
        }
    }
}

/// Wait for the first relevant change, then keep collecting until the
/// channel has been quiet for `debounce`. `None` once the sender is gone.
fn next_batch(
    rx: &Receiver<notify::Result<Event>>,
    root: &Path,
    ignore: &[String],
    debounce: Duration,
) -> Option<Vec<PathBuf>> {
    let mut batch = Vec::new();

    while batch.is_empty() {
        let event = rx.recv().ok()?;
        batch.extend(relevant_paths(event, root, ignore));
    }

    loop {
        match rx.recv_timeout(debounce) {
            Ok(event) => batch.extend(relevant_paths(event, root, ignore)),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => return Some(batch),
        }
    }
}

/// Rendered outcome of one watch-triggered run.
#[derive(Debug, Clone)]
pub struct WatchTick {
    pub lines: Vec<String>,
    pub control: WatchControl,
}

/// Runs the bound script each time the watcher fires.
pub struct WatchCallback {
    script: Script,
    options: Options,
    verbose: bool,
    only_notify_on_failure: bool,
    stop_on_failure: bool,
    previous_run_failed: bool,
}

impl WatchCallback {
    pub fn new(script: Script, options: Options) -> Self {
        Self {
            script,
            options,
            verbose: false,
            only_notify_on_failure: false,
            stop_on_failure: false,
            previous_run_failed: false,
        }
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Notify only for failures and for the first success after a failure.
    pub fn only_notify_on_failure(mut self, enabled: bool) -> Self {
        self.only_notify_on_failure = enabled;
        self
    }

    pub fn stop_on_failure(mut self, enabled: bool) -> Self {
        self.stop_on_failure = enabled;
        self
    }

    pub fn previous_run_failed(&self) -> bool {
        self.previous_run_failed
    }

    pub fn script(&self) -> &Script {
        &self.script
    }

    pub fn call(&mut self, watcher: &dyn FileWatcher) -> WatchTick {
        let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");
        let mut lines = vec![format!("Running {} script at {}...", self.script.name(), timestamp)];

        // An error leaves `previous_run_failed` alone and never ends the watch.
        let report = match self.script.run(&self.options) {
            Ok(report) => report,
            Err(err) => {
                lines.push("Error encountered when running script during watch.".to_string());
                lines.push(err.describe());
                return WatchTick {
                    lines,
                    control: WatchControl::Continue,
                };
            }
        };

        lines.extend(report.render(self.verbose));
        let failed = !report.is_success();
        if self.should_notify(failed) {
            watcher.display_notification(self.script.name(), &report);
        }
        self.previous_run_failed = failed;

        let control = if failed && self.stop_on_failure {
            WatchControl::Stop
        } else {
            WatchControl::Continue
        };

        WatchTick { lines, control }
    }

    fn should_notify(&self, failed: bool) -> bool {
        !self.only_notify_on_failure || failed || self.previous_run_failed
    }
}
