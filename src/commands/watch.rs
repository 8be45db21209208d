use clap::Args;

use stagehand::options::parse_pairs;
use stagehand::watch::{self, WatchCallback};
use stagehand::Result;

use super::{select_environment, GlobalArgs};

#[derive(Args)]
pub struct WatchArgs {
    /// Script to re-run on every change
    pub script: String,

    #[arg(long, short)]
    pub env: Option<String>,

    /// Script option as key=value (repeatable)
    #[arg(long = "option", short = 'o', value_name = "KEY=VALUE")]
    pub options: Vec<String>,

    #[arg(long, short)]
    pub verbose: bool,

    /// Desktop notifications only for failures and recoveries
    #[arg(long)]
    pub only_notify_on_failure: bool,

    /// Stop watching after the first failed run
    #[arg(long)]
    pub stop_on_failure: bool,
}

/// Streams plain text until stopped; returns the process exit code.
pub fn run(args: WatchArgs, global: &GlobalArgs) -> Result<i32> {
    let project = global.load_project()?;
    let environment = select_environment(&project, args.env.as_deref())?;
    let runner = global.runner();

    let script = project.build_script(&args.script, environment, runner.clone(), &global.settings, None)?;
    let options = script.configure().resolve(&parse_pairs(&args.options)?)?;

    let mut callback = WatchCallback::new(script, options)
        .verbose(args.verbose)
        .only_notify_on_failure(args.only_notify_on_failure)
        .stop_on_failure(args.stop_on_failure);

    let backend = watch::select_backend();
    let mut watcher = watch::watcher_for(backend, &global.settings.watch, runner.clone());
    // `watch` borrows the watcher mutably for its whole run.
    let notifier = watch::watcher_for(backend, &global.settings.watch, runner);

    watcher.watch(project.root(), &mut || {
        let tick = callback.call(notifier.as_ref());
        for line in &tick.lines {
            println!("{}", line);
        }
        tick.control
    })?;

    Ok(if callback.previous_run_failed() { 1 } else { 0 })
}

