use std::path::PathBuf;
use std::sync::Arc;

use stagehand::api::{HttpNotificationClient, NotificationClient};
use stagehand::defaults::Defaults;
use stagehand::environment::Environment;
use stagehand::exec::{CommandRunner, ProcessRunner};
use stagehand::project::Project;
use stagehand::{Error, Result};

pub type CmdResult<T> = Result<(T, i32)>;

pub(crate) struct GlobalArgs {
    /// Project root override; otherwise the nearest `stagehand.json` upwards.
    pub project: Option<PathBuf>,
    pub settings: Defaults,
}

impl GlobalArgs {
    pub fn load_project(&self) -> Result<Project> {
        match &self.project {
            Some(root) => Project::load(root),
            None => {
                let cwd = std::env::current_dir()
                    .map_err(|e| Error::internal_io(e.to_string(), Some("current directory".to_string())))?;
                Project::discover(&cwd)
            }
        }
    }

    pub fn runner(&self) -> Arc<dyn CommandRunner> {
        Arc::new(ProcessRunner::from_config(&self.settings.exec))
    }

    /// Notification client when the project key variable is set.
    pub fn notifier(&self) -> Result<Option<Box<dyn NotificationClient>>> {
        Ok(HttpNotificationClient::from_env(&self.settings.api)?
            .map(|client| Box::new(client) as Box<dyn NotificationClient>))
    }
}

pub(crate) fn select_environment(project: &Project, name: Option<&str>) -> Result<Option<Environment>> {
    name.map(|name| project.environment(name)).transpose()
}

pub(crate) fn exit_code(success: bool) -> i32 {
    if success {
        0
    } else {
        1
    }
}

pub mod config;
pub mod hosts;
pub mod run;
pub mod ssh;
pub mod watch;

/// Dispatch a command to its handler and map result to JSON.
macro_rules! dispatch {
    ($args:expr, $global:expr, $module:ident) => {
        crate::output::map_cmd_result_to_json($module::run($args, $global))
    };
}

pub(crate) fn run_json(command: crate::Commands, global: &GlobalArgs) -> (Result<serde_json::Value>, i32) {
    match command {
        crate::Commands::Run(args) => dispatch!(args, global, run),
        crate::Commands::Scripts(args) => crate::output::map_cmd_result_to_json(run::list(args, global)),
        crate::Commands::Ssh(args) => dispatch!(args, global, ssh),
        crate::Commands::Hosts(args) => dispatch!(args, global, hosts),
        crate::Commands::Config(args) => dispatch!(args, global, config),
        crate::Commands::Watch(_) => {
            let err = Error::validation_invalid_argument(
                "output_mode",
                "Watch streams plain text output",
                None,
                None,
            );
            crate::output::map_cmd_result_to_json::<serde_json::Value>(Err(err))
        }
    }
}
