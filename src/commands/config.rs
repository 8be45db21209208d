use clap::{Args, Subcommand};
use serde::Serialize;

use stagehand::cache::FileCache;
use stagehand::defaults::{self, StagehandConfig};
use stagehand::detect::ConfigFactory;
use stagehand::options::Options;
use stagehand::paths;
use stagehand::script::Script;
use stagehand::step::DetectConfigStep;
use stagehand::{Error, ScriptReport};

use super::{exit_code, CmdResult, GlobalArgs};

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommand,
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Display global settings (config.json merged over built-ins)
    Show {
        /// Show only built-in defaults
        #[arg(long)]
        builtin: bool,
    },
    /// Show the path to config.json
    Path,
    /// Discover the application configuration on an environment's hosts
    Detect {
        #[arg(long, short)]
        env: String,

        /// Probe only the first host
        #[arg(long)]
        first_host_only: bool,
    },
    /// Forget the detector remembered for this project
    ClearCache,
}

#[derive(Debug, Serialize)]
#[serde(tag = "command", rename_all = "kebab-case")]
pub enum ConfigOutput {
    Show { config: StagehandConfig },
    Path { path: String, exists: bool },
    Detect { report: ScriptReport, text: Vec<String> },
    ClearCache { path: String, deleted: bool },
}

pub fn run(args: ConfigArgs, global: &GlobalArgs) -> CmdResult<ConfigOutput> {
    match args.command {
        ConfigCommand::Show { builtin } => {
            let config = if builtin {
                StagehandConfig::default()
            } else {
                defaults::load_config()
            };
            Ok((ConfigOutput::Show { config }, 0))
        }
        ConfigCommand::Path => {
            let path = paths::config_json()?;
            Ok((
                ConfigOutput::Path {
                    exists: path.exists(),
                    path: path.display().to_string(),
                },
                0,
            ))
        }
        ConfigCommand::Detect { env, first_host_only } => detect(&env, first_host_only, global),
        ConfigCommand::ClearCache => clear_cache(global),
    }
}

fn detect(env: &str, first_host_only: bool, global: &GlobalArgs) -> CmdResult<ConfigOutput> {
    let project = global.load_project()?;
    let cache = FileCache::for_project(project.root())?;

    let step = DetectConfigStep::new(ConfigFactory::new(Some(Box::new(cache))));
    let step = if first_host_only { step.first_host_only() } else { step };

    let mut script = Script::new("config:detect", "Discover remote configuration", global.runner())
        .with_settings(global.settings.clone());
    script.set_environment(Some(project.environment(env)?));
    script.add_step(step);

    let report = script.run(&Options::new())?;
    let text = report.render(false);
    let code = exit_code(report.is_success());
    Ok((ConfigOutput::Detect { report, text }, code))
}

fn clear_cache(global: &GlobalArgs) -> CmdResult<ConfigOutput> {
    let project = global.load_project()?;
    let cache = FileCache::for_project(project.root())?;
    let path = cache.path().to_path_buf();

    let deleted = if path.exists() {
        std::fs::remove_file(&path)
            .map_err(|e| Error::internal_io(e.to_string(), Some(format!("delete {}", path.display()))))?;
        true
    } else {
        false
    };

    Ok((
        ConfigOutput::ClearCache {
            path: path.display().to_string(),
            deleted,
        },
        0,
    ))
}
