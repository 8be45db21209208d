use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;
mod logging;
mod output;
mod tty;

use commands::{config, hosts, run, ssh, watch, GlobalArgs};
use logging::LogLevel;

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "stagehand")]
#[command(version = VERSION)]
#[command(about = "Run scripted deployment steps across environment hosts")]
struct Cli {
    /// Diagnostic log level (overrides STAGEHAND_LOG)
    #[arg(long, global = true, value_enum)]
    log_level: Option<LogLevel>,

    /// Project root containing stagehand.json
    #[arg(long, global = true)]
    project: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Run a script declared in stagehand.json
    Run(run::RunArgs),
    /// List declared scripts, their steps and options
    Scripts(run::ScriptsArgs),
    /// Re-run a script whenever project files change
    Watch(watch::WatchArgs),
    /// Generate and install the project SSH key
    Ssh(ssh::SshArgs),
    /// Show environment hosts and whether they are ready for SSH
    Hosts(hosts::HostsArgs),
    /// Global settings and remote configuration discovery
    Config(config::ConfigArgs),
}

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    logging::init_logging(cli.log_level);

    let global = GlobalArgs {
        project: cli.project,
        settings: stagehand::defaults::load_defaults(),
    };

    if let Commands::Watch(args) = cli.command {
        return match watch::run(args, &global) {
            Ok(code) => std::process::ExitCode::from(exit_code_to_u8(code)),
            Err(err) => {
                let code = output::exit_code_for_error(err.code);
                let _ = output::print_result::<serde_json::Value>(Err(err));
                std::process::ExitCode::from(exit_code_to_u8(code))
            }
        };
    }

    tty::status("stagehand is working...");
    let (json_result, exit_code) = commands::run_json(cli.command, &global);
    let _ = output::print_result(json_result);

    std::process::ExitCode::from(exit_code_to_u8(exit_code))
}

fn exit_code_to_u8(code: i32) -> u8 {
    code.clamp(0, 255) as u8
}
