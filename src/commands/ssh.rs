use clap::{Args, Subcommand};
use serde::Serialize;

use stagehand::options::Options;
use stagehand::ssh_keys::{self, KeyPair};
use stagehand::{Error, ScriptReport};

use super::{exit_code, CmdResult, GlobalArgs};

#[derive(Args)]
pub struct SshArgs {
    #[command(subcommand)]
    command: SshCommand,
}

#[derive(Subcommand)]
enum SshCommand {
    /// Generate the project key pair in ssh-keys/
    GenerateKey,
    /// Append the project public key to authorized_keys on every host
    InstallKey {
        /// Environment whose hosts receive the key
        #[arg(long, short)]
        env: String,

        /// Skip the notification API even when a project key is set
        #[arg(long)]
        no_notify: bool,
    },
}

#[derive(Debug, Serialize)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum SshOutput {
    GenerateKey(KeyPair),
    InstallKey { report: ScriptReport, text: Vec<String> },
}

pub fn run(args: SshArgs, global: &GlobalArgs) -> CmdResult<SshOutput> {
    match args.command {
        SshCommand::GenerateKey => {
            let project = global.load_project()?;
            let runner = global.runner();
            let keys = ssh_keys::generate(project.root(), &*runner)?;
            Ok((SshOutput::GenerateKey(keys), 0))
        }
        SshCommand::InstallKey { env, no_notify } => install_key(&env, no_notify, global),
    }
}

fn install_key(env: &str, no_notify: bool, global: &GlobalArgs) -> CmdResult<SshOutput> {
    if !crate::tty::require_tty_for_interactive() {
        return Err(Error::validation_invalid_argument(
            "tty",
            "Installing keys prompts for host passwords and needs an interactive terminal",
            None,
            None,
        ));
    }

    let project = global.load_project()?;
    let mut environment = project.environment(env)?;

    ssh_keys::apply_passwords(&mut environment, |host| {
        crate::tty::prompt_password(&format!("Password for {}: ", host.address()))
    })?;

    let notifier = if no_notify { None } else { global.notifier()? };
    let mut script = ssh_keys::install_key_script(
        project.root(),
        &project.name,
        environment,
        global.runner(),
        global.settings.clone(),
        notifier,
    );

    let report = script.run(&Options::new())?;
    let text = report.render(false);
    let code = exit_code(report.is_success());
    Ok((SshOutput::InstallKey { report, text }, code))
}
