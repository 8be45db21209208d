//! Project SSH key pair: generation and installation on remote hosts.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;

use crate::api::NotificationClient;
use crate::defaults::Defaults;
use crate::environment::{Environment, Host};
use crate::error::{Error, RemoteCommandFailedDetails, Result};
use crate::exec::CommandRunner;
use crate::paths;
use crate::script::Script;
use crate::step::{CheckStep, NotifyStep, ScpStep, SshStep, StepBuilder};
use crate::utils::{io, shell};

pub const INSTALL_KEY_SCRIPT: &str = "ssh:install-key";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyPair {
    pub private_key: PathBuf,
    pub public_key: PathBuf,
}

/// Generate `ssh-keys/id_rsa` and `ssh-keys/id_rsa.pub` under the project
/// root. Never overwrites an existing pair.
pub fn generate(root: &Path, runner: &dyn CommandRunner) -> Result<KeyPair> {
    let private_key = paths::private_key(root);
    let public_key = paths::public_key(root);

    if private_key.exists() || public_key.exists() {
        return Err(Error::ssh_keys_already_exist(private_key.display().to_string()));
    }

    let key_dir = paths::ssh_keys(root);
    fs::create_dir_all(&key_dir)
        .map_err(|e| Error::internal_io(e.to_string(), Some(format!("create {}", key_dir.display()))))?;

    let command = format!(
        "ssh-keygen -t rsa -b 2048 -f {} -q -N ''",
        shell::quote_path(&private_key.to_string_lossy())
    );
    let output = runner.run(&command)?;

    if !output.success() {
        return Err(Error::remote_command_failed(RemoteCommandFailedDetails {
            command,
            exit_code: output.exit_status,
            output: output.lines,
            host: None,
        }));
    }

    io::set_mode(&private_key, 0o600, "restrict private key")?;
    log_status!("ssh", "Generated {}", public_key.display());

    Ok(KeyPair {
        private_key,
        public_key,
    })
}

/// Give each host the password returned by `prompt`, so its tunnel leaves
/// batch mode. Empty answers are asked again.
pub fn apply_passwords<F>(environment: &mut Environment, mut prompt: F) -> Result<()>
where
    F: FnMut(&Host) -> Result<String>,
{
    for host in environment.hosts_mut() {
        loop {
            let password = prompt(host)?;
            if !password.trim().is_empty() {
                host.set_password(password.trim());
                break;
            }
        }
    }
    Ok(())
}

/// Build the script that appends the project's public key to
/// `.ssh/authorized_keys` on every host of `environment`.
pub fn install_key_script(
    root: &Path,
    project_name: &str,
    environment: Environment,
    runner: Arc<dyn CommandRunner>,
    settings: Defaults,
    notifier: Option<Box<dyn NotificationClient>>,
) -> Script {
    let mut script = Script::new(
        INSTALL_KEY_SCRIPT,
        "Install the project SSH public key in authorized_keys on a remote environment.",
        runner,
    )
    .with_settings(settings);
    script.set_environment(Some(environment));

    if let Some(client) = notifier {
        script.add_step(NotifyStep::new(client));
    }

    let private_key = paths::private_key(root);
    let public_key = paths::public_key(root);
    let label = format!("# stagehand key for {}", project_name);

    let check_path = public_key.clone();

    script
        .add_step(CheckStep::new("fix-key-permissions", move |_| {
            if private_key.exists() {
                io::set_mode(&private_key, 0o600, "restrict private key")?;
            }
            Ok(())
        }))
        .add_step(CheckStep::new("check-for-public-key", move |_| {
            if check_path.exists() {
                Ok(())
            } else {
                Err(Error::ssh_public_key_missing(check_path.display().to_string()))
            }
        }))
        .add_step(ScpStep::new(public_key, "").named("copy-public-key"))
        .add_step(SshStep::new("mkdir -p .ssh").named("create-ssh-folder"))
        .add_step(
            SshStep::new("touch .ssh/authorized_keys && chmod +w .ssh/authorized_keys")
                .named("allow-authorized-keys-writes"),
        )
        .add_step(
            SshStep::new(format!("echo {} >> .ssh/authorized_keys", shell::quote_path(&label)))
                .named("label-key"),
        )
        .add_step(SshStep::new("cat id_rsa.pub >> .ssh/authorized_keys").named("add-key"))
        .add_step(SshStep::new("chmod 400 .ssh/authorized_keys").named("change-authorized-keys-permissions"))
        .add_step(SshStep::new("chmod 700 .ssh").named("change-ssh-folder-permissions"));

    script
}
