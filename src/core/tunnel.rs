//! Scoped transport to a single host.
//!
//! [`SshTunnel`] multiplexes every command and copy over one OpenSSH
//! ControlMaster connection opened by `set_up` and closed by `tear_down`.
//! Use [`with_tunnel`] so the release happens on every exit path.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::defaults::SshConfig;
use crate::environment::Host;
use crate::error::{Error, Result};
use crate::exec::{CommandOutput, CommandRunner};
use crate::paths;
use crate::utils::shell;

pub trait Tunnel {
    fn host(&self) -> &Host;

    /// Acquire the transport. Nothing needs releasing when this fails.
    fn set_up(&mut self) -> Result<()>;

    fn tear_down(&mut self);

    fn run(&self, remote_command: &str) -> Result<CommandOutput>;

    fn download(&self, remote_path: &str, local_path: &Path) -> Result<CommandOutput>;

    fn upload(&self, local_path: &Path, remote_path: &str) -> Result<CommandOutput>;
}

/// Run `work` between `set_up` and exactly one `tear_down`.
pub fn with_tunnel<T, F>(tunnel: &mut dyn Tunnel, work: F) -> Result<T>
where
    F: FnOnce(&dyn Tunnel) -> Result<T>,
{
    tunnel.set_up()?;
    let outcome = work(&*tunnel);
    tunnel.tear_down();
    outcome
}

pub struct SshTunnel<'a> {
    host: Host,
    runner: &'a dyn CommandRunner,
    settings: SshConfig,
    control_path: Option<PathBuf>,
}

impl<'a> SshTunnel<'a> {
    pub fn new(host: Host, runner: &'a dyn CommandRunner, settings: SshConfig) -> Self {
        Self {
            host,
            runner,
            settings,
            control_path: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.control_path.is_some()
    }

    /// Without a password there is nobody to answer prompts.
    fn batch_mode(&self) -> bool {
        self.host.password().is_none()
    }

    /// `sshpass -e` reads the password from `SSHPASS`, which is only ever
    /// set in the child environment.
    fn password_prefix(&self) -> &'static str {
        if self.host.password().is_some() {
            "sshpass -e "
        } else {
            ""
        }
    }

    fn exec(&self, command: &str) -> Result<CommandOutput> {
        match self.host.password() {
            Some(password) => self.runner.run_with_env(command, &[("SSHPASS", password)]),
            None => self.runner.run(command),
        }
    }

    fn options(&self, port_flag: &str) -> Vec<String> {
        let mut args = Vec::new();

        if let Some(identity) = self.host.identity_path() {
            args.push("-i".to_string());
            args.push(identity.to_string_lossy().into_owned());
        }

        if self.host.port != 22 {
            args.push(port_flag.to_string());
            args.push(self.host.port.to_string());
        }

        args.extend([
            "-o".to_string(),
            format!("BatchMode={}", if self.batch_mode() { "yes" } else { "no" }),
            "-o".to_string(),
            format!("ConnectTimeout={}", self.settings.connect_timeout_secs),
        ]);

        if let Some(control_path) = &self.control_path {
            args.push("-o".to_string());
            args.push(format!("ControlPath={}", control_path.display()));
        }

        args
    }

    pub fn assemble_ssh_command(&self, remote_command: &str) -> String {
        format!(
            "{}ssh {} {} {}",
            self.password_prefix(),
            shell::quote_args(&self.options("-p")),
            shell::quote_arg(&self.host.address()),
            shell::quote_arg(remote_command)
        )
    }

    fn assemble_scp_command(&self, source: &str, destination: &str, recursive: bool) -> String {
        let mut args = self.settings.scp_flags.clone();
        if recursive {
            args.push("-r".to_string());
        }
        args.extend(self.options("-P"));
        args.push(source.to_string());
        args.push(destination.to_string());

        format!("{}scp {}", self.password_prefix(), shell::quote_args(&args))
    }

    fn remote_spec(&self, remote_path: &str) -> String {
        format!("{}:{}", self.host.address(), remote_path)
    }
}

impl Tunnel for SshTunnel<'_> {
    fn host(&self) -> &Host {
        &self.host
    }

    fn set_up(&mut self) -> Result<()> {
        if self.is_open() {
            return Ok(());
        }

        let socket_dir = paths::control_sockets();
        fs::create_dir_all(&socket_dir).map_err(|e| {
            Error::internal_io(e.to_string(), Some(format!("create {}", socket_dir.display())))
        })?;
        let control_path = socket_dir.join("%C");

        let mut args = self.options("-p");
        args.extend([
            "-o".to_string(),
            "ControlMaster=yes".to_string(),
            "-o".to_string(),
            format!("ControlPath={}", control_path.display()),
            "-o".to_string(),
            format!("ControlPersist={}", self.settings.control_persist_secs),
            "-fN".to_string(),
            self.host.address(),
        ]);

        let command = format!("{}ssh {}", self.password_prefix(), shell::quote_args(&args));
        let output = self.exec(&command)?;

        if !output.success() {
            return Err(Error::ssh_tunnel_failed(self.host.address(), output.lines));
        }

        debug!(host = %self.host.hostname, "ssh tunnel opened");
        self.control_path = Some(control_path);
        Ok(())
    }

    fn tear_down(&mut self) {
        let Some(control_path) = self.control_path.take() else {
            return;
        };

        let args = vec![
            "-o".to_string(),
            format!("ControlPath={}", control_path.display()),
            "-O".to_string(),
            "exit".to_string(),
            self.host.address(),
        ];
        let command = format!("ssh {}", shell::quote_args(&args));

        match self.runner.run(&command) {
            Ok(output) if output.success() => {
                debug!(host = %self.host.hostname, "ssh tunnel closed")
            }
            Ok(output) => {
                debug!(host = %self.host.hostname, exit_status = output.exit_status, "ssh tunnel close reported failure")
            }
            Err(err) => debug!(host = %self.host.hostname, error = %err, "ssh tunnel close failed"),
        }
    }

    fn run(&self, remote_command: &str) -> Result<CommandOutput> {
        self.exec(&self.assemble_ssh_command(remote_command))
    }

    fn download(&self, remote_path: &str, local_path: &Path) -> Result<CommandOutput> {
        let command = self.assemble_scp_command(
            &self.remote_spec(remote_path),
            &local_path.to_string_lossy(),
            false,
        );
        self.exec(&command)
    }

    fn upload(&self, local_path: &Path, remote_path: &str) -> Result<CommandOutput> {
        let command = self.assemble_scp_command(
            &local_path.to_string_lossy(),
            &self.remote_spec(remote_path),
            local_path.is_dir(),
        );
        self.exec(&command)
    }
}
