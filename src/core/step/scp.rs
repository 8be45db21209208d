use std::path::PathBuf;

use super::fan_out::{run_on_all_hosts, HostOutcome};
use super::{ScriptContext, Step, StepBase, StepBuilder, SshStep};
use crate::error::Result;
use crate::result::StepResult;
use crate::tunnel::{with_tunnel, Tunnel};
use crate::utils::shell;

/// Copy a local file or directory to every host of the environment.
pub struct ScpStep {
    base: StepBase,
    local: PathBuf,
    remote: String,
    permissions: Option<String>,
    first_host_only: bool,
}

impl ScpStep {
    pub fn new(local: impl Into<PathBuf>, remote: impl Into<String>) -> Self {
        let local = local.into();
        let name = local
            .file_name()
            .map(|n| format!("copy-{}", n.to_string_lossy()))
            .unwrap_or_else(|| "copy-files".to_string());

        Self {
            base: StepBase::new(name),
            local,
            remote: remote.into(),
            permissions: None,
            first_host_only: false,
        }
    }

    /// `chmod -R` mode applied on the hosts by a follow-up step.
    pub fn with_permissions(mut self, mode: impl Into<String>) -> Self {
        self.permissions = Some(mode.into());
        self
    }

    pub fn first_host_only(mut self) -> Self {
        self.first_host_only = true;
        self
    }
}

impl Step for ScpStep {
    fn base(&self) -> &StepBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut StepBase {
        &mut self.base
    }

    fn run(&mut self, context: &ScriptContext) -> Result<StepResult> {
        if !self.local.exists() {
            return Ok(StepResult::failure(self.name(), Vec::new())
                .with_explanation(format!("because {} does not exist", self.local.display())));
        }

        let local = &self.local;
        let remote = &self.remote;

        run_on_all_hosts(self.name(), context.environment, self.first_host_only, |host| {
            let mut tunnel = host.tunnel(context.runner, &context.settings.ssh);
            HostOutcome::from_transport(with_tunnel(&mut tunnel, |tunnel: &dyn Tunnel| {
                Ok(HostOutcome::from_output(tunnel.upload(local, remote)?))
            }))
        })
    }

    fn nested_steps(&mut self) -> Vec<Box<dyn Step>> {
        let Some(mode) = self.permissions.take() else {
            return Vec::new();
        };

        let target = if self.remote.is_empty() { "." } else { self.remote.as_str() };
        let mut chmod = SshStep::new(format!("chmod -R {} {}", mode, shell::quote_path(target)))
            .named(&format!("{}-permissions", self.name()));
        if self.first_host_only {
            chmod = chmod.first_host_only();
        }
        chmod.set_environments(self.environments().to_vec());

        vec![Box::new(chmod)]
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::Fixture;
    use super::*;
    use crate::environment::{Environment, Host};
    use crate::testing::RecordingRunner;

    #[test]
    fn missing_local_path_fails_without_touching_hosts() {
        let fixture = Fixture::new(RecordingRunner::new(), Some(Environment::new("production")));
        let mut step = ScpStep::new("/nonexistent/build", "public_html");

        let result = step.run(&fixture.context()).unwrap();

        assert!(result.is_failure());
        assert!(fixture.runner.commands().is_empty());
    }

    #[test]
    fn uploads_to_each_host() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let mut host = Host::new("web1", "deploy");
        host.set_password("secret");
        let fixture = Fixture::new(
            RecordingRunner::new(),
            Some(Environment::new("production").with_host(host)),
        );
        let mut step = ScpStep::new(file.path(), "uploads/");

        let result = step.run(&fixture.context()).unwrap();

        assert!(result.is_success());
        assert!(fixture
            .runner
            .commands()
            .iter()
            .any(|c| c.contains("scp -O") && c.contains("deploy@web1:uploads/")));
    }

    #[test]
    fn permissions_register_chmod_step_once() {
        let mut step = ScpStep::new("build", "public_html")
            .with_permissions("755")
            .only_in(&["production"]);

        let nested = step.nested_steps();
        assert_eq!(nested.len(), 1);
        assert_eq!(nested[0].name(), "copy-build-permissions");
        assert_eq!(nested[0].environments(), &["production".to_string()]);
        assert!(step.nested_steps().is_empty());
    }
}
