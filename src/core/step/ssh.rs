use super::fan_out::{run_on_all_hosts, HostOutcome};
use super::{declare_placeholders, default_name, ScriptContext, Step, StepBase};
use crate::error::Result;
use crate::options::OptionSchema;
use crate::result::StepResult;
use crate::tunnel::{with_tunnel, Tunnel};
use crate::utils::template;

/// Remote command fanned out over every host of the environment.
pub struct SshStep {
    base: StepBase,
    command: String,
    first_host_only: bool,
}

impl SshStep {
    pub fn new(command: impl Into<String>) -> Self {
        let command = command.into();
        Self {
            base: StepBase::new(default_name(&command)),
            command,
            first_host_only: false,
        }
    }

    pub fn first_host_only(mut self) -> Self {
        self.first_host_only = true;
        self
    }

    pub fn command(&self) -> &str {
        &self.command
    }
}

impl Step for SshStep {
    fn base(&self) -> &StepBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut StepBase {
        &mut self.base
    }

    fn configure(&self, schema: &mut OptionSchema) {
        declare_placeholders(self.name(), &self.command, schema);
    }

    fn run(&mut self, context: &ScriptContext) -> Result<StepResult> {
        let command = template::render_map(&self.command, context.options);

        run_on_all_hosts(self.name(), context.environment, self.first_host_only, |host| {
            let mut tunnel = host.tunnel(context.runner, &context.settings.ssh);
            HostOutcome::from_transport(with_tunnel(&mut tunnel, |tunnel: &dyn Tunnel| {
                let output = tunnel.run(&command)?;
                Ok(HostOutcome::from_output(output).with_verbose_output(vec![format!("$ {}", command)]))
            }))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::Fixture;
    use super::*;
    use crate::environment::{Environment, Host};
    use crate::testing::RecordingRunner;

    fn ready(hostname: &str) -> Host {
        let mut host = Host::new(hostname, "deploy");
        host.set_password("secret");
        host
    }

    #[test]
    fn runs_over_each_host_tunnel() {
        let env = Environment::new("production")
            .with_host(ready("web1"))
            .with_host(ready("web2"));
        let runner = RecordingRunner::new().respond("uptime", &["up 3 days"], 0);
        let fixture = Fixture::new(runner, Some(env));
        let mut step = SshStep::new("uptime");

        let result = step.run(&fixture.context()).unwrap();

        assert!(result.is_success());
        assert_eq!(result.explanation(), Some("on all 2 hosts"));
        assert_eq!(
            result.output(),
            &["web1", "  up 3 days", "web2", "  up 3 days"].map(String::from)
        );
        let commands = fixture.runner.commands();
        assert_eq!(commands.iter().filter(|c| c.contains("-O exit")).count(), 2);
    }

    #[test]
    fn unreachable_host_is_counted_as_failed() {
        let env = Environment::new("production").with_host(ready("web1"));
        let runner = RecordingRunner::new().respond("ControlMaster=yes", &["Connection timed out"], 255);
        let fixture = Fixture::new(runner, Some(env));
        let mut step = SshStep::new("uptime");

        let result = step.run(&fixture.context()).unwrap();

        assert!(result.is_failure());
        assert_eq!(result.explanation(), Some("because 1 host(s) failed"));
        assert!(result.output().contains(&"  Connection timed out".to_string()));
    }

    #[test]
    fn without_environment_is_precondition_error() {
        let fixture = Fixture::new(RecordingRunner::new(), None);
        let err = SshStep::new("uptime").run(&fixture.context()).unwrap_err();
        assert_eq!(err.code.as_str(), "environment.not_available");
    }
}
