use super::fan_out::{run_on_all_hosts, HostOutcome};
use super::{ScriptContext, Step, StepBase};
use crate::detect::ConfigFactory;
use crate::error::{Error, ErrorCode, Result};
use crate::result::StepResult;

/// Discovers the configuration on each host of the environment.
pub struct DetectConfigStep {
    base: StepBase,
    factory: ConfigFactory,
    first_host_only: bool,
}

impl DetectConfigStep {
    pub fn new(factory: ConfigFactory) -> Self {
        Self {
            base: StepBase::new("detect-config"),
            factory,
            first_host_only: false,
        }
    }

    pub fn first_host_only(mut self) -> Self {
        self.first_host_only = true;
        self
    }
}

impl Step for DetectConfigStep {
    fn base(&self) -> &StepBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut StepBase {
        &mut self.base
    }

    fn run(&mut self, context: &ScriptContext) -> Result<StepResult> {
        let environment = context
            .environment
            .ok_or_else(|| Error::environment_not_available(self.name()))?;
        let factory = &mut self.factory;

        run_on_all_hosts(&self.base.name, Some(environment), self.first_host_only, |host| {
            let mut tunnel = host.tunnel(context.runner, &context.settings.ssh);

            match factory.detect_configs_on_host(environment, &mut tunnel) {
                Ok(configs) => Ok(HostOutcome::completed(
                    configs.iter().flat_map(|config| config.summary()).collect(),
                    0,
                )),
                Err(err) if err.code == ErrorCode::ConfigNotFound => {
                    Ok(HostOutcome::completed(vec![err.message], 1))
                }
                Err(err) => HostOutcome::from_transport(Err(err)),
            }
        })
    }
}
