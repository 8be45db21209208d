use super::{ScriptContext, Step, StepBase};
use crate::error::{Error, Result};
use crate::result::StepResult;

/// Lists the hosts of the script's environment and whether each one is
/// ready for SSH.
pub struct HostListStep {
    base: StepBase,
}

impl HostListStep {
    pub fn new() -> Self {
        Self {
            base: StepBase::new("list-hosts"),
        }
    }
}

impl Default for HostListStep {
    fn default() -> Self {
        Self::new()
    }
}

impl Step for HostListStep {
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

        let output = environment
            .hosts()
            .iter()
            .map(|host| {
                let port = if host.port == 22 {
                    String::new()
                } else {
                    format!(":{}", host.port)
                };
                let state = if host.has_requirements_for_ssh_use() {
                    "ready"
                } else {
                    "not configured for SSH"
                };
                format!("{}{} ({})", host.address(), port, state)
            })
            .collect();

        Ok(StepResult::success(self.name(), output)
            .with_explanation(format!("for the {} environment", environment.name())))
    }
}
