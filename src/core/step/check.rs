use super::{ScriptContext, Step, StepBase};
use crate::error::Result;
use crate::result::StepResult;

type CheckFn = Box<dyn Fn(&ScriptContext) -> Result<()>>;

/// Local precondition or housekeeping closure. An `Err` aborts the script.
pub struct CheckStep {
    base: StepBase,
    check: CheckFn,
}

impl CheckStep {
    pub fn new<F>(name: &str, check: F) -> Self
    where
        F: Fn(&ScriptContext) -> Result<()> + 'static,
    {
        Self {
            base: StepBase::new(name),
            check: Box::new(check),
        }
    }
}

impl Step for CheckStep {
    fn base(&self) -> &StepBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut StepBase {
        &mut self.base
    }

    fn run(&mut self, context: &ScriptContext) -> Result<StepResult> {
        (self.check)(context)?;
        Ok(StepResult::success(self.name(), Vec::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::Fixture;
    use super::*;
    use crate::error::Error;
    use crate::testing::RecordingRunner;

    #[test]
    fn passing_check_succeeds() {
        let fixture = Fixture::new(RecordingRunner::new(), None);
        let mut step = CheckStep::new("check-for-public-key", |_| Ok(()));
        assert!(step.run(&fixture.context()).unwrap().is_success());
    }

    #[test]
    fn failing_check_propagates_error() {
        let fixture = Fixture::new(RecordingRunner::new(), None);
        let mut step = CheckStep::new("check-for-public-key", |_| {
            Err(Error::ssh_public_key_missing("ssh-keys/id_rsa.pub"))
        });

        let err = step.run(&fixture.context()).unwrap_err();
        assert_eq!(err.code.as_str(), "ssh.public_key_missing");
    }
}
