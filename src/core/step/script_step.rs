use super::{ScriptContext, Step, StepBase};
use crate::error::Result;
use crate::options::OptionSchema;
use crate::result::StepResult;
use crate::script::{Script, ScriptReport};

/// A whole script used as one step of another script.
pub struct ScriptStep {
    base: StepBase,
    script: Script,
    verbose: bool,
}

impl ScriptStep {
    pub fn new(script: Script) -> Self {
        Self {
            base: StepBase::new(script.name()),
            script,
            verbose: false,
        }
    }

    pub fn verbose(mut self) -> Self {
        self.verbose = true;
        self
    }
}

impl Step for ScriptStep {
    fn base(&self) -> &StepBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut StepBase {
        &mut self.base
    }

    fn configure(&self, schema: &mut OptionSchema) {
        self.script.configure_into(schema);
    }

    fn pre_run(&mut self, context: &ScriptContext) -> Result<()> {
        if self.script.environment().is_none() {
            self.script.set_environment(context.environment.cloned());
        }
        Ok(())
    }

    fn run(&mut self, context: &ScriptContext) -> Result<StepResult> {
        let report: ScriptReport = self.script.execute(context.options)?;

        let output = report
            .results
            .iter()
            .flat_map(|result| result.render(self.verbose))
            .collect();

        let result = if report.is_success() {
            StepResult::success(self.name(), output)
        } else {
            StepResult::failure(self.name(), output)
        };

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::Fixture;
    use super::super::ShellStep;
    use super::*;
    use crate::environment::Environment;
    use crate::testing::RecordingRunner;
    use std::sync::Arc;

    #[test]
    fn nested_failure_fails_the_step() {
        let runner = Arc::new(RecordingRunner::new().respond("false", &[], 1));
        let mut nested = Script::new("build", "Build assets", runner);
        nested.add_step(ShellStep::new("true"));
        nested.add_step(ShellStep::new("false"));

        let fixture = Fixture::new(RecordingRunner::new(), Some(Environment::new("staging")));
        let mut step = ScriptStep::new(nested);
        step.pre_run(&fixture.context()).unwrap();

        let result = step.run(&fixture.context()).unwrap();

        assert!(result.is_failure());
        assert_eq!(result.step(), "build");
        assert_eq!(result.output()[0], "✔ true completed successfully");
        assert_eq!(
            result.output()[1],
            "✘ false failed because the command exited with status 1"
        );
    }

    #[test]
    fn pre_run_inherits_environment() {
        let runner = Arc::new(RecordingRunner::new());
        let nested = Script::new("build", "Build assets", runner);
        let fixture = Fixture::new(RecordingRunner::new(), Some(Environment::new("staging")));

        let mut step = ScriptStep::new(nested);
        step.pre_run(&fixture.context()).unwrap();

        assert_eq!(step.script.environment().map(|e| e.name()), Some("staging"));
    }
}
