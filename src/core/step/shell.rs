use super::{declare_placeholders, default_name, ScriptContext, Step, StepBase};
use crate::error::Result;
use crate::exec::TerminalSpinner;
use crate::options::OptionSchema;
use crate::result::StepResult;
use crate::utils::template;

/// Local shell command.
pub struct ShellStep {
    base: StepBase,
    command: String,
}

impl ShellStep {
    pub fn new(command: impl Into<String>) -> Self {
        let command = command.into();
        Self {
            base: StepBase::new(default_name(&command)),
            command,
        }
    }

    pub fn command(&self) -> &str {
        &self.command
    }
}

impl Step for ShellStep {
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
        let mut spinner = TerminalSpinner::new(format!("Running {}...", self.name()));

        let output = context.runner.run_with_spinner(&command, Some(&mut spinner))?;

        Ok(StepResult::from_exit_status(self.name(), output.exit_status, output.lines)
            .with_verbose_output(vec![format!("$ {}", command)]))
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::Fixture;
    use super::*;
    use crate::testing::RecordingRunner;

    #[test]
    fn renders_options_into_command() {
        let mut fixture = Fixture::new(RecordingRunner::new(), None);
        fixture.options.insert("branch".to_string(), "main".to_string());
        let mut step = ShellStep::new("git checkout {{branch}}");

        let result = step.run(&fixture.context()).unwrap();

        assert!(result.is_success());
        assert_eq!(fixture.runner.commands(), vec!["git checkout main"]);
        assert_eq!(result.verbose_output(), &["$ git checkout main".to_string()]);
    }

    #[test]
    fn non_zero_exit_is_failure_with_output() {
        let runner = RecordingRunner::new().respond("make", &["make: *** No rule"], 2);
        let fixture = Fixture::new(runner, None);
        let mut step = ShellStep::new("make release");

        let result = step.run(&fixture.context()).unwrap();

        assert!(result.is_failure());
        assert_eq!(result.step(), "make-release");
        assert_eq!(result.output(), &["make: *** No rule".to_string()]);
    }
}
