//! Outcome of a single step.
//!
//! A `StepResult` is assembled by the step that produced it through the
//! consuming `with_*` builders and is read-only once `run` returns it.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Success,
    Failure,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepResult {
    step: String,
    status: Status,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    output: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    verbose_output: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    explanation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    status_message: Option<String>,
}

impl StepResult {
    pub fn new(step: impl Into<String>, status: Status, output: Vec<String>) -> Self {
        Self {
            step: step.into(),
            status,
            output,
            verbose_output: Vec::new(),
            explanation: None,
            status_message: None,
        }
    }

    pub fn success(step: impl Into<String>, output: Vec<String>) -> Self {
        Self::new(step, Status::Success, output)
    }

    pub fn failure(step: impl Into<String>, output: Vec<String>) -> Self {
        Self::new(step, Status::Failure, output)
    }

    /// Success/failure from a process exit status.
    pub fn from_exit_status(step: impl Into<String>, exit_status: i32, output: Vec<String>) -> Self {
        if exit_status == 0 {
            Self::success(step, output)
        } else {
            Self::failure(step, output)
                .with_explanation(format!("because the command exited with status {}", exit_status))
        }
    }

    pub fn with_explanation(mut self, explanation: impl Into<String>) -> Self {
        self.explanation = Some(explanation.into());
        self
    }

    pub fn with_verbose_output(mut self, verbose_output: Vec<String>) -> Self {
        self.verbose_output = verbose_output;
        self
    }

    pub fn with_status_message(mut self, message: impl Into<String>) -> Self {
        self.status_message = Some(message.into());
        self
    }

    pub fn step(&self) -> &str {
        &self.step
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn is_success(&self) -> bool {
        self.status == Status::Success
    }

    pub fn is_failure(&self) -> bool {
        self.status == Status::Failure
    }

    pub fn output(&self) -> &[String] {
        &self.output
    }

    pub fn verbose_output(&self) -> &[String] {
        &self.verbose_output
    }

    pub fn explanation(&self) -> Option<&str> {
        self.explanation.as_deref()
    }

    pub fn status_message(&self) -> Option<&str> {
        self.status_message.as_deref()
    }

    /// One-line summary used as the header of [`render`](Self::render).
    pub fn headline(&self) -> String {
        if let Some(message) = &self.status_message {
            return format!("{} {}", self.step, message);
        }

        let (mark, verb) = match self.status {
            Status::Success => ("✔", "completed successfully"),
            Status::Failure => ("✘", "failed"),
        };

        match &self.explanation {
            Some(explanation) => format!("{} {} {} {}", mark, self.step, verb, explanation),
            None => format!("{} {} {}", mark, self.step, verb),
        }
    }

    /// Human-readable lines: headline, indented output, then verbose output
    /// when requested.
    pub fn render(&self, verbose: bool) -> Vec<String> {
        let mut lines = vec![self.headline()];
        lines.extend(self.output.iter().map(|line| format!("  {}", line)));

        if verbose {
            lines.extend(self.verbose_output.iter().map(|line| format!("  {}", line)));
        }

        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_headline_appends_explanation() {
        let result = StepResult::failure("deploy", vec![])
            .with_explanation("because 1 host(s) failed");
        assert_eq!(result.headline(), "✘ deploy failed because 1 host(s) failed");
    }

    #[test]
    fn success_headline_appends_explanation() {
        let result = StepResult::success("restart", vec![]).with_explanation("on web1");
        assert_eq!(result.headline(), "✔ restart completed successfully on web1");
    }

    #[test]
    fn status_message_overrides_headline() {
        let result = StepResult::success("notify", vec![])
            .with_explanation("ignored")
            .with_status_message("is ready to run at the end of this script");
        assert_eq!(
            result.headline(),
            "notify is ready to run at the end of this script"
        );
    }

    #[test]
    fn render_hides_verbose_output_unless_asked() {
        let result = StepResult::success("ls", vec!["a".to_string()])
            .with_verbose_output(vec!["debug".to_string()]);

        assert_eq!(result.render(false).len(), 2);
        assert_eq!(result.render(true)[2], "  debug");
    }

    #[test]
    fn from_exit_status_explains_non_zero() {
        let result = StepResult::from_exit_status("build", 2, vec![]);
        assert!(result.is_failure());
        assert_eq!(
            result.explanation(),
            Some("because the command exited with status 2")
        );
    }
}
