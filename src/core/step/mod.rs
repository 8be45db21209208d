//! Units of orchestration work.
//!
//! Every step goes through the same lifecycle inside a [`Script`]:
//! `configure` (declare options) → `pre_run` → `run` (exactly one
//! [`StepResult`], or an `Err` for a violated precondition) → `post_run`,
//! which is deferred until the whole script has finished so hooks see the
//! final [`ScriptReport`].
//!
//! [`Script`]: crate::script::Script

mod check;
mod detect_config;
pub mod fan_out;
mod host_list;
mod notify;
mod scp;
mod script_step;
mod shell;
mod ssh;

pub use check::CheckStep;
pub use detect_config::DetectConfigStep;
pub use fan_out::{run_on_all_hosts, HostOutcome};
pub use host_list::HostListStep;
pub use notify::NotifyStep;
pub use scp::ScpStep;
pub use script_step::ScriptStep;
pub use shell::ShellStep;
pub use ssh::SshStep;

use heck::ToKebabCase;

use crate::defaults::Defaults;
use crate::environment::Environment;
use crate::error::Result;
use crate::exec::CommandRunner;
use crate::options::{OptionSchema, Options};
use crate::result::StepResult;
use crate::script::ScriptReport;
use crate::utils::template;

/// What a running step can see of its script.
pub struct ScriptContext<'a> {
    pub script: &'a str,
    pub environment: Option<&'a Environment>,
    pub options: &'a Options,
    /// Results of the steps that ran before this one.
    pub results: &'a [StepResult],
    pub runner: &'a dyn CommandRunner,
    pub settings: &'a Defaults,
}

/// Identity and filters shared by every step.
#[derive(Debug, Clone, Default)]
pub struct StepBase {
    name: String,
    environments: Vec<String>,
    required: bool,
}

impl StepBase {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

pub trait Step {
    fn base(&self) -> &StepBase;

    fn base_mut(&mut self) -> &mut StepBase;

    fn name(&self) -> &str {
        &self.base().name
    }

    fn set_name(&mut self, name: &str) {
        self.base_mut().name = name.to_string();
    }

    fn environments(&self) -> &[String] {
        &self.base().environments
    }

    /// Restrict the step to the named environments. Empty means everywhere.
    fn set_environments(&mut self, environments: Vec<String>) {
        self.base_mut().environments = environments;
    }

    fn applies_to_environment(&self, environment: Option<&Environment>) -> bool {
        let filters = &self.base().environments;
        filters.is_empty()
            || environment.is_some_and(|env| filters.iter().any(|name| name == env.name()))
    }

    /// A required step fails the script instead of being skipped when it
    /// does not apply.
    fn is_required(&self) -> bool {
        self.base().required
    }

    fn set_required(&mut self, required: bool) {
        self.base_mut().required = required;
    }

    fn configure(&self, _schema: &mut OptionSchema) {}

    fn pre_run(&mut self, _context: &ScriptContext) -> Result<()> {
        Ok(())
    }

    fn run(&mut self, context: &ScriptContext) -> Result<StepResult>;

    fn post_run(&mut self, _context: &ScriptContext, _report: &ScriptReport) -> Result<()> {
        Ok(())
    }

    /// Steps to append to the owning script right after this one.
    fn nested_steps(&mut self) -> Vec<Box<dyn Step>> {
        Vec::new()
    }
}

/// Consuming builders available on every concrete step.
pub trait StepBuilder: Step + Sized {
    fn named(mut self, name: &str) -> Self {
        self.set_name(name);
        self
    }

    fn only_in(mut self, environments: &[&str]) -> Self {
        self.set_environments(environments.iter().map(|e| e.to_string()).collect());
        self
    }

    fn required(mut self) -> Self {
        self.set_required(true);
        self
    }
}

impl<T: Step + Sized> StepBuilder for T {}

/// Kebab-case name from the first few words of a command line.
pub(crate) fn default_name(command: &str) -> String {
    let words: Vec<&str> = command.split_whitespace().take(3).collect();
    let name = words.join(" ").to_kebab_case();
    if name.is_empty() {
        "step".to_string()
    } else {
        name
    }
}

/// Declare one required option per `{{placeholder}}` in a command.
pub(crate) fn declare_placeholders(step: &str, command: &str, schema: &mut OptionSchema) {
    for name in template::placeholders(command) {
        schema.required(&name, format!("Value for {{{{{}}}}} in {}", name, step));
    }
}
