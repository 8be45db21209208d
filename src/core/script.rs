//! Named, ordered composition of steps bound to an environment.
//!
//! Steps run in declaration order and the script stops at the first failing
//! step; the steps that were not reached are listed in
//! [`ScriptReport::skipped`] together with the steps that do not apply to
//! the selected environment. A step returning `Err` aborts the script and
//! the error reaches the caller. `post_run` hooks run after the last step,
//! for every step that produced a result, and see the final report.

use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use crate::defaults::Defaults;
use crate::environment::Environment;
use crate::error::Result;
use crate::exec::CommandRunner;
use crate::options::{OptionSchema, Options};
use crate::result::{Status, StepResult};
use crate::step::{ScriptContext, Step};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptReport {
    pub script: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
    pub status: Status,
    pub results: Vec<StepResult>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<String>,
}

impl ScriptReport {
    pub fn is_success(&self) -> bool {
        self.status == Status::Success
    }

    pub fn headline(&self) -> String {
        let target = match &self.environment {
            Some(environment) => format!(" on {}", environment),
            None => String::new(),
        };

        match self.status {
            Status::Success => format!("✔ {} script completed successfully{}", self.script, target),
            Status::Failure => format!("✘ {} script failed{}", self.script, target),
        }
    }

    pub fn render(&self, verbose: bool) -> Vec<String> {
        let mut lines: Vec<String> = self
            .results
            .iter()
            .flat_map(|result| result.render(verbose))
            .collect();

        if !self.skipped.is_empty() {
            lines.push(format!("Skipped: {}", self.skipped.join(", ")));
        }

        lines.push(self.headline());
        lines
    }
}

pub struct Script {
    name: String,
    description: String,
    environment: Option<Environment>,
    steps: Vec<Box<dyn Step>>,
    runner: Arc<dyn CommandRunner>,
    settings: Defaults,
}

impl Script {
    pub fn new(name: impl Into<String>, description: impl Into<String>, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            environment: None,
            steps: Vec::new(),
            runner,
            settings: Defaults::default(),
        }
    }

    pub fn with_settings(mut self, settings: Defaults) -> Self {
        self.settings = settings;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn environment(&self) -> Option<&Environment> {
        self.environment.as_ref()
    }

    pub fn environment_mut(&mut self) -> Option<&mut Environment> {
        self.environment.as_mut()
    }

    pub fn set_environment(&mut self, environment: Option<Environment>) {
        self.environment = environment;
    }

    pub fn runner(&self) -> Arc<dyn CommandRunner> {
        Arc::clone(&self.runner)
    }

    pub fn settings(&self) -> &Defaults {
        &self.settings
    }

    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|step| step.name()).collect()
    }

    /// Append a step, followed by any steps it registers.
    pub fn add_step<S: Step + 'static>(&mut self, step: S) -> &mut Self {
        self.add_boxed_step(Box::new(step))
    }

    pub fn add_boxed_step(&mut self, mut step: Box<dyn Step>) -> &mut Self {
        let nested = step.nested_steps();
        self.steps.push(step);
        for nested_step in nested {
            self.add_boxed_step(nested_step);
        }
        self
    }

    pub fn configure(&self) -> OptionSchema {
        let mut schema = OptionSchema::new();
        self.configure_into(&mut schema);
        schema
    }

    pub fn configure_into(&self, schema: &mut OptionSchema) {
        for step in &self.steps {
            step.configure(schema);
        }
    }

    /// Validate options against the steps' declarations, then execute.
    pub fn run(&mut self, supplied: &Options) -> Result<ScriptReport> {
        let options = self.configure().resolve(supplied)?;

        match &self.environment {
            Some(environment) => log_status!("script", "Running {} on {}...", self.name, environment.name()),
            None => log_status!("script", "Running {}...", self.name),
        }

        self.execute(&options)
    }

    /// Execute with already-resolved options.
    pub fn execute(&mut self, options: &Options) -> Result<ScriptReport> {
        let Self {
            name,
            environment,
            steps,
            runner,
            settings,
            ..
        } = self;
        let environment = Option::as_ref(environment);

        let mut results: Vec<StepResult> = Vec::new();
        let mut skipped = Vec::new();
        let mut ran = Vec::new();
        let mut halted = false;

        for (index, step) in steps.iter_mut().enumerate() {
            if halted {
                skipped.push(step.name().to_string());
                continue;
            }

            if !step.applies_to_environment(environment) {
                if step.is_required() {
                    let target = environment.map(|env| env.name()).unwrap_or("selected");
                    let result = StepResult::failure(step.name(), Vec::new())
                        .with_explanation(format!("because it does not apply to the {} environment", target));
                    log_status!("script", "{}", result.headline());
                    results.push(result);
                    halted = true;
                } else {
                    debug!(step = step.name(), "step does not apply to environment");
                    skipped.push(step.name().to_string());
                }
                continue;
            }

            let context = ScriptContext {
                script: name.as_str(),
                environment,
                options,
                results: &results,
                runner: &**runner,
                settings: &*settings,
            };

            step.pre_run(&context)?;
            let result = step.run(&context)?;

            log_status!("script", "{}", result.headline());
            halted = result.is_failure();
            results.push(result);
            ran.push(index);
        }

        let status = if results.iter().all(StepResult::is_success) {
            Status::Success
        } else {
            Status::Failure
        };

        let report = ScriptReport {
            script: name.clone(),
            environment: environment.map(|env| env.name().to_string()),
            status,
            results,
            skipped,
        };

        let context = ScriptContext {
            script: name.as_str(),
            environment,
            options,
            results: &report.results,
            runner: &**runner,
            settings: &*settings,
        };

        for index in ran {
            steps[index].post_run(&context, &report)?;
        }

        Ok(report)
    }
}
