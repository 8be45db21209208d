//! `stagehand.json`: a project's environments and declarative scripts.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::api::NotificationClient;
use crate::cache::FileCache;
use crate::defaults::Defaults;
use crate::detect::ConfigFactory;
use crate::environment::Environment;
use crate::error::{Error, Result};
use crate::exec::CommandRunner;
use crate::paths;
use crate::script::Script;
use crate::step::{
    DetectConfigStep, HostListStep, NotifyStep, ScpStep, ScriptStep, ShellStep, SshStep, Step,
};
use crate::utils::io;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum StepKind {
    Shell {
        command: String,
    },
    Ssh {
        command: String,
        #[serde(default)]
        first_host_only: bool,
    },
    Scp {
        local: String,
        #[serde(default)]
        remote: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        permissions: Option<String>,
        #[serde(default)]
        first_host_only: bool,
    },
    DetectConfig {
        #[serde(default)]
        first_host_only: bool,
    },
    Hosts,
    Script {
        script: String,
        #[serde(default)]
        verbose: bool,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepDefinition {
    #[serde(flatten)]
    pub kind: StepKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub environments: Vec<String>,
    #[serde(default)]
    pub required: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScriptDefinition {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub steps: Vec<StepDefinition>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub name: String,
    #[serde(default)]
    pub environments: BTreeMap<String, Environment>,
    #[serde(default)]
    pub scripts: BTreeMap<String, ScriptDefinition>,
    #[serde(skip)]
    root: PathBuf,
}

impl Project {
    pub fn load(root: &Path) -> Result<Self> {
        let file = paths::project_file(root);
        if !file.is_file() {
            return Err(Error::project_not_found(root.display().to_string()));
        }

        let content = io::read_file(&file, "read project config")?;
        let mut project: Project = serde_json::from_str(&content)
            .map_err(|e| Error::config_invalid_json(file.display().to_string(), e))?;
        project.root = root.to_path_buf();
        Ok(project)
    }

    /// Load from `start` or the nearest ancestor holding `stagehand.json`.
    pub fn discover(start: &Path) -> Result<Self> {
        let found = start
            .ancestors()
            .find(|dir| paths::project_file(dir).is_file())
            .ok_or_else(|| Error::project_not_found(start.display().to_string()))?;
        Self::load(found)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn environment_names(&self) -> Vec<String> {
        self.environments.keys().cloned().collect()
    }

    pub fn script_names(&self) -> Vec<String> {
        self.scripts.keys().cloned().collect()
    }

    /// Named environment with identity files resolved against the root.
    pub fn environment(&self, name: &str) -> Result<Environment> {
        let mut environment = self
            .environments
            .get(name)
            .cloned()
            .ok_or_else(|| Error::environment_not_found(name, self.environment_names()))?;

        environment.set_name(name);
        for host in environment.hosts_mut() {
            host.resolve_identity_file(&self.root);
        }
        Ok(environment)
    }

    /// Build a declared script. The notification step, when given, runs first.
    pub fn build_script(
        &self,
        name: &str,
        environment: Option<Environment>,
        runner: Arc<dyn CommandRunner>,
        settings: &Defaults,
        notifier: Option<Box<dyn NotificationClient>>,
    ) -> Result<Script> {
        let definition = self.definition(name)?;
        let steps = self.steps_for(definition, Arc::clone(&runner), settings, &mut vec![name.to_string()])?;

        let mut script = Script::new(name, definition.description.clone(), runner).with_settings(settings.clone());
        script.set_environment(environment);

        if let Some(client) = notifier {
            script.add_step(NotifyStep::new(client));
        }
        for step in steps {
            script.add_boxed_step(step);
        }
        Ok(script)
    }

    fn definition(&self, name: &str) -> Result<&ScriptDefinition> {
        self.scripts
            .get(name)
            .ok_or_else(|| Error::script_not_found(name, self.script_names()))
    }

    /// Nested script for a `script` step; `stack` holds the scripts being built.
    fn assemble(
        &self,
        name: &str,
        runner: Arc<dyn CommandRunner>,
        settings: &Defaults,
        stack: &mut Vec<String>,
    ) -> Result<Script> {
        if stack.iter().any(|entry| entry == name) {
            return Err(Error::validation_invalid_argument(
                "script",
                "Script includes itself",
                Some(name.to_string()),
                Some(stack.clone()),
            ));
        }

        let definition = self.definition(name)?;
        stack.push(name.to_string());
        let steps = self.steps_for(definition, Arc::clone(&runner), settings, stack)?;
        stack.pop();

        let mut script = Script::new(name, definition.description.clone(), runner).with_settings(settings.clone());
        for step in steps {
            script.add_boxed_step(step);
        }
        Ok(script)
    }

    fn steps_for(
        &self,
        definition: &ScriptDefinition,
        runner: Arc<dyn CommandRunner>,
        settings: &Defaults,
        stack: &mut Vec<String>,
    ) -> Result<Vec<Box<dyn Step>>> {
        definition
            .steps
            .iter()
            .map(|step| self.build_step(step, Arc::clone(&runner), settings, stack))
            .collect()
    }

    fn build_step(
        &self,
        definition: &StepDefinition,
        runner: Arc<dyn CommandRunner>,
        settings: &Defaults,
        stack: &mut Vec<String>,
    ) -> Result<Box<dyn Step>> {
        let mut step: Box<dyn Step> = match &definition.kind {
            StepKind::Shell { command } => Box::new(ShellStep::new(command.clone())),
            StepKind::Ssh {
                command,
                first_host_only,
            } => {
                let step = SshStep::new(command.clone());
                Box::new(if *first_host_only { step.first_host_only() } else { step })
            }
            StepKind::Scp {
                local,
                remote,
                permissions,
                first_host_only,
            } => {
                let mut step = ScpStep::new(self.root.join(local), remote.clone());
                if let Some(mode) = permissions {
                    step = step.with_permissions(mode.clone());
                }
                Box::new(if *first_host_only { step.first_host_only() } else { step })
            }
            StepKind::DetectConfig { first_host_only } => {
                let cache = FileCache::for_project(&self.root)?;
                let step = DetectConfigStep::new(ConfigFactory::new(Some(Box::new(cache))));
                Box::new(if *first_host_only { step.first_host_only() } else { step })
            }
            StepKind::Hosts => Box::new(HostListStep::new()),
            StepKind::Script { script, verbose } => {
                let nested = self.assemble(script, runner, settings, stack)?;
                let step = ScriptStep::new(nested);
                Box::new(if *verbose { step.verbose() } else { step })
            }
        };

        if let Some(name) = &definition.name {
            step.set_name(name);
        }
        if !definition.environments.is_empty() {
            step.set_environments(definition.environments.clone());
        }
        step.set_required(definition.required);

        Ok(step)
    }
}
