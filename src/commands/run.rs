use clap::Args;
use serde::Serialize;

use stagehand::options::{parse_pairs, OptionSpec};
use stagehand::ScriptReport;

use super::{exit_code, select_environment, CmdResult, GlobalArgs};

#[derive(Args)]
pub struct RunArgs {
    /// Script declared in stagehand.json
    pub script: String,

    /// Environment whose hosts the script targets
    #[arg(long, short)]
    pub env: Option<String>,

    /// Script option as key=value (repeatable)
    #[arg(long = "option", short = 'o', value_name = "KEY=VALUE")]
    pub options: Vec<String>,

    /// Include verbose step output in the rendered text
    #[arg(long, short)]
    pub verbose: bool,

    /// Skip the notification API even when a project key is set
    #[arg(long)]
    pub no_notify: bool,
}

#[derive(Debug, Serialize)]
pub struct RunOutput {
    pub report: ScriptReport,
    pub text: Vec<String>,
}

pub fn run(args: RunArgs, global: &GlobalArgs) -> CmdResult<RunOutput> {
    let project = global.load_project()?;
    let environment = select_environment(&project, args.env.as_deref())?;
    let notifier = if args.no_notify { None } else { global.notifier()? };

    let mut script = project.build_script(&args.script, environment, global.runner(), &global.settings, notifier)?;
    let report = script.run(&parse_pairs(&args.options)?)?;

    let text = report.render(args.verbose);
    let code = exit_code(report.is_success());
    Ok((RunOutput { report, text }, code))
}

#[derive(Args)]
pub struct ScriptsArgs {}

#[derive(Debug, Serialize)]
pub struct ScriptSummary {
    pub name: String,
    pub description: String,
    pub steps: Vec<String>,
    pub options: Vec<OptionSpec>,
}

#[derive(Debug, Serialize)]
pub struct ScriptsOutput {
    pub project: String,
    pub environments: Vec<String>,
    pub scripts: Vec<ScriptSummary>,
}

/// Declared scripts with their expanded steps and accepted options.
pub fn list(_args: ScriptsArgs, global: &GlobalArgs) -> CmdResult<ScriptsOutput> {
    let project = global.load_project()?;

    let scripts = project
        .script_names()
        .iter()
        .map(|name| {
            let script = project.build_script(name, None, global.runner(), &global.settings, None)?;
            Ok(ScriptSummary {
                name: name.clone(),
                description: script.description().to_string(),
                steps: script.step_names().iter().map(|s| s.to_string()).collect(),
                options: script.configure().specs().to_vec(),
            })
        })
        .collect::<stagehand::Result<Vec<_>>>()?;

    Ok((
        ScriptsOutput {
            project: project.name.clone(),
            environments: project.environment_names(),
            scripts,
        },
        0,
    ))
}
