use clap::Args;
use serde::Serialize;

use stagehand::options::Options;
use stagehand::script::Script;
use stagehand::step::HostListStep;
use stagehand::ScriptReport;

use super::{exit_code, CmdResult, GlobalArgs};

#[derive(Args)]
pub struct HostsArgs {
    /// Only this environment; all environments when omitted
    #[arg(long, short)]
    pub env: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HostsOutput {
    pub reports: Vec<ScriptReport>,
    pub text: Vec<String>,
}

pub fn run(args: HostsArgs, global: &GlobalArgs) -> CmdResult<HostsOutput> {
    let project = global.load_project()?;
    let names = match args.env {
        Some(name) => vec![name],
        None => project.environment_names(),
    };

    let mut reports = Vec::new();
    for name in names {
        let mut script = Script::new("hosts", "List environment hosts", global.runner())
            .with_settings(global.settings.clone());
        script.set_environment(Some(project.environment(&name)?));
        script.add_step(HostListStep::new());
        reports.push(script.run(&Options::new())?);
    }

    let text = reports
        .iter()
        .flat_map(|report| report.results.iter().flat_map(|result| result.render(false)))
        .collect();
    let code = exit_code(reports.iter().all(ScriptReport::is_success));

    Ok((HostsOutput { reports, text }, code))
}
