//! Run one host-scoped operation on every host of an environment and fold
//! the per-host outcomes into a single [`StepResult`].
//!
//! Hosts are classified three ways: misconfigured (no usable credential,
//! never run, counted separately from failures), skipped (only the first
//! host runs when `first_host_only` is set) and executed. Hosts run one at
//! a time in declaration order.

use crate::environment::{Environment, Host};
use crate::error::{Error, ErrorCode, Result};
use crate::exec::CommandOutput;
use crate::result::StepResult;

/// What running the operation on one host produced.
#[derive(Debug, Clone)]
pub enum HostOutcome {
    /// Ends the whole fan-out with this result.
    Terminal(StepResult),
    Completed {
        output: Vec<String>,
        exit_status: i32,
        verbose_output: Vec<String>,
    },
}

impl HostOutcome {
    pub fn completed(output: Vec<String>, exit_status: i32) -> Self {
        Self::Completed {
            output,
            exit_status,
            verbose_output: Vec::new(),
        }
    }

    pub fn from_output(output: CommandOutput) -> Self {
        Self::completed(output.lines, output.exit_status)
    }

    pub fn with_verbose_output(self, verbose: Vec<String>) -> Self {
        match self {
            Self::Completed {
                output,
                exit_status,
                ..
            } => Self::Completed {
                output,
                exit_status,
                verbose_output: verbose,
            },
            terminal => terminal,
        }
    }

    /// A host whose tunnel could not be opened counts as failed instead of
    /// aborting the remaining hosts.
    pub fn from_transport(outcome: Result<HostOutcome>) -> Result<HostOutcome> {
        match outcome {
            Err(err) if err.code == ErrorCode::SshTunnelFailed => {
                let mut output = vec![err.message.clone()];
                if let Some(lines) = err.details.get("output").and_then(|v| v.as_array()) {
                    output.extend(lines.iter().filter_map(|l| l.as_str()).map(str::to_string));
                }
                Ok(Self::completed(output, 255))
            }
            other => other,
        }
    }
}

pub fn run_on_all_hosts<F>(
    step: &str,
    environment: Option<&Environment>,
    first_host_only: bool,
    mut run_on_host: F,
) -> Result<StepResult>
where
    F: FnMut(&Host) -> Result<HostOutcome>,
{
    let environment = environment.ok_or_else(|| Error::environment_not_available(step))?;

    let mut output = Vec::new();
    let mut verbose_output = Vec::new();
    let mut failed = 0usize;
    let mut misconfigured = 0usize;

    for (index, host) in environment.hosts().iter().enumerate() {
        if !host.has_requirements_for_ssh_use() {
            misconfigured += 1;
            continue;
        }

        if first_host_only && index > 0 {
            output.push(format!(
                "{} skipped because this step is limited to the first host only.",
                host.hostname
            ));
            continue;
        }

        let (host_output, exit_status, host_verbose) = match run_on_host(host)? {
            HostOutcome::Terminal(result) => return Ok(result),
            HostOutcome::Completed {
                output,
                exit_status,
                verbose_output,
            } => (output, exit_status, verbose_output),
        };

        if exit_status != 0 {
            failed += 1;
        }

        append_section(&mut output, &host.hostname, &host_output);
        append_section(&mut verbose_output, &host.hostname, &host_verbose);
    }

    let hosts = environment.hosts();
    let result = if !hosts.is_empty() && failed == 0 && misconfigured == 0 {
        StepResult::success(step, output).with_explanation(success_explanation(hosts))
    } else {
        StepResult::failure(step, output)
            .with_explanation(failure_explanation(hosts.len(), failed, misconfigured))
    };

    Ok(result.with_verbose_output(verbose_output))
}

fn append_section(target: &mut Vec<String>, hostname: &str, lines: &[String]) {
    if lines.is_empty() {
        return;
    }

    target.push(hostname.to_string());
    target.extend(lines.iter().map(|line| format!("  {}", line)));
}

fn success_explanation(hosts: &[Host]) -> String {
    match hosts {
        [only] => format!("on {}", only.hostname),
        _ => format!("on all {} hosts", hosts.len()),
    }
}

fn failure_explanation(host_count: usize, failed: usize, misconfigured: usize) -> String {
    if host_count == 0 {
        return "because no hosts were added in the environment".to_string();
    }

    let mut clauses = Vec::new();
    if failed > 0 {
        clauses.push(format!("{} host(s) failed", failed));
    }
    if misconfigured > 0 {
        clauses.push(format!("{} host(s) were not configured for SSH", misconfigured));
    }

    format!("because {}", clauses.join(" and "))
}
