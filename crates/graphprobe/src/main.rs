mod bootstrap_helpers;
mod diagnostics_commands;
mod graph_commands;
mod llm_commands;
mod mcp_commands;
mod memory_commands;
mod report_output;
mod stack_runtime;

use std::io;

use anyhow::{Context, Result};
use clap::Parser;
use graphprobe_cli::{Cli, Command, StackConfig};

use crate::bootstrap_helpers::init_tracing;
use crate::stack_runtime::StackRuntime;

/// Runs one command and returns the process exit code.
fn run_cli(cli: Cli) -> Result<i32> {
    if let Command::Completions { shell } = cli.command {
        Cli::write_completions(shell, &mut io::stdout().lock())
            .context("failed to write shell completion")?;
        return Ok(0);
    }

    let config = StackConfig::resolve(&cli.stack).context("invalid stack configuration")?;
    tracing::debug!(
        settings = ?config.summary_fields(),
        "stack configuration resolved"
    );
    let runtime = StackRuntime::new(config)?;

    match cli.command {
        Command::Health { report, skip } => diagnostics_commands::health(&runtime, &report, &skip),
        Command::ConfigCheck { report } => diagnostics_commands::config_check(&runtime, &report),
        Command::Status { report } => diagnostics_commands::status(&runtime, &report),
        Command::Suite {
            report,
            suite,
            reports,
        } => diagnostics_commands::suite(&runtime, &report, suite.into(), reports),
        Command::Graph(command) => graph_commands::execute(&runtime, command),
        Command::Llm(command) => llm_commands::execute(&runtime, command),
        Command::Mcp(command) => mcp_commands::execute(&runtime, command),
        Command::Memory(command) => memory_commands::execute(&runtime, command),
        Command::Completions { .. } => Ok(0),
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let code = match run_cli(cli) {
        Ok(code) => code,
        Err(error) => {
            eprintln!("error: {error:#}");
            1
        }
    };
    std::process::exit(code);
}
