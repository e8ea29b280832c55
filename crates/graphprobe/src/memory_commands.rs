use anyhow::{Context, Result};
use graphprobe_cli::MemoryCommand;
use graphprobe_core::thread_sleeper;
use graphprobe_mcp::AddMemoryRequest;
use graphprobe_scenarios::{memory_flow, render_scenario_report, verify_memories};

use crate::mcp_commands::render_tool_outcome;
use crate::report_output::emit;
use crate::stack_runtime::StackRuntime;

pub(crate) fn execute(runtime: &StackRuntime, command: MemoryCommand) -> Result<i32> {
    let group_id = runtime.config.group_id.as_str();
    match command {
        MemoryCommand::Add {
            name,
            body,
            source_description,
        } => {
            let request =
                AddMemoryRequest::text(&name, &body, &source_description).with_group(group_id);
            let mut client = runtime.mcp_client()?;
            let outcome = client
                .add_memory(&request)
                .with_context(|| format!("add_memory '{name}' failed"))?;
            emit(
                &format!(
                    "memory add: name={name} group_id={group_id} result={}",
                    render_tool_outcome(&outcome)
                ),
                None,
            )?;
            Ok(0)
        }
        MemoryCommand::Flow { cleanup } => {
            let settings = runtime.config.memory_flow_settings(cleanup);
            let mut client = runtime.mcp_client()?;
            let mut sleeper = thread_sleeper;
            let report = memory_flow(&mut client, &runtime.graph, &settings, &mut sleeper);
            emit(&render_scenario_report(&report), None)?;
            Ok(if report.passed { 0 } else { 1 })
        }
        MemoryCommand::Verify { sources, limit } => {
            let report = verify_memories(&runtime.graph, group_id, &sources, limit);
            emit(&render_scenario_report(&report), None)?;
            Ok(if report.passed { 0 } else { 1 })
        }
        MemoryCommand::Search { query, limit } => {
            let group_ids = vec![group_id.to_string()];
            let mut client = runtime.mcp_client()?;
            let nodes = client
                .search_memory_nodes(&query, &group_ids, limit)
                .context("search_memory_nodes failed")?;
            let memory_facts = client
                .search_memory_facts(&query, &group_ids, limit)
                .context("search_memory_facts failed")?;
            emit(
                &format!(
                    "memory search: query={query} group_id={group_id}\n# nodes\n{}\n# facts\n{}",
                    render_tool_outcome(&nodes),
                    render_tool_outcome(&memory_facts)
                ),
                None,
            )?;
            Ok(0)
        }
    }
}
