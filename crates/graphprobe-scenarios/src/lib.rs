//! Validation flows that exercise the memory stack end to end, and the suite
//! runner that groups them.

pub mod flows;
pub mod memories;
pub mod report;
pub mod suite;

pub use flows::{
    data_accessibility, memory_flow, seed_sample, tool_catalog, verify_memories,
    MemoryFlowSettings,
};
pub use memories::{SampleMemory, SAMPLE_MEMORIES, SAMPLE_SEARCHES};
pub use report::{render_scenario_report, ScenarioReport, StepResult};
pub use suite::{
    render_suite_report, render_suite_report_json, run_suite, McpConnector, SuiteKind,
    SuiteOutcome, SuiteReport, SuiteSelection, SuiteSettings,
};
