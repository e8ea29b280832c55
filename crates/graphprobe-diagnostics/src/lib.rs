//! Health, configuration and status reports for the memory stack.
//!
//! Every probe failure is captured as a `fail` check with a reason code
//! rather than propagated, so a report is always produced. Reports render as
//! `key=value` text lines or JSON.

pub mod checks;
pub mod config_check;
pub mod health;
pub mod probes;
pub mod status;

pub use checks::{count_checks, CheckCounts, CheckResult, CheckStatus, ComponentReport};
pub use config_check::{
    render_config_check_report, render_config_check_report_json, run_config_check,
    ConfigCheckReport, ConfigExpectations, EnvExpectation,
};
pub use health::{
    check_docker_container, check_mcp_endpoint, check_mcp_server_init, check_neo4j, check_ollama,
    evaluate_verdict, render_health_report, render_health_report_json, run_health_check,
    HealthReport, HealthSettings, Verdict, COMPONENT_DOCKER_CONTAINER, COMPONENT_MCP_ENDPOINT,
    COMPONENT_MCP_SERVER_INIT, COMPONENT_NEO4J, COMPONENT_OLLAMA, DEFAULT_LOG_TAIL_LINES,
    HEALTH_COMPONENTS,
};
pub use probes::{SseProbeFn, StackProbes};
pub use status::{
    build_status_report, render_status_report, render_status_report_json, ModelLiveness,
    StatusReport, StatusSettings,
};
