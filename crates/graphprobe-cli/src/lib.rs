//! Command-line surface for graphprobe: clap definitions, the TOML stack
//! profile and resolution of both into a validated [`StackConfig`].

pub mod cli_args;
pub mod cli_types;
pub mod profile;
pub mod stack_config;

pub use cli_args::{
    Cli, Command, GraphCommand, LlmCommand, McpCommand, MemoryCommand, ReportArgs, StackArgs,
};
pub use cli_types::{CliSuite, CliTransport};
pub use profile::{load_profile, parse_profile, StackProfile};
pub use stack_config::StackConfig;
