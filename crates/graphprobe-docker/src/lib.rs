//! Container inspection through the `docker` CLI.
//!
//! Every call goes through a [`CommandRunner`] with a timeout, so checks stay
//! bounded when the daemon hangs and tests can script responses.

pub mod docker;
pub mod runner;
pub mod scripted;

pub use docker::{
    parse_networks_json, parse_port_mappings, parse_ps_rows, ContainerStatus, DockerCli,
    PortMapping, ResourceUsage, DEFAULT_CONTAINER_NAME, DEFAULT_DOCKER_BINARY,
};
pub use runner::{render_command_line, CommandOutput, CommandRunner, ProcessCommandRunner};
pub use scripted::ScriptedCommandRunner;
