use clap::ValueEnum;
use graphprobe_scenarios::SuiteSelection;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CliTransport {
    Stdio,
    Sse,
    Http,
}

impl CliTransport {
    pub fn as_str(self) -> &'static str {
        match self {
            CliTransport::Stdio => "stdio",
            CliTransport::Sse => "sse",
            CliTransport::Http => "http",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CliSuite {
    Unit,
    Integration,
    Validation,
    All,
}

impl From<CliSuite> for SuiteSelection {
    fn from(value: CliSuite) -> Self {
        match value {
            CliSuite::Unit => SuiteSelection::Unit,
            CliSuite::Integration => SuiteSelection::Integration,
            CliSuite::Validation => SuiteSelection::Validation,
            CliSuite::All => SuiteSelection::All,
        }
    }
}
