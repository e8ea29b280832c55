use std::{cell::RefCell, time::Duration};

use anyhow::Result;

use crate::runner::{CommandOutput, CommandRunner};

#[derive(Debug, Clone)]
struct ScriptedRule {
    program: String,
    args_prefix: Vec<String>,
    output: CommandOutput,
}

#[derive(Debug, Default)]
/// `CommandRunner` that answers from a fixed table instead of spawning processes.
///
/// Rules match on program name plus an argument prefix; the first match wins.
/// Unmatched invocations exit with status 127, like a missing command.
pub struct ScriptedCommandRunner {
    rules: Vec<ScriptedRule>,
    calls: RefCell<Vec<Vec<String>>>,
}

impl ScriptedCommandRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(mut self, program: &str, args_prefix: &[&str], output: CommandOutput) -> Self {
        self.rules.push(ScriptedRule {
            program: program.to_string(),
            args_prefix: args_prefix.iter().map(|arg| arg.to_string()).collect(),
            output,
        });
        self
    }

    pub fn on_success(self, program: &str, args_prefix: &[&str], stdout: &str) -> Self {
        self.on(program, args_prefix, ok_output(stdout))
    }

    pub fn on_failure(self, program: &str, args_prefix: &[&str], stderr: &str) -> Self {
        self.on(
            program,
            args_prefix,
            CommandOutput {
                status_code: Some(1),
                stdout: String::new(),
                stderr: stderr.to_string(),
                timed_out: false,
            },
        )
    }

    /// Every invocation seen so far, program first.
    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.borrow().clone()
    }
}

fn ok_output(stdout: &str) -> CommandOutput {
    CommandOutput {
        status_code: Some(0),
        stdout: stdout.to_string(),
        stderr: String::new(),
        timed_out: false,
    }
}

impl CommandRunner for ScriptedCommandRunner {
    fn run(
        &self,
        program: &str,
        args: &[String],
        _stdin: Option<&str>,
        _timeout: Duration,
    ) -> Result<CommandOutput> {
        self.calls.borrow_mut().push(
            std::iter::once(program.to_string())
                .chain(args.iter().cloned())
                .collect(),
        );
        let matched = self.rules.iter().find(|rule| {
            rule.program == program
                && rule.args_prefix.len() <= args.len()
                && rule
                    .args_prefix
                    .iter()
                    .zip(args.iter())
                    .all(|(expected, actual)| expected == actual)
        });
        Ok(match matched {
            Some(rule) => rule.output.clone(),
            None => CommandOutput {
                status_code: Some(127),
                stdout: String::new(),
                stderr: format!("no scripted response for {program} {}", args.join(" ")),
                timed_out: false,
            },
        })
    }
}
