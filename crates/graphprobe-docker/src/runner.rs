use std::{
    io::{self, Read, Write},
    process::{Command, Stdio},
    thread::JoinHandle,
    time::Duration,
};

use anyhow::{anyhow, Context, Result};
use wait_timeout::ChildExt;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
/// Captured result of one subprocess invocation.
pub struct CommandOutput {
    pub status_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub timed_out: bool,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        !self.timed_out && self.status_code == Some(0)
    }

    /// Stdout followed by stderr; `docker logs` splits container output across both.
    pub fn combined(&self) -> String {
        if self.stderr.is_empty() {
            return self.stdout.clone();
        }
        if self.stdout.is_empty() {
            return self.stderr.clone();
        }
        format!("{}\n{}", self.stdout, self.stderr)
    }

    pub fn status_label(&self) -> String {
        if self.timed_out {
            return "timed_out".to_string();
        }
        self.status_code
            .map(|code| code.to_string())
            .unwrap_or_else(|| "terminated_by_signal".to_string())
    }
}

/// Runs external programs; the seam tests use to script docker responses.
pub trait CommandRunner {
    fn run(
        &self,
        program: &str,
        args: &[String],
        stdin: Option<&str>,
        timeout: Duration,
    ) -> Result<CommandOutput>;
}

impl<T: CommandRunner + ?Sized> CommandRunner for &T {
    fn run(
        &self,
        program: &str,
        args: &[String],
        stdin: Option<&str>,
        timeout: Duration,
    ) -> Result<CommandOutput> {
        (**self).run(program, args, stdin, timeout)
    }
}

#[derive(Debug, Clone, Copy, Default)]
/// Spawns real processes and enforces the timeout with `wait-timeout`.
pub struct ProcessCommandRunner;

impl CommandRunner for ProcessCommandRunner {
    fn run(
        &self,
        program: &str,
        args: &[String],
        stdin: Option<&str>,
        timeout: Duration,
    ) -> Result<CommandOutput> {
        let command_line = render_command_line(program, args);
        let mut child = Command::new(program)
            .args(args)
            .stdin(if stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("failed to spawn command: {command_line}"))?;

        let stdout_reader = spawn_pipe_reader(child.stdout.take());
        let stderr_reader = spawn_pipe_reader(child.stderr.take());
        // Written on its own thread so a full stdin pipe cannot outlast the timeout.
        let stdin_writer = match stdin {
            Some(input) => {
                let pipe = child
                    .stdin
                    .take()
                    .ok_or_else(|| anyhow!("failed to open stdin for command: {command_line}"))?;
                Some(spawn_stdin_writer(pipe, input.to_string()))
            }
            None => None,
        };

        let status = child
            .wait_timeout(timeout)
            .with_context(|| format!("failed while waiting for command: {command_line}"))?;
        let (status_code, timed_out) = match status {
            Some(status) => (status.code(), false),
            None => {
                let _ = child.kill();
                let _ = child.wait();
                tracing::warn!(
                    command = %command_line,
                    timeout_ms = timeout.as_millis() as u64,
                    "command timed out"
                );
                (None, true)
            }
        };

        if let Some(Ok(Err(error))) = stdin_writer.map(JoinHandle::join) {
            tracing::debug!(command = %command_line, %error, "stdin not fully written");
        }
        let stdout = join_pipe_reader(stdout_reader);
        let stderr = join_pipe_reader(stderr_reader);
        tracing::debug!(
            command = %command_line,
            status = ?status_code,
            timed_out,
            stdout_bytes = stdout.len(),
            stderr_bytes = stderr.len(),
            "command finished"
        );
        Ok(CommandOutput {
            status_code,
            stdout,
            stderr,
            timed_out,
        })
    }
}

fn spawn_pipe_reader<R>(pipe: Option<R>) -> Option<JoinHandle<String>>
where
    R: Read + Send + 'static,
{
    pipe.map(|mut pipe| {
        std::thread::spawn(move || {
            let mut buffer = Vec::new();
            let _ = pipe.read_to_end(&mut buffer);
            String::from_utf8_lossy(&buffer).into_owned()
        })
    })
}

fn spawn_stdin_writer<W>(mut pipe: W, input: String) -> JoinHandle<io::Result<()>>
where
    W: Write + Send + 'static,
{
    std::thread::spawn(move || pipe.write_all(input.as_bytes()))
}

fn join_pipe_reader(handle: Option<JoinHandle<String>>) -> String {
    handle
        .and_then(|handle| handle.join().ok())
        .unwrap_or_default()
}

pub fn render_command_line(program: &str, args: &[String]) -> String {
    std::iter::once(program.to_string())
        .chain(args.iter().cloned())
        .collect::<Vec<_>>()
        .join(" ")
}
