//! Blocking subprocess execution with a per-invocation timeout.

use std::ffi::OsString;
use std::fmt;
use std::io::Read;
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use super::types::{TranscodeError, TranscodeResult};
use crate::logging::CommandSink;

/// Lines of stderr kept in `CommandFailed` errors.
pub const STDERR_TAIL_LINES: usize = 20;

const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Captured output of a finished command.
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Runs external tools, killing any that exceed the timeout.
#[derive(Clone)]
pub struct CommandRunner {
    timeout: Option<Duration>,
    command_sink: Option<CommandSink>,
}

impl fmt::Debug for CommandRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandRunner")
            .field("timeout", &self.timeout)
            .field("command_sink", &self.command_sink.is_some())
            .finish()
    }
}

impl CommandRunner {
    /// Create a runner. A timeout of 0 seconds disables the limit.
    pub fn new(timeout_secs: u64) -> Self {
        Self {
            timeout: (timeout_secs > 0).then(|| Duration::from_secs(timeout_secs)),
            command_sink: None,
        }
    }

    /// Also send every command line to `sink` (a run log, usually).
    pub fn with_command_sink(mut self, sink: CommandSink) -> Self {
        self.command_sink = Some(sink);
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Run `program` with `args`, returning its output on exit code 0.
    ///
    /// `tool` is the short name used in errors and logs.
    pub fn run(
        &self,
        tool: &str,
        program: &str,
        args: &[OsString],
    ) -> TranscodeResult<CommandOutput> {
        let line = format_command(program, args);
        tracing::debug!(tool, "$ {}", line);
        if let Some(sink) = &self.command_sink {
            sink(&line);
        }

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| TranscodeError::Spawn {
                tool: tool.to_string(),
                source,
            })?;

        // Drain both pipes on their own threads so a chatty tool cannot
        // block on a full pipe while we wait for it.
        let stdout = child.stdout.take().map(spawn_reader);
        let stderr = child.stderr.take().map(spawn_reader);

        let status = match self.wait(&mut child) {
            Ok(Some(status)) => status,
            Ok(None) => {
                let _ = child.kill();
                let _ = child.wait();
                let secs = self.timeout.map(|t| t.as_secs()).unwrap_or_default();
                tracing::warn!(tool, "killed after {}s", secs);
                return Err(TranscodeError::Timeout {
                    tool: tool.to_string(),
                    secs,
                });
            }
            Err(e) => {
                let _ = child.kill();
                return Err(TranscodeError::Io(e));
            }
        };

        let output = CommandOutput {
            stdout: stdout.map(join_reader).unwrap_or_default(),
            stderr: stderr.map(join_reader).unwrap_or_default(),
        };

        if !status.success() {
            return Err(TranscodeError::CommandFailed {
                tool: tool.to_string(),
                exit_code: status.code().unwrap_or(-1),
                stderr_tail: tail_lines(&output.stderr, STDERR_TAIL_LINES),
            });
        }

        Ok(output)
    }

    /// Wait for the child. `Ok(None)` means the timeout elapsed.
    fn wait(&self, child: &mut Child) -> std::io::Result<Option<std::process::ExitStatus>> {
        let Some(timeout) = self.timeout else {
            return child.wait().map(Some);
        };

        let deadline = Instant::now() + timeout;
        loop {
            if let Some(status) = child.try_wait()? {
                return Ok(Some(status));
            }
            if Instant::now() >= deadline {
                return Ok(None);
            }
            thread::sleep(POLL_INTERVAL);
        }
    }
}

impl Default for CommandRunner {
    fn default() -> Self {
        Self::new(600)
    }
}

fn spawn_reader<R: Read + Send + 'static>(mut pipe: R) -> thread::JoinHandle<String> {
    thread::spawn(move || {
        let mut buffer = Vec::new();
        let _ = pipe.read_to_end(&mut buffer);
        String::from_utf8_lossy(&buffer).into_owned()
    })
}

fn join_reader(handle: thread::JoinHandle<String>) -> String {
    handle.join().unwrap_or_default()
}

/// Render a command line for logs.
pub fn format_command(program: &str, args: &[OsString]) -> String {
    let mut line = program.to_string();
    for arg in args {
        let arg = arg.to_string_lossy();
        line.push(' ');
        if arg.is_empty() || arg.contains(char::is_whitespace) {
            line.push('"');
            line.push_str(&arg);
            line.push('"');
        } else {
            line.push_str(&arg);
        }
    }
    line
}

/// Last `count` non-empty lines of `text`, joined with newlines.
pub fn tail_lines(text: &str, count: usize) -> String {
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(count);
    lines[start..].join("\n")
}
