//! Child-process execution with captured output, cancellation and timeout

use super::CommandSpec;
use crate::error::PipeError;
use std::io::{BufRead, BufReader, Read, Write};
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// How long to wait for output readers after killing an interrupted run
const READER_GRACE: Duration = Duration::from_secs(1);

/// Shared cancellation flag, checked between polls of a running child
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    /// Signal cancellation. Idempotent.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub working_dir: PathBuf,
    pub timeout: Option<Duration>,
    /// Stream child output live (DEBUG mode) in addition to capturing it
    pub echo: bool,
    pub cancel: CancelToken,
    /// Environment applied to every child, before the command's own env
    pub env: Vec<(String, String)>,
}

impl RunOptions {
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: working_dir.into(),
            timeout: None,
            echo: false,
            cancel: CancelToken::new(),
            env: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExecutionResult {
    pub command: String,
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub duration: Duration,
    pub timed_out: bool,
    pub cancelled: bool,
    pub success: bool,
    pub blocking: bool,
}

impl ExecutionResult {
    /// Build a result from a finished command, applying `fail_on_output`
    pub fn finished(
        spec: &CommandSpec,
        exit_code: Option<i32>,
        stdout: String,
        stderr: String,
        duration: Duration,
    ) -> Self {
        let success =
            exit_code == Some(0) && !(spec.fail_on_output && !stdout.trim().is_empty());
        Self {
            command: spec.display(),
            exit_code,
            stdout,
            stderr,
            duration,
            timed_out: false,
            cancelled: false,
            success,
            blocking: spec.blocking,
        }
    }

    /// Prefers stderr, falls back to stdout
    pub fn error_text(&self) -> &str {
        if !self.stderr.trim().is_empty() {
            self.stderr.trim()
        } else {
            self.stdout.trim()
        }
    }

    /// Last `lines` lines of the error text
    pub fn error_tail(&self, lines: usize) -> String {
        let text: Vec<&str> = self.error_text().lines().collect();
        let start = text.len().saturating_sub(lines);
        text[start..].join("\n")
    }

    /// Timeout or cancellation as a typed error
    pub fn interruption(&self, timeout: Option<Duration>) -> Option<PipeError> {
        if self.cancelled {
            Some(PipeError::Cancelled {
                command: self.command.clone(),
            })
        } else if self.timed_out {
            Some(PipeError::TimedOut {
                command: self.command.clone(),
                seconds: timeout.map(|t| t.as_secs()).unwrap_or_default(),
            })
        } else {
            None
        }
    }
}

/// Seam between dispatch logic and real process spawning
pub trait CommandRunner: Send + Sync {
    /// Runs one command to completion. Only failure to start is an error;
    /// a nonzero exit, timeout or cancellation is reported in the result.
    fn run(&self, spec: &CommandSpec, options: &RunOptions) -> Result<ExecutionResult, PipeError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl SystemRunner {
    pub fn new() -> Self {
        Self
    }
}

fn capture<R: Read + Send + 'static>(stream: R, echo: bool, to_stderr: bool) -> Receiver<String> {
    let (tx, rx) = mpsc::channel();
    std::thread::spawn(move || {
        let mut buf = String::new();
        let reader = BufReader::new(stream);
        for line in reader.lines() {
            let Ok(line) = line else { break };
            if echo {
                if to_stderr {
                    eprintln!("{}", line);
                } else {
                    println!("{}", line);
                }
            }
            buf.push_str(&line);
            buf.push('\n');
        }
        let _ = tx.send(buf);
    });
    rx
}

/// Kills the child and everything it spawned. The child leads its own
/// process group, so its pid is the group id.
fn kill_tree(child: &mut Child) {
    #[cfg(unix)]
    {
        if let Ok(pgid) = libc::pid_t::try_from(child.id()) {
            // SAFETY: kill(2) with a negative pid only signals that process group
            unsafe {
                libc::kill(-pgid, libc::SIGKILL);
            }
        }
    }
    let _ = child.kill();
    let _ = child.wait();
}

fn wait_with_deadline(
    child: &mut Child,
    options: &RunOptions,
    start: Instant,
) -> (Option<ExitStatus>, bool, bool) {
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return (Some(status), false, false),
            Ok(None) => {}
            Err(e) => {
                warn!("Failed to poll child process: {}", e);
                return (None, false, false);
            }
        }

        if options.cancel.is_cancelled() {
            kill_tree(child);
            return (None, false, true);
        }

        if let Some(timeout) = options.timeout {
            if start.elapsed() > timeout {
                kill_tree(child);
                return (None, true, false);
            }
        }

        std::thread::sleep(POLL_INTERVAL);
    }
}

impl CommandRunner for SystemRunner {
    fn run(&self, spec: &CommandSpec, options: &RunOptions) -> Result<ExecutionResult, PipeError> {
        debug!(command = %spec.display(), dir = %options.working_dir.display(), "Spawning");

        let mut command = Command::new(&spec.program);
        command
            .args(&spec.args)
            .current_dir(&options.working_dir)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .stdin(if spec.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            });
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }
        for (key, value) in options.env.iter().chain(spec.env.iter()) {
            command.env(key, value);
        }

        let start = Instant::now();
        let mut child = command.spawn().map_err(|source| PipeError::Spawn {
            program: spec.program.clone(),
            source,
        })?;

        if let (Some(input), Some(mut stdin)) = (spec.stdin.clone(), child.stdin.take()) {
            std::thread::spawn(move || {
                let _ = stdin.write_all(input.as_bytes());
            });
        }

        let stdout = child.stdout.take().map(|s| capture(s, options.echo, false));
        let stderr = child.stderr.take().map(|s| capture(s, options.echo, true));

        let (status, timed_out, cancelled) = wait_with_deadline(&mut child, options, start);

        // A process that escaped the group may still hold the pipes open
        let interrupted = timed_out || cancelled;
        let join = |output: Option<Receiver<String>>| {
            output
                .and_then(|rx| {
                    if interrupted {
                        rx.recv_timeout(READER_GRACE).ok()
                    } else {
                        rx.recv().ok()
                    }
                })
                .unwrap_or_default()
        };
        let stdout = join(stdout);
        let stderr = join(stderr);

        let mut result = ExecutionResult::finished(
            spec,
            status.and_then(|s| s.code()),
            stdout,
            stderr,
            start.elapsed(),
        );
        result.timed_out = timed_out;
        result.cancelled = cancelled;
        if timed_out || cancelled {
            result.success = false;
        }

        debug!(
            command = %result.command,
            exit_code = ?result.exit_code,
            duration_ms = result.duration.as_millis() as u64,
            "Finished"
        );
        Ok(result)
    }
}
