//! Scripted command runner for tests and dry runs
//!
//! Rules match on the printable command line by prefix; the longest matching
//! prefix wins. One-shot rules are consumed before sticky ones. Unmatched
//! commands succeed with empty output.

use super::runner::{CommandRunner, ExecutionResult, RunOptions};
use super::CommandSpec;
use crate::error::PipeError;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

/// Canned outcome for a command
#[derive(Debug, Clone, Default)]
pub struct Scripted {
    exit_code: Option<i32>,
    stdout: String,
    stderr: String,
    spawn_error: bool,
    timed_out: bool,
    /// Files written relative to the working directory when the command "runs"
    writes: Vec<(PathBuf, String)>,
}

impl Scripted {
    pub fn ok() -> Self {
        Self::exit(0)
    }

    pub fn exit(code: i32) -> Self {
        Self {
            exit_code: Some(code),
            ..Self::default()
        }
    }

    /// Program not installed
    pub fn missing() -> Self {
        Self {
            spawn_error: true,
            ..Self::default()
        }
    }

    pub fn timed_out() -> Self {
        Self {
            timed_out: true,
            ..Self::default()
        }
    }

    pub fn stdout(mut self, stdout: impl Into<String>) -> Self {
        self.stdout = stdout.into();
        self
    }

    pub fn stderr(mut self, stderr: impl Into<String>) -> Self {
        self.stderr = stderr.into();
        self
    }

    pub fn writes(mut self, path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        self.writes.push((path.into(), content.into()));
        self
    }
}

/// A command the runner was asked to execute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub command: String,
    pub env: Vec<(String, String)>,
    pub stdin: Option<String>,
}

#[derive(Default)]
struct Rules {
    once: VecDeque<(String, Scripted)>,
    sticky: Vec<(String, Scripted)>,
}

#[derive(Default)]
pub struct ScriptedRunner {
    rules: Mutex<Rules>,
    calls: Mutex<Vec<RecordedCall>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every command starting with `prefix` gets this outcome
    pub fn on(self, prefix: &str, outcome: Scripted) -> Self {
        lock(&self.rules).sticky.push((prefix.to_string(), outcome));
        self
    }

    /// The next command starting with `prefix` gets this outcome
    pub fn once(self, prefix: &str, outcome: Scripted) -> Self {
        lock(&self.rules).once.push_back((prefix.to_string(), outcome));
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        lock(&self.calls).clone()
    }

    pub fn commands(&self) -> Vec<String> {
        lock(&self.calls).iter().map(|c| c.command.clone()).collect()
    }

    fn outcome_for(&self, command: &str) -> Scripted {
        let mut rules = lock(&self.rules);
        if let Some(idx) = rules.once.iter().position(|(p, _)| command.starts_with(p.as_str())) {
            if let Some((_, outcome)) = rules.once.remove(idx) {
                return outcome;
            }
        }
        rules
            .sticky
            .iter()
            .filter(|(p, _)| command.starts_with(p.as_str()))
            .max_by_key(|(p, _)| p.len())
            .map(|(_, outcome)| outcome.clone())
            .unwrap_or_else(Scripted::ok)
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, spec: &CommandSpec, options: &RunOptions) -> Result<ExecutionResult, PipeError> {
        let command = spec.display();
        lock(&self.calls).push(RecordedCall {
            command: command.clone(),
            env: options.env.iter().chain(spec.env.iter()).cloned().collect(),
            stdin: spec.stdin.clone(),
        });

        let outcome = self.outcome_for(&command);
        if outcome.spawn_error {
            return Err(PipeError::Spawn {
                program: spec.program.clone(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "No such file or directory"),
            });
        }

        for (path, content) in &outcome.writes {
            crate::report::artifact::write_file(&options.working_dir.join(path), content)?;
        }

        let mut result = ExecutionResult::finished(
            spec,
            outcome.exit_code,
            outcome.stdout,
            outcome.stderr,
            Duration::from_millis(1),
        );
        if outcome.timed_out || options.cancel.is_cancelled() {
            result.timed_out = outcome.timed_out;
            result.cancelled = options.cancel.is_cancelled();
            result.success = false;
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_longest_prefix_wins() {
        let runner = ScriptedRunner::new()
            .on("docker", Scripted::ok())
            .on("docker info", Scripted::exit(1));
        let opts = RunOptions::new(".");
        let info = runner.run(&CommandSpec::new("docker").arg("info"), &opts).unwrap();
        assert_eq!(info.exit_code, Some(1));
        let build = runner.run(&CommandSpec::new("docker").arg("build"), &opts).unwrap();
        assert!(build.success);
    }

    #[test]
    fn test_once_rules_are_consumed() {
        let runner = ScriptedRunner::new().once("npm test", Scripted::exit(2));
        let opts = RunOptions::new(".");
        let spec = CommandSpec::new("npm").arg("test");
        assert_eq!(runner.run(&spec, &opts).unwrap().exit_code, Some(2));
        assert_eq!(runner.run(&spec, &opts).unwrap().exit_code, Some(0));
        assert_eq!(runner.commands(), vec!["npm test", "npm test"]);
    }

    #[test]
    fn test_writes_files_into_working_dir() {
        let temp = TempDir::new().unwrap();
        let runner = ScriptedRunner::new().on(
            "gitleaks",
            Scripted::ok().writes("security-reports/gitleaks-report.json", "[]"),
        );
        let opts = RunOptions::new(temp.path());
        runner.run(&CommandSpec::new("gitleaks").arg("detect"), &opts).unwrap();
        let written = temp.path().join("security-reports/gitleaks-report.json");
        assert_eq!(std::fs::read_to_string(written).unwrap(), "[]");
    }

    #[test]
    fn test_missing_program() {
        let runner = ScriptedRunner::new().on("trivy", Scripted::missing());
        let err = runner
            .run(&CommandSpec::new("trivy"), &RunOptions::new("."))
            .unwrap_err();
        assert!(matches!(err, PipeError::Spawn { .. }));
    }

    #[test]
    fn test_records_env_and_stdin() {
        let runner = ScriptedRunner::new();
        let mut opts = RunOptions::new(".");
        opts.env.push(("KUBECONFIG".into(), "/tmp/k".into()));
        let spec = CommandSpec::new("docker").arg("login").stdin("pw").env("A", "1");
        runner.run(&spec, &opts).unwrap();
        let call = &runner.calls()[0];
        assert_eq!(call.stdin.as_deref(), Some("pw"));
        assert_eq!(
            call.env,
            vec![("KUBECONFIG".to_string(), "/tmp/k".to_string()), ("A".to_string(), "1".to_string())]
        );
    }
}
