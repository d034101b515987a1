//! Per-run state shared by every pipe

use crate::config::{CommonConfig, EnvSource, ProcessEnv};
use crate::dispatch::{
    CancelToken, CommandRunner, CommandSpec, Dispatcher, ExecutionResult, RunOptions,
    SystemRunner, TaskOutcome, TaskRequest,
};
use crate::error::PipeError;
use crate::fs::{FileSystem, RealFileSystem};
use crate::report::{GateResult, PipeReport};
use crate::stack::{Detection, EcosystemRegistry, TaskKind, ToolSelection};
use anyhow::Context;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Owns the long-lived dependencies of one pipe invocation and the report it fills
pub struct PipeContext {
    pub common: CommonConfig,
    env: Arc<dyn EnvSource>,
    pub file_system: Arc<dyn FileSystem>,
    pub registry: Arc<EcosystemRegistry>,
    pub runner: Arc<dyn CommandRunner>,
    pub options: RunOptions,
    pub report: PipeReport,
}

impl PipeContext {
    pub fn new(
        env: Arc<dyn EnvSource>,
        file_system: Arc<dyn FileSystem>,
        runner: Arc<dyn CommandRunner>,
    ) -> Self {
        let common = CommonConfig::from_source(env.as_ref());
        let mut options = RunOptions::new(common.working_dir.clone());
        options.timeout = common.command_timeout;
        options.echo = common.debug;

        Self {
            common,
            env,
            file_system,
            registry: Arc::new(EcosystemRegistry::with_defaults()),
            runner,
            options,
            report: PipeReport::new("pipe"),
        }
    }

    /// Process environment, real filesystem, real child processes
    pub fn from_env() -> Self {
        Self::new(
            Arc::new(ProcessEnv),
            Arc::new(RealFileSystem::new()),
            Arc::new(SystemRunner::new()),
        )
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.options.cancel = cancel;
        self
    }

    pub fn env(&self) -> &dyn EnvSource {
        self.env.as_ref()
    }

    pub fn working_dir(&self) -> &Path {
        &self.common.working_dir
    }

    /// Path of a file relative to the working directory
    pub fn path(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.common.working_dir.join(relative)
    }

    pub fn read_file(&self, relative: impl AsRef<Path>) -> anyhow::Result<String> {
        let path = self.path(relative);
        self.file_system
            .read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))
    }

    /// Applies override/custom precedence, falling back to marker detection
    pub fn resolve(&mut self, selection: ToolSelection<'_>) -> Result<Detection, PipeError> {
        let detection = self.registry.resolve(
            self.file_system.as_ref(),
            &self.common.working_dir,
            selection,
        )?;
        self.report.detection = Some(detection.clone());
        Ok(detection)
    }

    pub fn dispatch(&mut self, request: &TaskRequest) -> Result<TaskOutcome, PipeError> {
        let dispatcher = Dispatcher::new(
            &self.registry,
            self.file_system.as_ref(),
            self.runner.as_ref(),
            &self.options,
        );
        let mut journal = Vec::new();
        let outcome = dispatcher.dispatch(request, &mut journal);
        for result in &journal {
            self.report.record(result);
        }
        outcome
    }

    /// Dispatches a task and records its gate. Returns whether the gate did not fail.
    ///
    /// A failing command becomes a failed gate; anything else that goes wrong
    /// (no handler, spawn failure, timeout) is returned as an error.
    pub fn gate_task(&mut self, gate: &str, request: &TaskRequest) -> Result<bool, PipeError> {
        match self.dispatch(request) {
            Ok(TaskOutcome::Completed) => {
                self.report.gate(GateResult::passed(gate, "succeeded"));
                Ok(true)
            }
            Ok(TaskOutcome::Skipped { reason }) => {
                self.report.gate(GateResult::warned(gate, format!("skipped: {}", reason)));
                Ok(true)
            }
            Err(PipeError::ExecutionFailed { exit_code, .. }) => {
                let detail = match exit_code {
                    Some(0) => "reported problems on stdout".to_string(),
                    Some(code) => format!("exit code {}", code),
                    None => "terminated by signal".to_string(),
                };
                self.report.gate(GateResult::failed(gate, detail));
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Runs one external command and records it, without judging the exit code.
    /// Spawn failures, timeouts and cancellation are still errors.
    pub fn execute(&mut self, spec: &CommandSpec) -> Result<ExecutionResult, PipeError> {
        let result = self.runner.run(spec, &self.options)?;
        self.report.record(&result);
        if let Some(err) = result.interruption(self.options.timeout) {
            return Err(err);
        }
        Ok(result)
    }

    /// Runs a fixed external tool (gitleaks, trivy, docker, helm, ...).
    /// A failing blocking command is `ToolFailed`; a failing advisory one only warns.
    pub fn run_tool(
        &mut self,
        tool: &str,
        task: TaskKind,
        spec: CommandSpec,
    ) -> Result<ExecutionResult, PipeError> {
        info!("Running {}: {}", tool, spec.display());
        let result = self.execute(&spec)?;
        if result.success {
            return Ok(result);
        }
        let tail = result.error_tail(20);
        if !self.options.echo && !tail.is_empty() {
            error!("{} output:\n{}", tool, tail);
        }
        if spec.blocking {
            return Err(PipeError::ToolFailed {
                tool: tool.to_string(),
                task,
                exit_code: result.exit_code,
            });
        }
        warn!("{} {} failed (advisory, continuing)", tool, task);
        self.report
            .warn(format!("{} {} failed (exit code {:?})", tool, task, result.exit_code));
        Ok(result)
    }
}
