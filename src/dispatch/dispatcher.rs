//! Command Dispatcher: (ecosystem, task) to executed commands

use super::command::append_extra_args;
use super::runner::{CommandRunner, ExecutionResult, RunOptions};
use super::CommandSpec;
use crate::error::PipeError;
use crate::fs::FileSystem;
use crate::stack::{CommandContext, Ecosystem, EcosystemRegistry, TaskKind};
use tracing::{error, info, warn};

const ERROR_TAIL_LINES: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    /// A missing handler is an error
    Required,
    /// A missing handler is a warning and the task is skipped
    Optional,
}

#[derive(Debug, Clone)]
pub struct TaskRequest {
    pub ecosystem: Ecosystem,
    pub task: TaskKind,
    pub extra_args: Vec<String>,
    /// Replaces the ecosystem's commands unconditionally
    pub custom_command: Option<CommandSpec>,
    pub coverage: bool,
    pub requirement: Requirement,
}

impl TaskRequest {
    pub fn new(ecosystem: Ecosystem, task: TaskKind) -> Self {
        Self {
            ecosystem,
            task,
            extra_args: Vec::new(),
            custom_command: None,
            coverage: false,
            requirement: Requirement::Required,
        }
    }

    pub fn extra_args(mut self, args: Vec<String>) -> Self {
        self.extra_args = args;
        self
    }

    pub fn custom_command(mut self, command: Option<CommandSpec>) -> Self {
        self.custom_command = command;
        self
    }

    pub fn coverage(mut self, enabled: bool) -> Self {
        self.coverage = enabled;
        self
    }

    pub fn optional(mut self) -> Self {
        self.requirement = Requirement::Optional;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    Completed,
    Skipped { reason: String },
}

pub struct Dispatcher<'a> {
    registry: &'a EcosystemRegistry,
    fs: &'a dyn FileSystem,
    runner: &'a dyn CommandRunner,
    options: &'a RunOptions,
}

impl<'a> Dispatcher<'a> {
    pub fn new(
        registry: &'a EcosystemRegistry,
        fs: &'a dyn FileSystem,
        runner: &'a dyn CommandRunner,
        options: &'a RunOptions,
    ) -> Self {
        Self {
            registry,
            fs,
            runner,
            options,
        }
    }

    /// Commands the request resolves to, without running anything.
    /// Empty means there is no handler.
    pub fn plan(&self, request: &TaskRequest) -> Vec<CommandSpec> {
        let mut commands = match &request.custom_command {
            Some(custom) => vec![custom.clone()],
            None => {
                let ctx = CommandContext::new(self.fs, &self.options.working_dir)
                    .with_coverage(request.coverage);
                self.registry
                    .get(request.ecosystem)
                    .map(|def| def.commands(request.task, &ctx))
                    .unwrap_or_default()
            }
        };
        append_extra_args(&mut commands, &request.extra_args);
        commands
    }

    /// Runs the request's commands in order, stopping at the first blocking failure.
    /// Every executed command is appended to `journal`, including the failing one.
    pub fn dispatch(
        &self,
        request: &TaskRequest,
        journal: &mut Vec<ExecutionResult>,
    ) -> Result<TaskOutcome, PipeError> {
        let commands = self.plan(request);
        if commands.is_empty() {
            return match request.requirement {
                Requirement::Required => Err(PipeError::NoHandler {
                    ecosystem: request.ecosystem,
                    task: request.task,
                }),
                Requirement::Optional => {
                    let reason = format!(
                        "no {} convention found for {}",
                        request.task, request.ecosystem
                    );
                    warn!("Skipping {}: {}", request.task, reason);
                    Ok(TaskOutcome::Skipped { reason })
                }
            };
        }

        for spec in &commands {
            info!("Running {}: {}", request.task, spec.display());
            let result = self.runner.run(spec, self.options)?;
            let interruption = result.interruption(self.options.timeout);
            let failed = !result.success;
            journal.push(result);

            if let Some(err) = interruption {
                return Err(err);
            }
            if !failed {
                continue;
            }

            let Some(result) = journal.last() else {
                continue;
            };
            if !self.options.echo {
                let tail = result.error_tail(ERROR_TAIL_LINES);
                if !tail.is_empty() {
                    error!("{} output:\n{}", result.command, tail);
                }
            }
            if spec.blocking {
                return Err(PipeError::ExecutionFailed {
                    ecosystem: request.ecosystem,
                    task: request.task,
                    exit_code: result.exit_code,
                });
            }
            warn!(
                "{} failed (exit code {:?}); advisory, continuing",
                result.command, result.exit_code
            );
        }

        Ok(TaskOutcome::Completed)
    }
}
