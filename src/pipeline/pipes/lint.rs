//! Lint pipe: linter, then optional format and type checks

use super::test::command_var;
use crate::config::{self, ConfigError, EnvSource};
use crate::dispatch::{CommandSpec, TaskRequest};
use crate::error::PipeError;
use crate::pipeline::{Pipe, PipeContext};
use crate::stack::{TaskKind, ToolSelection};
use tracing::info;

#[derive(Debug, Clone)]
pub struct LintConfig {
    pub tool: Option<String>,
    pub command: Option<CommandSpec>,
    pub args: Vec<String>,
    pub format_check: bool,
    pub type_check: bool,
}

impl LintConfig {
    pub fn from_source(source: &dyn EnvSource) -> Result<Self, ConfigError> {
        Ok(Self {
            tool: config::string(source, "LINT_TOOL"),
            command: command_var(source, "LINT_COMMAND")?,
            args: config::args(source, "LINT_ARGS")?,
            format_check: config::bool_or(source, "FORMAT_CHECK", true),
            type_check: config::bool_or(source, "TYPE_CHECK", false),
        })
    }
}

pub struct LintPipe;

impl Pipe for LintPipe {
    fn name(&self) -> &'static str {
        "lint"
    }

    fn run(&self, ctx: &mut PipeContext) -> Result<(), PipeError> {
        let cfg = LintConfig::from_source(ctx.env())?;
        let detection = ctx.resolve(ToolSelection {
            variable: "LINT_TOOL",
            tool: cfg.tool.as_deref(),
            has_custom_command: cfg.command.is_some(),
        })?;
        info!("Linting as {} ({})", detection.ecosystem, detection.source.as_str());

        let lint = TaskRequest::new(detection.ecosystem, TaskKind::Lint)
            .custom_command(cfg.command.clone())
            .extra_args(cfg.args.clone());
        if !ctx.gate_task("lint", &lint)? {
            return Ok(());
        }

        // A custom lint command replaces the whole toolchain
        if cfg.command.is_some() {
            return Ok(());
        }

        let checks = [
            (cfg.format_check, "format-check", TaskKind::FormatCheck),
            (cfg.type_check, "type-check", TaskKind::TypeCheck),
        ];
        for (enabled, gate, task) in checks {
            if !enabled {
                continue;
            }
            let request = TaskRequest::new(detection.ecosystem, task).optional();
            if !ctx.gate_task(gate, &request)? {
                return Ok(());
            }
        }
        Ok(())
    }
}
