//! Shared command table for npm and yarn

use super::{CommandContext, CoverageSource};
use crate::dispatch::CommandSpec;
use crate::report::CoverageFormat;
use crate::stack::TaskKind;
use serde_json::Value;

pub const INTEGRATION_SCRIPT: &str = "test:integration";

/// Script names declared in package.json
pub fn scripts(ctx: &CommandContext) -> Vec<String> {
    ctx.read("package.json")
        .and_then(|content| serde_json::from_str::<Value>(&content).ok())
        .and_then(|json| {
            json.get("scripts")
                .and_then(|s| s.as_object())
                .map(|scripts| scripts.keys().cloned().collect())
        })
        .unwrap_or_default()
}

pub fn has_script(ctx: &CommandContext, name: &str) -> bool {
    scripts(ctx).iter().any(|s| s == name)
}

/// `install` is the lockfile-respecting install command for the client
pub fn commands(
    client: &str,
    install: &[&str],
    task: TaskKind,
    ctx: &CommandContext,
) -> Vec<CommandSpec> {
    let run = |script: &str| CommandSpec::new(client).args(["run", script]);
    match task {
        TaskKind::UnitTest if ctx.coverage => vec![CommandSpec::new(client).args([
            "test",
            "--",
            "--coverage",
            "--coverageReporters=json-summary",
            "--coverageReporters=text",
        ])],
        TaskKind::UnitTest => vec![CommandSpec::new(client).arg("test")],
        TaskKind::IntegrationTest if has_script(ctx, INTEGRATION_SCRIPT) => {
            vec![run(INTEGRATION_SCRIPT)]
        }
        TaskKind::IntegrationTest => vec![],
        TaskKind::Lint if has_script(ctx, "lint") => vec![run("lint")],
        TaskKind::Lint => vec![CommandSpec::new("npx").args(["eslint", "."])],
        TaskKind::FormatCheck => vec![CommandSpec::new("npx").args(["prettier", "--check", "."])],
        TaskKind::TypeCheck if ctx.has_file("tsconfig.json") => {
            vec![CommandSpec::new("npx").args(["tsc", "--noEmit"])]
        }
        TaskKind::TypeCheck => vec![],
        TaskKind::Build if has_script(ctx, "build") => {
            vec![CommandSpec::new(client).args(install.iter().copied()), run("build")]
        }
        TaskKind::Build => vec![CommandSpec::new(client).args(install.iter().copied())],
        TaskKind::Package => vec![CommandSpec::new(client).arg("pack")],
        _ => vec![],
    }
}

pub fn coverage_source() -> CoverageSource {
    CoverageSource::File {
        path: "coverage/coverage-summary.json",
        format: CoverageFormat::JestSummary,
    }
}
