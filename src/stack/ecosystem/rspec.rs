//! RSpec (Ruby/Bundler)

use super::{CommandContext, CoverageSource, EcosystemDefinition, Marker};
use crate::dispatch::CommandSpec;
use crate::report::CoverageFormat;
use crate::stack::{Ecosystem, TaskKind};

pub struct RspecEcosystem;

fn bundled(ctx: &CommandContext, tool: &str) -> CommandSpec {
    if ctx.has_file("Gemfile") {
        CommandSpec::new("bundle").args(["exec", tool])
    } else {
        CommandSpec::new(tool)
    }
}

impl EcosystemDefinition for RspecEcosystem {
    fn id(&self) -> Ecosystem {
        Ecosystem::Rspec
    }

    fn markers(&self) -> &[Marker] {
        &[Marker::File(".rspec"), Marker::File("Gemfile")]
    }

    fn commands(&self, task: TaskKind, ctx: &CommandContext) -> Vec<CommandSpec> {
        match task {
            // SimpleCov is switched on from spec_helper by COVERAGE=true
            TaskKind::UnitTest if ctx.coverage => vec![bundled(ctx, "rspec").env("COVERAGE", "true")],
            TaskKind::UnitTest => vec![bundled(ctx, "rspec")],
            TaskKind::IntegrationTest if ctx.has_dir("spec/integration") => {
                vec![bundled(ctx, "rspec").arg("spec/integration")]
            }
            TaskKind::IntegrationTest => vec![],
            TaskKind::Lint => vec![bundled(ctx, "rubocop")],
            TaskKind::FormatCheck => vec![bundled(ctx, "rubocop").arg("--layout")],
            TaskKind::Build => vec![CommandSpec::new("bundle").arg("install")],
            _ => vec![],
        }
    }

    fn coverage_source(&self, _ctx: &CommandContext) -> Option<CoverageSource> {
        Some(CoverageSource::File {
            path: "coverage/.last_run.json",
            format: CoverageFormat::SimpleCov,
        })
    }
}
