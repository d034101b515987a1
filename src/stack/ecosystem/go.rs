//! Go modules

use super::{CommandContext, CoverageSource, EcosystemDefinition, Marker};
use crate::dispatch::CommandSpec;
use crate::report::CoverageFormat;
use crate::stack::{Ecosystem, TaskKind};

const PROFILE: &str = "coverage.out";

pub struct GoEcosystem;

impl EcosystemDefinition for GoEcosystem {
    fn id(&self) -> Ecosystem {
        Ecosystem::Go
    }

    fn markers(&self) -> &[Marker] {
        &[Marker::File("go.mod")]
    }

    fn commands(&self, task: TaskKind, ctx: &CommandContext) -> Vec<CommandSpec> {
        let go = CommandSpec::new("go");
        match task {
            TaskKind::UnitTest => vec![go
                .arg("test")
                .arg_if(ctx.coverage, format!("-coverprofile={}", PROFILE))
                .arg("./...")],
            TaskKind::IntegrationTest => vec![go.args(["test", "-tags=integration", "./..."])],
            TaskKind::Lint => vec![
                go.args(["vet", "./..."]),
                CommandSpec::new("golangci-lint").arg("run").advisory(),
            ],
            // gofmt exits 0 and lists unformatted files on stdout
            TaskKind::FormatCheck => vec![CommandSpec::new("gofmt").args(["-l", "."]).fail_on_output()],
            TaskKind::TypeCheck | TaskKind::Build => vec![go.args(["build", "./..."])],
            TaskKind::Package => vec![go.args(["build", "-o", "bin/", "./..."])],
            _ => vec![],
        }
    }

    fn coverage_source(&self, _ctx: &CommandContext) -> Option<CoverageSource> {
        Some(CoverageSource::Command {
            command: CommandSpec::new("go")
                .args(["tool", "cover"])
                .arg(format!("-func={}", PROFILE)),
            format: CoverageFormat::GoCover,
        })
    }
}
