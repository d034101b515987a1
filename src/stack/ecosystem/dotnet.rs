//! .NET SDK (C#/F#)

use super::{CommandContext, CoverageSource, EcosystemDefinition, Marker};
use crate::dispatch::CommandSpec;
use crate::report::CoverageFormat;
use crate::stack::{Ecosystem, TaskKind};

pub struct DotNetEcosystem;

impl EcosystemDefinition for DotNetEcosystem {
    fn id(&self) -> Ecosystem {
        Ecosystem::DotNet
    }

    fn markers(&self) -> &[Marker] {
        &[
            Marker::Extension("sln"),
            Marker::Extension("csproj"),
            Marker::Extension("fsproj"),
        ]
    }

    fn commands(&self, task: TaskKind, ctx: &CommandContext) -> Vec<CommandSpec> {
        let dotnet = CommandSpec::new("dotnet");
        match task {
            TaskKind::UnitTest if ctx.coverage => vec![dotnet.args([
                "test",
                "/p:CollectCoverage=true",
                "/p:CoverletOutputFormat=cobertura",
                "/p:CoverletOutput=./coverage/",
            ])],
            TaskKind::UnitTest => vec![dotnet.arg("test")],
            TaskKind::IntegrationTest => vec![dotnet.args(["test", "--filter", "Category=Integration"])],
            TaskKind::Lint => vec![dotnet.args(["format", "analyzers", "--verify-no-changes"])],
            TaskKind::FormatCheck => {
                vec![dotnet.args(["format", "whitespace", "--verify-no-changes"])]
            }
            TaskKind::Build => vec![dotnet.args(["build", "-c", "Release"])],
            TaskKind::Package => vec![dotnet.args(["publish", "-c", "Release", "-o", "publish"])],
            _ => vec![],
        }
    }

    fn coverage_source(&self, _ctx: &CommandContext) -> Option<CoverageSource> {
        Some(CoverageSource::File {
            path: "coverage/coverage.cobertura.xml",
            format: CoverageFormat::Cobertura,
        })
    }
}
