//! Cargo (Rust)

use super::{CommandContext, CoverageSource, EcosystemDefinition, Marker};
use crate::dispatch::CommandSpec;
use crate::report::CoverageFormat;
use crate::stack::{Ecosystem, TaskKind};

pub struct CargoEcosystem;

impl EcosystemDefinition for CargoEcosystem {
    fn id(&self) -> Ecosystem {
        Ecosystem::Cargo
    }

    fn markers(&self) -> &[Marker] {
        &[Marker::File("Cargo.toml")]
    }

    fn commands(&self, task: TaskKind, ctx: &CommandContext) -> Vec<CommandSpec> {
        let cargo = CommandSpec::new("cargo");
        match task {
            TaskKind::UnitTest if ctx.coverage => vec![cargo.args(["tarpaulin", "--out", "Xml"])],
            TaskKind::UnitTest => vec![cargo.arg("test")],
            TaskKind::IntegrationTest if ctx.has_dir("tests") => {
                vec![cargo.args(["test", "--test", "*"])]
            }
            TaskKind::IntegrationTest => vec![],
            TaskKind::Lint => vec![cargo.args(["clippy", "--all-targets", "--", "-D", "warnings"])],
            TaskKind::FormatCheck => vec![cargo.args(["fmt", "--all", "--", "--check"])],
            TaskKind::TypeCheck => vec![cargo.args(["check", "--all-targets"])],
            TaskKind::Build => vec![cargo.args(["build", "--release"])],
            TaskKind::Package => vec![cargo.args(["package", "--allow-dirty"])],
            _ => vec![],
        }
    }

    fn coverage_source(&self, _ctx: &CommandContext) -> Option<CoverageSource> {
        Some(CoverageSource::File {
            path: "cobertura.xml",
            format: CoverageFormat::Cobertura,
        })
    }
}
