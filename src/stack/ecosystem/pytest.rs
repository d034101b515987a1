//! pytest (Python)

use super::{CommandContext, CoverageSource, EcosystemDefinition, Marker};
use crate::dispatch::CommandSpec;
use crate::report::CoverageFormat;
use crate::stack::{Ecosystem, TaskKind};

pub struct PytestEcosystem;

fn pytest() -> CommandSpec {
    CommandSpec::new("python").args(["-m", "pytest"])
}

impl EcosystemDefinition for PytestEcosystem {
    fn id(&self) -> Ecosystem {
        Ecosystem::Pytest
    }

    fn markers(&self) -> &[Marker] {
        &[
            Marker::File("pytest.ini"),
            Marker::File("pyproject.toml"),
            Marker::File("setup.py"),
            Marker::File("setup.cfg"),
            Marker::File("tox.ini"),
            Marker::File("requirements.txt"),
        ]
    }

    fn commands(&self, task: TaskKind, ctx: &CommandContext) -> Vec<CommandSpec> {
        match task {
            TaskKind::UnitTest if ctx.coverage => vec![pytest().args([
                "--cov=.",
                "--cov-report=xml",
                "--cov-report=term",
            ])],
            TaskKind::UnitTest => vec![pytest()],
            TaskKind::IntegrationTest if ctx.has_dir("tests/integration") => {
                vec![pytest().arg("tests/integration")]
            }
            TaskKind::IntegrationTest => vec![],
            // pylint is informational only
            TaskKind::Lint => vec![
                CommandSpec::new("flake8").arg("."),
                CommandSpec::new("pylint").args(["--recursive=y", "."]).advisory(),
            ],
            TaskKind::FormatCheck => vec![CommandSpec::new("black").args(["--check", "."])],
            TaskKind::TypeCheck => vec![CommandSpec::new("mypy").arg(".")],
            TaskKind::Build => vec![CommandSpec::new("python").args(["-m", "compileall", "-q", "."])],
            TaskKind::Package => vec![CommandSpec::new("python").args(["-m", "build"])],
            _ => vec![],
        }
    }

    fn coverage_source(&self, _ctx: &CommandContext) -> Option<CoverageSource> {
        Some(CoverageSource::File {
            path: "coverage.xml",
            format: CoverageFormat::Cobertura,
        })
    }
}
