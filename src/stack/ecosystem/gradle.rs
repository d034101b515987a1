//! Gradle (Java/Kotlin)

use super::{CommandContext, CoverageSource, EcosystemDefinition, Marker};
use crate::dispatch::CommandSpec;
use crate::report::CoverageFormat;
use crate::stack::{Ecosystem, TaskKind};

pub struct GradleEcosystem;

impl EcosystemDefinition for GradleEcosystem {
    fn id(&self) -> Ecosystem {
        Ecosystem::Gradle
    }

    fn markers(&self) -> &[Marker] {
        &[
            Marker::File("build.gradle"),
            Marker::File("build.gradle.kts"),
        ]
    }

    fn commands(&self, task: TaskKind, ctx: &CommandContext) -> Vec<CommandSpec> {
        let gradle = CommandSpec::new(ctx.local_or("gradlew", "gradle")).arg("--no-daemon");
        match task {
            TaskKind::UnitTest => vec![gradle
                .arg("test")
                .arg_if(ctx.coverage, "jacocoTestReport")],
            TaskKind::IntegrationTest => vec![gradle.arg("integrationTest")],
            TaskKind::Lint => vec![gradle.args(["check", "-x", "test"])],
            TaskKind::FormatCheck => vec![gradle.arg("spotlessCheck")],
            TaskKind::TypeCheck => vec![gradle.arg("classes")],
            TaskKind::Build => vec![gradle.args(["build", "-x", "test"])],
            TaskKind::Package => vec![gradle.arg("assemble")],
            _ => vec![],
        }
    }

    fn coverage_source(&self, _ctx: &CommandContext) -> Option<CoverageSource> {
        Some(CoverageSource::File {
            path: "build/reports/jacoco/test/jacocoTestReport.xml",
            format: CoverageFormat::Jacoco,
        })
    }
}
