//! Maven (Java/Kotlin)

use super::{CommandContext, CoverageSource, EcosystemDefinition, Marker};
use crate::dispatch::CommandSpec;
use crate::report::CoverageFormat;
use crate::stack::{Ecosystem, TaskKind};

const JACOCO: &str = "org.jacoco:jacoco-maven-plugin";

pub struct MavenEcosystem;

impl MavenEcosystem {
    fn mvn(ctx: &CommandContext) -> CommandSpec {
        CommandSpec::new(ctx.local_or("mvnw", "mvn")).arg("-B")
    }
}

impl EcosystemDefinition for MavenEcosystem {
    fn id(&self) -> Ecosystem {
        Ecosystem::Maven
    }

    fn markers(&self) -> &[Marker] {
        &[Marker::File("pom.xml")]
    }

    fn commands(&self, task: TaskKind, ctx: &CommandContext) -> Vec<CommandSpec> {
        let mvn = Self::mvn(ctx);
        match task {
            TaskKind::UnitTest if ctx.coverage => vec![mvn.args([
                format!("{}:prepare-agent", JACOCO),
                "test".to_string(),
                format!("{}:report", JACOCO),
            ])],
            TaskKind::UnitTest => vec![mvn.arg("test")],
            TaskKind::IntegrationTest => vec![mvn.args(["verify", "-DskipUnitTests=true"])],
            TaskKind::Lint => vec![mvn.arg("checkstyle:check")],
            TaskKind::FormatCheck => vec![mvn.arg("spotless:check")],
            TaskKind::TypeCheck => vec![mvn.args(["-q", "compile"])],
            TaskKind::Build => vec![mvn.args(["compile", "-DskipTests"])],
            TaskKind::Package => vec![mvn.args(["package", "-DskipTests"])],
            _ => vec![],
        }
    }

    fn coverage_source(&self, _ctx: &CommandContext) -> Option<CoverageSource> {
        Some(CoverageSource::File {
            path: "target/site/jacoco/jacoco.xml",
            format: CoverageFormat::Jacoco,
        })
    }
}
