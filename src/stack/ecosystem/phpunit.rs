//! PHPUnit (PHP/Composer)

use super::{CommandContext, CoverageSource, EcosystemDefinition, Marker};
use crate::dispatch::CommandSpec;
use crate::report::CoverageFormat;
use crate::stack::{Ecosystem, TaskKind};

pub struct PhpUnitEcosystem;

fn vendor_bin(ctx: &CommandContext, tool: &str) -> CommandSpec {
    CommandSpec::new(ctx.local_or(&format!("vendor/bin/{}", tool), tool))
}

impl EcosystemDefinition for PhpUnitEcosystem {
    fn id(&self) -> Ecosystem {
        Ecosystem::PhpUnit
    }

    fn markers(&self) -> &[Marker] {
        &[
            Marker::File("phpunit.xml"),
            Marker::File("phpunit.xml.dist"),
            Marker::File("composer.json"),
        ]
    }

    fn commands(&self, task: TaskKind, ctx: &CommandContext) -> Vec<CommandSpec> {
        match task {
            TaskKind::UnitTest if ctx.coverage => vec![vendor_bin(ctx, "phpunit")
                .args(["--coverage-clover", "coverage.xml"])
                .env("XDEBUG_MODE", "coverage")],
            TaskKind::UnitTest => vec![vendor_bin(ctx, "phpunit")],
            TaskKind::IntegrationTest => {
                vec![vendor_bin(ctx, "phpunit").args(["--testsuite", "integration"])]
            }
            TaskKind::Lint => vec![vendor_bin(ctx, "phpcs")],
            TaskKind::FormatCheck => {
                vec![vendor_bin(ctx, "php-cs-fixer").args(["fix", "--dry-run", "--diff"])]
            }
            TaskKind::TypeCheck => vec![vendor_bin(ctx, "phpstan").arg("analyse")],
            TaskKind::Build => vec![CommandSpec::new("composer").args([
                "install",
                "--no-interaction",
                "--prefer-dist",
            ])],
            TaskKind::Package => vec![CommandSpec::new("composer").args(["archive", "--format=zip"])],
            _ => vec![],
        }
    }

    fn coverage_source(&self, _ctx: &CommandContext) -> Option<CoverageSource> {
        Some(CoverageSource::File {
            path: "coverage.xml",
            format: CoverageFormat::Clover,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MockFileSystem;
    use std::path::PathBuf;

    #[test]
    fn test_coverage_sets_xdebug_mode() {
        let fs = MockFileSystem::new();
        fs.add_file("/mock/vendor/bin/phpunit", "");
        let dir = PathBuf::from("/mock");
        let ctx = CommandContext::new(&fs, &dir).with_coverage(true);
        let cmds = PhpUnitEcosystem.commands(TaskKind::UnitTest, &ctx);
        assert_eq!(cmds[0].program, "vendor/bin/phpunit");
        assert!(cmds[0]
            .env
            .contains(&("XDEBUG_MODE".to_string(), "coverage".to_string())));
    }
}
