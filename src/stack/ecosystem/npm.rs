//! npm (JavaScript/TypeScript)

use super::{node_common, CommandContext, CoverageSource, EcosystemDefinition, Marker};
use crate::dispatch::CommandSpec;
use crate::stack::{Ecosystem, TaskKind};

pub struct NpmEcosystem;

impl EcosystemDefinition for NpmEcosystem {
    fn id(&self) -> Ecosystem {
        Ecosystem::Npm
    }

    fn markers(&self) -> &[Marker] {
        &[Marker::File("package.json")]
    }

    fn commands(&self, task: TaskKind, ctx: &CommandContext) -> Vec<CommandSpec> {
        node_common::commands("npm", &["ci"], task, ctx)
    }

    fn coverage_source(&self, _ctx: &CommandContext) -> Option<CoverageSource> {
        Some(node_common::coverage_source())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MockFileSystem;
    use std::path::PathBuf;

    fn with_package(scripts: &str) -> MockFileSystem {
        let fs = MockFileSystem::new();
        fs.add_file(
            "/mock/package.json",
            &format!(r#"{{"name": "app", "scripts": {}}}"#, scripts),
        );
        fs
    }

    #[test]
    fn test_integration_requires_script() {
        let dir = PathBuf::from("/mock");
        let fs = with_package(r#"{"test": "jest"}"#);
        let ctx = CommandContext::new(&fs, &dir);
        assert!(NpmEcosystem.commands(TaskKind::IntegrationTest, &ctx).is_empty());

        let fs = with_package(r#"{"test": "jest", "test:integration": "jest -c it"}"#);
        let ctx = CommandContext::new(&fs, &dir);
        let cmds = NpmEcosystem.commands(TaskKind::IntegrationTest, &ctx);
        assert_eq!(cmds[0].display(), "npm run test:integration");
    }

    #[test]
    fn test_lint_prefers_project_script() {
        let dir = PathBuf::from("/mock");
        let fs = with_package(r#"{"lint": "eslint src"}"#);
        let ctx = CommandContext::new(&fs, &dir);
        assert_eq!(NpmEcosystem.commands(TaskKind::Lint, &ctx)[0].display(), "npm run lint");

        let fs = with_package("{}");
        let ctx = CommandContext::new(&fs, &dir);
        assert_eq!(NpmEcosystem.commands(TaskKind::Lint, &ctx)[0].display(), "npx eslint .");
    }

    #[test]
    fn test_type_check_only_for_typescript() {
        let dir = PathBuf::from("/mock");
        let fs = with_package("{}");
        let ctx = CommandContext::new(&fs, &dir);
        assert!(NpmEcosystem.commands(TaskKind::TypeCheck, &ctx).is_empty());

        fs.add_file("/mock/tsconfig.json", "{}");
        assert_eq!(NpmEcosystem.commands(TaskKind::TypeCheck, &ctx).len(), 1);
    }

    #[test]
    fn test_malformed_package_json_has_no_scripts() {
        let dir = PathBuf::from("/mock");
        let fs = MockFileSystem::new();
        fs.add_file("/mock/package.json", "{not json");
        let ctx = CommandContext::new(&fs, &dir);
        assert!(node_common::scripts(&ctx).is_empty());
    }
}
