//! Yarn (JavaScript/TypeScript)

use super::{node_common, CommandContext, CoverageSource, EcosystemDefinition, Marker};
use crate::dispatch::CommandSpec;
use crate::fs::FileSystem;
use crate::stack::{Ecosystem, TaskKind};
use std::path::{Path, PathBuf};

pub struct YarnEcosystem;

impl EcosystemDefinition for YarnEcosystem {
    fn id(&self) -> Ecosystem {
        Ecosystem::Yarn
    }

    fn markers(&self) -> &[Marker] {
        &[Marker::File("yarn.lock")]
    }

    /// Needs both package.json and yarn.lock
    fn detect(&self, fs: &dyn FileSystem, dir: &Path) -> Option<PathBuf> {
        let manifest = Marker::File("package.json").find(fs, dir)?;
        Marker::File("yarn.lock").find(fs, dir).map(|_| manifest)
    }

    fn commands(&self, task: TaskKind, ctx: &CommandContext) -> Vec<CommandSpec> {
        node_common::commands("yarn", &["install", "--frozen-lockfile"], task, ctx)
    }

    fn coverage_source(&self, _ctx: &CommandContext) -> Option<CoverageSource> {
        Some(node_common::coverage_source())
    }
}
