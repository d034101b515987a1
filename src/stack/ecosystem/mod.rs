//! Ecosystem definitions
//!
//! Each definition owns its marker files, its command table per task kind
//! and the location of the coverage report its test command produces.

use crate::dispatch::CommandSpec;
use crate::fs::FileSystem;
use crate::report::CoverageFormat;
use crate::stack::{Ecosystem, TaskKind};
use std::path::{Path, PathBuf};

/// Marker that identifies an ecosystem in a project directory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    /// Exact file name in the directory root
    File(&'static str),
    /// Any file with this extension in the directory root
    Extension(&'static str),
}

impl Marker {
    /// Returns the matching path when the marker is present
    pub fn find(&self, fs: &dyn FileSystem, dir: &Path) -> Option<PathBuf> {
        match self {
            Marker::File(name) => {
                let path = dir.join(name);
                fs.exists(&path).then_some(path)
            }
            Marker::Extension(ext) => fs
                .read_dir(dir)
                .ok()?
                .into_iter()
                .filter(|entry| entry.is_file())
                .find(|entry| entry.extension() == Some(*ext))
                .map(|entry| entry.path().to_path_buf()),
        }
    }
}

/// Where to read coverage after a test run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoverageSource {
    File {
        path: &'static str,
        format: CoverageFormat,
    },
    /// Run a summary command and parse its stdout
    Command {
        command: CommandSpec,
        format: CoverageFormat,
    },
}

/// Read-only view of the project handed to command builders
pub struct CommandContext<'a> {
    pub fs: &'a dyn FileSystem,
    pub dir: &'a Path,
    pub coverage: bool,
}

impl<'a> CommandContext<'a> {
    pub fn new(fs: &'a dyn FileSystem, dir: &'a Path) -> Self {
        Self {
            fs,
            dir,
            coverage: false,
        }
    }

    pub fn with_coverage(mut self, coverage: bool) -> Self {
        self.coverage = coverage;
        self
    }

    pub fn has_file(&self, name: &str) -> bool {
        self.fs.is_file(&self.dir.join(name))
    }

    pub fn has_dir(&self, name: &str) -> bool {
        self.fs.is_dir(&self.dir.join(name))
    }

    pub fn read(&self, name: &str) -> Option<String> {
        self.fs.read_to_string(&self.dir.join(name)).ok()
    }

    /// Project-local wrapper (`./mvnw`, `vendor/bin/phpunit`) when present
    pub fn local_or(&self, local: &str, global: &str) -> String {
        if self.has_file(local) {
            if local.contains('/') {
                local.to_string()
            } else {
                format!("./{}", local)
            }
        } else {
            global.to_string()
        }
    }
}

pub trait EcosystemDefinition: Send + Sync {
    fn id(&self) -> Ecosystem;

    /// Marker files checked in order
    fn markers(&self) -> &[Marker];

    /// First marker present in `dir`, if any
    fn detect(&self, fs: &dyn FileSystem, dir: &Path) -> Option<PathBuf> {
        self.markers().iter().find_map(|marker| marker.find(fs, dir))
    }

    /// Commands for a task. Empty means this ecosystem has no handler for it.
    fn commands(&self, task: TaskKind, ctx: &CommandContext) -> Vec<CommandSpec>;

    fn coverage_source(&self, ctx: &CommandContext) -> Option<CoverageSource> {
        let _ = ctx;
        None
    }
}

pub mod cargo;
pub mod dotnet;
pub mod go;
pub mod gradle;
pub mod maven;
mod node_common;
pub mod npm;
pub mod phpunit;
pub mod pytest;
pub mod rspec;
pub mod yarn;

pub use cargo::CargoEcosystem;
pub use dotnet::DotNetEcosystem;
pub use go::GoEcosystem;
pub use gradle::GradleEcosystem;
pub use maven::MavenEcosystem;
pub use npm::NpmEcosystem;
pub use phpunit::PhpUnitEcosystem;
pub use pytest::PytestEcosystem;
pub use rspec::RspecEcosystem;
pub use yarn::YarnEcosystem;
