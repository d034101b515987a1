//! Subcommand handlers; each returns the process exit code

use crate::cli::commands::{DetectArgs, PipeArgs, SummaryFormatArg};
use crate::cli::output::{DetectionOutput, OutputFormatter, PlannedTask};
use crate::config::{EnvSource, ProcessEnv};
use crate::dispatch::SystemRunner;
use crate::error::EXIT_FAILURE;
use crate::fs::{FileSystem, RealFileSystem};
use crate::pipeline::{pipe_by_name, run_pipe, PipeContext};
use crate::report::render_human;
use crate::stack::{CommandContext, EcosystemRegistry, TaskKind};
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info};

pub fn handle_pipe(name: &str, args: &PipeArgs) -> i32 {
    let Some(pipe) = pipe_by_name(name) else {
        error!("Unknown pipe '{}'", name);
        return EXIT_FAILURE;
    };

    let env = PipeEnv::new(ProcessEnv, args.working_dir.as_deref());
    let mut ctx = PipeContext::new(
        Arc::new(env),
        Arc::new(RealFileSystem::new()),
        Arc::new(SystemRunner::new()),
    );
    let report = run_pipe(pipe.as_ref(), &mut ctx);

    match args.summary {
        SummaryFormatArg::Human => {
            print!("{}", render_human(&report, atty::is(atty::Stream::Stdout)));
        }
        SummaryFormatArg::Json => match serde_json::to_string_pretty(&report) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                error!("Failed to serialize report: {}", e);
                return EXIT_FAILURE;
            }
        },
    }

    report.exit_code()
}

/// An environment with the `--working-dir` override layered on top.
/// Lookups are per key, so unrelated non-UTF-8 variables are never read.
struct PipeEnv<E> {
    inner: E,
    working_dir: Option<String>,
}

impl<E: EnvSource> PipeEnv<E> {
    fn new(inner: E, working_dir: Option<&Path>) -> Self {
        let working_dir = working_dir.map(|dir| dir.display().to_string());
        if let Some(dir) = &working_dir {
            debug!("Working directory overridden to {}", dir);
        }
        Self { inner, working_dir }
    }
}

impl<E: EnvSource> EnvSource for PipeEnv<E> {
    fn var(&self, key: &str) -> Option<String> {
        match (&self.working_dir, key) {
            (Some(dir), "WORKING_DIR") => Some(dir.clone()),
            _ => self.inner.var(key),
        }
    }
}

pub fn handle_detect(args: &DetectArgs) -> i32 {
    info!("Starting ecosystem detection");

    let repo_path = match &args.repository_path {
        Some(path) => path.clone(),
        None => match env::current_dir() {
            Ok(dir) => dir,
            Err(e) => {
                error!("Failed to get current directory: {}", e);
                return EXIT_FAILURE;
            }
        },
    };

    if !repo_path.is_dir() {
        error!(
            "Repository path is not a directory: {}",
            repo_path.display()
        );
        return EXIT_FAILURE;
    }

    let output = detect(&RealFileSystem::new(), &repo_path, args.coverage);
    let formatter = OutputFormatter::new(args.format.into());
    match formatter.format(&output) {
        Ok(text) => {
            println!("{}", text.trim_end());
            0
        }
        Err(e) => {
            error!("Failed to format detection result: {:#}", e);
            EXIT_FAILURE
        }
    }
}

pub fn detect(fs: &dyn FileSystem, dir: &Path, coverage: bool) -> DetectionOutput {
    let registry = EcosystemRegistry::with_defaults();
    let detection = registry.detect(fs, dir);
    debug!("Detection: {:?}", detection);

    let tasks = match registry.get(detection.ecosystem) {
        Some(definition) => {
            let ctx = CommandContext::new(fs, dir).with_coverage(coverage);
            TaskKind::all_variants()
                .iter()
                .filter_map(|&task| {
                    let commands = definition.commands(task, &ctx);
                    (!commands.is_empty()).then(|| PlannedTask {
                        task,
                        commands: commands.iter().map(|c| c.display()).collect(),
                    })
                })
                .collect()
        }
        None => Vec::new(),
    };

    DetectionOutput {
        path: PathBuf::from(dir),
        detection,
        tasks,
    }
}
