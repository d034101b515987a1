use crate::config::ConfigError;
use crate::stack::{Ecosystem, TaskKind};
use std::path::PathBuf;
use thiserror::Error;

/// Exit code for any failed pipe run
pub const EXIT_FAILURE: i32 = 1;

#[derive(Debug, Error)]
pub enum PipeError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(
        "Could not detect a supported ecosystem in {}. Set {variable} to one of: {accepted}",
        dir.display()
    )]
    DetectionAmbiguity {
        variable: String,
        dir: PathBuf,
        accepted: String,
    },

    #[error("No {task} handler for ecosystem '{ecosystem}'")]
    NoHandler { ecosystem: Ecosystem, task: TaskKind },

    #[error("{task} failed for {ecosystem} ({})", describe_exit(.exit_code))]
    ExecutionFailed {
        ecosystem: Ecosystem,
        task: TaskKind,
        exit_code: Option<i32>,
    },

    #[error("{tool} {task} failed ({})", describe_exit(.exit_code))]
    ToolFailed {
        tool: String,
        task: TaskKind,
        exit_code: Option<i32>,
    },

    #[error("Failed to start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{command}' timed out after {seconds}s")]
    TimedOut { command: String, seconds: u64 },

    #[error("'{command}' was cancelled")]
    Cancelled { command: String },

    #[error("Notification delivery failed: {failed} of {total} channel(s) failed")]
    Delivery { failed: usize, total: usize },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

fn describe_exit(exit_code: &Option<i32>) -> String {
    match exit_code {
        Some(code) => format!("exit code {}", code),
        None => "terminated by signal".to_string(),
    }
}

impl PipeError {
    /// Process exit code for this error
    pub fn exit_code(&self) -> i32 {
        EXIT_FAILURE
    }

    /// Short category label used in reports and build-info
    pub fn kind(&self) -> &'static str {
        match self {
            PipeError::Config(_) => "configuration",
            PipeError::DetectionAmbiguity { .. } => "detection",
            PipeError::NoHandler { .. } => "no-handler",
            PipeError::ExecutionFailed { .. } | PipeError::ToolFailed { .. } => "execution",
            PipeError::Spawn { .. } => "spawn",
            PipeError::TimedOut { .. } | PipeError::Cancelled { .. } => "interrupted",
            PipeError::Delivery { .. } => "delivery",
            PipeError::Other(_) => "internal",
        }
    }

    /// Remediation text shown under the error line, when there is one
    pub fn hint(&self) -> Option<String> {
        match self {
            PipeError::Config(ConfigError::MissingVariable { name }) => {
                Some(format!("Set {} in the pipe variables", name))
            }
            PipeError::DetectionAmbiguity { variable, .. } => Some(format!(
                "Set {} explicitly, or provide a custom command",
                variable
            )),
            PipeError::Spawn { program, .. } => Some(format!(
                "Make sure '{}' is installed in the build image and on PATH",
                program
            )),
            _ => None,
        }
    }
}

pub type Result<T, E = PipeError> = std::result::Result<T, E>;
