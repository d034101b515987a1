//! pipekit - auto-detecting CI pipes
//!
//! Each pipe is one CI step (test, lint, secrets, security, quality, docker,
//! helm, deploy, notify) configured entirely through environment variables.
//! A run detects the project ecosystem from marker files, dispatches the
//! matching tool commands in sequence, evaluates policy gates on the results
//! and writes `build-info/<pipe>-info.txt` and `<pipe>-report.json`.
//!
//! # Example Usage
//!
//! ```ignore
//! use pipekit::{run_pipe, pipe_by_name, PipeContext};
//!
//! let pipe = pipe_by_name("test").expect("known pipe");
//! let mut ctx = PipeContext::from_env();
//! let report = run_pipe(pipe.as_ref(), &mut ctx);
//! std::process::exit(report.exit_code());
//! ```
//!
//! # Project Structure
//!
//! - [`stack`]: ecosystem identifiers, marker files and per-ecosystem command tables
//! - [`dispatch`]: structured commands, the process runner and the task dispatcher
//! - [`report`]: findings, coverage, policy gates and build-info artifacts
//! - [`notify`]: Slack, webhook and email delivery
//! - [`pipeline`]: the pipes and the runner that ties the pieces together

pub mod cli;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod fs;
pub mod notify;
pub mod pipeline;
pub mod report;
pub mod stack;
pub mod util;

pub use config::{CommonConfig, ConfigError, EnvSource, ProcessEnv};
pub use dispatch::{CommandRunner, CommandSpec, Dispatcher, ScriptedRunner, SystemRunner};
pub use error::{PipeError, Result};
pub use pipeline::{pipe_by_name, run_pipe, Pipe, PipeContext, PIPE_NAMES};
pub use report::{GateResult, GateStatus, PipeReport};
pub use stack::{Detection, Ecosystem, EcosystemRegistry, TaskKind};
pub use util::{init_logging, LoggingConfig};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
