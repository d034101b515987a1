//! Command Dispatcher
//!
//! Resolves an (ecosystem, task) pair to structured commands and runs them
//! strictly in sequence through a [`CommandRunner`].

pub mod command;
pub mod dispatcher;
pub mod mock;
pub mod runner;

pub use command::CommandSpec;
pub use dispatcher::{Dispatcher, Requirement, TaskOutcome, TaskRequest};
pub use mock::{RecordedCall, Scripted, ScriptedRunner};
pub use runner::{CancelToken, CommandRunner, ExecutionResult, RunOptions, SystemRunner};
