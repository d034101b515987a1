//! Pipe execution: shared context, the `Pipe` trait, the top-level runner and the pipes

pub mod context;
pub mod orchestrator;
pub mod pipe_trait;
pub mod pipes;

#[cfg(test)]
pub(crate) mod testing;

pub use context::PipeContext;
pub use orchestrator::{run_pipe, timestamp};
pub use pipe_trait::Pipe;
pub use pipes::{pipe_by_name, PIPE_NAMES};
