use super::context::PipeContext;
use crate::error::PipeError;

/// One CI step.
///
/// Implementations read their own configuration from `ctx.env()` inside
/// `run`, so configuration errors are reported through the same path as
/// every other failure and artifacts are still written.
pub trait Pipe: Send + Sync {
    fn name(&self) -> &'static str;

    fn run(&self, ctx: &mut PipeContext) -> Result<(), PipeError>;
}
