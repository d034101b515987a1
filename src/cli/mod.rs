pub mod commands;
pub mod handlers;
pub mod output;

pub use commands::{CliArgs, Commands, DetectArgs, PipeArgs};
pub use handlers::{handle_detect, handle_pipe};
pub use output::{OutputFormat, OutputFormatter};
