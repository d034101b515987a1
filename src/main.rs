use pipekit::cli::commands::{CliArgs, Commands};
use pipekit::cli::handlers::{handle_detect, handle_pipe};
use pipekit::config::ProcessEnv;
use pipekit::util::{init_logging, LevelFlags, LoggingConfig};
use pipekit::VERSION;

use clap::error::ErrorKind;
use clap::Parser;
use tracing::debug;

/// Exit code for command-line usage errors
const EXIT_USAGE: i32 = 2;

fn main() {
    let args = match CliArgs::try_parse() {
        Ok(args) => args,
        Err(err) => {
            let code = match err.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
                _ => EXIT_USAGE,
            };
            let _ = err.print();
            std::process::exit(code);
        }
    };

    let flags = LevelFlags {
        log_level: args.log_level.as_deref(),
        verbose: args.verbose,
        quiet: args.quiet,
    };
    init_logging(LoggingConfig::resolve(flags, &ProcessEnv));

    debug!("pipekit v{} starting", VERSION);
    debug!("Arguments: {:?}", args);

    let exit_code = match &args.command {
        Commands::Detect(detect_args) => handle_detect(detect_args),
        command => match command.pipe() {
            Some((name, pipe_args)) => handle_pipe(name, pipe_args),
            None => EXIT_USAGE,
        },
    };

    std::process::exit(exit_code);
}
