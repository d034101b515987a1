//! Structured logging setup
//!
//! Logs go to stderr through a `tracing` subscriber so stdout stays free for
//! the pipe summary and `detect` output. The subscriber is installed once per
//! process; later calls are ignored.

use crate::config::{self, EnvSource};
use std::sync::Once;
use tracing::Level;
use tracing_subscriber::filter::{Directive, LevelFilter};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static INIT: Once = Once::new();

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Level applied to pipekit's own targets
    pub level: Level,

    /// JSON lines instead of the human format
    pub use_json: bool,

    pub include_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            use_json: false,
            include_target: false,
        }
    }
}

/// Command-line switches that influence the log level
#[derive(Debug, Clone, Copy, Default)]
pub struct LevelFlags<'a> {
    pub log_level: Option<&'a str>,
    pub verbose: bool,
    pub quiet: bool,
}

impl LoggingConfig {
    pub fn with_level(level: Level) -> Self {
        Self {
            level,
            ..Default::default()
        }
    }

    /// Flags first, then `DEBUG`, then `PIPEKIT_LOG_LEVEL`, then info
    pub fn resolve(flags: LevelFlags<'_>, env: &dyn EnvSource) -> Self {
        let level = if let Some(level_str) = flags.log_level {
            parse_level(level_str)
        } else if flags.verbose {
            Level::DEBUG
        } else if flags.quiet {
            Level::ERROR
        } else if config::bool_or(env, "DEBUG", false) {
            Level::DEBUG
        } else {
            parse_level(&config::string_or(env, "PIPEKIT_LOG_LEVEL", "info"))
        };

        Self {
            level,
            use_json: config::bool_or(env, "PIPEKIT_LOG_JSON", false),
            include_target: level >= Level::DEBUG,
        }
    }

    fn filter(&self, rust_log: Option<String>) -> EnvFilter {
        if let Some(spec) = rust_log.filter(|s| !s.trim().is_empty()) {
            return EnvFilter::new(spec);
        }
        let mut filter = EnvFilter::default().add_directive(Directive::from(LevelFilter::WARN));
        if let Ok(own) = format!("pipekit={}", LevelFilter::from_level(self.level)).parse::<Directive>() {
            filter = filter.add_directive(own);
        }
        filter
    }
}

/// Unknown names fall back to info
pub fn parse_level(level_str: &str) -> Level {
    match level_str.trim().to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" | "warning" => Level::WARN,
        "error" => Level::ERROR,
        _ => {
            eprintln!(
                "Invalid log level '{}', defaulting to INFO. Valid levels: trace, debug, info, warn, error",
                level_str
            );
            Level::INFO
        }
    }
}

pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let filter = config.filter(std::env::var("RUST_LOG").ok());

        if config.use_json {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .json()
                        .with_target(true)
                        .with_writer(std::io::stderr),
                )
                .init();
        } else {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .with_target(config.include_target)
                        .with_writer(std::io::stderr),
                )
                .init();
        }
    });
}
