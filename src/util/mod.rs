//! Process-wide helpers

pub mod logging;

pub use logging::{init_logging, parse_level, LevelFlags, LoggingConfig};
