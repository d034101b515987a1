//! Environment-driven configuration
//!
//! Every pipe is configured entirely through environment variables. Values are
//! read through [`EnvSource`] so tests can supply a plain map instead of
//! mutating the process environment. Optional values always have a default;
//! malformed optional values are logged and replaced by that default.

use std::collections::HashMap;
use std::env;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

const DEFAULT_WORKING_DIR: &str = ".";
const DEFAULT_BUILD_INFO_DIR: &str = "build-info";
const DEFAULT_REPORTS_DIR: &str = "security-reports";
const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 0;

/// Read access to named configuration values
pub trait EnvSource: Send + Sync {
    fn var(&self, key: &str) -> Option<String>;
}

/// The real process environment
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, key: &str) -> Option<String> {
        env::var(key).ok()
    }
}

impl EnvSource for HashMap<String, String> {
    fn var(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Required variable {name} is not set")]
    MissingVariable { name: String },

    #[error("Invalid value '{value}' for {name}: expected {expected}{}", suggestion_suffix(.suggestion))]
    InvalidValue {
        name: String,
        value: String,
        expected: String,
        suggestion: Option<String>,
    },
}

fn suggestion_suffix(suggestion: &Option<String>) -> String {
    match suggestion {
        Some(s) => format!(" (did you mean '{}'?)", s),
        None => String::new(),
    }
}

impl ConfigError {
    pub fn missing(name: &str) -> Self {
        ConfigError::MissingVariable {
            name: name.to_string(),
        }
    }

    /// Build an invalid-value error, suggesting the closest accepted value
    pub fn invalid(name: &str, value: &str, accepted: &[&str]) -> Self {
        let suggestion = accepted
            .iter()
            .map(|candidate| (candidate, strsim::jaro_winkler(value, candidate)))
            .filter(|(_, score)| *score >= 0.8)
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(candidate, _)| candidate.to_string());

        ConfigError::InvalidValue {
            name: name.to_string(),
            value: value.to_string(),
            expected: format!("one of {}", accepted.join(", ")),
            suggestion,
        }
    }

    /// Name of the variable the error is about
    pub fn variable(&self) -> &str {
        match self {
            ConfigError::MissingVariable { name } | ConfigError::InvalidValue { name, .. } => name,
        }
    }
}

/// Non-empty trimmed value of a variable
pub fn string(source: &dyn EnvSource, name: &str) -> Option<String> {
    source
        .var(name)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub fn string_or(source: &dyn EnvSource, name: &str, default: &str) -> String {
    string(source, name).unwrap_or_else(|| default.to_string())
}

pub fn required(source: &dyn EnvSource, name: &str) -> Result<String, ConfigError> {
    string(source, name).ok_or_else(|| ConfigError::missing(name))
}

pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

pub fn bool_or(source: &dyn EnvSource, name: &str, default: bool) -> bool {
    match string(source, name) {
        None => default,
        Some(raw) => parse_bool(&raw).unwrap_or_else(|| {
            warn!(variable = name, value = %raw, default, "Invalid boolean, using default");
            default
        }),
    }
}

pub fn number_or<T>(source: &dyn EnvSource, name: &str, default: T) -> T
where
    T: std::str::FromStr + Copy + fmt::Display,
{
    match string(source, name) {
        None => default,
        Some(raw) => raw.parse::<T>().unwrap_or_else(|_| {
            warn!(variable = name, value = %raw, default = %default, "Invalid number, using default");
            default
        }),
    }
}

/// Comma-separated list, empty items dropped
pub fn list(source: &dyn EnvSource, name: &str) -> Vec<String> {
    string(source, name)
        .map(|raw| {
            raw.split(',')
                .map(|item| item.trim().to_string())
                .filter(|item| !item.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

/// Comma-separated `KEY=value` pairs
pub fn key_values(source: &dyn EnvSource, name: &str) -> Result<Vec<(String, String)>, ConfigError> {
    list(source, name)
        .into_iter()
        .map(|item| match item.split_once('=') {
            Some((key, value)) if !key.trim().is_empty() => {
                Ok((key.trim().to_string(), value.trim().to_string()))
            }
            _ => Err(ConfigError::InvalidValue {
                name: name.to_string(),
                value: item.clone(),
                expected: "comma-separated KEY=value pairs".to_string(),
                suggestion: None,
            }),
        })
        .collect()
}

/// Shell-word split of an argument string (`TEST_ARGS="-k 'slow and db'"`)
pub fn args(source: &dyn EnvSource, name: &str) -> Result<Vec<String>, ConfigError> {
    match string(source, name) {
        None => Ok(Vec::new()),
        Some(raw) => shell_words::split(&raw).map_err(|e| ConfigError::InvalidValue {
            name: name.to_string(),
            value: raw.clone(),
            expected: format!("shell-style arguments ({})", e),
            suggestion: None,
        }),
    }
}

/// Settings shared by every pipe
#[derive(Debug, Clone, PartialEq)]
pub struct CommonConfig {
    pub working_dir: PathBuf,
    pub debug: bool,
    pub build_info_dir: PathBuf,
    pub reports_dir: PathBuf,
    pub command_timeout: Option<Duration>,
}

impl Default for CommonConfig {
    fn default() -> Self {
        Self {
            working_dir: PathBuf::from(DEFAULT_WORKING_DIR),
            debug: false,
            build_info_dir: PathBuf::from(DEFAULT_BUILD_INFO_DIR),
            reports_dir: PathBuf::from(DEFAULT_REPORTS_DIR),
            command_timeout: None,
        }
    }
}

impl CommonConfig {
    pub fn from_env() -> Self {
        Self::from_source(&ProcessEnv)
    }

    pub fn from_source(source: &dyn EnvSource) -> Self {
        let timeout_secs = number_or(source, "COMMAND_TIMEOUT", DEFAULT_COMMAND_TIMEOUT_SECS);

        Self {
            working_dir: PathBuf::from(string_or(source, "WORKING_DIR", DEFAULT_WORKING_DIR)),
            debug: bool_or(source, "DEBUG", false),
            build_info_dir: PathBuf::from(string_or(
                source,
                "BUILD_INFO_DIR",
                DEFAULT_BUILD_INFO_DIR,
            )),
            reports_dir: PathBuf::from(string_or(source, "REPORTS_DIR", DEFAULT_REPORTS_DIR)),
            command_timeout: (timeout_secs > 0).then(|| Duration::from_secs(timeout_secs)),
        }
    }

    /// Artifact directories are relative to the working directory unless absolute
    pub fn build_info_path(&self) -> PathBuf {
        self.working_dir.join(&self.build_info_dir)
    }

    pub fn reports_path(&self) -> PathBuf {
        self.working_dir.join(&self.reports_dir)
    }
}

impl fmt::Display for CommonConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Pipe Configuration:")?;
        writeln!(f, "  Working Dir: {}", self.working_dir.display())?;
        writeln!(f, "  Debug: {}", self.debug)?;
        writeln!(f, "  Build Info Dir: {}", self.build_info_dir.display())?;
        writeln!(f, "  Reports Dir: {}", self.reports_dir.display())?;
        match self.command_timeout {
            Some(t) => writeln!(f, "  Command Timeout: {}s", t.as_secs())?,
            None => writeln!(f, "  Command Timeout: none")?,
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) fn env_map(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    struct EnvGuard {
        key: String,
        old_value: Option<String>,
    }

    impl EnvGuard {
        fn set(key: &str, value: &str) -> Self {
            let old_value = env::var(key).ok();
            env::set_var(key, value);
            Self {
                key: key.to_string(),
                old_value,
            }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            match &self.old_value {
                Some(v) => env::set_var(&self.key, v),
                None => env::remove_var(&self.key),
            }
        }
    }

    #[test]
    fn test_common_defaults() {
        let config = CommonConfig::from_source(&env_map(&[]));
        assert_eq!(config, CommonConfig::default());
        assert_eq!(config.build_info_path(), PathBuf::from("./build-info"));
    }

    #[test]
    fn test_common_overrides() {
        let config = CommonConfig::from_source(&env_map(&[
            ("WORKING_DIR", "/src/app"),
            ("DEBUG", "yes"),
            ("REPORTS_DIR", "out/reports"),
            ("COMMAND_TIMEOUT", "90"),
        ]));
        assert_eq!(config.working_dir, PathBuf::from("/src/app"));
        assert!(config.debug);
        assert_eq!(config.reports_path(), PathBuf::from("/src/app/out/reports"));
        assert_eq!(config.command_timeout, Some(Duration::from_secs(90)));
    }

    #[test]
    fn test_empty_values_are_unset() {
        let source = env_map(&[("WORKING_DIR", "   ")]);
        assert_eq!(string(&source, "WORKING_DIR"), None);
        assert!(required(&source, "WORKING_DIR").is_err());
    }

    #[test]
    fn test_bool_parsing() {
        assert_eq!(parse_bool("TRUE"), Some(true));
        assert_eq!(parse_bool("off"), Some(false));
        assert_eq!(parse_bool("maybe"), None);

        let source = env_map(&[("FAIL_ON_SECRETS", "ture")]);
        assert!(bool_or(&source, "FAIL_ON_SECRETS", true));
        assert!(!bool_or(&source, "MISSING", false));
    }

    #[test]
    fn test_invalid_number_falls_back() {
        let source = env_map(&[("COVERAGE_THRESHOLD", "eighty")]);
        assert_eq!(number_or(&source, "COVERAGE_THRESHOLD", 80.0), 80.0);
    }

    #[test]
    fn test_list_and_key_values() {
        let source = env_map(&[
            ("CHANNELS", "slack, ,webhook"),
            ("BUILD_ARGS", "VERSION=1.2, COMMIT=abc=def"),
            ("BAD", "novalue"),
        ]);
        assert_eq!(list(&source, "CHANNELS"), vec!["slack", "webhook"]);
        assert_eq!(
            key_values(&source, "BUILD_ARGS").unwrap(),
            vec![
                ("VERSION".to_string(), "1.2".to_string()),
                ("COMMIT".to_string(), "abc=def".to_string())
            ]
        );
        assert!(key_values(&source, "BAD").is_err());
    }

    #[test]
    fn test_args_split_like_shell() {
        let source = env_map(&[("TEST_ARGS", "-k 'slow and db' --maxfail=1")]);
        assert_eq!(
            args(&source, "TEST_ARGS").unwrap(),
            vec!["-k", "slow and db", "--maxfail=1"]
        );

        let unbalanced = env_map(&[("TEST_ARGS", "-k 'oops")]);
        assert!(args(&unbalanced, "TEST_ARGS").is_err());
    }

    #[test]
    fn test_invalid_value_suggests_closest() {
        let err = ConfigError::invalid("TEST_TOOL", "pytets", &["maven", "pytest", "cargo"]);
        assert!(err.to_string().contains("did you mean 'pytest'"));
        assert_eq!(err.variable(), "TEST_TOOL");

        let err = ConfigError::invalid("TEST_TOOL", "zzz", &["maven"]);
        assert!(!err.to_string().contains("did you mean"));
    }

    #[test]
    fn test_missing_names_variable() {
        let err = ConfigError::missing("DOCKER_REGISTRY");
        assert_eq!(err.to_string(), "Required variable DOCKER_REGISTRY is not set");
    }

    #[test]
    #[serial]
    fn test_process_env_source() {
        let _guard = EnvGuard::set("PIPEKIT_TEST_WORKING_DIR_PROBE", "value");
        assert_eq!(
            ProcessEnv.var("PIPEKIT_TEST_WORKING_DIR_PROBE"),
            Some("value".to_string())
        );
    }

    #[test]
    #[serial]
    fn test_common_from_process_env() {
        let _dir = EnvGuard::set("WORKING_DIR", "/tmp/pipekit-workdir");
        let _debug = EnvGuard::set("DEBUG", "true");

        let config = CommonConfig::from_env();
        assert_eq!(config.working_dir, PathBuf::from("/tmp/pipekit-workdir"));
        assert!(config.debug);
    }

    #[test]
    fn test_config_display() {
        let display = format!("{}", CommonConfig::default());
        assert!(display.contains("Pipe Configuration:"));
        assert!(display.contains("Command Timeout: none"));
    }
}
