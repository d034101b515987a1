//! Artifacts written for downstream steps
//!
//! `build-info/<pipe>-info.txt` is sourced by later pipeline steps as shell
//! assignments, so every line is `IDENTIFIER=value` with an unquoted value
//! restricted to characters that need no quoting.

use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Ordered `KEY=value` pairs; setting an existing key replaces its value in place
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildInfo {
    entries: Vec<(String, String)>,
}

impl BuildInfo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: &str, value: impl AsRef<str>) {
        let key = sanitize_key(key);
        let value = sanitize_value(value.as_ref());
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn entries(&self) -> &[(String, String)] {
        &self.entries
    }

    pub fn render(&self) -> String {
        self.entries
            .iter()
            .map(|(k, v)| format!("{}={}\n", k, v))
            .collect()
    }

    pub fn write(&self, dir: &Path, pipe: &str) -> Result<PathBuf> {
        let path = dir.join(format!("{}-info.txt", pipe));
        write_file(&path, &self.render())?;
        Ok(path)
    }
}

pub fn is_valid_key(key: &str) -> bool {
    let mut chars = key.chars();
    matches!(chars.next(), Some(c) if c == '_' || c.is_ascii_uppercase())
        && chars.all(|c| c == '_' || c.is_ascii_uppercase() || c.is_ascii_digit())
}

fn sanitize_key(key: &str) -> String {
    let mut out: String = key
        .chars()
        .map(|c| {
            let c = c.to_ascii_uppercase();
            if c.is_ascii_uppercase() || c.is_ascii_digit() {
                c
            } else {
                '_'
            }
        })
        .collect();
    if out.is_empty() || out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    out
}

fn is_safe_value_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || "._:/@%+,=-".contains(c)
}

/// Replace anything a shell would interpret with `_`
pub fn sanitize_value(value: &str) -> String {
    value
        .trim()
        .chars()
        .map(|c| if is_safe_value_char(c) { c } else { '_' })
        .collect()
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize report")?;
    write_file(path, &json)
}

pub fn write_file(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_values_are_safe_for_sourcing() {
        let mut info = BuildInfo::new();
        info.set("MESSAGE", "tests failed; rm -rf $HOME `id`");
        info.set("IMAGE", "registry.example.com/team/app:1.2.3");
        let rendered = info.render();
        assert!(rendered.contains("MESSAGE=tests_failed__rm_-rf__HOME__id_\n"));
        assert!(rendered.contains("IMAGE=registry.example.com/team/app:1.2.3\n"));
    }

    #[test]
    fn test_keys_are_normalized() {
        let mut info = BuildInfo::new();
        info.set("coverage-pct", "81.5");
        info.set("1st", "x");
        assert_eq!(info.get("COVERAGE_PCT"), Some("81.5"));
        assert_eq!(info.get("_1ST"), Some("x"));
        assert!(info.entries().iter().all(|(k, _)| is_valid_key(k)));
    }

    #[test]
    fn test_set_replaces_in_place() {
        let mut info = BuildInfo::new();
        info.set("PIPE", "test");
        info.set("STATUS", "running");
        info.set("STATUS", "passed");
        assert_eq!(info.render(), "PIPE=test\nSTATUS=passed\n");
    }

    #[test]
    fn test_is_valid_key() {
        assert!(is_valid_key("EXIT_CODE"));
        assert!(is_valid_key("_X1"));
        assert!(!is_valid_key("1X"));
        assert!(!is_valid_key("lower"));
        assert!(!is_valid_key(""));
    }

    #[test]
    fn test_write_creates_directory() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("build-info");
        let mut info = BuildInfo::new();
        info.set("PIPE", "lint");
        let path = info.write(&dir, "lint").unwrap();
        assert_eq!(path, dir.join("lint-info.txt"));
        assert_eq!(fs::read_to_string(path).unwrap(), "PIPE=lint\n");
    }
}
