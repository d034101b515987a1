use crate::stack::{Detection, DetectionSource, Ecosystem, TaskKind};
use anyhow::{Context, Result};
use serde::Serialize;
use std::path::PathBuf;

/// Output format for the `detect` command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// JSON format (machine-readable)
    Json,
    /// YAML format
    Yaml,
    /// Human-readable formatted text
    Human,
}

/// Detection result plus the command each task would dispatch
#[derive(Debug, Clone, Serialize)]
pub struct DetectionOutput {
    pub path: PathBuf,
    #[serde(flatten)]
    pub detection: Detection,
    pub tasks: Vec<PlannedTask>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlannedTask {
    pub task: TaskKind,
    pub commands: Vec<String>,
}

pub struct OutputFormatter {
    format: OutputFormat,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn format(&self, output: &DetectionOutput) -> Result<String> {
        match self.format {
            OutputFormat::Json => self.format_json(output),
            OutputFormat::Yaml => self.format_yaml(output),
            OutputFormat::Human => self.format_human(output),
        }
    }

    fn format_json(&self, output: &DetectionOutput) -> Result<String> {
        serde_json::to_string_pretty(output).context("Failed to serialize detection result to JSON")
    }

    fn format_yaml(&self, output: &DetectionOutput) -> Result<String> {
        serde_yaml::to_string(output).context("Failed to serialize detection result to YAML")
    }

    fn format_human(&self, output: &DetectionOutput) -> Result<String> {
        let mut text = String::new();
        let detection = &output.detection;

        if detection.ecosystem == Ecosystem::Unknown {
            text.push_str("\u{26A0} Ecosystem Detection Result (nothing recognized)\n");
        } else {
            text.push_str("\u{2713} Ecosystem Detection Result\n");
        }
        text.push_str(&"\u{2501}".repeat(42));
        text.push_str("\n\n");

        text.push_str(&format!("Path:       {}\n", output.path.display()));
        text.push_str(&format!("Ecosystem:  {}\n", detection.ecosystem));
        match (&detection.marker, detection.source) {
            (Some(marker), _) => text.push_str(&format!("Marker:     {}\n", marker.display())),
            (None, DetectionSource::Markers) => text.push_str("Marker:     (none found)\n"),
            (None, source) => text.push_str(&format!("Source:     {}\n", source.as_str())),
        }

        if output.tasks.is_empty() {
            text.push_str("\nNo commands available. Set TEST_TOOL / LINT_TOOL or a custom command.\n");
            return Ok(text);
        }

        text.push_str("\nPlanned Commands:\n");
        let last = output.tasks.len() - 1;
        for (i, planned) in output.tasks.iter().enumerate() {
            let connector = if i == last { "\u{2514}" } else { "\u{251C}" };
            let label = format!("{}:", planned.task);
            text.push_str(&format!(
                "{}\u{2500} {:<14} {}\n",
                connector,
                label,
                planned.commands.join(" && ")
            ));
        }

        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cargo_output() -> DetectionOutput {
        DetectionOutput {
            path: PathBuf::from("/repo"),
            detection: Detection::detected(Ecosystem::Cargo, PathBuf::from("Cargo.toml")),
            tasks: vec![
                PlannedTask {
                    task: TaskKind::UnitTest,
                    commands: vec!["cargo test".to_string()],
                },
                PlannedTask {
                    task: TaskKind::Lint,
                    commands: vec!["cargo clippy -- -D warnings".to_string()],
                },
            ],
        }
    }

    #[test]
    fn test_json_flattens_detection() {
        let json = OutputFormatter::new(OutputFormat::Json)
            .format(&cargo_output())
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["ecosystem"], "cargo");
        assert_eq!(value["source"], "markers");
        assert_eq!(value["marker"], "Cargo.toml");
        assert_eq!(value["tasks"][0]["task"], "unit-test");
        assert_eq!(value["tasks"][0]["commands"][0], "cargo test");
    }

    #[test]
    fn test_yaml_output() {
        let yaml = OutputFormatter::new(OutputFormat::Yaml)
            .format(&cargo_output())
            .unwrap();
        assert!(yaml.contains("ecosystem: cargo"));
        assert!(yaml.contains("- cargo test"));
    }

    #[test]
    fn test_human_lists_planned_commands() {
        let text = OutputFormatter::new(OutputFormat::Human)
            .format(&cargo_output())
            .unwrap();
        assert!(text.contains("Ecosystem:  cargo"));
        assert!(text.contains("Marker:     Cargo.toml"));
        assert!(text.contains("unit-test:"));
        assert!(text.contains("cargo clippy -- -D warnings"));
    }

    #[test]
    fn test_human_unknown_ecosystem() {
        let output = DetectionOutput {
            path: PathBuf::from("/empty"),
            detection: Detection::unknown(),
            tasks: Vec::new(),
        };
        let text = OutputFormatter::new(OutputFormat::Human)
            .format(&output)
            .unwrap();
        assert!(text.contains("nothing recognized"));
        assert!(text.contains("(none found)"));
        assert!(text.contains("No commands available"));
    }
}
