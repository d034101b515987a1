//! Per-run result record and its human rendering

use super::artifact::BuildInfo;
use super::finding::{Finding, SeverityCounts};
use super::policy::{GateResult, GateStatus};
use crate::dispatch::ExecutionResult;
use crate::error::PipeError;
use crate::stack::Detection;
use serde::Serialize;
use std::collections::BTreeMap;

const RULE: &str = "\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}";

const MAX_LISTED_FINDINGS: usize = 20;

/// One executed command
#[derive(Debug, Clone, Serialize)]
pub struct StepRecord {
    pub command: String,
    pub exit_code: Option<i32>,
    pub duration_ms: u128,
    pub success: bool,
    pub blocking: bool,
}

impl From<&ExecutionResult> for StepRecord {
    fn from(result: &ExecutionResult) -> Self {
        Self {
            command: result.command.clone(),
            exit_code: result.exit_code,
            duration_ms: result.duration.as_millis(),
            success: result.success,
            blocking: result.blocking,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorRecord {
    pub kind: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl From<&PipeError> for ErrorRecord {
    fn from(err: &PipeError) -> Self {
        Self {
            kind: err.kind().to_string(),
            message: format!("{:#}", err),
            hint: err.hint(),
        }
    }
}

/// Everything a pipe run produced, written as `<pipe>-report.json`
#[derive(Debug, Clone, Serialize)]
pub struct PipeReport {
    pub pipe: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detection: Option<Detection>,
    pub gates: Vec<GateResult>,
    pub steps: Vec<StepRecord>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub findings: Vec<Finding>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub counts: Option<SeverityCounts>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coverage: Option<f64>,
    pub warnings: Vec<String>,
    /// Extra `KEY=value` pairs exported through build-info
    pub metadata: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorRecord>,
}

impl PipeReport {
    pub fn new(pipe: &str) -> Self {
        Self {
            pipe: pipe.to_string(),
            detection: None,
            gates: Vec::new(),
            steps: Vec::new(),
            findings: Vec::new(),
            counts: None,
            coverage: None,
            warnings: Vec::new(),
            metadata: BTreeMap::new(),
            error: None,
        }
    }

    pub fn gate(&mut self, gate: GateResult) {
        self.gates.push(gate);
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    pub fn set(&mut self, key: &str, value: impl ToString) {
        self.metadata.insert(key.to_string(), value.to_string());
    }

    pub fn record(&mut self, result: &ExecutionResult) {
        self.steps.push(StepRecord::from(result));
    }

    pub fn set_findings(&mut self, findings: Vec<Finding>) {
        self.counts = Some(SeverityCounts::from_findings(&findings));
        self.findings = findings;
    }

    pub fn set_error(&mut self, err: &PipeError) {
        self.error = Some(ErrorRecord::from(err));
    }

    pub fn status(&self) -> GateStatus {
        if self.error.is_some() || self.gates.iter().any(GateResult::is_failed) {
            GateStatus::Failed
        } else if !self.warnings.is_empty()
            || self.gates.iter().any(|g| g.status == GateStatus::Warned)
        {
            GateStatus::Warned
        } else {
            GateStatus::Passed
        }
    }

    /// 0 only when no gate failed and no error was raised
    pub fn exit_code(&self) -> i32 {
        match self.status() {
            GateStatus::Failed => crate::error::EXIT_FAILURE,
            _ => 0,
        }
    }

    pub fn build_info(&self, timestamp: &str) -> BuildInfo {
        let mut info = BuildInfo::new();
        info.set("PIPE", &self.pipe);
        info.set("STATUS", self.status().as_str());
        info.set("EXIT_CODE", self.exit_code().to_string());
        info.set("TIMESTAMP", timestamp);
        if let Some(detection) = &self.detection {
            info.set("ECOSYSTEM", detection.ecosystem.as_str());
            info.set("ECOSYSTEM_SOURCE", detection.source.as_str());
        }
        for gate in &self.gates {
            info.set(&format!("GATE_{}", gate.name), gate.status.as_str());
        }
        if let Some(counts) = &self.counts {
            info.set("FINDINGS_TOTAL", counts.total().to_string());
        }
        if let Some(coverage) = self.coverage {
            info.set("COVERAGE", format!("{:.2}", coverage));
        }
        for (key, value) in &self.metadata {
            info.set(key, value);
        }
        if let Some(error) = &self.error {
            info.set("ERROR_KIND", &error.kind);
        }
        info
    }
}

fn paint(text: &str, code: &str, color: bool) -> String {
    if color {
        format!("\x1b[{}m{}\x1b[0m", code, text)
    } else {
        text.to_string()
    }
}

/// Status block printed at the end of a run
pub fn render_human(report: &PipeReport, color: bool) -> String {
    let mut output = String::new();
    output.push_str(&format!("{}\n", RULE));
    output.push_str(&format!("Pipe: {}\n", report.pipe));
    if let Some(detection) = &report.detection {
        output.push_str(&format!(
            "Ecosystem: {} ({})\n",
            detection.ecosystem,
            detection.source.as_str()
        ));
    }
    output.push_str(&format!("{}\n", RULE));

    for gate in &report.gates {
        let line = match gate.status {
            GateStatus::Passed => paint(&format!("\u{2713} {}: {}", gate.name, gate.detail), "32", color),
            GateStatus::Warned => paint(
                &format!("\u{26A0} {}: {} (warning, continuing)", gate.name, gate.detail),
                "33",
                color,
            ),
            GateStatus::Failed => paint(
                &format!("\u{2717} [ERROR] {}: {} (blocking)", gate.name, gate.detail),
                "31",
                color,
            ),
        };
        output.push_str(&line);
        output.push('\n');
        if gate.status != GateStatus::Passed {
            if let Some(remediation) = &gate.remediation {
                for line in remediation.lines() {
                    output.push_str(&format!("    {}\n", line));
                }
            }
        }
    }

    if !report.findings.is_empty() {
        if let Some(counts) = &report.counts {
            output.push_str(&format!("Findings: {}\n", counts.summary()));
        }
        let mut sorted: Vec<&Finding> = report.findings.iter().collect();
        sorted.sort_by(|a, b| b.severity.cmp(&a.severity));
        for finding in sorted.iter().take(MAX_LISTED_FINDINGS) {
            output.push_str(&format!(
                "  {:<8} {} {}: {}\n",
                finding.severity, finding.location, finding.rule_id, finding.message
            ));
        }
        if sorted.len() > MAX_LISTED_FINDINGS {
            output.push_str(&format!(
                "  ... and {} more (see the JSON report)\n",
                sorted.len() - MAX_LISTED_FINDINGS
            ));
        }
    }

    for warning in &report.warnings {
        output.push_str(&paint(&format!("\u{26A0} {}", warning), "33", color));
        output.push('\n');
    }

    if let Some(error) = &report.error {
        output.push_str(&paint(&format!("\u{2717} [ERROR] {}", error.message), "31", color));
        output.push('\n');
        if let Some(hint) = &error.hint {
            output.push_str(&format!("    {}\n", hint));
        }
    }

    let verdict = match report.status() {
        GateStatus::Passed => paint("\u{2713} PASSED", "32", color),
        GateStatus::Warned => paint("\u{26A0} PASSED WITH WARNINGS", "33", color),
        GateStatus::Failed => paint("\u{2717} FAILED", "31", color),
    };
    output.push_str(&format!("{}\n", verdict));
    output
}
