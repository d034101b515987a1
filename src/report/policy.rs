//! Pass/fail gates applied to raw tool results

use super::finding::{affected_locations, Finding, Severity, SeverityCounts};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

const MAX_LISTED_LOCATIONS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GateStatus {
    Passed,
    /// Failed but downgraded, or informational; never blocks
    Warned,
    Failed,
}

impl GateStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            GateStatus::Passed => "passed",
            GateStatus::Warned => "warned",
            GateStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for GateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GateResult {
    pub name: String,
    pub status: GateStatus,
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remediation: Option<String>,
}

impl GateResult {
    pub fn new(name: impl Into<String>, status: GateStatus, detail: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status,
            detail: detail.into(),
            remediation: None,
        }
    }

    pub fn passed(name: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(name, GateStatus::Passed, detail)
    }

    pub fn warned(name: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(name, GateStatus::Warned, detail)
    }

    pub fn failed(name: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(name, GateStatus::Failed, detail)
    }

    pub fn with_remediation(mut self, remediation: impl Into<String>) -> Self {
        self.remediation = Some(remediation.into());
        self
    }

    pub fn is_failed(&self) -> bool {
        self.status == GateStatus::Failed
    }
}

/// Severity threshold combined with per-severity fail toggles.
///
/// A finding blocks only when its severity is at or above the threshold and
/// the toggle for its severity is on.
#[derive(Debug, Clone)]
pub struct FindingPolicy {
    pub threshold: Severity,
    fail_on: BTreeMap<Severity, bool>,
}

impl FindingPolicy {
    pub fn new(threshold: Severity) -> Self {
        Self {
            threshold,
            fail_on: BTreeMap::new(),
        }
    }

    pub fn fail_on(mut self, severity: Severity, enabled: bool) -> Self {
        self.fail_on.insert(severity, enabled);
        self
    }

    pub fn blocks(&self, severity: Severity) -> bool {
        severity >= self.threshold && self.fail_on.get(&severity).copied().unwrap_or(false)
    }

    pub fn evaluate(&self, name: &str, findings: &[Finding]) -> GateResult {
        if findings.is_empty() {
            return GateResult::passed(name, "no findings");
        }

        let counts = SeverityCounts::from_findings(findings);
        let blocking: Vec<Finding> = findings
            .iter()
            .filter(|f| self.blocks(f.severity))
            .cloned()
            .collect();

        if blocking.is_empty() {
            return GateResult::warned(
                name,
                format!(
                    "{} finding(s) below blocking policy ({})",
                    findings.len(),
                    counts.summary()
                ),
            );
        }

        let locations = affected_locations(&blocking);
        let mut listed: Vec<&str> = locations.iter().take(MAX_LISTED_LOCATIONS).copied().collect();
        if locations.len() > MAX_LISTED_LOCATIONS {
            listed.push("...");
        }
        let mut detail = format!(
            "{} blocking finding(s) ({})",
            blocking.len(),
            counts.summary()
        );
        if !listed.is_empty() {
            detail.push_str(&format!("; affected: {}", listed.join(", ")));
        }
        GateResult::failed(name, detail)
    }
}

/// Gate driven only by a command's exit status.
///
/// With `blocking` off a failure is downgraded to a warning.
#[derive(Debug, Clone, Copy)]
pub struct ExitCodePolicy {
    pub blocking: bool,
}

impl ExitCodePolicy {
    pub fn new(blocking: bool) -> Self {
        Self { blocking }
    }

    pub fn evaluate(&self, name: &str, exit_code: Option<i32>) -> GateResult {
        match exit_code {
            Some(0) => GateResult::passed(name, "exit code 0"),
            other => {
                let detail = match other {
                    Some(code) => format!("exit code {}", code),
                    None => "terminated by signal".to_string(),
                };
                if self.blocking {
                    GateResult::failed(name, detail)
                } else {
                    GateResult::warned(name, format!("{} (non-blocking)", detail))
                }
            }
        }
    }
}

/// Minimum line coverage, inclusive
#[derive(Debug, Clone, Copy)]
pub struct CoveragePolicy {
    pub threshold: f64,
    pub fail_on_low: bool,
}

impl CoveragePolicy {
    pub fn new(threshold: f64, fail_on_low: bool) -> Self {
        Self {
            threshold,
            fail_on_low,
        }
    }

    pub fn evaluate(&self, coverage: Option<f64>) -> GateResult {
        let Some(pct) = coverage else {
            return GateResult::warned("coverage", "no coverage report found");
        };
        let pct = round_pct(pct);
        if pct >= self.threshold {
            return GateResult::passed(
                "coverage",
                format!("{:.2}% (threshold {:.2}%)", pct, self.threshold),
            );
        }
        let detail = format!("{:.2}% is below threshold {:.2}%", pct, self.threshold);
        if self.fail_on_low {
            GateResult::failed("coverage", detail)
        } else {
            GateResult::warned("coverage", detail)
        }
    }
}

/// Two decimal places, so float noise from ratio * 100 cannot flip the gate
pub fn round_pct(pct: f64) -> f64 {
    (pct * 100.0).round() / 100.0
}
