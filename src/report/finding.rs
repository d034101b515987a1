use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Finding severity, ordered from least to most severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Unknown,
    Info,
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub const ALL: [Severity; 6] = [
        Severity::Critical,
        Severity::High,
        Severity::Medium,
        Severity::Low,
        Severity::Info,
        Severity::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Unknown => "UNKNOWN",
            Severity::Info => "INFO",
            Severity::Low => "LOW",
            Severity::Medium => "MEDIUM",
            Severity::High => "HIGH",
            Severity::Critical => "CRITICAL",
        }
    }

    /// Lenient parse for scanner output; unrecognized labels map to `Unknown`
    pub fn parse_lenient(label: &str) -> Self {
        Self::parse(label).unwrap_or(Severity::Unknown)
    }

    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_ascii_uppercase().as_str() {
            "CRITICAL" => Some(Severity::Critical),
            "HIGH" => Some(Severity::High),
            "MEDIUM" | "MODERATE" => Some(Severity::Medium),
            "LOW" => Some(Severity::Low),
            "INFO" | "NEGLIGIBLE" => Some(Severity::Info),
            "UNKNOWN" => Some(Severity::Unknown),
            _ => None,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// One structured finding from a scanner
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub severity: Severity,
    pub location: String,
    pub rule_id: String,
    pub message: String,
}

impl Finding {
    pub fn new(
        severity: Severity,
        location: impl Into<String>,
        rule_id: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            location: location.into(),
            rule_id: rule_id.into(),
            message: message.into(),
        }
    }
}

/// Per-severity finding counts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SeverityCounts(BTreeMap<Severity, usize>);

impl SeverityCounts {
    pub fn from_findings(findings: &[Finding]) -> Self {
        let mut counts = BTreeMap::new();
        for finding in findings {
            *counts.entry(finding.severity).or_insert(0) += 1;
        }
        Self(counts)
    }

    pub fn get(&self, severity: Severity) -> usize {
        self.0.get(&severity).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.0.values().sum()
    }

    /// `CRITICAL=1 HIGH=0 ...`, most severe first
    pub fn summary(&self) -> String {
        Severity::ALL
            .iter()
            .filter(|s| **s != Severity::Unknown || self.get(**s) > 0)
            .map(|s| format!("{}={}", s, self.get(*s)))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Distinct file locations, in first-seen order
pub fn affected_locations(findings: &[Finding]) -> Vec<&str> {
    let mut seen = Vec::new();
    for finding in findings {
        let location = finding.location.as_str();
        if !location.is_empty() && !seen.contains(&location) {
            seen.push(location);
        }
    }
    seen
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Critical > Severity::High);
        assert!(Severity::High > Severity::Medium);
        assert!(Severity::Low > Severity::Info);
        assert!(Severity::Info > Severity::Unknown);
    }

    #[test]
    fn test_parse_lenient() {
        assert_eq!(Severity::parse_lenient("high"), Severity::High);
        assert_eq!(Severity::parse_lenient("moderate"), Severity::Medium);
        assert_eq!(Severity::parse_lenient("whatever"), Severity::Unknown);
        assert_eq!(Severity::parse("whatever"), None);
    }

    #[test]
    fn test_counts_summary() {
        let findings = vec![
            Finding::new(Severity::High, "a.rs", "R1", "x"),
            Finding::new(Severity::High, "b.rs", "R1", "x"),
            Finding::new(Severity::Low, "a.rs", "R2", "y"),
        ];
        let counts = SeverityCounts::from_findings(&findings);
        assert_eq!(counts.get(Severity::High), 2);
        assert_eq!(counts.get(Severity::Critical), 0);
        assert_eq!(counts.total(), 3);
        assert_eq!(counts.summary(), "CRITICAL=0 HIGH=2 MEDIUM=0 LOW=1 INFO=0");
        assert_eq!(affected_locations(&findings), vec!["a.rs", "b.rs"]);
    }
}
