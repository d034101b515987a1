//! Scanner report parsing (GitLeaks, Trivy)

use super::finding::{Finding, Severity};
use anyhow::{Context, Result};
use serde::Deserialize;

pub const SECRETS_REMEDIATION: &str = "\
1. Rotate every exposed credential immediately; treat it as compromised.
2. Remove the secret from the code and load it from a secret store or pipeline variable.
3. Purge it from git history (git filter-repo or BFG) and force-push.
4. Add an allowlist entry to .gitleaks.toml only for confirmed false positives.";

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct GitleaksLeak {
    description: String,
    file: String,
    start_line: u64,
    #[serde(rename = "RuleID")]
    rule_id: String,
    commit: String,
}

/// Every leak is a critical finding. The secret value itself is never kept.
pub fn parse_gitleaks(content: &str) -> Result<Vec<Finding>> {
    if content.trim().is_empty() {
        return Ok(Vec::new());
    }
    let leaks: Option<Vec<GitleaksLeak>> =
        serde_json::from_str(content).context("Invalid GitLeaks JSON report")?;

    Ok(leaks
        .unwrap_or_default()
        .into_iter()
        .map(|leak| {
            let mut message = leak.description;
            if !leak.commit.is_empty() {
                let short: String = leak.commit.chars().take(8).collect();
                message.push_str(&format!(" (commit {})", short));
            }
            Finding::new(
                Severity::Critical,
                format!("{}:{}", leak.file, leak.start_line),
                leak.rule_id,
                message,
            )
        })
        .collect())
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct TrivyReport {
    results: Option<Vec<TrivyResult>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct TrivyResult {
    target: String,
    vulnerabilities: Option<Vec<TrivyVulnerability>>,
    misconfigurations: Option<Vec<TrivyMisconfiguration>>,
    secrets: Option<Vec<TrivySecret>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct TrivyVulnerability {
    #[serde(rename = "VulnerabilityID")]
    vulnerability_id: String,
    pkg_name: String,
    installed_version: String,
    fixed_version: String,
    severity: String,
    title: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct TrivyMisconfiguration {
    #[serde(rename = "ID")]
    id: String,
    title: String,
    severity: String,
    status: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct TrivySecret {
    #[serde(rename = "RuleID")]
    rule_id: String,
    title: String,
    severity: String,
    start_line: u64,
}

/// Vulnerabilities, failed misconfigurations and secrets from a Trivy JSON report
pub fn parse_trivy(content: &str) -> Result<Vec<Finding>> {
    if content.trim().is_empty() {
        return Ok(Vec::new());
    }
    let report: TrivyReport = serde_json::from_str(content).context("Invalid Trivy JSON report")?;
    let mut findings = Vec::new();

    for result in report.results.unwrap_or_default() {
        for vuln in result.vulnerabilities.unwrap_or_default() {
            let fix = if vuln.fixed_version.is_empty() {
                "no fix available".to_string()
            } else {
                format!("fixed in {}", vuln.fixed_version)
            };
            findings.push(Finding::new(
                Severity::parse_lenient(&vuln.severity),
                result.target.clone(),
                vuln.vulnerability_id,
                format!(
                    "{} {}: {} ({})",
                    vuln.pkg_name, vuln.installed_version, vuln.title, fix
                ),
            ));
        }
        for misconfig in result.misconfigurations.unwrap_or_default() {
            if misconfig.status.eq_ignore_ascii_case("PASS") {
                continue;
            }
            findings.push(Finding::new(
                Severity::parse_lenient(&misconfig.severity),
                result.target.clone(),
                misconfig.id,
                misconfig.title,
            ));
        }
        for secret in result.secrets.unwrap_or_default() {
            findings.push(Finding::new(
                Severity::parse_lenient(&secret.severity),
                format!("{}:{}", result.target, secret.start_line),
                secret.rule_id,
                secret.title,
            ));
        }
    }

    Ok(findings)
}
