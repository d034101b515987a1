//! Security pipe: Trivy vulnerability scan and optional SBOM

use crate::config::{self, ConfigError, EnvSource};
use crate::dispatch::CommandSpec;
use crate::error::PipeError;
use crate::pipeline::{Pipe, PipeContext};
use crate::report::parsers::parse_trivy;
use crate::report::{FindingPolicy, Severity};
use crate::stack::TaskKind;
use anyhow::Context;
use std::path::Path;
use tracing::info;

pub const TRIVY_REPORT: &str = "trivy-report.json";
pub const SBOM_REPORT: &str = "sbom.cdx.json";

const SEVERITY_NAMES: [&str; 6] = ["CRITICAL", "HIGH", "MEDIUM", "LOW", "INFO", "UNKNOWN"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanType {
    Filesystem,
    Image,
    Config,
}

impl ScanType {
    pub const NAMES: [&'static str; 3] = ["fs", "image", "config"];

    pub fn parse(value: &str) -> Result<Self, ConfigError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "fs" | "filesystem" => Ok(ScanType::Filesystem),
            "image" => Ok(ScanType::Image),
            "config" => Ok(ScanType::Config),
            other => Err(ConfigError::invalid("SCAN_TYPE", other, &Self::NAMES)),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ScanType::Filesystem => "fs",
            ScanType::Image => "image",
            ScanType::Config => "config",
        }
    }
}

fn severity(name: &str, value: &str) -> Result<Severity, ConfigError> {
    Severity::parse(value).ok_or_else(|| ConfigError::invalid(name, value, &SEVERITY_NAMES))
}

#[derive(Debug, Clone)]
pub struct SecurityConfig {
    pub scan_type: ScanType,
    pub target: String,
    pub severities: Vec<Severity>,
    pub threshold: Severity,
    pub fail_on_critical: bool,
    pub fail_on_high: bool,
    pub fail_on_medium: bool,
    pub fail_on_low: bool,
    pub ignore_unfixed: bool,
    pub sbom: bool,
}

impl SecurityConfig {
    pub fn from_source(source: &dyn EnvSource) -> Result<Self, ConfigError> {
        let scan_type = config::string(source, "SCAN_TYPE")
            .map(|v| ScanType::parse(&v))
            .transpose()?
            .unwrap_or(ScanType::Filesystem);

        let target = match (scan_type, config::string(source, "SCAN_TARGET")) {
            (_, Some(target)) => target,
            (ScanType::Image, None) => return Err(ConfigError::missing("SCAN_TARGET")),
            (_, None) => ".".to_string(),
        };

        let mut severities = Vec::new();
        let raw = config::list(source, "SEVERITY");
        let raw = if raw.is_empty() {
            vec!["CRITICAL", "HIGH", "MEDIUM", "LOW"]
                .into_iter()
                .map(String::from)
                .collect()
        } else {
            raw
        };
        for item in raw {
            severities.push(severity("SEVERITY", &item)?);
        }

        let threshold = match config::string(source, "SEVERITY_THRESHOLD") {
            Some(value) => severity("SEVERITY_THRESHOLD", &value)?,
            None => Severity::Low,
        };

        Ok(Self {
            scan_type,
            target,
            severities,
            threshold,
            fail_on_critical: config::bool_or(source, "FAIL_ON_CRITICAL", true),
            fail_on_high: config::bool_or(source, "FAIL_ON_HIGH", true),
            fail_on_medium: config::bool_or(source, "FAIL_ON_MEDIUM", false),
            fail_on_low: config::bool_or(source, "FAIL_ON_LOW", false),
            ignore_unfixed: config::bool_or(source, "IGNORE_UNFIXED", false),
            sbom: config::bool_or(source, "SBOM_ENABLED", false),
        })
    }

    pub fn policy(&self) -> FindingPolicy {
        FindingPolicy::new(self.threshold)
            .fail_on(Severity::Critical, self.fail_on_critical)
            .fail_on(Severity::High, self.fail_on_high)
            .fail_on(Severity::Medium, self.fail_on_medium)
            .fail_on(Severity::Low, self.fail_on_low)
    }

    fn severity_arg(&self) -> String {
        self.severities
            .iter()
            .map(Severity::as_str)
            .collect::<Vec<_>>()
            .join(",")
    }

    pub fn scan_command(&self, output: &Path) -> CommandSpec {
        CommandSpec::new("trivy")
            .arg(self.scan_type.as_str())
            .args(["--format", "json", "--output"])
            .arg(output.display().to_string())
            .arg("--severity")
            .arg(self.severity_arg())
            .args(["--exit-code", "0"])
            .arg_if(self.ignore_unfixed, "--ignore-unfixed")
            .arg(&self.target)
    }

    pub fn sbom_command(&self, output: &Path) -> CommandSpec {
        let kind = match self.scan_type {
            ScanType::Image => "image",
            _ => "fs",
        };
        CommandSpec::new("trivy")
            .arg(kind)
            .args(["--format", "cyclonedx", "--output"])
            .arg(output.display().to_string())
            .arg(&self.target)
            .advisory()
    }
}

pub struct SecurityPipe;

impl Pipe for SecurityPipe {
    fn name(&self) -> &'static str {
        "security"
    }

    fn run(&self, ctx: &mut PipeContext) -> Result<(), PipeError> {
        let cfg = SecurityConfig::from_source(ctx.env())?;
        ctx.report.set("SCAN_TYPE", cfg.scan_type.as_str());
        ctx.report.set("SCAN_TARGET", &cfg.target);

        let reports = ctx.common.reports_dir.clone();
        let dir = ctx.path(&reports);
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;

        let report_path = reports.join(TRIVY_REPORT);
        ctx.run_tool("trivy", TaskKind::Scan, cfg.scan_command(&report_path))?;
        let content = ctx
            .read_file(&report_path)
            .context("Trivy did not produce a report")?;
        let findings = parse_trivy(&content)?;

        let policy = cfg.policy();
        let gate = policy.evaluate("vulnerabilities", &findings);
        info!(
            "Trivy reported {} finding(s): {}",
            findings.len(),
            crate::report::SeverityCounts::from_findings(&findings).summary()
        );
        ctx.report.gate(gate);
        ctx.report.set_findings(findings);
        ctx.report.set("TRIVY_REPORT", report_path.display());

        if cfg.sbom {
            let sbom_path = reports.join(SBOM_REPORT);
            let result = ctx.run_tool("trivy", TaskKind::Scan, cfg.sbom_command(&sbom_path))?;
            if result.success {
                ctx.report.set("SBOM_FILE", sbom_path.display());
            }
        }
        Ok(())
    }
}
