//! Secrets pipe: GitLeaks scan with a fail-closed gate

use crate::config::{self, ConfigError, EnvSource};
use crate::dispatch::CommandSpec;
use crate::error::PipeError;
use crate::pipeline::{Pipe, PipeContext};
use crate::report::parsers::{parse_gitleaks, SECRETS_REMEDIATION};
use crate::report::{FindingPolicy, Severity};
use crate::stack::TaskKind;
use anyhow::Context;
use std::path::PathBuf;
use tracing::{info, warn};

pub const GITLEAKS_REPORT: &str = "gitleaks-report.json";

#[derive(Debug, Clone)]
pub struct SecretsConfig {
    pub fail_on_secrets: bool,
    pub scan_history: bool,
    pub config_path: Option<PathBuf>,
    pub redact: bool,
}

impl SecretsConfig {
    pub fn from_source(source: &dyn EnvSource) -> Result<Self, ConfigError> {
        Ok(Self {
            fail_on_secrets: config::bool_or(source, "FAIL_ON_SECRETS", true),
            scan_history: config::bool_or(source, "SCAN_HISTORY", true),
            config_path: config::string(source, "GITLEAKS_CONFIG").map(PathBuf::from),
            redact: config::bool_or(source, "REDACT", true),
        })
    }

    pub fn command(&self, report_path: &str, verbose: bool) -> CommandSpec {
        let mut cmd = CommandSpec::new("gitleaks").args([
            "detect",
            "--source",
            ".",
            "--report-format",
            "json",
            "--report-path",
            report_path,
            "--exit-code",
            "0",
        ]);
        cmd = cmd.arg_if(!self.scan_history, "--no-git");
        if let Some(path) = &self.config_path {
            cmd = cmd.arg("--config").arg(path.display().to_string());
        }
        cmd.arg_if(self.redact, "--redact").arg_if(verbose, "--verbose")
    }
}

pub struct SecretsPipe;

impl Pipe for SecretsPipe {
    fn name(&self) -> &'static str {
        "secrets"
    }

    fn run(&self, ctx: &mut PipeContext) -> Result<(), PipeError> {
        let cfg = SecretsConfig::from_source(ctx.env())?;
        ctx.report.set("SCAN_HISTORY", cfg.scan_history);

        if let Some(path) = &cfg.config_path {
            if !ctx.file_system.is_file(&ctx.path(path)) {
                return Err(ConfigError::InvalidValue {
                    name: "GITLEAKS_CONFIG".to_string(),
                    value: path.display().to_string(),
                    expected: "an existing file relative to WORKING_DIR".to_string(),
                    suggestion: None,
                }
                .into());
            }
        }

        let relative = ctx.common.reports_dir.join(GITLEAKS_REPORT);
        let absolute = ctx.path(&relative);
        if let Some(dir) = absolute.parent() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
        }

        let cmd = cfg.command(&relative.display().to_string(), ctx.common.debug);
        ctx.run_tool("gitleaks", TaskKind::Scan, cmd)?;

        // A missing report after a clean exit means the scan cannot be trusted
        let content = ctx
            .read_file(&relative)
            .context("GitLeaks did not produce a report")?;
        let findings = parse_gitleaks(&content)?;
        info!("GitLeaks found {} potential secret(s)", findings.len());
        ctx.report.set("SECRETS_FOUND", findings.len());
        ctx.report.set("SECRETS_REPORT", relative.display());

        let policy =
            FindingPolicy::new(Severity::Critical).fail_on(Severity::Critical, cfg.fail_on_secrets);
        let mut gate = policy.evaluate("secrets", &findings);
        if !findings.is_empty() {
            gate = gate.with_remediation(SECRETS_REMEDIATION);
            if !cfg.fail_on_secrets {
                warn!("FAIL_ON_SECRETS=false: secrets reported but not blocking");
            }
        }
        ctx.report.gate(gate);
        ctx.report.set_findings(findings);
        Ok(())
    }
}
