//! Helm pipe: lint, package and optionally push a chart to an OCI registry

use super::docker::{credentials, Credentials};
use crate::config::{self, ConfigError, EnvSource};
use crate::dispatch::CommandSpec;
use crate::error::PipeError;
use crate::pipeline::{Pipe, PipeContext};
use crate::report::GateResult;
use crate::stack::TaskKind;
use anyhow::Context;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

pub const PACKAGE_DIR: &str = "helm-packages";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartMetadata {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub app_version: Option<String>,
    #[serde(default)]
    pub dependencies: Vec<ChartDependency>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChartDependency {
    pub name: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub repository: Option<String>,
}

impl ChartMetadata {
    pub fn parse(content: &str) -> anyhow::Result<Self> {
        serde_yaml::from_str(content).context("Invalid Chart.yaml")
    }
}

#[derive(Debug, Clone)]
pub struct HelmConfig {
    pub chart_path: PathBuf,
    pub chart_version: Option<String>,
    pub app_version: Option<String>,
    pub lint: bool,
    pub update_dependencies: bool,
    pub registry: Option<String>,
    pub credentials: Option<Credentials>,
}

impl HelmConfig {
    pub fn from_source(source: &dyn EnvSource) -> Result<Self, ConfigError> {
        Ok(Self {
            chart_path: PathBuf::from(config::string_or(source, "CHART_PATH", "chart")),
            chart_version: config::string(source, "CHART_VERSION"),
            app_version: config::string(source, "APP_VERSION"),
            lint: config::bool_or(source, "LINT_CHART", true),
            update_dependencies: config::bool_or(source, "UPDATE_DEPENDENCIES", true),
            registry: config::string(source, "HELM_REGISTRY").map(|r| oci_url(&r)),
            credentials: credentials(source, "HELM_USERNAME", "HELM_PASSWORD")?,
        })
    }

    fn chart_arg(&self) -> String {
        self.chart_path.display().to_string()
    }

    pub fn package_command(&self) -> CommandSpec {
        let mut cmd = CommandSpec::new("helm")
            .arg("package")
            .arg(self.chart_arg())
            .args(["--destination", PACKAGE_DIR]);
        if let Some(version) = &self.chart_version {
            cmd = cmd.arg("--version").arg(version);
        }
        if let Some(app_version) = &self.app_version {
            cmd = cmd.arg("--app-version").arg(app_version);
        }
        cmd
    }
}

/// `registry.example.com/charts` becomes `oci://registry.example.com/charts`
pub fn oci_url(registry: &str) -> String {
    let trimmed = registry.trim_end_matches('/');
    if trimmed.starts_with("oci://") {
        trimmed.to_string()
    } else {
        format!("oci://{}", trimmed)
    }
}

/// Host part used by `helm registry login`
pub fn registry_host(url: &str) -> &str {
    let rest = url.strip_prefix("oci://").unwrap_or(url);
    rest.split('/').next().unwrap_or(rest)
}

pub struct HelmPipe;

impl HelmPipe {
    fn load_chart(ctx: &PipeContext, chart_path: &Path) -> Result<ChartMetadata, PipeError> {
        let manifest = chart_path.join("Chart.yaml");
        if !ctx.file_system.is_file(&ctx.path(&manifest)) {
            return Err(ConfigError::InvalidValue {
                name: "CHART_PATH".to_string(),
                value: chart_path.display().to_string(),
                expected: "a chart directory containing Chart.yaml".to_string(),
                suggestion: None,
            }
            .into());
        }
        let content = ctx.read_file(&manifest)?;
        Ok(ChartMetadata::parse(&content)?)
    }
}

impl Pipe for HelmPipe {
    fn name(&self) -> &'static str {
        "helm"
    }

    fn run(&self, ctx: &mut PipeContext) -> Result<(), PipeError> {
        let cfg = HelmConfig::from_source(ctx.env())?;
        let chart = Self::load_chart(ctx, &cfg.chart_path)?;
        let version = cfg.chart_version.clone().unwrap_or_else(|| chart.version.clone());
        info!("Packaging chart {} {}", chart.name, version);
        ctx.report.set("CHART_NAME", &chart.name);
        ctx.report.set("CHART_VERSION", &version);
        ctx.report.set("CHART_PUSHED", false);

        if cfg.update_dependencies && !chart.dependencies.is_empty() {
            let update = CommandSpec::new("helm")
                .args(["dependency", "update"])
                .arg(cfg.chart_arg());
            ctx.run_tool("helm", TaskKind::Build, update)?;
        }

        if cfg.lint {
            let lint = CommandSpec::new("helm").arg("lint").arg(cfg.chart_arg());
            ctx.run_tool("helm", TaskKind::Lint, lint)?;
            ctx.report.gate(GateResult::passed("chart-lint", "no errors"));
        }

        let destination = ctx.path(PACKAGE_DIR);
        std::fs::create_dir_all(&destination)
            .with_context(|| format!("Failed to create {}", destination.display()))?;
        ctx.run_tool("helm", TaskKind::Package, cfg.package_command())?;

        let package = Path::new(PACKAGE_DIR).join(format!("{}-{}.tgz", chart.name, version));
        ctx.report.set("CHART_PACKAGE", package.display());
        ctx.report.gate(GateResult::passed("package", package.display().to_string()));

        if let Some(registry) = &cfg.registry {
            if let Some(creds) = &cfg.credentials {
                let login = CommandSpec::new("helm")
                    .args(["registry", "login", registry_host(registry)])
                    .args(["-u", creds.username.as_str(), "--password-stdin"])
                    .stdin(creds.password.clone());
                ctx.run_tool("helm", TaskKind::Deploy, login)?;
            }
            let push = CommandSpec::new("helm")
                .arg("push")
                .arg(package.display().to_string())
                .arg(registry);
            ctx.run_tool("helm", TaskKind::Deploy, push)?;
            ctx.report.set("CHART_PUSHED", true);
            ctx.report.set("CHART_REGISTRY", registry);
            ctx.report.gate(GateResult::passed("push", registry.clone()));
        }
        Ok(())
    }
}
