//! Deploy pipe: `helm upgrade --install --atomic` into a Kubernetes namespace

use crate::config::{self, ConfigError, EnvSource};
use crate::dispatch::CommandSpec;
use crate::error::PipeError;
use crate::pipeline::{Pipe, PipeContext};
use crate::report::GateResult;
use crate::stack::TaskKind;
use anyhow::Context;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use regex::Regex;
use tempfile::NamedTempFile;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{debug, info};

const MAX_RELEASE_NAME: usize = 53;
const MAX_NAMESPACE: usize = 63;

fn dns_label_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?$").expect("valid regex"))
}

fn duration_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^([0-9]+(ms|s|m|h))+$").expect("valid regex"))
}

fn check_dns_label(name: &str, value: &str, max: usize) -> Result<(), ConfigError> {
    if value.len() <= max && dns_label_regex().is_match(value) {
        return Ok(());
    }
    Err(ConfigError::InvalidValue {
        name: name.to_string(),
        value: value.to_string(),
        expected: format!(
            "lowercase letters, digits and '-', starting and ending alphanumeric, at most {} chars",
            max
        ),
        suggestion: None,
    })
}

#[derive(Clone)]
pub struct DeployConfig {
    pub release: String,
    pub chart: String,
    pub namespace: String,
    pub chart_version: Option<String>,
    pub values_files: Vec<PathBuf>,
    pub set_values: Vec<(String, String)>,
    pub timeout: String,
    pub create_namespace: bool,
    pub dry_run: bool,
    pub kube_context: Option<String>,
    pub kubeconfig: Option<Vec<u8>>,
}

impl std::fmt::Debug for DeployConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeployConfig")
            .field("release", &self.release)
            .field("chart", &self.chart)
            .field("namespace", &self.namespace)
            .field("dry_run", &self.dry_run)
            .field("kubeconfig", &self.kubeconfig.as_ref().map(|_| "<redacted>"))
            .finish_non_exhaustive()
    }
}

impl DeployConfig {
    pub fn from_source(source: &dyn EnvSource) -> Result<Self, ConfigError> {
        let release = config::required(source, "RELEASE_NAME")?;
        check_dns_label("RELEASE_NAME", &release, MAX_RELEASE_NAME)?;
        let chart = config::required(source, "CHART")?;
        let namespace = config::string_or(source, "NAMESPACE", "default");
        check_dns_label("NAMESPACE", &namespace, MAX_NAMESPACE)?;

        let timeout = config::string_or(source, "HELM_TIMEOUT", "5m");
        if !duration_regex().is_match(&timeout) {
            return Err(ConfigError::InvalidValue {
                name: "HELM_TIMEOUT".to_string(),
                value: timeout,
                expected: "a duration such as 300s, 5m or 1h30m".to_string(),
                suggestion: None,
            });
        }

        let kubeconfig = config::string(source, "KUBECONFIG_CONTENT")
            .map(|encoded| {
                let compact: String = encoded.split_whitespace().collect();
                STANDARD.decode(compact).map_err(|e| ConfigError::InvalidValue {
                    name: "KUBECONFIG_CONTENT".to_string(),
                    value: "<redacted>".to_string(),
                    expected: format!("base64-encoded kubeconfig ({})", e),
                    suggestion: None,
                })
            })
            .transpose()?;

        Ok(Self {
            release,
            chart,
            namespace,
            chart_version: config::string(source, "CHART_VERSION"),
            values_files: config::list(source, "VALUES_FILES")
                .into_iter()
                .map(PathBuf::from)
                .collect(),
            set_values: config::key_values(source, "SET_VALUES")?,
            timeout,
            create_namespace: config::bool_or(source, "CREATE_NAMESPACE", true),
            dry_run: config::bool_or(source, "DRY_RUN", false),
            kube_context: config::string(source, "KUBE_CONTEXT"),
            kubeconfig,
        })
    }

    fn with_target(&self, cmd: CommandSpec) -> CommandSpec {
        let cmd = cmd.arg("--namespace").arg(&self.namespace);
        match &self.kube_context {
            Some(context) => cmd.arg("--kube-context").arg(context),
            None => cmd,
        }
    }

    pub fn upgrade_command(&self) -> CommandSpec {
        let mut cmd = self.with_target(
            CommandSpec::new("helm")
                .args(["upgrade", "--install"])
                .arg(&self.release)
                .arg(&self.chart),
        );
        cmd = cmd.arg_if(self.create_namespace, "--create-namespace");
        if let Some(version) = &self.chart_version {
            cmd = cmd.arg("--version").arg(version);
        }
        for file in &self.values_files {
            cmd = cmd.arg("-f").arg(file.display().to_string());
        }
        for (key, value) in &self.set_values {
            cmd = cmd.arg("--set").arg(format!("{}={}", key, value));
        }
        cmd.args(["--atomic", "--wait", "--timeout"])
            .arg(&self.timeout)
            .arg_if(self.dry_run, "--dry-run")
    }

    pub fn status_command(&self) -> CommandSpec {
        self.with_target(CommandSpec::new("helm").arg("status").arg(&self.release))
            .advisory()
    }
}

/// Kubeconfig written to a private temp file, removed on drop
struct KubeconfigFile {
    file: NamedTempFile,
}

impl KubeconfigFile {
    fn create(content: &[u8]) -> anyhow::Result<Self> {
        Self::create_in(&std::env::temp_dir(), content)
    }

    /// Created with a random name, exclusively and readable by the owner only
    fn create_in(dir: &Path, content: &[u8]) -> anyhow::Result<Self> {
        let mut file = tempfile::Builder::new()
            .prefix("pipekit-kubeconfig-")
            .tempfile_in(dir)
            .with_context(|| format!("Failed to create kubeconfig in {}", dir.display()))?;
        file.write_all(content)
            .and_then(|()| file.flush())
            .with_context(|| format!("Failed to write {}", file.path().display()))?;
        Ok(Self { file })
    }

    fn path(&self) -> &Path {
        self.file.path()
    }
}

pub struct DeployPipe;

impl Pipe for DeployPipe {
    fn name(&self) -> &'static str {
        "deploy"
    }

    fn run(&self, ctx: &mut PipeContext) -> Result<(), PipeError> {
        let cfg = DeployConfig::from_source(ctx.env())?;
        for file in &cfg.values_files {
            if !ctx.file_system.is_file(&ctx.path(file)) {
                return Err(ConfigError::InvalidValue {
                    name: "VALUES_FILES".to_string(),
                    value: file.display().to_string(),
                    expected: "existing files relative to WORKING_DIR".to_string(),
                    suggestion: None,
                }
                .into());
            }
        }
        ctx.report.set("RELEASE_NAME", &cfg.release);
        ctx.report.set("NAMESPACE", &cfg.namespace);
        ctx.report.set("DRY_RUN", cfg.dry_run);
        ctx.report.set("DEPLOYED", false);

        let _kubeconfig = match &cfg.kubeconfig {
            Some(content) => {
                let file = KubeconfigFile::create(content)?;
                debug!("Using kubeconfig from KUBECONFIG_CONTENT");
                ctx.options
                    .env
                    .push(("KUBECONFIG".to_string(), file.path().display().to_string()));
                Some(file)
            }
            None => None,
        };

        info!(
            "Deploying release {} to namespace {}{}",
            cfg.release,
            cfg.namespace,
            if cfg.dry_run { " (dry run)" } else { "" }
        );
        ctx.run_tool("helm", TaskKind::Deploy, cfg.upgrade_command())?;
        let detail = if cfg.dry_run {
            format!("{} rendered (dry run)", cfg.release)
        } else {
            format!("{} deployed to {}", cfg.release, cfg.namespace)
        };
        ctx.report.gate(GateResult::passed("deploy", detail));
        ctx.report.set("DEPLOYED", !cfg.dry_run);

        if !cfg.dry_run {
            let status = ctx.run_tool("helm", TaskKind::Deploy, cfg.status_command())?;
            if status.success {
                info!("Release status:\n{}", status.stdout.trim());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::env_map;
    use crate::dispatch::{Scripted, ScriptedRunner};
    use crate::pipeline::run_pipe;
    use crate::pipeline::testing::{context_in, context_with, touch};
    use tempfile::TempDir;

    const BASE: [(&str, &str); 2] = [
        ("RELEASE_NAME", "shop-api"),
        ("CHART", "helm-packages/shop-0.3.1.tgz"),
    ];

    fn vars(extra: &[(&'static str, &'static str)]) -> Vec<(&'static str, &'static str)> {
        BASE.iter().chain(extra.iter()).copied().collect()
    }

    #[test]
    fn test_release_name_rules() {
        let too_long = "a".repeat(54);
        for bad in ["Shop", "-shop", "shop_api", too_long.as_str()] {
            let err = DeployConfig::from_source(&env_map(&[("RELEASE_NAME", bad), ("CHART", "c")]))
                .unwrap_err();
            assert_eq!(err.variable(), "RELEASE_NAME", "{}", bad);
        }
        let ok = env_map(&[("RELEASE_NAME", "shop-api-2"), ("CHART", "c")]);
        assert!(DeployConfig::from_source(&ok).is_ok());
    }

    #[test]
    fn test_timeout_and_kubeconfig_validation() {
        let err =
            DeployConfig::from_source(&env_map(&vars(&[("HELM_TIMEOUT", "5 minutes")]))).unwrap_err();
        assert_eq!(err.variable(), "HELM_TIMEOUT");
        let err =
            DeployConfig::from_source(&env_map(&vars(&[("KUBECONFIG_CONTENT", "%%%")]))).unwrap_err();
        assert_eq!(err.variable(), "KUBECONFIG_CONTENT");
        assert!(!err.to_string().contains("%%%"));
    }

    #[test]
    fn test_upgrade_command() {
        let cfg = DeployConfig::from_source(&env_map(&vars(&[
            ("NAMESPACE", "shop"),
            ("VALUES_FILES", "values.yaml,values-prod.yaml"),
            ("SET_VALUES", "image.tag=1.2.0,replicas=3"),
            ("KUBE_CONTEXT", "prod"),
        ])))
        .unwrap();
        assert_eq!(
            cfg.upgrade_command().display(),
            "helm upgrade --install shop-api helm-packages/shop-0.3.1.tgz --namespace shop \
             --kube-context prod --create-namespace -f values.yaml -f values-prod.yaml \
             --set image.tag=1.2.0 --set replicas=3 --atomic --wait --timeout 5m"
        );
        assert!(!cfg.status_command().blocking);
    }

    #[test]
    fn test_deploy_with_kubeconfig() {
        let temp = TempDir::new().unwrap();
        let encoded = STANDARD.encode("apiVersion: v1\nkind: Config\n");
        let pairs = [BASE[0], BASE[1], ("KUBECONFIG_CONTENT", encoded.as_str())];
        let (mut ctx, runner) = context_in(temp.path(), &pairs);
        let report = run_pipe(&DeployPipe, &mut ctx);
        assert_eq!(report.exit_code(), 0);

        let calls = runner.calls();
        assert_eq!(calls.len(), 2);
        assert!(calls[1].command.starts_with("helm status shop-api"));
        let kubeconfig = calls[0]
            .env
            .iter()
            .find(|(k, _)| k == "KUBECONFIG")
            .map(|(_, v)| PathBuf::from(v))
            .unwrap();
        assert!(!kubeconfig.exists());
        assert_eq!(report.metadata["DEPLOYED"], "true");
    }

    #[test]
    fn test_kubeconfig_file_is_private_and_removed() {
        let temp = TempDir::new().unwrap();
        let file = KubeconfigFile::create_in(temp.path(), b"kind: Config\n").unwrap();
        let path = file.path().to_path_buf();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "kind: Config\n");
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }
        drop(file);
        assert!(!path.exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_kubeconfig_does_not_follow_planted_symlinks() {
        let temp = TempDir::new().unwrap();
        let victim = temp.path().join("victim");
        std::fs::write(&victim, "original").unwrap();
        for seq in 0..4 {
            let guess = temp
                .path()
                .join(format!("pipekit-kubeconfig-{}-{}", std::process::id(), seq));
            std::os::unix::fs::symlink(&victim, guess).unwrap();
        }

        let file = KubeconfigFile::create_in(temp.path(), b"kind: Config\n").unwrap();
        assert!(!std::fs::symlink_metadata(file.path())
            .unwrap()
            .file_type()
            .is_symlink());
        drop(file);
        assert_eq!(std::fs::read_to_string(&victim).unwrap(), "original");
    }

    #[test]
    fn test_dry_run_skips_status() {
        let temp = TempDir::new().unwrap();
        let (mut ctx, runner) = context_in(temp.path(), &vars(&[("DRY_RUN", "true")]));
        let report = run_pipe(&DeployPipe, &mut ctx);
        assert_eq!(report.exit_code(), 0);
        assert_eq!(runner.commands().len(), 1);
        assert!(runner.commands()[0].ends_with("--dry-run"));
        assert_eq!(report.metadata["DEPLOYED"], "false");
    }

    #[test]
    fn test_failed_upgrade() {
        let temp = TempDir::new().unwrap();
        let runner = ScriptedRunner::new().on("helm upgrade", Scripted::exit(1));
        let (mut ctx, runner) = context_with(temp.path(), &vars(&[]), runner);
        let report = run_pipe(&DeployPipe, &mut ctx);
        assert_eq!(report.exit_code(), 1);
        assert_eq!(runner.commands().len(), 1);
    }

    #[test]
    fn test_advisory_status_failure() {
        let temp = TempDir::new().unwrap();
        let runner = ScriptedRunner::new().on("helm status", Scripted::exit(1));
        let (mut ctx, _) = context_with(temp.path(), &vars(&[]), runner);
        let report = run_pipe(&DeployPipe, &mut ctx);
        assert_eq!(report.exit_code(), 0);
        assert_eq!(report.warnings.len(), 1);
    }

    #[test]
    fn test_missing_values_file() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "values.yaml", "replicas: 1");
        let (mut ctx, runner) =
            context_in(temp.path(), &vars(&[("VALUES_FILES", "values.yaml,missing.yaml")]));
        let report = run_pipe(&DeployPipe, &mut ctx);
        assert!(report.error.unwrap().message.contains("missing.yaml"));
        assert!(runner.commands().is_empty());
    }
}
