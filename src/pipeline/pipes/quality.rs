//! Quality pipe: SonarQube analysis with an exit-code quality gate

use crate::config::{self, ConfigError, EnvSource};
use crate::dispatch::CommandSpec;
use crate::error::PipeError;
use crate::pipeline::{Pipe, PipeContext};
use crate::report::ExitCodePolicy;
use crate::stack::{CommandContext, Ecosystem};
use tracing::info;

#[derive(Clone)]
pub struct QualityConfig {
    pub host_url: String,
    pub token: String,
    pub project_key: String,
    pub project_name: Option<String>,
    pub organization: Option<String>,
    pub sources: Option<String>,
    pub extra_args: Vec<String>,
    pub wait_for_gate: bool,
    pub fail_on_gate: bool,
}

impl std::fmt::Debug for QualityConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QualityConfig")
            .field("host_url", &self.host_url)
            .field("token", &"***")
            .field("project_key", &self.project_key)
            .field("wait_for_gate", &self.wait_for_gate)
            .field("fail_on_gate", &self.fail_on_gate)
            .finish_non_exhaustive()
    }
}

impl QualityConfig {
    pub fn from_source(source: &dyn EnvSource) -> Result<Self, ConfigError> {
        Ok(Self {
            host_url: config::required(source, "SONAR_HOST_URL")?,
            token: config::required(source, "SONAR_TOKEN")?,
            project_key: config::required(source, "SONAR_PROJECT_KEY")?,
            project_name: config::string(source, "SONAR_PROJECT_NAME"),
            organization: config::string(source, "SONAR_ORGANIZATION"),
            sources: config::string(source, "SONAR_SOURCES"),
            extra_args: config::args(source, "SONAR_EXTRA_ARGS")?,
            wait_for_gate: config::bool_or(source, "QUALITY_GATE_WAIT", true),
            fail_on_gate: config::bool_or(source, "FAIL_ON_QUALITY_GATE", true),
        })
    }

    fn properties(&self) -> Vec<String> {
        let mut props = vec![
            format!("-Dsonar.host.url={}", self.host_url),
            format!("-Dsonar.projectKey={}", self.project_key),
        ];
        if let Some(name) = &self.project_name {
            props.push(format!("-Dsonar.projectName={}", name));
        }
        if let Some(org) = &self.organization {
            props.push(format!("-Dsonar.organization={}", org));
        }
        if self.wait_for_gate {
            props.push("-Dsonar.qualitygate.wait=true".to_string());
        }
        props
    }

    /// Build-tool plugin for Maven and Gradle, `sonar-scanner` otherwise
    pub fn command(&self, ecosystem: Ecosystem, ctx: &CommandContext) -> CommandSpec {
        let base = match ecosystem {
            Ecosystem::Maven => CommandSpec::new(ctx.local_or("mvnw", "mvn"))
                .args(["-B", "sonar:sonar"]),
            Ecosystem::Gradle => CommandSpec::new(ctx.local_or("gradlew", "gradle"))
                .args(["--no-daemon", "sonar"]),
            _ => {
                let sources = self.sources.as_deref().unwrap_or(".");
                CommandSpec::new("sonar-scanner").arg(format!("-Dsonar.sources={}", sources))
            }
        };
        base.args(self.properties())
            .args(self.extra_args.iter().cloned())
            .env("SONAR_TOKEN", &self.token)
    }
}

pub struct QualityPipe;

impl Pipe for QualityPipe {
    fn name(&self) -> &'static str {
        "quality"
    }

    fn run(&self, ctx: &mut PipeContext) -> Result<(), PipeError> {
        let cfg = QualityConfig::from_source(ctx.env())?;
        let detection = ctx
            .registry
            .detect(ctx.file_system.as_ref(), &ctx.common.working_dir);
        ctx.report.detection = Some(detection.clone());
        ctx.report.set("SONAR_PROJECT_KEY", &cfg.project_key);

        let cmd = {
            let cmd_ctx = CommandContext::new(ctx.file_system.as_ref(), &ctx.common.working_dir);
            cfg.command(detection.ecosystem, &cmd_ctx)
        };
        info!("Running SonarQube analysis: {}", cmd.display());
        let result = ctx.execute(&cmd)?;

        let gate = if cfg.wait_for_gate {
            ExitCodePolicy::new(cfg.fail_on_gate).evaluate("quality-gate", result.exit_code)
        } else {
            ExitCodePolicy::new(true).evaluate("analysis", result.exit_code)
        };
        if !result.success {
            let tail = result.error_tail(20);
            if !tail.is_empty() && !ctx.options.echo {
                tracing::error!("SonarQube output:\n{}", tail);
            }
        }
        ctx.report.set("QUALITY_GATE", gate.status.as_str());
        ctx.report.gate(gate);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::{Scripted, ScriptedRunner};
    use crate::pipeline::run_pipe;
    use crate::pipeline::testing::{context_in, context_with, touch};
    use crate::report::GateStatus;
    use tempfile::TempDir;

    const SONAR: [(&str, &str); 3] = [
        ("SONAR_HOST_URL", "https://sonar.example.com"),
        ("SONAR_TOKEN", "squ_secret"),
        ("SONAR_PROJECT_KEY", "shop"),
    ];

    fn vars(extra: &[(&'static str, &'static str)]) -> Vec<(&'static str, &'static str)> {
        SONAR.iter().chain(extra.iter()).copied().collect()
    }

    #[test]
    fn test_token_never_in_argv() {
        let temp = TempDir::new().unwrap();
        let (mut ctx, runner) = context_in(temp.path(), &vars(&[]));
        let report = run_pipe(&QualityPipe, &mut ctx);
        assert_eq!(report.exit_code(), 0);

        let call = &runner.calls()[0];
        assert!(call.command.starts_with("sonar-scanner -Dsonar.sources=."));
        assert!(call.command.contains("-Dsonar.qualitygate.wait=true"));
        assert!(!call.command.contains("squ_secret"));
        assert!(call
            .env
            .contains(&("SONAR_TOKEN".to_string(), "squ_secret".to_string())));
    }

    #[test]
    fn test_maven_uses_plugin() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "pom.xml", "<project/>");
        let (mut ctx, runner) = context_in(temp.path(), &vars(&[]));
        run_pipe(&QualityPipe, &mut ctx);
        assert!(runner.commands()[0].starts_with("mvn -B sonar:sonar -Dsonar.host.url="));
    }

    #[test]
    fn test_gate_failure_blocks_by_default() {
        let temp = TempDir::new().unwrap();
        let runner = ScriptedRunner::new().on("sonar-scanner", Scripted::exit(2));
        let (mut ctx, _) = context_with(temp.path(), &vars(&[]), runner);
        let report = run_pipe(&QualityPipe, &mut ctx);
        assert_eq!(report.exit_code(), 1);
        assert_eq!(report.gates[0].name, "quality-gate");
    }

    #[test]
    fn test_gate_override_warns() {
        let temp = TempDir::new().unwrap();
        let runner = ScriptedRunner::new().on("sonar-scanner", Scripted::exit(2));
        let (mut ctx, _) =
            context_with(temp.path(), &vars(&[("FAIL_ON_QUALITY_GATE", "false")]), runner);
        let report = run_pipe(&QualityPipe, &mut ctx);
        assert_eq!(report.exit_code(), 0);
        assert_eq!(report.gates[0].status, GateStatus::Warned);
    }

    #[test]
    fn test_analysis_failure_without_wait_still_blocks() {
        let temp = TempDir::new().unwrap();
        let runner = ScriptedRunner::new().on("sonar-scanner", Scripted::exit(1));
        let (mut ctx, _) = context_with(
            temp.path(),
            &vars(&[("QUALITY_GATE_WAIT", "false"), ("FAIL_ON_QUALITY_GATE", "false")]),
            runner,
        );
        let report = run_pipe(&QualityPipe, &mut ctx);
        assert_eq!(report.exit_code(), 1);
        assert_eq!(report.gates[0].name, "analysis");
    }

    #[test]
    fn test_missing_token() {
        let temp = TempDir::new().unwrap();
        let (mut ctx, runner) = context_in(
            temp.path(),
            &[("SONAR_HOST_URL", "https://s"), ("SONAR_PROJECT_KEY", "k")],
        );
        let report = run_pipe(&QualityPipe, &mut ctx);
        assert!(report.error.unwrap().message.contains("SONAR_TOKEN"));
        assert!(runner.commands().is_empty());
    }

    #[test]
    fn test_debug_redacts_token() {
        let cfg = QualityConfig::from_source(&crate::config::env_map(&SONAR)).unwrap();
        assert!(!format!("{:?}", cfg).contains("squ_secret"));
    }
}
