//! Docker pipe: build, tag and push an image

use crate::config::{self, ConfigError, EnvSource};
use crate::dispatch::CommandSpec;
use crate::error::PipeError;
use crate::pipeline::{Pipe, PipeContext};
use crate::report::artifact::write_file;
use crate::report::GateResult;
use crate::stack::TaskKind;
use regex::Regex;
use std::path::PathBuf;
use std::sync::OnceLock;
use tracing::info;

pub const IMAGE_REF_FILE: &str = "image-ref.txt";

fn tag_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9_][A-Za-z0-9_.-]{0,127}$").expect("valid regex"))
}

fn check_tag(name: &str, tag: &str) -> Result<(), ConfigError> {
    if tag_regex().is_match(tag) {
        Ok(())
    } else {
        Err(ConfigError::InvalidValue {
            name: name.to_string(),
            value: tag.to_string(),
            expected: "a docker tag ([A-Za-z0-9_][A-Za-z0-9_.-], at most 128 chars)".to_string(),
            suggestion: None,
        })
    }
}

#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Credentials({}, ***)", self.username)
    }
}

/// Username and password must be given together
pub(crate) fn credentials(
    source: &dyn EnvSource,
    user_var: &str,
    password_var: &str,
) -> Result<Option<Credentials>, ConfigError> {
    match (config::string(source, user_var), config::string(source, password_var)) {
        (Some(username), Some(password)) => Ok(Some(Credentials { username, password })),
        (None, None) => Ok(None),
        (Some(_), None) => Err(ConfigError::missing(password_var)),
        (None, Some(_)) => Err(ConfigError::missing(user_var)),
    }
}

#[derive(Debug, Clone)]
pub struct DockerConfig {
    pub registry: String,
    pub image_name: String,
    pub tag: String,
    pub additional_tags: Vec<String>,
    pub dockerfile: PathBuf,
    pub context: String,
    pub build_args: Vec<(String, String)>,
    pub platform: Option<String>,
    pub push: bool,
    pub credentials: Option<Credentials>,
    pub revision: Option<String>,
}

impl DockerConfig {
    pub fn from_source(source: &dyn EnvSource) -> Result<Self, ConfigError> {
        let registry = config::required(source, "DOCKER_REGISTRY")?;
        let image_name = config::required(source, "IMAGE_NAME")?;
        let revision = config::string(source, "BITBUCKET_COMMIT");

        let tag = config::string(source, "IMAGE_TAG").unwrap_or_else(|| match &revision {
            Some(commit) => commit.chars().take(7).collect(),
            None => "latest".to_string(),
        });
        check_tag("IMAGE_TAG", &tag)?;

        let additional_tags = config::list(source, "ADDITIONAL_TAGS");
        for extra in &additional_tags {
            check_tag("ADDITIONAL_TAGS", extra)?;
        }

        Ok(Self {
            registry: registry.trim_end_matches('/').to_string(),
            image_name,
            tag,
            additional_tags,
            dockerfile: PathBuf::from(config::string_or(source, "DOCKERFILE", "Dockerfile")),
            context: config::string_or(source, "BUILD_CONTEXT", "."),
            build_args: config::key_values(source, "BUILD_ARGS")?,
            platform: config::string(source, "PLATFORM"),
            push: config::bool_or(source, "PUSH_IMAGE", true),
            credentials: credentials(source, "DOCKER_USERNAME", "DOCKER_PASSWORD")?,
            revision,
        })
    }

    pub fn repository(&self) -> String {
        format!("{}/{}", self.registry, self.image_name)
    }

    pub fn image_ref(&self) -> String {
        format!("{}:{}", self.repository(), self.tag)
    }

    /// Primary reference first
    pub fn image_refs(&self) -> Vec<String> {
        let repo = self.repository();
        std::iter::once(&self.tag)
            .chain(self.additional_tags.iter())
            .map(|tag| format!("{}:{}", repo, tag))
            .collect()
    }

    pub fn login_command(&self) -> Option<CommandSpec> {
        self.credentials.as_ref().map(|creds| {
            CommandSpec::new("docker")
                .args(["login", self.registry.as_str(), "-u", creds.username.as_str(), "--password-stdin"])
                .stdin(creds.password.clone())
        })
    }

    pub fn build_command(&self) -> CommandSpec {
        let mut cmd = CommandSpec::new("docker")
            .arg("build")
            .arg("-f")
            .arg(self.dockerfile.display().to_string());
        for image in self.image_refs() {
            cmd = cmd.arg("-t").arg(image);
        }
        if let Some(platform) = &self.platform {
            cmd = cmd.arg("--platform").arg(platform);
        }
        for (key, value) in &self.build_args {
            cmd = cmd.arg("--build-arg").arg(format!("{}={}", key, value));
        }
        if let Some(revision) = &self.revision {
            cmd = cmd
                .arg("--label")
                .arg(format!("org.opencontainers.image.revision={}", revision));
        }
        cmd.arg(&self.context)
    }
}

pub struct DockerPipe;

impl Pipe for DockerPipe {
    fn name(&self) -> &'static str {
        "docker"
    }

    fn run(&self, ctx: &mut PipeContext) -> Result<(), PipeError> {
        let cfg = DockerConfig::from_source(ctx.env())?;
        if !ctx.file_system.is_file(&ctx.path(&cfg.dockerfile)) {
            return Err(ConfigError::InvalidValue {
                name: "DOCKERFILE".to_string(),
                value: cfg.dockerfile.display().to_string(),
                expected: "an existing file relative to WORKING_DIR".to_string(),
                suggestion: None,
            }
            .into());
        }
        let image_ref = cfg.image_ref();
        ctx.report.set("IMAGE_REF", &image_ref);
        ctx.report.set("IMAGE_TAG", &cfg.tag);
        ctx.report.set("IMAGE_PUSHED", false);

        if cfg.push {
            if let Some(login) = cfg.login_command() {
                ctx.run_tool("docker", TaskKind::Deploy, login)?;
            }
        }

        info!("Building {}", image_ref);
        ctx.run_tool("docker", TaskKind::Build, cfg.build_command())?;
        ctx.report.gate(GateResult::passed("build", image_ref.clone()));

        if cfg.push {
            for image in cfg.image_refs() {
                let push = CommandSpec::new("docker").args(["push", image.as_str()]);
                ctx.run_tool("docker", TaskKind::Deploy, push)?;
            }
            ctx.report.set("IMAGE_PUSHED", true);
            let pushed = format!("{} tag(s) pushed", cfg.image_refs().len());
            ctx.report.gate(GateResult::passed("push", pushed));
        } else {
            ctx.report.gate(GateResult::passed("push", "skipped (PUSH_IMAGE=false)"));
        }

        let ref_path = ctx.common.build_info_path().join(IMAGE_REF_FILE);
        write_file(&ref_path, &format!("{}\n", image_ref))?;
        Ok(())
    }
}
