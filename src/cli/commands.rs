use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Auto-detecting CI pipes
#[derive(Parser, Debug)]
#[command(
    name = "pipekit",
    about = "Auto-detecting CI pipes: test, lint, scan, build, package, deploy and notify",
    version,
    long_about = "pipekit runs one CI step per invocation. Each pipe is configured through \
                  environment variables, detects the project ecosystem from marker files, \
                  dispatches the right tool, applies policy gates to the results and writes \
                  build-info/<pipe>-info.txt plus a JSON report.\n\n\
                  Exit codes: 0 on success (warnings included), 1 on any failure, \
                  2 on command-line usage errors."
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, value_name = "LEVEL", help = "Set logging level")]
    pub log_level: Option<String>,

    #[arg(short = 'v', long, global = true, help = "Enable debug logging")]
    pub verbose: bool,

    #[arg(
        short = 'q',
        long,
        global = true,
        conflicts_with = "verbose",
        help = "Quiet mode - only errors are logged"
    )]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(
        about = "Run unit and integration tests with coverage gating",
        long_about = "Detects the test tool from marker files (or TEST_TOOL / TEST_COMMAND), \
                      runs unit tests, optional integration tests and enforces \
                      COVERAGE_THRESHOLD.\n\n\
                      Examples:\n  \
                      pipekit test\n  \
                      TEST_TOOL=npm COVERAGE_THRESHOLD=90 pipekit test\n  \
                      pipekit test --working-dir services/api"
    )]
    Test(PipeArgs),

    #[command(
        about = "Run linters, format checks and type checks",
        long_about = "Runs the detected (or LINT_TOOL / LINT_COMMAND) linter, then the \
                      ecosystem's format check and optional type check.\n\n\
                      Examples:\n  \
                      pipekit lint\n  \
                      LINT_TOOL=golangci-lint pipekit lint"
    )]
    Lint(PipeArgs),

    #[command(
        about = "Scan the repository for leaked secrets with gitleaks",
        long_about = "Runs gitleaks, parses its JSON report and blocks the build on any \
                      finding unless FAIL_ON_SECRETS=false.\n\n\
                      Examples:\n  \
                      pipekit secrets\n  \
                      SCAN_HISTORY=false pipekit secrets"
    )]
    Secrets(PipeArgs),

    #[command(
        about = "Scan dependencies, images or IaC for vulnerabilities with trivy",
        long_about = "Runs trivy in filesystem, image or config mode and gates on severity \
                      counts. Optionally emits a CycloneDX SBOM.\n\n\
                      Examples:\n  \
                      pipekit security\n  \
                      SCAN_TYPE=image SCAN_TARGET=registry.example.com/app:1.0 pipekit security"
    )]
    Security(PipeArgs),

    #[command(
        about = "Run SonarQube analysis and wait for the quality gate",
        long_about = "Runs the ecosystem's Sonar integration (maven/gradle plugin or \
                      sonar-scanner) and fails on a red quality gate.\n\n\
                      Examples:\n  \
                      SONAR_HOST_URL=https://sonar.example.com SONAR_TOKEN=... \
                      SONAR_PROJECT_KEY=app pipekit quality"
    )]
    Quality(PipeArgs),

    #[command(
        about = "Build, tag and push a container image",
        long_about = "Builds the Dockerfile, tags it with IMAGE_TAG (or the short commit) \
                      and pushes every tag to DOCKER_REGISTRY.\n\n\
                      Examples:\n  \
                      DOCKER_REGISTRY=registry.example.com IMAGE_NAME=app pipekit docker\n  \
                      PUSH_IMAGE=false pipekit docker"
    )]
    Docker(PipeArgs),

    #[command(
        about = "Lint, package and publish a Helm chart",
        long_about = "Updates chart dependencies, lints and packages CHART_PATH, and pushes \
                      the package to an OCI registry when HELM_REGISTRY is set.\n\n\
                      Examples:\n  \
                      pipekit helm\n  \
                      HELM_REGISTRY=registry.example.com/charts pipekit helm"
    )]
    Helm(PipeArgs),

    #[command(
        about = "Deploy a Helm release to Kubernetes",
        long_about = "Runs helm upgrade --install with --atomic and --wait against the \
                      cluster described by KUBECONFIG_CONTENT.\n\n\
                      Examples:\n  \
                      RELEASE_NAME=app CHART=./chart NAMESPACE=prod pipekit deploy\n  \
                      DRY_RUN=true pipekit deploy"
    )]
    Deploy(PipeArgs),

    #[command(
        about = "Send a build notification to Slack, a webhook or email",
        long_about = "Delivers one message to every channel in NOTIFY_CHANNELS. Partial \
                      delivery succeeds unless NOTIFY_STRICT=true.\n\n\
                      Examples:\n  \
                      NOTIFY_CHANNELS=slack STATUS=success pipekit notify"
    )]
    Notify(PipeArgs),

    #[command(
        about = "Show the detected ecosystem and the commands each task would run",
        long_about = "Probes marker files in the given directory and prints the detected \
                      ecosystem together with the planned command for every task.\n\n\
                      Examples:\n  \
                      pipekit detect\n  \
                      pipekit detect /path/to/repo\n  \
                      pipekit detect --format json"
    )]
    Detect(DetectArgs),
}

impl Commands {
    /// Pipe name for pipe subcommands, with their shared arguments
    pub fn pipe(&self) -> Option<(&'static str, &PipeArgs)> {
        match self {
            Commands::Test(args) => Some(("test", args)),
            Commands::Lint(args) => Some(("lint", args)),
            Commands::Secrets(args) => Some(("secrets", args)),
            Commands::Security(args) => Some(("security", args)),
            Commands::Quality(args) => Some(("quality", args)),
            Commands::Docker(args) => Some(("docker", args)),
            Commands::Helm(args) => Some(("helm", args)),
            Commands::Deploy(args) => Some(("deploy", args)),
            Commands::Notify(args) => Some(("notify", args)),
            Commands::Detect(_) => None,
        }
    }
}

#[derive(Parser, Debug, Clone, Default)]
pub struct PipeArgs {
    #[arg(
        short = 'C',
        long,
        value_name = "DIR",
        help = "Working directory (overrides WORKING_DIR)"
    )]
    pub working_dir: Option<PathBuf>,

    #[arg(
        long,
        value_enum,
        default_value = "human",
        help = "Summary format printed to stdout"
    )]
    pub summary: SummaryFormatArg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum SummaryFormatArg {
    #[default]
    Human,
    Json,
}

#[derive(Parser, Debug, Clone)]
pub struct DetectArgs {
    #[arg(
        value_name = "PATH",
        help = "Path to repository (defaults to current directory)"
    )]
    pub repository_path: Option<PathBuf>,

    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "human",
        help = "Output format"
    )]
    pub format: OutputFormatArg,

    #[arg(long, help = "Plan commands as if coverage were enabled")]
    pub coverage: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormatArg {
    Json,
    Yaml,
    Human,
}

impl From<OutputFormatArg> for crate::cli::output::OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Json => Self::Json,
            OutputFormatArg::Yaml => Self::Yaml,
            OutputFormatArg::Human => Self::Human,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        CliArgs::command().debug_assert();
    }

    #[test]
    fn test_parse_pipe_with_working_dir() {
        let args = CliArgs::try_parse_from(["pipekit", "test", "-C", "services/api"]).unwrap();
        let (name, pipe_args) = args.command.pipe().unwrap();
        assert_eq!(name, "test");
        assert_eq!(pipe_args.working_dir, Some(PathBuf::from("services/api")));
        assert_eq!(pipe_args.summary, SummaryFormatArg::Human);
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let args = CliArgs::try_parse_from(["pipekit", "lint", "--log-level", "debug"]).unwrap();
        assert_eq!(args.log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        let err = CliArgs::try_parse_from(["pipekit", "-v", "-q", "lint"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn test_detect_defaults() {
        let args = CliArgs::try_parse_from(["pipekit", "detect"]).unwrap();
        match args.command {
            Commands::Detect(detect) => {
                assert!(detect.repository_path.is_none());
                assert_eq!(detect.format, OutputFormatArg::Human);
                assert!(!detect.coverage);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_unknown_subcommand_rejected() {
        let err = CliArgs::try_parse_from(["pipekit", "publish"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::InvalidSubcommand);
    }
}
