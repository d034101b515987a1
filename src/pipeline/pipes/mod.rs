//! The pipes, one per CI concern

pub mod deploy;
pub mod docker;
pub mod helm;
pub mod lint;
pub mod notify;
pub mod quality;
pub mod secrets;
pub mod security;

pub use deploy::DeployPipe;
pub use docker::DockerPipe;
pub use helm::HelmPipe;
pub use lint::LintPipe;
pub use notify::NotifyPipe;
pub use quality::QualityPipe;
pub use secrets::SecretsPipe;
pub use security::SecurityPipe;
pub use test::TestPipe;

use super::Pipe;

pub const PIPE_NAMES: [&str; 9] = [
    "test", "lint", "secrets", "security", "quality", "docker", "helm", "deploy", "notify",
];

pub fn pipe_by_name(name: &str) -> Option<Box<dyn Pipe>> {
    let pipe: Box<dyn Pipe> = match name {
        "test" => Box::new(TestPipe),
        "lint" => Box::new(LintPipe),
        "secrets" => Box::new(SecretsPipe),
        "security" => Box::new(SecurityPipe),
        "quality" => Box::new(QualityPipe),
        "docker" => Box::new(DockerPipe),
        "helm" => Box::new(HelmPipe),
        "deploy" => Box::new(DeployPipe),
        "notify" => Box::new(NotifyPipe),
        _ => return None,
    };
    Some(pipe)
}
