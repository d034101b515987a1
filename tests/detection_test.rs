//! Ecosystem detection against real directories

mod support;

use pipekit::fs::RealFileSystem;
use pipekit::stack::{DetectionSource, Ecosystem, EcosystemRegistry, ToolSelection};
use pipekit::PipeError;
use tempfile::TempDir;
use yare::parameterized;

fn detect_with(files: &[(&str, &str)]) -> (TempDir, pipekit::Detection) {
    let temp = TempDir::new().unwrap();
    for (name, content) in files {
        support::write(temp.path(), name, content);
    }
    let detection = EcosystemRegistry::with_defaults().detect(&RealFileSystem::new(), temp.path());
    (temp, detection)
}

#[parameterized(
    maven = { "pom.xml", Ecosystem::Maven },
    gradle = { "build.gradle", Ecosystem::Gradle },
    gradle_kotlin = { "build.gradle.kts", Ecosystem::Gradle },
    npm = { "package.json", Ecosystem::Npm },
    pytest_pyproject = { "pyproject.toml", Ecosystem::Pytest },
    pytest_requirements = { "requirements.txt", Ecosystem::Pytest },
    go = { "go.mod", Ecosystem::Go },
    dotnet = { "App.csproj", Ecosystem::DotNet },
    phpunit = { "phpunit.xml", Ecosystem::PhpUnit },
    rspec = { "Gemfile", Ecosystem::Rspec },
    cargo = { "Cargo.toml", Ecosystem::Cargo },
)]
fn test_single_marker(marker: &str, expected: Ecosystem) {
    let (_temp, detection) = detect_with(&[(marker, "")]);
    assert_eq!(detection.ecosystem, expected);
    assert_eq!(detection.source, DetectionSource::Markers);
    let found = detection.marker.expect("marker path recorded");
    assert_eq!(found.file_name().unwrap().to_str().unwrap(), marker);
}

#[test]
fn test_yarn_lock_wins_over_npm() {
    let (_temp, detection) = detect_with(&[("package.json", "{}"), ("yarn.lock", "")]);
    assert_eq!(detection.ecosystem, Ecosystem::Yarn);
}

#[test]
fn test_maven_probed_before_other_markers() {
    let (_temp, detection) = detect_with(&[
        ("package.json", "{}"),
        ("pom.xml", "<project/>"),
        ("go.mod", "module x\n"),
    ]);
    assert_eq!(detection.ecosystem, Ecosystem::Maven);
}

#[test]
fn test_markers_in_subdirectories_are_ignored() {
    let (_temp, detection) = detect_with(&[("service/pom.xml", "<project/>")]);
    assert!(detection.is_unknown());
}

#[test]
fn test_detection_is_idempotent() {
    let temp = TempDir::new().unwrap();
    support::write(temp.path(), "go.mod", "module example.com/app\n");
    let registry = EcosystemRegistry::with_defaults();
    let fs = RealFileSystem::new();

    let first = registry.detect(&fs, temp.path());
    let second = registry.detect(&fs, temp.path());
    assert_eq!(first, second);
}

#[test]
fn test_override_beats_markers() {
    let temp = TempDir::new().unwrap();
    support::write(temp.path(), "pom.xml", "<project/>");
    let selection = ToolSelection {
        variable: "TEST_TOOL",
        tool: Some("gradle"),
        has_custom_command: false,
    };
    let detection = EcosystemRegistry::with_defaults()
        .resolve(&RealFileSystem::new(), temp.path(), selection)
        .unwrap();
    assert_eq!(detection.ecosystem, Ecosystem::Gradle);
    assert_eq!(detection.source, DetectionSource::Override);
}

#[test]
fn test_unknown_directory_is_ambiguous() {
    let temp = TempDir::new().unwrap();
    let selection = ToolSelection {
        variable: "LINT_TOOL",
        tool: None,
        has_custom_command: false,
    };
    let err = EcosystemRegistry::with_defaults()
        .resolve(&RealFileSystem::new(), temp.path(), selection)
        .unwrap_err();
    assert!(matches!(err, PipeError::DetectionAmbiguity { .. }));
    assert!(err.to_string().contains("LINT_TOOL"));
}

#[test]
fn test_unknown_override_lists_accepted_names() {
    let temp = TempDir::new().unwrap();
    let selection = ToolSelection {
        variable: "TEST_TOOL",
        tool: Some("bazel"),
        has_custom_command: false,
    };
    let err = EcosystemRegistry::with_defaults()
        .resolve(&RealFileSystem::new(), temp.path(), selection)
        .unwrap_err();
    let message = err.to_string();
    assert!(message.contains("TEST_TOOL"));
    assert!(message.contains("maven"));
}
