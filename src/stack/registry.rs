use super::ecosystem::*;
use super::{Detection, Ecosystem};
use crate::config::ConfigError;
use crate::error::PipeError;
use crate::fs::FileSystem;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Order in which ecosystems are probed. Yarn must precede npm.
pub const DETECTION_ORDER: [Ecosystem; 10] = [
    Ecosystem::Maven,
    Ecosystem::Gradle,
    Ecosystem::Yarn,
    Ecosystem::Npm,
    Ecosystem::Pytest,
    Ecosystem::Go,
    Ecosystem::DotNet,
    Ecosystem::PhpUnit,
    Ecosystem::Rspec,
    Ecosystem::Cargo,
];

/// Tool selection inputs for one task family (`TEST_TOOL`/`TEST_COMMAND`, ...)
#[derive(Debug, Clone, Copy)]
pub struct ToolSelection<'a> {
    /// Name of the override variable, used in error messages
    pub variable: &'a str,
    pub tool: Option<&'a str>,
    pub has_custom_command: bool,
}

pub struct EcosystemRegistry {
    definitions: Vec<Arc<dyn EcosystemDefinition>>,
}

impl EcosystemRegistry {
    pub fn new() -> Self {
        Self {
            definitions: Vec::new(),
        }
    }

    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for id in DETECTION_ORDER {
            let def: Arc<dyn EcosystemDefinition> = match id {
                Ecosystem::Maven => Arc::new(MavenEcosystem),
                Ecosystem::Gradle => Arc::new(GradleEcosystem),
                Ecosystem::Yarn => Arc::new(YarnEcosystem),
                Ecosystem::Npm => Arc::new(NpmEcosystem),
                Ecosystem::Pytest => Arc::new(PytestEcosystem),
                Ecosystem::Go => Arc::new(GoEcosystem),
                Ecosystem::DotNet => Arc::new(DotNetEcosystem),
                Ecosystem::PhpUnit => Arc::new(PhpUnitEcosystem),
                Ecosystem::Rspec => Arc::new(RspecEcosystem),
                Ecosystem::Cargo => Arc::new(CargoEcosystem),
                Ecosystem::Custom | Ecosystem::Unknown => continue,
            };
            registry.register(def);
        }
        registry
    }

    /// Appends a definition; probed after the ones already registered
    pub fn register(&mut self, definition: Arc<dyn EcosystemDefinition>) {
        self.definitions.retain(|d| d.id() != definition.id());
        self.definitions.push(definition);
    }

    pub fn get(&self, id: Ecosystem) -> Option<&dyn EcosystemDefinition> {
        self.definitions
            .iter()
            .find(|d| d.id() == id)
            .map(|d| d.as_ref())
    }

    pub fn ecosystems(&self) -> Vec<Ecosystem> {
        self.definitions.iter().map(|d| d.id()).collect()
    }

    pub fn accepted_names(&self) -> Vec<&'static str> {
        self.definitions.iter().map(|d| d.id().as_str()).collect()
    }

    /// First ecosystem whose markers are present in `dir`, or `unknown`.
    /// Read-only: never runs a command.
    pub fn detect(&self, fs: &dyn FileSystem, dir: &Path) -> Detection {
        for def in &self.definitions {
            if let Some(marker) = def.detect(fs, dir) {
                debug!(ecosystem = %def.id(), marker = %marker.display(), "Detected ecosystem");
                return Detection::detected(def.id(), marker);
            }
        }
        debug!(dir = %dir.display(), "No ecosystem markers found");
        Detection::unknown()
    }

    /// Applies override and custom-command precedence, falling back to detection.
    ///
    /// An explicit tool name is never second-guessed by marker files. A custom
    /// command without a tool name skips detection entirely.
    pub fn resolve(
        &self,
        fs: &dyn FileSystem,
        dir: &Path,
        selection: ToolSelection<'_>,
    ) -> Result<Detection, PipeError> {
        if let Some(name) = selection.tool {
            return match Ecosystem::from_name(name) {
                Some(Ecosystem::Custom) if selection.has_custom_command => Ok(Detection::custom()),
                Some(id) if self.get(id).is_some() => Ok(Detection::overridden(id)),
                _ => Err(ConfigError::invalid(selection.variable, name, &self.accepted_names()).into()),
            };
        }

        if selection.has_custom_command {
            return Ok(Detection::custom());
        }

        let detection = self.detect(fs, dir);
        if detection.is_unknown() {
            return Err(PipeError::DetectionAmbiguity {
                variable: selection.variable.to_string(),
                dir: dir.to_path_buf(),
                accepted: self.accepted_names().join(", "),
            });
        }
        Ok(detection)
    }
}

impl Default for EcosystemRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MockFileSystem;
    use crate::stack::DetectionSource;
    use std::path::PathBuf;

    fn selection(tool: Option<&str>, custom: bool) -> ToolSelection<'_> {
        ToolSelection {
            variable: "TEST_TOOL",
            tool,
            has_custom_command: custom,
        }
    }

    #[test]
    fn test_registry_holds_every_concrete_ecosystem() {
        let registry = EcosystemRegistry::with_defaults();
        assert_eq!(registry.ecosystems(), DETECTION_ORDER.to_vec());
        for eco in Ecosystem::concrete() {
            assert!(registry.get(*eco).is_some(), "missing {}", eco);
        }
        assert!(registry.get(Ecosystem::Custom).is_none());
    }

    #[test]
    fn test_maven_beats_gradle() {
        let fs = MockFileSystem::new();
        fs.add_file("/mock/build.gradle", "");
        fs.add_file("/mock/pom.xml", "<project/>");
        let detection = EcosystemRegistry::with_defaults().detect(&fs, Path::new("/mock"));
        assert_eq!(detection.ecosystem, Ecosystem::Maven);
        assert_eq!(detection.marker, Some(PathBuf::from("/mock/pom.xml")));
    }

    #[test]
    fn test_empty_directory_is_unknown() {
        let fs = MockFileSystem::new();
        fs.add_dir("/mock");
        let detection = EcosystemRegistry::with_defaults().detect(&fs, Path::new("/mock"));
        assert!(detection.is_unknown());
        assert!(detection.marker.is_none());
    }

    #[test]
    fn test_override_skips_markers() {
        let fs = MockFileSystem::new();
        fs.add_file("/mock/pom.xml", "<project/>");
        let registry = EcosystemRegistry::with_defaults();
        let detection = registry
            .resolve(&fs, Path::new("/mock"), selection(Some("npm"), false))
            .unwrap();
        assert_eq!(detection.ecosystem, Ecosystem::Npm);
        assert_eq!(detection.source, DetectionSource::Override);
    }

    #[test]
    fn test_custom_command_needs_no_markers() {
        let fs = MockFileSystem::new();
        let registry = EcosystemRegistry::with_defaults();
        let detection = registry
            .resolve(&fs, Path::new("/mock"), selection(None, true))
            .unwrap();
        assert_eq!(detection, Detection::custom());
    }

    #[test]
    fn test_invalid_override_suggests_name() {
        let fs = MockFileSystem::new();
        let registry = EcosystemRegistry::with_defaults();
        let err = registry
            .resolve(&fs, Path::new("/mock"), selection(Some("mavne"), false))
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("TEST_TOOL"));
        assert!(message.contains("did you mean 'maven'"));
    }

    #[test]
    fn test_custom_override_without_command_is_rejected() {
        let fs = MockFileSystem::new();
        let registry = EcosystemRegistry::with_defaults();
        let result = registry.resolve(&fs, Path::new("/mock"), selection(Some("custom"), false));
        assert!(matches!(result, Err(PipeError::Config(_))));
    }

    #[test]
    fn test_unknown_without_fallback_is_ambiguity() {
        let fs = MockFileSystem::new();
        fs.add_dir("/mock");
        let registry = EcosystemRegistry::with_defaults();
        let err = registry
            .resolve(&fs, Path::new("/mock"), selection(None, false))
            .unwrap_err();
        assert!(matches!(err, PipeError::DetectionAmbiguity { .. }));
    }
}
