crate::define_id_enum! {
    /// Build/test ecosystem a project belongs to.
    ///
    /// `Custom` marks a run driven entirely by a user-supplied command;
    /// `Unknown` is what detection returns when no marker file matched.
    Ecosystem {
        Maven => "maven" | "mvn",
        Gradle => "gradle" | "gradlew",
        Npm => "npm" | "node",
        Yarn => "yarn",
        Pytest => "pytest" | "python" | "py",
        Go => "go" | "golang",
        DotNet => "dotnet" | ".net" | "net",
        PhpUnit => "phpunit" | "php",
        Rspec => "rspec" | "ruby",
        Cargo => "cargo" | "rust",
        Custom => "custom",
        Unknown => "unknown",
    }
}

impl Ecosystem {
    /// Ecosystems that have a command table and marker files
    pub fn concrete() -> &'static [Ecosystem] {
        &Self::all_variants()[..10]
    }

    pub fn is_concrete(&self) -> bool {
        !matches!(self, Ecosystem::Custom | Ecosystem::Unknown)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ecosystem_serialization() {
        assert_eq!(serde_json::to_string(&Ecosystem::DotNet).unwrap(), "\"dotnet\"");
        assert_eq!(serde_json::to_string(&Ecosystem::Unknown).unwrap(), "\"unknown\"");
    }

    #[test]
    fn test_ecosystem_deserialization_rejects_unknown_names() {
        let eco: Ecosystem = serde_json::from_str("\"golang\"").unwrap();
        assert_eq!(eco, Ecosystem::Go);
        assert!(serde_json::from_str::<Ecosystem>("\"bazel\"").is_err());
    }

    #[test]
    fn test_from_name_with_aliases() {
        assert_eq!(Ecosystem::from_name("Maven"), Some(Ecosystem::Maven));
        assert_eq!(Ecosystem::from_name("mvn"), Some(Ecosystem::Maven));
        assert_eq!(Ecosystem::from_name("python"), Some(Ecosystem::Pytest));
        assert_eq!(Ecosystem::from_name(".NET"), Some(Ecosystem::DotNet));
        assert_eq!(Ecosystem::from_name(" rust "), Some(Ecosystem::Cargo));
        assert_eq!(Ecosystem::from_name("bazel"), None);
    }

    #[test]
    fn test_concrete_excludes_custom_and_unknown() {
        let concrete = Ecosystem::concrete();
        assert_eq!(concrete.len(), 10);
        assert!(concrete.iter().all(|e| e.is_concrete()));
        assert!(!Ecosystem::Custom.is_concrete());
        assert!(!concrete.contains(&Ecosystem::Unknown));
    }

    #[test]
    fn test_from_str_error_lists_accepted() {
        let err = "bazel".parse::<Ecosystem>().unwrap_err();
        assert!(err.contains("maven"));
        assert!(err.contains("cargo"));
    }
}
