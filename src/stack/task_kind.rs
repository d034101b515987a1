crate::define_id_enum! {
    /// What a dispatched command is supposed to accomplish
    TaskKind {
        UnitTest => "unit-test" | "test" | "unit",
        IntegrationTest => "integration-test" | "integration",
        Lint => "lint",
        FormatCheck => "format-check" | "format",
        TypeCheck => "type-check" | "typecheck",
        Build => "build",
        Package => "package",
        Scan => "scan",
        Deploy => "deploy",
        Notify => "notify",
    }
}
