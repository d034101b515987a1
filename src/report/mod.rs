//! Result Reporter / Policy Gate
//!
//! Turns raw execution results and scanner output into gate decisions, a
//! process exit code and the artifacts downstream steps consume.

pub mod artifact;
pub mod coverage;
pub mod finding;
pub mod parsers;
pub mod policy;
pub mod summary;

pub use artifact::{BuildInfo, sanitize_value};
pub use coverage::CoverageFormat;
pub use finding::{Finding, Severity, SeverityCounts};
pub use policy::{CoveragePolicy, ExitCodePolicy, FindingPolicy, GateResult, GateStatus};
pub use summary::{render_human, PipeReport, StepRecord};
