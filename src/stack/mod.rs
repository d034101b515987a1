//! Ecosystem identification (the Tool Detector)
//!
//! Maps a working directory to a closed set of build/test ecosystems by
//! probing marker files in a fixed order, and holds the per-ecosystem
//! command tables used by the dispatcher.

#[macro_use]
pub mod id_enum_macro;
pub mod detection;
pub mod ecosystem;
pub mod ecosystem_id;
pub mod registry;
pub mod task_kind;

pub use detection::{Detection, DetectionSource};
pub use ecosystem::{CommandContext, CoverageSource, EcosystemDefinition, Marker};
pub use ecosystem_id::Ecosystem;
pub use registry::{EcosystemRegistry, ToolSelection, DETECTION_ORDER};
pub use task_kind::TaskKind;
