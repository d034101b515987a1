use super::Ecosystem;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// How the ecosystem for a run was chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectionSource {
    Markers,
    Override,
    Custom,
}

impl DetectionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            DetectionSource::Markers => "markers",
            DetectionSource::Override => "override",
            DetectionSource::Custom => "custom",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Detection {
    pub ecosystem: Ecosystem,
    pub source: DetectionSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marker: Option<PathBuf>,
}

impl Detection {
    pub fn detected(ecosystem: Ecosystem, marker: PathBuf) -> Self {
        Self {
            ecosystem,
            source: DetectionSource::Markers,
            marker: Some(marker),
        }
    }

    pub fn unknown() -> Self {
        Self {
            ecosystem: Ecosystem::Unknown,
            source: DetectionSource::Markers,
            marker: None,
        }
    }

    pub fn overridden(ecosystem: Ecosystem) -> Self {
        Self {
            ecosystem,
            source: DetectionSource::Override,
            marker: None,
        }
    }

    pub fn custom() -> Self {
        Self {
            ecosystem: Ecosystem::Custom,
            source: DetectionSource::Custom,
            marker: None,
        }
    }

    pub fn is_unknown(&self) -> bool {
        self.ecosystem == Ecosystem::Unknown
    }
}
