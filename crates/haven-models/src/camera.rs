//! Camera configuration.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::ids::CameraId;
use crate::mode::AnalysisMode;
use crate::zone::DetectionZone;

/// Per-camera pipeline configuration.
///
/// Owned by the camera-configuration store; the pipeline reads it, never
/// writes it except through explicit zone-management calls.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CameraConfig {
    pub id: CameraId,

    pub name: String,

    /// Disabled cameras get no producer task.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// The analysis mode this camera is configured for. The orchestrator
    /// may still fall back below it.
    #[serde(default)]
    pub analysis_mode: AnalysisMode,

    /// Whether the camera's source can serve motion clips (Protect-style
    /// NVR cameras). Snapshot-only cameras route straight to single-frame.
    #[serde(default)]
    pub clip_capable: bool,

    /// Path the capture service keeps the latest snapshot at.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot_path: Option<PathBuf>,

    /// Per-camera cooldown override in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cooldown_secs: Option<u64>,

    /// Detection zones, persisted as part of this config.
    #[serde(default)]
    pub zones: Vec<DetectionZone>,
}

fn default_enabled() -> bool {
    true
}

impl CameraConfig {
    pub fn new(id: CameraId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            enabled: true,
            analysis_mode: AnalysisMode::default(),
            clip_capable: false,
            snapshot_path: None,
            cooldown_secs: None,
            zones: Vec::new(),
        }
    }

    /// Set the configured analysis mode.
    pub fn with_analysis_mode(mut self, mode: AnalysisMode) -> Self {
        self.analysis_mode = mode;
        self
    }

    /// Mark the camera clip-capable.
    pub fn with_clip_capable(mut self, clip_capable: bool) -> Self {
        self.clip_capable = clip_capable;
        self
    }

    /// Set the snapshot path.
    pub fn with_snapshot_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.snapshot_path = Some(path.into());
        self
    }

    /// Set a per-camera cooldown override.
    pub fn with_cooldown_secs(mut self, secs: u64) -> Self {
        self.cooldown_secs = Some(secs);
        self
    }
}
