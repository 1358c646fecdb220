//! Motion triggers and in-flight processing events.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::geometry::MotionLocation;
use crate::ids::CameraId;

/// A motion notification from the capture service.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct MotionTrigger {
    /// Camera that saw the motion.
    pub camera_id: CameraId,

    /// When the motion was detected.
    pub detected_at: DateTime<Utc>,

    /// Snapshot captured at trigger time, if the source provided one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot_path: Option<PathBuf>,

    /// Where in the frame the motion was seen.
    pub location: MotionLocation,

    /// Detector hints ("person", "vehicle"), possibly empty.
    #[serde(default)]
    pub object_hints: Vec<String>,
}

impl MotionTrigger {
    pub fn new(camera_id: CameraId, location: MotionLocation) -> Self {
        Self {
            camera_id,
            detected_at: Utc::now(),
            snapshot_path: None,
            location,
            object_hints: Vec::new(),
        }
    }

    /// Set the snapshot path.
    pub fn with_snapshot(mut self, path: impl Into<PathBuf>) -> Self {
        self.snapshot_path = Some(path.into());
        self
    }

    /// Set detector object hints.
    pub fn with_hints(mut self, hints: Vec<String>) -> Self {
        self.object_hints = hints;
        self
    }
}

/// Outcome of the zone-filter gate for an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ZoneOutcome {
    /// Motion fell inside an enabled zone.
    Inside,
    /// No zones are configured; the filter failed open.
    NoZones,
    /// Zone config was unreadable; the filter failed open.
    FailedOpen,
    /// Motion fell outside every enabled zone (event dropped).
    Outside,
}

impl ZoneOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            ZoneOutcome::Inside => "inside",
            ZoneOutcome::NoZones => "no_zones",
            ZoneOutcome::FailedOpen => "failed_open",
            ZoneOutcome::Outside => "outside",
        }
    }

    /// Whether the event should proceed through the pipeline.
    pub fn allows_event(&self) -> bool {
        !matches!(self, ZoneOutcome::Outside)
    }
}

/// An in-flight queue item.
///
/// Owned exclusively by the queue until a worker claims it; dropped after
/// persistence or terminal failure.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ProcessingEvent {
    /// The originating trigger.
    pub trigger: MotionTrigger,

    /// When the event entered the queue.
    pub enqueued_at: DateTime<Utc>,

    /// Zone-filter outcome, filled in by the worker.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zone_outcome: Option<ZoneOutcome>,
}

impl ProcessingEvent {
    pub fn new(trigger: MotionTrigger) -> Self {
        Self {
            trigger,
            enqueued_at: Utc::now(),
            zone_outcome: None,
        }
    }

    pub fn camera_id(&self) -> &CameraId {
        &self.trigger.camera_id
    }
}
