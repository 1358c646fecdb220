//! Persisted event records.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::analysis::AnalysisResult;
use crate::ids::{CameraId, EntityId, EventId};
use crate::trigger::ZoneOutcome;

/// Terminal status of a persisted event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    /// Analysis produced a real description.
    #[default]
    Described,
    /// Every fallback stage failed; the description is a placeholder.
    Degraded,
    /// The worker raised; the event was persisted for diagnosis only.
    Failed,
}

impl EventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Described => "described",
            EventStatus::Degraded => "degraded",
            EventStatus::Failed => "failed",
        }
    }
}

/// The persisted record of one motion event.
///
/// Never mutated after creation except for user feedback annotations,
/// which live outside this pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct EventRecord {
    /// Unique event id.
    pub id: EventId,

    /// Camera that produced the event.
    pub camera_id: CameraId,

    /// When the motion was detected.
    pub timestamp: DateTime<Utc>,

    /// Analysis output (description, mode, tokens, cost, trail).
    pub analysis: AnalysisResult,

    /// Entity this event was matched to, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_entity: Option<EntityId>,

    /// How the zone filter ruled.
    pub zone_outcome: ZoneOutcome,

    /// Terminal status.
    #[serde(default)]
    pub status: EventStatus,

    /// When the record was written.
    pub created_at: DateTime<Utc>,
}

impl EventRecord {
    /// Create a record from a completed analysis.
    pub fn new(
        camera_id: CameraId,
        timestamp: DateTime<Utc>,
        analysis: AnalysisResult,
        zone_outcome: ZoneOutcome,
    ) -> Self {
        let status = if analysis.degraded {
            EventStatus::Degraded
        } else {
            EventStatus::Described
        };
        Self {
            id: EventId::new(),
            camera_id,
            timestamp,
            analysis,
            matched_entity: None,
            zone_outcome,
            status,
            created_at: Utc::now(),
        }
    }

    /// Link the matched entity.
    pub fn with_entity(mut self, entity_id: EntityId) -> Self {
        self.matched_entity = Some(entity_id);
        self
    }

    /// Mark the record failed (worker error after analysis).
    pub fn mark_failed(&mut self) {
        self.status = EventStatus::Failed;
    }
}
