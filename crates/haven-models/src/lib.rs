//! Shared data models for the Haven event pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Camera, event and entity identifiers
//! - Analysis modes and the fallback trail
//! - Motion triggers and in-flight processing events
//! - Detection zones and normalized frame geometry
//! - Analysis results, persisted event records, recognized entities

pub mod analysis;
pub mod camera;
pub mod entity;
pub mod event;
pub mod fallback;
pub mod geometry;
pub mod ids;
pub mod mode;
pub mod trigger;
pub mod zone;

// Re-export common types
pub use analysis::{AnalysisResult, TokenUsage};
pub use camera::CameraConfig;
pub use entity::{EntityEvent, EntityType, RecognizedEntity};
pub use event::{EventRecord, EventStatus};
pub use fallback::{FallbackCause, FallbackRecord, FallbackTrail, TrailParseError};
pub use geometry::{MotionLocation, NormalizedBBox, NormalizedPoint};
pub use ids::{CameraId, EntityId, EventId};
pub use mode::AnalysisMode;
pub use trigger::{MotionTrigger, ProcessingEvent, ZoneOutcome};
pub use zone::{DetectionZone, ZoneSchedule, ZoneTimeRange, MAX_ZONES_PER_CAMERA, MIN_ZONE_VERTICES};
