//! Detection zone model.
//!
//! Zones are user-drawn polygons restricting where motion is relevant.
//! They are persisted as part of camera configuration (a JSON array) and
//! compiled into fast test structures by `haven-zones`.

use chrono::NaiveTime;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geometry::NormalizedPoint;

/// Maximum number of zones a camera may carry.
pub const MAX_ZONES_PER_CAMERA: usize = 10;

/// Minimum vertices for a valid polygon.
pub const MIN_ZONE_VERTICES: usize = 3;

/// A time range within a day during which a zone is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ZoneTimeRange {
    /// Inclusive start of the active window.
    pub start: NaiveTime,
    /// Exclusive end of the active window.
    pub end: NaiveTime,
}

impl ZoneTimeRange {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self { start, end }
    }

    /// Whether `t` falls inside this range. Ranges that wrap midnight
    /// (start > end) are split logically at 00:00.
    pub fn contains(&self, t: NaiveTime) -> bool {
        if self.start <= self.end {
            t >= self.start && t < self.end
        } else {
            t >= self.start || t < self.end
        }
    }
}

/// Optional activity schedule for a zone.
///
/// Multiple ranges use OR-logic: the zone is active if the current time
/// falls inside any of them. An empty range list means always active.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ZoneSchedule {
    #[serde(default)]
    pub ranges: Vec<ZoneTimeRange>,
}

impl ZoneSchedule {
    /// Whether the schedule is active at the given time of day.
    pub fn is_active_at(&self, t: NaiveTime) -> bool {
        self.ranges.is_empty() || self.ranges.iter().any(|r| r.contains(t))
    }
}

/// A user-defined polygon zone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DetectionZone {
    /// Zone identifier, unique within the camera.
    pub id: String,

    /// Human-readable name ("Driveway", "Front porch").
    pub name: String,

    /// Ordered polygon vertices in normalized coordinates.
    ///
    /// Stored auto-closed: after `normalize()` the first vertex is repeated
    /// as the last.
    pub vertices: Vec<NormalizedPoint>,

    /// Disabled zones are never evaluated.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Optional activity schedule.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule: Option<ZoneSchedule>,
}

fn default_enabled() -> bool {
    true
}

impl DetectionZone {
    /// Create a new enabled zone with a random id.
    pub fn new(name: impl Into<String>, vertices: Vec<NormalizedPoint>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            vertices,
            enabled: true,
            schedule: None,
        }
    }

    /// Set the enabled flag.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Set the activity schedule.
    pub fn with_schedule(mut self, schedule: ZoneSchedule) -> Self {
        self.schedule = Some(schedule);
        self
    }

    /// Auto-close the polygon: append the first vertex if the ring is open.
    ///
    /// Idempotent; calling on an already-closed polygon is a no-op.
    pub fn normalize(&mut self) {
        if self.vertices.len() >= MIN_ZONE_VERTICES {
            let first = self.vertices[0];
            let last = self.vertices[self.vertices.len() - 1];
            if first != last {
                self.vertices.push(first);
            }
        }
    }

    /// Whether the polygon has enough vertices and all lie in [0,1].
    ///
    /// Counts unique ring vertices, so a closed triangle (4 stored points)
    /// still passes the 3-vertex minimum.
    pub fn is_valid(&self) -> bool {
        let n = self.ring_len();
        n >= MIN_ZONE_VERTICES && self.vertices.iter().all(|v| v.is_valid())
    }

    /// Number of vertices excluding the closing duplicate.
    pub fn ring_len(&self) -> usize {
        let n = self.vertices.len();
        if n >= 2 && self.vertices[0] == self.vertices[n - 1] {
            n - 1
        } else {
            n
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

    fn pts(raw: &[(f64, f64)]) -> Vec<NormalizedPoint> {
        raw.iter().map(|&(x, y)| NormalizedPoint::new(x, y)).collect()
    }

    #[test]
    fn normalize_auto_closes_open_polygon() {
        let mut zone = DetectionZone::new("yard", pts(&[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0)]));
        zone.normalize();
        assert_eq!(zone.vertices.len(), 4);
        assert_eq!(zone.vertices[0], zone.vertices[3]);

        // Idempotent
        zone.normalize();
        assert_eq!(zone.vertices.len(), 4);
    }

    #[test]
    fn closed_triangle_is_still_valid() {
        let mut zone = DetectionZone::new("yard", pts(&[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0)]));
        zone.normalize();
        assert!(zone.is_valid());
        assert_eq!(zone.ring_len(), 3);
    }

    #[test]
    fn two_vertex_zone_is_invalid() {
        let zone = DetectionZone::new("line", pts(&[(0.0, 0.0), (1.0, 1.0)]));
        assert!(!zone.is_valid());
    }

    #[test]
    fn schedule_or_logic_matches_any_range() {
        let morning = ZoneTimeRange::new(
            NaiveTime::from_hms_opt(6, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
        );
        let evening = ZoneTimeRange::new(
            NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(23, 0, 0).unwrap(),
        );
        let schedule = ZoneSchedule {
            ranges: vec![morning, evening],
        };

        assert!(schedule.is_active_at(NaiveTime::from_hms_opt(7, 30, 0).unwrap()));
        assert!(schedule.is_active_at(NaiveTime::from_hms_opt(20, 0, 0).unwrap()));
        assert!(!schedule.is_active_at(NaiveTime::from_hms_opt(12, 0, 0).unwrap()));
    }

    #[test]
    fn empty_schedule_is_always_active() {
        let schedule = ZoneSchedule::default();
        assert!(schedule.is_active_at(NaiveTime::from_hms_opt(3, 0, 0).unwrap()));
    }

    #[test]
    fn overnight_range_wraps_midnight() {
        let range = ZoneTimeRange::new(
            NaiveTime::from_hms_opt(22, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(6, 0, 0).unwrap(),
        );
        assert!(range.contains(NaiveTime::from_hms_opt(23, 30, 0).unwrap()));
        assert!(range.contains(NaiveTime::from_hms_opt(2, 0, 0).unwrap()));
        assert!(!range.contains(NaiveTime::from_hms_opt(12, 0, 0).unwrap()));
    }
}
