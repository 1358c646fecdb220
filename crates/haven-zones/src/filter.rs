//! The fail-open zone filter.
//!
//! Evaluation never blocks event creation: a missing, empty or unparseable
//! zone config logs a warning and lets the event through. Decoded polygons
//! are cached per camera and invalidated by config version, so steady-state
//! evaluation does no JSON work at all.

use chrono::{NaiveTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::{debug, warn};

use haven_models::{CameraId, DetectionZone, MotionLocation, ZoneOutcome, ZoneSchedule};

use crate::geometry::point_in_polygon;
use crate::store::ZoneStore;

/// One compiled (enabled, valid) zone.
#[derive(Debug, Clone)]
pub struct CompiledZone {
    pub id: String,
    pub name: String,
    ring: Vec<haven_models::NormalizedPoint>,
    schedule: Option<ZoneSchedule>,
}

impl CompiledZone {
    fn from_zone(zone: &DetectionZone) -> Self {
        Self {
            id: zone.id.clone(),
            name: zone.name.clone(),
            ring: zone.vertices.clone(),
            schedule: zone.schedule.clone(),
        }
    }

    /// Whether the zone is active at the given time of day.
    fn is_active_at(&self, t: NaiveTime) -> bool {
        match &self.schedule {
            Some(schedule) => schedule.is_active_at(t),
            None => true,
        }
    }

    fn contains(&self, location: &MotionLocation) -> bool {
        point_in_polygon(location.anchor(), &self.ring)
    }
}

/// The decoded zone list for one camera config version.
#[derive(Debug)]
pub struct CompiledZoneSet {
    pub version: u64,
    pub zones: Vec<CompiledZone>,
}

/// Evaluates whether motion falls inside any enabled zone for a camera.
pub struct ZoneFilter {
    store: Arc<dyn ZoneStore>,
    // Swap-on-write: entries are replaced whole, never mutated in place,
    // so readers holding an Arc never observe a partial rebuild.
    cache: RwLock<HashMap<CameraId, Arc<CompiledZoneSet>>>,
}

impl ZoneFilter {
    pub fn new(store: Arc<dyn ZoneStore>) -> Self {
        Self {
            store,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Evaluate a motion location against the camera's enabled zones.
    ///
    /// Returns the gate outcome; every variant except `Outside` lets the
    /// event proceed.
    pub async fn evaluate(&self, camera_id: &CameraId, location: &MotionLocation) -> ZoneOutcome {
        self.evaluate_at(camera_id, location, Utc::now().time()).await
    }

    /// Evaluation with an explicit time of day, for schedule tests.
    pub async fn evaluate_at(
        &self,
        camera_id: &CameraId,
        location: &MotionLocation,
        time_of_day: NaiveTime,
    ) -> ZoneOutcome {
        let compiled = match self.compiled_zones(camera_id).await {
            Ok(Some(set)) => set,
            Ok(None) => {
                warn!(camera = %camera_id, "no zones configured, allowing event");
                return ZoneOutcome::NoZones;
            }
            Err(outcome) => return outcome,
        };

        if compiled.zones.is_empty() {
            warn!(camera = %camera_id, "no enabled zones, allowing event");
            return ZoneOutcome::NoZones;
        }

        // Short-circuit on the first containing zone
        for zone in &compiled.zones {
            if !zone.is_active_at(time_of_day) {
                continue;
            }
            if zone.contains(location) {
                debug!(camera = %camera_id, zone = %zone.name, "motion inside zone");
                return ZoneOutcome::Inside;
            }
        }
        ZoneOutcome::Outside
    }

    /// Convenience wrapper: does the gate let this event through?
    pub async fn allows(&self, camera_id: &CameraId, location: &MotionLocation) -> bool {
        self.evaluate(camera_id, location).await.allows_event()
    }

    /// Fetch (or rebuild) the compiled zone set for the camera.
    ///
    /// `Err(outcome)` carries the fail-open outcome for unreadable configs.
    async fn compiled_zones(
        &self,
        camera_id: &CameraId,
    ) -> Result<Option<Arc<CompiledZoneSet>>, ZoneOutcome> {
        let version = match self.store.config_version(camera_id).await {
            Ok(v) => v,
            Err(e) => {
                warn!(camera = %camera_id, error = %e, "zone config version unreadable, failing open");
                return Err(ZoneOutcome::FailedOpen);
            }
        };

        {
            let cache = self.cache.read().unwrap_or_else(|e| e.into_inner());
            if let Some(set) = cache.get(camera_id) {
                if set.version == version {
                    return Ok(Some(Arc::clone(set)));
                }
            }
        }

        let json = match self.store.load_zones_json(camera_id).await {
            Ok(Some(json)) => json,
            Ok(None) => return Ok(None),
            Err(e) => {
                warn!(camera = %camera_id, error = %e, "zone config unreadable, failing open");
                return Err(ZoneOutcome::FailedOpen);
            }
        };

        let zones: Vec<DetectionZone> = match serde_json::from_str(&json) {
            Ok(zones) => zones,
            Err(e) => {
                warn!(camera = %camera_id, error = %e, "zone config failed to parse, failing open");
                return Err(ZoneOutcome::FailedOpen);
            }
        };

        if zones.is_empty() {
            return Ok(None);
        }

        let compiled: Vec<CompiledZone> = zones
            .iter()
            .filter(|z| {
                if !z.enabled {
                    return false;
                }
                if !z.is_valid() {
                    warn!(camera = %camera_id, zone = %z.name, "skipping invalid zone");
                    return false;
                }
                true
            })
            .map(CompiledZone::from_zone)
            .collect();

        let set = Arc::new(CompiledZoneSet {
            version,
            zones: compiled,
        });

        let mut cache = self.cache.write().unwrap_or_else(|e| e.into_inner());
        cache.insert(camera_id.clone(), Arc::clone(&set));
        Ok(Some(set))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryZoneStore;
    use haven_models::{NormalizedBBox, NormalizedPoint};

    fn left_half_zone() -> DetectionZone {
        DetectionZone::new(
            "left half",
            vec![
                NormalizedPoint::new(0.0, 0.0),
                NormalizedPoint::new(0.5, 0.0),
                NormalizedPoint::new(0.5, 1.0),
                NormalizedPoint::new(0.0, 1.0),
            ],
        )
    }

    async fn filter_with(zones: Vec<DetectionZone>) -> (ZoneFilter, CameraId) {
        let store = Arc::new(InMemoryZoneStore::new());
        let camera = CameraId::from("cam-1");
        store.save_zones(&camera, zones).await.unwrap();
        (ZoneFilter::new(store), camera)
    }

    #[tokio::test]
    async fn motion_in_left_half_passes_right_half_drops() {
        let (filter, camera) = filter_with(vec![left_half_zone()]).await;

        let inside = MotionLocation::Point(NormalizedPoint::new(0.2, 0.5));
        let outside = MotionLocation::Point(NormalizedPoint::new(0.8, 0.5));

        assert_eq!(filter.evaluate(&camera, &inside).await, ZoneOutcome::Inside);
        assert_eq!(filter.evaluate(&camera, &outside).await, ZoneOutcome::Outside);
    }

    #[tokio::test]
    async fn unconfigured_camera_fails_open() {
        let store = Arc::new(InMemoryZoneStore::new());
        let filter = ZoneFilter::new(store);
        let camera = CameraId::from("never-configured");

        let location = MotionLocation::Point(NormalizedPoint::new(0.9, 0.9));
        let outcome = filter.evaluate(&camera, &location).await;
        assert_eq!(outcome, ZoneOutcome::NoZones);
        assert!(outcome.allows_event());
    }

    #[tokio::test]
    async fn broken_json_fails_open() {
        let store = Arc::new(InMemoryZoneStore::new());
        let camera = CameraId::from("cam-1");
        store.seed_raw(camera.clone(), "{not json[");
        let filter = ZoneFilter::new(store);

        let location = MotionLocation::Point(NormalizedPoint::new(0.9, 0.9));
        let outcome = filter.evaluate(&camera, &location).await;
        assert_eq!(outcome, ZoneOutcome::FailedOpen);
        assert!(outcome.allows_event());
    }

    #[tokio::test]
    async fn disabled_zones_are_never_evaluated() {
        let full_frame = DetectionZone::new(
            "everything",
            vec![
                NormalizedPoint::new(0.0, 0.0),
                NormalizedPoint::new(1.0, 0.0),
                NormalizedPoint::new(1.0, 1.0),
                NormalizedPoint::new(0.0, 1.0),
            ],
        )
        .with_enabled(false);
        let (filter, camera) = filter_with(vec![full_frame]).await;

        // Only a disabled zone exists, so the filter treats the camera as
        // having no enabled zones and fails open.
        let location = MotionLocation::Point(NormalizedPoint::new(0.5, 0.5));
        assert_eq!(filter.evaluate(&camera, &location).await, ZoneOutcome::NoZones);
    }

    #[tokio::test]
    async fn bbox_is_evaluated_at_its_center() {
        let (filter, camera) = filter_with(vec![left_half_zone()]).await;

        // Box straddles the boundary but centers in the left half
        let bbox = MotionLocation::BBox(NormalizedBBox::new(0.3, 0.4, 0.3, 0.2));
        assert_eq!(filter.evaluate(&camera, &bbox).await, ZoneOutcome::Inside);

        let right = MotionLocation::BBox(NormalizedBBox::new(0.6, 0.4, 0.3, 0.2));
        assert_eq!(filter.evaluate(&camera, &right).await, ZoneOutcome::Outside);
    }

    #[tokio::test]
    async fn cache_invalidates_on_config_change() {
        let store = Arc::new(InMemoryZoneStore::new());
        let camera = CameraId::from("cam-1");
        store.save_zones(&camera, vec![left_half_zone()]).await.unwrap();
        let filter = ZoneFilter::new(store.clone());

        let right = MotionLocation::Point(NormalizedPoint::new(0.8, 0.5));
        assert_eq!(filter.evaluate(&camera, &right).await, ZoneOutcome::Outside);

        // Replace with a full-frame zone; the filter must pick up the new
        // version without restart
        let full = DetectionZone::new(
            "everything",
            vec![
                NormalizedPoint::new(0.0, 0.0),
                NormalizedPoint::new(1.0, 0.0),
                NormalizedPoint::new(1.0, 1.0),
                NormalizedPoint::new(0.0, 1.0),
            ],
        );
        store.save_zones(&camera, vec![full]).await.unwrap();
        assert_eq!(filter.evaluate(&camera, &right).await, ZoneOutcome::Inside);
    }

    #[tokio::test]
    async fn scheduled_zone_is_inactive_outside_its_window() {
        use haven_models::{ZoneSchedule, ZoneTimeRange};

        let evening_only = left_half_zone().with_schedule(ZoneSchedule {
            ranges: vec![ZoneTimeRange::new(
                NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
                NaiveTime::from_hms_opt(23, 0, 0).unwrap(),
            )],
        });
        let (filter, camera) = filter_with(vec![evening_only]).await;

        let inside = MotionLocation::Point(NormalizedPoint::new(0.2, 0.5));
        let noon = NaiveTime::from_hms_opt(12, 0, 0).unwrap();
        let night = NaiveTime::from_hms_opt(20, 0, 0).unwrap();

        assert_eq!(
            filter.evaluate_at(&camera, &inside, noon).await,
            ZoneOutcome::Outside
        );
        assert_eq!(
            filter.evaluate_at(&camera, &inside, night).await,
            ZoneOutcome::Inside
        );
    }
}
