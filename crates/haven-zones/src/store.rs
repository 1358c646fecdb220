//! Zone persistence.
//!
//! Zones live as a JSON array inside camera configuration. The typed model
//! exists only on this side of the boundary; encode/decode happens here and
//! nowhere else.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;
use validator::{Validate, ValidationError};

use haven_models::{CameraId, DetectionZone, MAX_ZONES_PER_CAMERA, MIN_ZONE_VERTICES};

use crate::error::{ZoneError, ZoneResult};

/// A validated zone-list write.
#[derive(Debug, Validate)]
pub struct ZoneListUpdate {
    // The length literal mirrors MAX_ZONES_PER_CAMERA; validator needs it
    // spelled out
    #[validate(
        length(max = 10, message = "at most 10 zones per camera"),
        custom(function = validate_zone_geometry)
    )]
    pub zones: Vec<DetectionZone>,
}

fn validate_zone_geometry(zones: &[DetectionZone]) -> Result<(), ValidationError> {
    for zone in zones {
        if zone.ring_len() < MIN_ZONE_VERTICES {
            return Err(ValidationError::new("too_few_vertices"));
        }
        if !zone.vertices.iter().all(|v| v.is_valid()) {
            return Err(ValidationError::new("coordinates_out_of_range"));
        }
    }
    Ok(())
}

impl ZoneListUpdate {
    /// Validate and normalize (auto-close) the zones for storage.
    pub fn into_normalized(mut self) -> ZoneResult<Vec<DetectionZone>> {
        self.validate()
            .map_err(|e| ZoneError::validation(e.to_string()))?;
        for zone in &mut self.zones {
            zone.normalize();
        }
        Ok(self.zones)
    }
}

/// Read/write access to a camera's zone list.
///
/// `load_zones` returns the raw JSON text (or `None` when the camera has no
/// zone config at all); decoding happens in the filter so a broken column
/// can fail open instead of failing the call chain.
#[async_trait]
pub trait ZoneStore: Send + Sync {
    /// Raw JSON zone array for the camera, if configured.
    async fn load_zones_json(&self, camera_id: &CameraId) -> ZoneResult<Option<String>>;

    /// Validate, normalize and persist a zone list.
    async fn save_zones(&self, camera_id: &CameraId, zones: Vec<DetectionZone>) -> ZoneResult<()>;

    /// Monotonic version of the camera's zone config; bumps on every save.
    async fn config_version(&self, camera_id: &CameraId) -> ZoneResult<u64>;
}

/// In-memory zone store for tests and single-process deployments.
#[derive(Debug, Default)]
pub struct InMemoryZoneStore {
    // JSON text plus version, like the camera-config column it stands in for
    configs: RwLock<HashMap<CameraId, (String, u64)>>,
}

impl InMemoryZoneStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a camera with pre-encoded zone JSON (no validation). Test use.
    pub fn seed_raw(&self, camera_id: CameraId, json: impl Into<String>) {
        let mut configs = self.configs.write().unwrap_or_else(|e| e.into_inner());
        let version = configs.get(&camera_id).map(|(_, v)| v + 1).unwrap_or(1);
        configs.insert(camera_id, (json.into(), version));
    }
}

#[async_trait]
impl ZoneStore for InMemoryZoneStore {
    async fn load_zones_json(&self, camera_id: &CameraId) -> ZoneResult<Option<String>> {
        let configs = self.configs.read().unwrap_or_else(|e| e.into_inner());
        Ok(configs.get(camera_id).map(|(json, _)| json.clone()))
    }

    async fn save_zones(&self, camera_id: &CameraId, zones: Vec<DetectionZone>) -> ZoneResult<()> {
        let normalized = ZoneListUpdate { zones }.into_normalized()?;
        let json = serde_json::to_string(&normalized)?;

        let mut configs = self.configs.write().unwrap_or_else(|e| e.into_inner());
        let version = configs.get(camera_id).map(|(_, v)| v + 1).unwrap_or(1);
        configs.insert(camera_id.clone(), (json, version));
        Ok(())
    }

    async fn config_version(&self, camera_id: &CameraId) -> ZoneResult<u64> {
        let configs = self.configs.read().unwrap_or_else(|e| e.into_inner());
        Ok(configs.get(camera_id).map(|(_, v)| *v).unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use haven_models::NormalizedPoint;

    fn triangle() -> Vec<NormalizedPoint> {
        vec![
            NormalizedPoint::new(0.0, 0.0),
            NormalizedPoint::new(1.0, 0.0),
            NormalizedPoint::new(1.0, 1.0),
        ]
    }

    #[test]
    fn zone_cap_matches_the_validator_literal() {
        assert_eq!(MAX_ZONES_PER_CAMERA, 10);
    }

    #[tokio::test]
    async fn save_auto_closes_and_bumps_version() {
        let store = InMemoryZoneStore::new();
        let camera = CameraId::from("cam-1");

        let zone = DetectionZone::new("yard", triangle());
        store.save_zones(&camera, vec![zone]).await.unwrap();
        assert_eq!(store.config_version(&camera).await.unwrap(), 1);

        let json = store.load_zones_json(&camera).await.unwrap().unwrap();
        let reloaded: Vec<DetectionZone> = serde_json::from_str(&json).unwrap();
        assert_eq!(reloaded[0].vertices.len(), 4);
        assert_eq!(reloaded[0].vertices[0], reloaded[0].vertices[3]);

        store.save_zones(&camera, vec![]).await.unwrap();
        assert_eq!(store.config_version(&camera).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn save_rejects_too_many_zones() {
        let store = InMemoryZoneStore::new();
        let camera = CameraId::from("cam-1");
        let zones: Vec<_> = (0..11)
            .map(|i| DetectionZone::new(format!("z{i}"), triangle()))
            .collect();

        let err = store.save_zones(&camera, zones).await.unwrap_err();
        assert!(matches!(err, ZoneError::Validation(_)));
    }

    #[tokio::test]
    async fn save_rejects_two_vertex_polygon() {
        let store = InMemoryZoneStore::new();
        let camera = CameraId::from("cam-1");
        let zone = DetectionZone::new(
            "line",
            vec![NormalizedPoint::new(0.0, 0.0), NormalizedPoint::new(1.0, 1.0)],
        );

        let err = store.save_zones(&camera, vec![zone]).await.unwrap_err();
        assert!(matches!(err, ZoneError::Validation(_)));
    }

    #[tokio::test]
    async fn save_rejects_out_of_range_coordinates() {
        let store = InMemoryZoneStore::new();
        let camera = CameraId::from("cam-1");
        let zone = DetectionZone::new(
            "bad",
            vec![
                NormalizedPoint::new(0.0, 0.0),
                NormalizedPoint::new(1.5, 0.0),
                NormalizedPoint::new(1.0, 1.0),
            ],
        );

        let err = store.save_zones(&camera, vec![zone]).await.unwrap_err();
        assert!(matches!(err, ZoneError::Validation(_)));
    }

    #[tokio::test]
    async fn missing_camera_has_version_zero_and_no_json() {
        let store = InMemoryZoneStore::new();
        let camera = CameraId::from("ghost");
        assert_eq!(store.config_version(&camera).await.unwrap(), 0);
        assert!(store.load_zones_json(&camera).await.unwrap().is_none());
    }
}
