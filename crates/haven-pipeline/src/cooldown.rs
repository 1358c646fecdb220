//! Per-camera cooldown.
//!
//! Motion sources tick many times for one physical visit; the gate admits
//! the first trigger and suppresses the rest for the quiet period. Multiple
//! producers can race on the same camera, so the timestamps live under a
//! lock.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::debug;

use haven_models::CameraId;

/// Admits one trigger per camera per quiet period.
pub struct CooldownGate {
    default_cooldown: Duration,
    last_trigger: Mutex<HashMap<CameraId, Instant>>,
}

impl CooldownGate {
    pub fn new(default_cooldown: Duration) -> Self {
        Self {
            default_cooldown,
            last_trigger: Mutex::new(HashMap::new()),
        }
    }

    /// Whether a trigger for this camera should be processed now.
    /// Admitting a trigger starts (or restarts) the camera's quiet period.
    pub fn should_process(&self, camera_id: &CameraId, override_secs: Option<u64>) -> bool {
        self.check_at(camera_id, override_secs, Instant::now())
    }

    // Deterministic core for tests.
    fn check_at(&self, camera_id: &CameraId, override_secs: Option<u64>, now: Instant) -> bool {
        let cooldown = override_secs
            .map(Duration::from_secs)
            .unwrap_or(self.default_cooldown);

        let mut last = self.last_trigger.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(&previous) = last.get(camera_id) {
            if now.duration_since(previous) < cooldown {
                debug!(camera = %camera_id, "trigger suppressed by cooldown");
                return false;
            }
        }
        last.insert(camera_id.clone(), now);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_trigger_is_admitted_repeat_is_suppressed() {
        let gate = CooldownGate::new(Duration::from_secs(30));
        let camera = CameraId::from("cam-1");
        let t0 = Instant::now();

        assert!(gate.check_at(&camera, None, t0));
        assert!(!gate.check_at(&camera, None, t0 + Duration::from_secs(5)));
        assert!(gate.check_at(&camera, None, t0 + Duration::from_secs(31)));
    }

    #[test]
    fn cameras_cool_down_independently() {
        let gate = CooldownGate::new(Duration::from_secs(30));
        let t0 = Instant::now();

        assert!(gate.check_at(&CameraId::from("a"), None, t0));
        assert!(gate.check_at(&CameraId::from("b"), None, t0));
        assert!(!gate.check_at(&CameraId::from("a"), None, t0 + Duration::from_secs(1)));
    }

    #[test]
    fn per_camera_override_wins_over_default() {
        let gate = CooldownGate::new(Duration::from_secs(30));
        let camera = CameraId::from("fast");
        let t0 = Instant::now();

        assert!(gate.check_at(&camera, Some(3), t0));
        assert!(!gate.check_at(&camera, Some(3), t0 + Duration::from_secs(2)));
        assert!(gate.check_at(&camera, Some(3), t0 + Duration::from_secs(4)));
    }
}
