//! Motion producers.
//!
//! One long-lived task per enabled camera feeds the shared queue. The
//! capture service is the real source; `SimulatedMotionSource` stands in
//! for it in local runs and self-checks.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use haven_models::{CameraId, MotionTrigger, NormalizedPoint};

use crate::processor::EventProcessor;

/// A stream of motion triggers for one camera.
#[async_trait]
pub trait MotionSource: Send + Sync {
    /// The next trigger; `None` means the source ended.
    async fn next_trigger(&self) -> Option<MotionTrigger>;
}

/// Spawn the producer task wiring a motion source into the processor.
pub fn spawn_producer(
    processor: Arc<EventProcessor>,
    source: Arc<dyn MotionSource>,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        break;
                    }
                }
                trigger = source.next_trigger() => {
                    match trigger {
                        Some(trigger) => {
                            let accepted = processor.submit(trigger);
                            if !accepted {
                                debug!("trigger suppressed by cooldown");
                            }
                        }
                        None => break,
                    }
                }
            }
        }
        info!("motion producer stopped");
    })
}

/// Emits a center-frame trigger on a fixed interval. Local runs only.
pub struct SimulatedMotionSource {
    camera_id: CameraId,
    period: Duration,
}

impl SimulatedMotionSource {
    pub fn new(camera_id: CameraId, period: Duration) -> Self {
        Self { camera_id, period }
    }
}

#[async_trait]
impl MotionSource for SimulatedMotionSource {
    async fn next_trigger(&self) -> Option<MotionTrigger> {
        tokio::time::sleep(self.period).await;
        Some(
            MotionTrigger::new(
                self.camera_id.clone(),
                NormalizedPoint::new(0.5, 0.5).into(),
            )
            .with_hints(vec!["person".to_string()]),
        )
    }
}
