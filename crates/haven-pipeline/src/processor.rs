//! The event processor.
//!
//! Workers pull from the bounded queue and run each event through:
//! zone gate → analysis orchestrator → entity match (best effort) →
//! persist (bounded retries) → notification fan-out. A failing event is
//! logged and counted; it never halts the pool.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use haven_ai::AnalysisOrchestrator;
use haven_entities::{EmbeddingSource, EntityMatcher};
use haven_models::{
    CameraConfig, CameraId, EntityType, EventRecord, MotionTrigger, ProcessingEvent,
};
use haven_zones::ZoneFilter;

use crate::config::PipelineConfig;
use crate::cooldown::CooldownGate;
use crate::error::PipelineResult;
use crate::notify::{fan_out, Notifier};
use crate::queue::EventQueue;
use crate::retry::{retry_with_backoff, RetryConfig};
use crate::store::EventStore;

/// Everything the processor needs, constructed once at startup and passed
/// by reference (no hidden singletons).
pub struct PipelineDeps {
    pub zone_filter: Arc<ZoneFilter>,
    pub orchestrator: Arc<AnalysisOrchestrator>,
    pub matcher: Arc<EntityMatcher>,
    pub embeddings: Option<Arc<dyn EmbeddingSource>>,
    pub event_store: Arc<dyn EventStore>,
    pub notifiers: Vec<Arc<dyn Notifier>>,
    pub cameras: HashMap<CameraId, CameraConfig>,
}

/// The queue + worker pool core.
pub struct EventProcessor {
    config: PipelineConfig,
    queue: Arc<EventQueue>,
    cooldown: CooldownGate,
    deps: PipelineDeps,
    shutdown: watch::Sender<bool>,
}

impl EventProcessor {
    pub fn new(config: PipelineConfig, deps: PipelineDeps) -> Self {
        let config = config.clamped();
        let queue = Arc::new(EventQueue::new(config.queue_capacity));
        let cooldown = CooldownGate::new(config.cooldown);
        let (shutdown, _) = watch::channel(false);
        Self {
            config,
            queue,
            cooldown,
            deps,
            shutdown,
        }
    }

    /// Submit a motion trigger. Returns false when the per-camera cooldown
    /// suppressed it.
    pub fn submit(&self, trigger: MotionTrigger) -> bool {
        let override_secs = self
            .deps
            .cameras
            .get(&trigger.camera_id)
            .and_then(|c| c.cooldown_secs);

        if !self.cooldown.should_process(&trigger.camera_id, override_secs) {
            metrics::counter!("haven_triggers_suppressed_total").increment(1);
            return false;
        }

        self.queue.push(ProcessingEvent::new(trigger));
        true
    }

    /// Run the worker pool until shutdown, then drain within the timeout.
    pub async fn run(self: Arc<Self>) {
        info!(
            workers = self.config.worker_count,
            capacity = self.config.queue_capacity,
            "event processor starting"
        );

        let mut handles = Vec::with_capacity(self.config.worker_count);
        for worker_id in 0..self.config.worker_count {
            let processor = Arc::clone(&self);
            handles.push(tokio::spawn(async move {
                processor.worker_loop(worker_id).await;
            }));
        }

        // Wait for the shutdown signal
        let mut shutdown_rx = self.shutdown.subscribe();
        while !*shutdown_rx.borrow() {
            if shutdown_rx.changed().await.is_err() {
                break;
            }
        }

        info!("shutdown requested, draining in-flight events");
        self.queue.close();

        let deadline = Instant::now() + self.config.shutdown_timeout;
        for mut handle in handles {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if tokio::time::timeout(remaining, &mut handle).await.is_err() {
                handle.abort();
            }
        }

        // Anything still queued past the timeout is dropped with a trace
        for event in self.queue.drain() {
            warn!(
                camera = %event.camera_id(),
                timestamp = %event.trigger.detected_at,
                "event dropped during shutdown"
            );
        }

        info!("event processor stopped");
    }

    /// Signal shutdown.
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(true);
    }

    /// Queue depth, for health endpoints and tests.
    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    async fn worker_loop(&self, worker_id: usize) {
        info!(worker_id, "worker started");
        while let Some(event) = self.queue.pop().await {
            metrics::gauge!("haven_queue_depth").set(self.queue.len() as f64);
            if let Err(e) = self.process_event(event).await {
                // One failure never halts the pool
                error!(worker_id, error = %e, "event processing failed");
                metrics::counter!("haven_events_failed_total").increment(1);
            }
        }
        info!(worker_id, "worker stopped");
    }

    async fn process_event(&self, mut event: ProcessingEvent) -> PipelineResult<()> {
        let started = Instant::now();

        let Some(camera) = self.deps.cameras.get(event.camera_id()) else {
            warn!(camera = %event.camera_id(), "trigger for unknown camera, dropping");
            return Ok(());
        };

        // 1. Zone gate: outside means silent drop, no event record
        let outcome = self
            .deps
            .zone_filter
            .evaluate(&camera.id, &event.trigger.location)
            .await;
        event.zone_outcome = Some(outcome);
        if !outcome.allows_event() {
            debug!(camera = %camera.id, "motion outside enabled zones, dropped");
            metrics::counter!("haven_events_zone_filtered_total").increment(1);
            return Ok(());
        }

        // 2. Analysis (never fails outward; worst case is a degraded result)
        let analysis = self
            .deps
            .orchestrator
            .analyze(camera, &event.trigger)
            .await;

        let mut record = EventRecord::new(
            camera.id.clone(),
            event.trigger.detected_at,
            analysis,
            outcome,
        );

        // 3. Entity match, best effort: a Skipped outcome leaves the event
        // unlinked and the pipeline moving
        if let Some(embeddings) = &self.deps.embeddings {
            let entity_type = entity_type_from_hints(&event.trigger.object_hints);
            let match_outcome = self
                .deps
                .matcher
                .match_event(&record.id, embeddings.as_ref(), entity_type)
                .await;
            if let Some(entity_id) = match_outcome.entity_id() {
                record.matched_entity = Some(entity_id.clone());
            }
        }

        // 4. Persist with bounded backoff; exhaustion fails the event
        // without resubmitting it
        let retry = RetryConfig::new("create_event")
            .with_max_retries(self.config.persist_max_retries)
            .with_base_delay(self.config.persist_base_delay);
        let store = &self.deps.event_store;
        if let Err(e) = retry_with_backoff(&retry, || async { store.create_event(&record).await }).await
        {
            record.mark_failed();
            error!(
                event = %record.id,
                camera = %camera.id,
                status = record.status.as_str(),
                error = %e,
                "event persistence exhausted retries"
            );
            return Err(e);
        }

        // 5. Fire-and-forget notifications
        fan_out(&self.deps.notifiers, &record);

        metrics::counter!("haven_events_processed_total").increment(1);
        metrics::histogram!("haven_event_latency_seconds").record(started.elapsed().as_secs_f64());
        info!(
            event = %record.id,
            camera = %camera.id,
            mode = record.analysis.analysis_mode.as_str(),
            latency_ms = started.elapsed().as_millis() as u64,
            "event persisted"
        );
        Ok(())
    }
}

/// Map detector hints onto an entity type.
fn entity_type_from_hints(hints: &[String]) -> EntityType {
    for hint in hints {
        match hint.to_ascii_lowercase().as_str() {
            "person" | "people" | "face" => return EntityType::Person,
            "vehicle" | "car" | "truck" | "motorcycle" | "bicycle" => return EntityType::Vehicle,
            _ => {}
        }
    }
    EntityType::Unknown
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hints_map_to_entity_types() {
        assert_eq!(
            entity_type_from_hints(&["person".to_string()]),
            EntityType::Person
        );
        assert_eq!(
            entity_type_from_hints(&["Car".to_string()]),
            EntityType::Vehicle
        );
        assert_eq!(
            entity_type_from_hints(&["raccoon".to_string()]),
            EntityType::Unknown
        );
        assert_eq!(entity_type_from_hints(&[]), EntityType::Unknown);
    }
}
