//! Notification fan-out.
//!
//! Bridges (MQTT, HomeKit, WebSocket, push) get a fire-and-forget "event
//! created" call. Each notification runs as its own task with a completion
//! log; failures are caught there and never travel back into the pipeline.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

use haven_models::EventRecord;

use crate::error::PipelineResult;

/// One external notification bridge.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Bridge name for logs ("mqtt", "homekit", "push").
    fn name(&self) -> &str;

    async fn notify(&self, event: &EventRecord) -> PipelineResult<()>;
}

/// Spawn one supervised task per notifier. Returns immediately; completion
/// and failure are logged from the tasks.
pub fn fan_out(notifiers: &[Arc<dyn Notifier>], event: &EventRecord) {
    for notifier in notifiers {
        let notifier = Arc::clone(notifier);
        let event = event.clone();
        tokio::spawn(async move {
            match notifier.notify(&event).await {
                Ok(()) => debug!(notifier = notifier.name(), event = %event.id, "notification delivered"),
                Err(e) => {
                    warn!(notifier = notifier.name(), event = %event.id, error = %e, "notification failed");
                    metrics::counter!(
                        "haven_notifications_failed_total",
                        "notifier" => notifier.name().to_string()
                    )
                    .increment(1);
                }
            }
        });
    }
}

/// Notifier that just logs the event; the default bridge in dev setups.
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    fn name(&self) -> &str {
        "log"
    }

    async fn notify(&self, event: &EventRecord) -> PipelineResult<()> {
        info!(
            event = %event.id,
            camera = %event.camera_id,
            mode = event.analysis.analysis_mode.as_str(),
            description = %event.analysis.description,
            "event created"
        );
        Ok(())
    }
}
