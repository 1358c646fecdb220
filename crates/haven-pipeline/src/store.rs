//! Event persistence.

use async_trait::async_trait;
use std::sync::RwLock;

use haven_models::EventRecord;

use crate::error::PipelineResult;

/// The external event storage API.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Persist one event record.
    async fn create_event(&self, event: &EventRecord) -> PipelineResult<()>;
}

/// In-memory event store.
#[derive(Debug, Default)]
pub struct InMemoryEventStore {
    events: RwLock<Vec<EventRecord>>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<EventRecord> {
        self.events.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn count(&self) -> usize {
        self.events.read().unwrap_or_else(|e| e.into_inner()).len()
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn create_event(&self, event: &EventRecord) -> PipelineResult<()> {
        let mut events = self.events.write().unwrap_or_else(|e| e.into_inner());
        events.push(event.clone());
        Ok(())
    }
}
