//! Entity persistence.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::RwLock;

use haven_models::{EntityEvent, EntityId, RecognizedEntity};

use crate::error::{EntityError, EntityResult};

/// Persistence for recognized entities and their event links.
#[async_trait]
pub trait EntityStore: Send + Sync {
    /// Every entity, for cache (re)builds.
    async fn load_all(&self) -> EntityResult<Vec<RecognizedEntity>>;

    /// Insert a newly created entity.
    async fn insert(&self, entity: RecognizedEntity) -> EntityResult<()>;

    /// Bump occurrence count and last-seen; returns the updated entity.
    async fn record_match(
        &self,
        entity_id: &EntityId,
        at: DateTime<Utc>,
    ) -> EntityResult<RecognizedEntity>;

    /// Create the entity-event join record.
    async fn link_event(&self, link: EntityEvent) -> EntityResult<()>;

    /// Delete an entity; its event links cascade.
    async fn delete(&self, entity_id: &EntityId) -> EntityResult<()>;

    /// Event links for one entity.
    async fn links_for(&self, entity_id: &EntityId) -> EntityResult<Vec<EntityEvent>>;
}

/// In-memory entity store.
#[derive(Debug, Default)]
pub struct InMemoryEntityStore {
    entities: RwLock<HashMap<EntityId, RecognizedEntity>>,
    links: RwLock<Vec<EntityEvent>>,
}

impl InMemoryEntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entity_count(&self) -> usize {
        self.entities.read().unwrap_or_else(|e| e.into_inner()).len()
    }
}

#[async_trait]
impl EntityStore for InMemoryEntityStore {
    async fn load_all(&self) -> EntityResult<Vec<RecognizedEntity>> {
        let entities = self.entities.read().unwrap_or_else(|e| e.into_inner());
        Ok(entities.values().cloned().collect())
    }

    async fn insert(&self, entity: RecognizedEntity) -> EntityResult<()> {
        let mut entities = self.entities.write().unwrap_or_else(|e| e.into_inner());
        entities.insert(entity.id.clone(), entity);
        Ok(())
    }

    async fn record_match(
        &self,
        entity_id: &EntityId,
        at: DateTime<Utc>,
    ) -> EntityResult<RecognizedEntity> {
        let mut entities = self.entities.write().unwrap_or_else(|e| e.into_inner());
        let entity = entities
            .get_mut(entity_id)
            .ok_or_else(|| EntityError::not_found(entity_id.as_str()))?;
        entity.record_sighting(at);
        Ok(entity.clone())
    }

    async fn link_event(&self, link: EntityEvent) -> EntityResult<()> {
        let mut links = self.links.write().unwrap_or_else(|e| e.into_inner());
        links.push(link);
        Ok(())
    }

    async fn delete(&self, entity_id: &EntityId) -> EntityResult<()> {
        let mut entities = self.entities.write().unwrap_or_else(|e| e.into_inner());
        if entities.remove(entity_id).is_none() {
            return Err(EntityError::not_found(entity_id.as_str()));
        }
        let mut links = self.links.write().unwrap_or_else(|e| e.into_inner());
        links.retain(|l| &l.entity_id != entity_id);
        Ok(())
    }

    async fn links_for(&self, entity_id: &EntityId) -> EntityResult<Vec<EntityEvent>> {
        let links = self.links.read().unwrap_or_else(|e| e.into_inner());
        Ok(links
            .iter()
            .filter(|l| &l.entity_id == entity_id)
            .cloned()
            .collect())
    }
}
