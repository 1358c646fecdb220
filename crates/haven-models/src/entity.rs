//! Recognized entities and their event links.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::ids::{EntityId, EventId};

/// What kind of recurring visitor an entity represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Person,
    Vehicle,
    #[default]
    Unknown,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Person => "person",
            EntityType::Vehicle => "vehicle",
            EntityType::Unknown => "unknown",
        }
    }
}

/// A recurring visitor identified by embedding-similarity clustering.
///
/// Created on first unmatched sighting; occurrence count and last-seen
/// update on every later match. Entities are never deleted automatically.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RecognizedEntity {
    pub id: EntityId,

    pub entity_type: EntityType,

    /// User-assigned name, if the operator labeled this entity.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Reference embedding all future sightings are compared against.
    pub reference_embedding: Vec<f32>,

    pub first_seen: DateTime<Utc>,

    pub last_seen: DateTime<Utc>,

    /// Number of events matched to this entity, including the first.
    pub occurrence_count: u64,
}

impl RecognizedEntity {
    /// Create a brand-new entity from its first sighting.
    pub fn from_first_sighting(entity_type: EntityType, embedding: Vec<f32>) -> Self {
        let now = Utc::now();
        Self {
            id: EntityId::new(),
            entity_type,
            name: None,
            reference_embedding: embedding,
            first_seen: now,
            last_seen: now,
            occurrence_count: 1,
        }
    }

    /// Record a new sighting: bump the count and last-seen timestamp.
    pub fn record_sighting(&mut self, at: DateTime<Utc>) {
        self.occurrence_count += 1;
        self.last_seen = at;
    }
}

/// Join record linking an entity to an event.
///
/// Created exactly once per event that matched or created an entity;
/// removed when the entity is deleted.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct EntityEvent {
    pub entity_id: EntityId,

    pub event_id: EventId,

    /// Cosine similarity at match time; 1.0 for the creating event.
    pub similarity: f64,

    pub created_at: DateTime<Utc>,
}

impl EntityEvent {
    pub fn new(entity_id: EntityId, event_id: EventId, similarity: f64) -> Self {
        Self {
            entity_id,
            event_id,
            similarity,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_sighting_counts_once() {
        let entity = RecognizedEntity::from_first_sighting(EntityType::Person, vec![0.1, 0.2]);
        assert_eq!(entity.occurrence_count, 1);
        assert_eq!(entity.first_seen, entity.last_seen);
    }

    #[test]
    fn record_sighting_bumps_count_and_last_seen() {
        let mut entity = RecognizedEntity::from_first_sighting(EntityType::Vehicle, vec![1.0]);
        let later = entity.first_seen + chrono::Duration::minutes(5);
        entity.record_sighting(later);
        assert_eq!(entity.occurrence_count, 2);
        assert_eq!(entity.last_seen, later);
        assert!(entity.first_seen < entity.last_seen);
    }
}
