//! The entity matcher.
//!
//! Clusters event embeddings into recurring entities: the new embedding is
//! compared against every cached reference vector; the best score at or
//! above the threshold links the event to that entity, anything else mints
//! a new one. The cache is rebuilt (swap-on-write) after create/delete so
//! concurrent readers never see a half-built list.

use chrono::Utc;
use std::sync::{Arc, RwLock};
use tracing::{debug, info, warn};

use haven_models::{EntityEvent, EntityId, EntityType, EventId, RecognizedEntity};

use crate::embedding::EmbeddingSource;
use crate::error::EntityResult;
use crate::similarity::best_match;
use crate::store::EntityStore;

/// Default similarity threshold for a match.
pub const DEFAULT_THRESHOLD: f64 = 0.75;

/// Matcher tuning.
#[derive(Debug, Clone)]
pub struct MatcherConfig {
    /// Minimum cosine similarity to count as the same entity.
    pub threshold: f64,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

/// What `match_or_create` decided.
#[derive(Debug, Clone)]
pub enum MatchOutcome {
    /// Linked to an existing entity.
    Matched {
        entity: RecognizedEntity,
        similarity: f64,
    },
    /// No candidate cleared the threshold; a new entity was created.
    Created { entity: RecognizedEntity },
    /// Matching was not attempted (embedding service down, store error).
    Skipped { reason: String },
}

impl MatchOutcome {
    pub fn entity_id(&self) -> Option<&EntityId> {
        match self {
            MatchOutcome::Matched { entity, .. } | MatchOutcome::Created { entity } => {
                Some(&entity.id)
            }
            MatchOutcome::Skipped { .. } => None,
        }
    }

    /// True when this outcome minted a new entity.
    pub fn is_new(&self) -> bool {
        matches!(self, MatchOutcome::Created { .. })
    }

    pub fn similarity(&self) -> Option<f64> {
        match self {
            MatchOutcome::Matched { similarity, .. } => Some(*similarity),
            MatchOutcome::Created { .. } => Some(1.0),
            MatchOutcome::Skipped { .. } => None,
        }
    }
}

// Cache rows carry only what scoring needs.
struct CachedEntity {
    id: EntityId,
    embedding: Vec<f32>,
}

/// Matches event embeddings to recurring entities.
pub struct EntityMatcher {
    store: Arc<dyn EntityStore>,
    config: MatcherConfig,
    // None = cold; rebuilt lazily after invalidation
    cache: RwLock<Option<Arc<Vec<CachedEntity>>>>,
}

impl EntityMatcher {
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self::with_config(store, MatcherConfig::default())
    }

    pub fn with_config(store: Arc<dyn EntityStore>, config: MatcherConfig) -> Self {
        Self {
            store,
            config,
            cache: RwLock::new(None),
        }
    }

    /// Match the embedding to an entity or create one.
    ///
    /// Store errors propagate; the pipeline wraps this call and degrades to
    /// `Skipped` so matching never blocks event processing.
    pub async fn match_or_create(
        &self,
        event_id: &EventId,
        embedding: &[f32],
        entity_type: EntityType,
    ) -> EntityResult<MatchOutcome> {
        let cache = self.cached_entities().await?;

        let best = best_match(cache.iter().map(|c| c.embedding.as_slice()), embedding);

        if let Some((idx, similarity)) = best {
            if similarity >= self.config.threshold {
                let entity_id = cache[idx].id.clone();
                let now = Utc::now();
                let entity = self.store.record_match(&entity_id, now).await?;
                self.store
                    .link_event(EntityEvent::new(entity_id.clone(), event_id.clone(), similarity))
                    .await?;
                debug!(entity = %entity_id, similarity, "event matched existing entity");
                return Ok(MatchOutcome::Matched { entity, similarity });
            }
        }

        // Nothing cleared the threshold (or no entities exist yet)
        let entity = RecognizedEntity::from_first_sighting(entity_type, embedding.to_vec());
        self.store.insert(entity.clone()).await?;
        self.store
            .link_event(EntityEvent::new(entity.id.clone(), event_id.clone(), 1.0))
            .await?;
        self.invalidate();
        info!(entity = %entity.id, entity_type = entity_type.as_str(), "new entity created");
        Ok(MatchOutcome::Created { entity })
    }

    /// Fetch the embedding and match, swallowing every failure into
    /// `Skipped` so the event proceeds unlinked.
    pub async fn match_event(
        &self,
        event_id: &EventId,
        embeddings: &dyn EmbeddingSource,
        entity_type: EntityType,
    ) -> MatchOutcome {
        let embedding = match embeddings.get_embedding(event_id).await {
            Ok(embedding) => embedding,
            Err(e) => {
                warn!(event = %event_id, error = %e, "embedding unavailable, skipping entity match");
                return MatchOutcome::Skipped {
                    reason: e.to_string(),
                };
            }
        };

        match self.match_or_create(event_id, &embedding, entity_type).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(event = %event_id, error = %e, "entity matching failed, event left unlinked");
                MatchOutcome::Skipped {
                    reason: e.to_string(),
                }
            }
        }
    }

    /// Delete an entity (cascades links) and invalidate the cache.
    pub async fn delete_entity(&self, entity_id: &EntityId) -> EntityResult<()> {
        self.store.delete(entity_id).await?;
        self.invalidate();
        Ok(())
    }

    /// Drop the cached reference vectors; the next match reloads.
    pub fn invalidate(&self) {
        let mut cache = self.cache.write().unwrap_or_else(|e| e.into_inner());
        *cache = None;
    }

    async fn cached_entities(&self) -> EntityResult<Arc<Vec<CachedEntity>>> {
        {
            let cache = self.cache.read().unwrap_or_else(|e| e.into_inner());
            if let Some(entities) = cache.as_ref() {
                return Ok(Arc::clone(entities));
            }
        }

        let entities = self.store.load_all().await?;
        let cached: Vec<CachedEntity> = entities
            .into_iter()
            .map(|e| CachedEntity {
                id: e.id,
                embedding: e.reference_embedding,
            })
            .collect();
        let cached = Arc::new(cached);

        let mut cache = self.cache.write().unwrap_or_else(|e| e.into_inner());
        *cache = Some(Arc::clone(&cached));
        Ok(cached)
    }
}
