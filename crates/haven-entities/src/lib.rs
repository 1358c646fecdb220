//! Entity matching for the Haven pipeline.
//!
//! This crate provides:
//! - Batched cosine similarity over cached reference embeddings
//! - `match_or_create`: link an event to the best entity above threshold,
//!   or mint a new entity from its embedding
//! - The `EntityStore` and `EmbeddingSource` traits with in-memory
//!   implementations for tests and single-process deployments

pub mod embedding;
pub mod error;
pub mod matcher;
pub mod similarity;
pub mod store;

pub use embedding::{EmbeddingSource, HttpEmbeddingSource};
pub use error::{EntityError, EntityResult};
pub use matcher::{EntityMatcher, MatchOutcome, MatcherConfig};
pub use similarity::{best_match, cosine_similarity};
pub use store::{EntityStore, InMemoryEntityStore};
