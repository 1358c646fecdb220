//! Entity error types.

use thiserror::Error;

pub type EntityResult<T> = Result<T, EntityError>;

#[derive(Debug, Error)]
pub enum EntityError {
    #[error("entity not found: {0}")]
    NotFound(String),

    #[error("embedding service unavailable: {0}")]
    EmbeddingUnavailable(String),

    #[error("store error: {0}")]
    Store(String),
}

impl EntityError {
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound(id.into())
    }

    pub fn embedding_unavailable(msg: impl Into<String>) -> Self {
        Self::EmbeddingUnavailable(msg.into())
    }

    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }
}
