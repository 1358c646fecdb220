//! Embedding retrieval.
//!
//! The embedding model lives with the external ML service; the matcher only
//! consumes its vectors. Unavailability must never block event processing.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use haven_models::EventId;

use crate::error::{EntityError, EntityResult};

/// Supplies the embedding vector for a persisted event.
#[async_trait]
pub trait EmbeddingSource: Send + Sync {
    async fn get_embedding(&self, event_id: &EventId) -> EntityResult<Vec<f32>>;
}

/// HTTP client for the embedding service.
///
/// `GET {base}/embeddings/{event_id}` returning `{"embedding": [f32, ...]}`.
pub struct HttpEmbeddingSource {
    base_url: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

impl HttpEmbeddingSource {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl EmbeddingSource for HttpEmbeddingSource {
    async fn get_embedding(&self, event_id: &EventId) -> EntityResult<Vec<f32>> {
        let url = format!("{}/embeddings/{}", self.base_url, event_id);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| EntityError::embedding_unavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(EntityError::embedding_unavailable(format!(
                "HTTP {} from embedding service",
                response.status()
            )));
        }

        let parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| EntityError::embedding_unavailable(e.to_string()))?;

        if parsed.embedding.is_empty() {
            return Err(EntityError::embedding_unavailable("empty embedding"));
        }

        debug!(event = %event_id, dims = parsed.embedding.len(), "embedding fetched");
        Ok(parsed.embedding)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path_regex};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn fetches_embedding_vector() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path_regex(r"^/embeddings/.+$"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "embedding": [0.1, 0.2, 0.3]
            })))
            .mount(&server)
            .await;

        let source = HttpEmbeddingSource::new(server.uri());
        let embedding = source.get_embedding(&EventId::new()).await.unwrap();
        assert_eq!(embedding, vec![0.1, 0.2, 0.3]);
    }

    #[tokio::test]
    async fn service_outage_is_embedding_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path_regex(r"^/embeddings/.+$"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let source = HttpEmbeddingSource::new(server.uri());
        let err = source.get_embedding(&EventId::new()).await.unwrap_err();
        assert!(matches!(err, EntityError::EmbeddingUnavailable(_)));
    }
}
