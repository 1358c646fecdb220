//! Gemini provider client.
//!
//! Submits frames or whole clips as inline base64 parts and asks for a
//! JSON-shaped description.

use base64::Engine;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

use async_trait::async_trait;

use crate::cost::ProviderRates;
use crate::error::{AiError, AiResult};
use crate::provider::{parse_description, AiProvider, ProviderCapabilities, ProviderResponse, ReportedTokens};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// Gemini API client.
pub struct GeminiProvider {
    api_key: String,
    model: String,
    base_url: String,
    client: Client,
}

#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part {
    Text {
        text: String,
    },
    Inline {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

#[derive(Debug, Serialize)]
struct InlineData {
    #[serde(rename = "mimeType")]
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    #[serde(rename = "responseMimeType")]
    response_mime_type: String,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    candidates: Vec<Candidate>,
    #[serde(rename = "usageMetadata")]
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: ResponseContent,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: String,
}

#[derive(Debug, Deserialize)]
struct UsageMetadata {
    #[serde(rename = "promptTokenCount")]
    prompt_token_count: Option<u64>,
    #[serde(rename = "candidatesTokenCount")]
    candidates_token_count: Option<u64>,
}

impl GeminiProvider {
    /// Create a client from `GEMINI_API_KEY`.
    pub fn from_env() -> AiResult<Self> {
        let api_key = std::env::var("GEMINI_API_KEY")
            .map_err(|_| AiError::config("GEMINI_API_KEY not set"))?;
        Ok(Self::new(api_key))
    }

    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            client: Client::new(),
        }
    }

    /// Override the model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Override the API base URL (tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn generate(&self, parts: Vec<Part>) -> AiResult<ProviderResponse> {
        let request = GeminiRequest {
            contents: vec![Content { parts }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json".to_string(),
            },
        };

        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );

        let response = self.client.post(&url).json(&request).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AiError::provider(
                "gemini",
                format!("HTTP {status}: {body}"),
            ));
        }

        let parsed: GeminiResponse = response
            .json()
            .await
            .map_err(|e| AiError::malformed(e.to_string()))?;

        let text = parsed
            .candidates
            .first()
            .and_then(|c| c.content.parts.first())
            .map(|p| p.text.as_str())
            .ok_or_else(|| AiError::malformed("no candidates in response"))?;

        let tokens = parsed.usage_metadata.and_then(|u| {
            match (u.prompt_token_count, u.candidates_token_count) {
                (Some(input), Some(output)) => Some(ReportedTokens { input, output }),
                _ => None,
            }
        });

        debug!(text_len = text.len(), "gemini responded");
        Ok(parse_description(text, tokens))
    }

    async fn inline_file(path: &Path, mime_type: &str) -> AiResult<Part> {
        let bytes = tokio::fs::read(path).await?;
        Ok(Part::Inline {
            inline_data: InlineData {
                mime_type: mime_type.to_string(),
                data: base64::engine::general_purpose::STANDARD.encode(bytes),
            },
        })
    }
}

#[async_trait]
impl AiProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities {
            single_image: true,
            multi_image: true,
            video: true,
            max_images: 16,
            max_video_secs: 60.0,
        }
    }

    fn rates(&self) -> ProviderRates {
        ProviderRates {
            input_per_1k: 0.000_10,
            output_per_1k: 0.000_40,
            tokens_per_image: 258,
            tokens_per_video_sec: 300,
        }
    }

    async fn describe_images(&self, prompt: &str, frames: &[&Path]) -> AiResult<ProviderResponse> {
        let mut parts = vec![Part::Text {
            text: prompt.to_string(),
        }];
        for frame in frames {
            parts.push(Self::inline_file(frame, "image/jpeg").await?);
        }
        self.generate(parts).await
    }

    async fn describe_video(&self, prompt: &str, clip: &Path) -> AiResult<ProviderResponse> {
        let parts = vec![
            Part::Text {
                text: prompt.to_string(),
            },
            Self::inline_file(clip, "video/mp4").await?,
        ];
        self.generate(parts).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path_regex};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn success_body() -> serde_json::Value {
        serde_json::json!({
            "candidates": [{
                "content": {
                    "parts": [{
                        "text": "{\"description\": \"A delivery driver drops a package\", \"objects\": [\"person\", \"package\"], \"confidence\": 0.9}"
                    }]
                }
            }],
            "usageMetadata": {
                "promptTokenCount": 1200,
                "candidatesTokenCount": 60
            }
        })
    }

    #[tokio::test]
    async fn describe_image_parses_structured_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path_regex(r"^/models/.*:generateContent$"))
            .respond_with(ResponseTemplate::new(200).set_body_json(success_body()))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let frame = dir.path().join("frame.jpg");
        std::fs::write(&frame, b"\xff\xd8\xff\xe0fake").unwrap();

        let provider = GeminiProvider::new("test-key").with_base_url(server.uri());
        let resp = provider.describe_image("what happened?", &frame).await.unwrap();

        assert_eq!(resp.description, "A delivery driver drops a package");
        assert_eq!(resp.objects, vec!["person", "package"]);
        assert_eq!(
            resp.tokens,
            Some(ReportedTokens {
                input: 1200,
                output: 60
            })
        );
    }

    #[tokio::test]
    async fn http_error_is_a_provider_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path_regex(r"^/models/.*:generateContent$"))
            .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let frame = dir.path().join("frame.jpg");
        std::fs::write(&frame, b"fake").unwrap();

        let provider = GeminiProvider::new("test-key").with_base_url(server.uri());
        let err = provider.describe_image("prompt", &frame).await.unwrap_err();
        assert!(matches!(err, AiError::Provider { .. }));
    }

    #[tokio::test]
    async fn empty_candidates_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path_regex(r"^/models/.*:generateContent$"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"candidates": []})),
            )
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let frame = dir.path().join("frame.jpg");
        std::fs::write(&frame, b"fake").unwrap();

        let provider = GeminiProvider::new("test-key").with_base_url(server.uri());
        let err = provider.describe_image("prompt", &frame).await.unwrap_err();
        assert!(matches!(err, AiError::MalformedResponse(_)));
    }

    #[test]
    fn capabilities_include_video() {
        let provider = GeminiProvider::new("k");
        let caps = provider.capabilities();
        assert!(caps.video && caps.multi_image && caps.single_image);
    }
}
