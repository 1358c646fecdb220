//! OpenAI provider client.
//!
//! Uses chat completions with data-URL image parts. No native video
//! support; the orchestrator never routes video calls here.

use base64::Engine;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

use async_trait::async_trait;

use crate::cost::ProviderRates;
use crate::error::{AiError, AiResult};
use crate::provider::{parse_description, AiProvider, ProviderCapabilities, ProviderResponse, ReportedTokens};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// OpenAI API client.
pub struct OpenAiProvider {
    api_key: String,
    model: String,
    base_url: String,
    client: Client,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<Message>,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: String,
}

#[derive(Debug, Serialize)]
struct Message {
    role: String,
    content: Vec<ContentPart>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    prompt_tokens: Option<u64>,
    completion_tokens: Option<u64>,
}

impl OpenAiProvider {
    /// Create a client from `OPENAI_API_KEY`.
    pub fn from_env() -> AiResult<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| AiError::config("OPENAI_API_KEY not set"))?;
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

    async fn data_url(path: &Path) -> AiResult<ContentPart> {
        let bytes = tokio::fs::read(path).await?;
        let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
        Ok(ContentPart::ImageUrl {
            image_url: ImageUrl {
                url: format!("data:image/jpeg;base64,{encoded}"),
            },
        })
    }
}

#[async_trait]
impl AiProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities {
            single_image: true,
            multi_image: true,
            video: false,
            max_images: 8,
            max_video_secs: 0.0,
        }
    }

    fn rates(&self) -> ProviderRates {
        ProviderRates {
            input_per_1k: 0.000_15,
            output_per_1k: 0.000_60,
            tokens_per_image: 85,
            tokens_per_video_sec: 0,
        }
    }

    async fn describe_images(&self, prompt: &str, frames: &[&Path]) -> AiResult<ProviderResponse> {
        let mut content = vec![ContentPart::Text {
            text: prompt.to_string(),
        }];
        for frame in frames {
            content.push(Self::data_url(frame).await?);
        }

        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![Message {
                role: "user".to_string(),
                content,
            }],
            response_format: ResponseFormat {
                format_type: "json_object".to_string(),
            },
        };

        let url = format!("{}/chat/completions", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AiError::provider(
                "openai",
                format!("HTTP {status}: {body}"),
            ));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| AiError::malformed(e.to_string()))?;

        let text = parsed
            .choices
            .first()
            .and_then(|c| c.message.content.as_deref())
            .ok_or_else(|| AiError::malformed("no choices in response"))?;

        let tokens = parsed.usage.and_then(|u| {
            match (u.prompt_tokens, u.completion_tokens) {
                (Some(input), Some(output)) => Some(ReportedTokens { input, output }),
                _ => None,
            }
        });

        debug!(text_len = text.len(), "openai responded");
        Ok(parse_description(text, tokens))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn describe_images_parses_usage() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{
                    "message": {
                        "content": "{\"description\": \"Empty porch\", \"objects\": [], \"confidence\": 0.7}"
                    }
                }],
                "usage": {"prompt_tokens": 500, "completion_tokens": 30}
            })))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.jpg");
        let b = dir.path().join("b.jpg");
        std::fs::write(&a, b"x").unwrap();
        std::fs::write(&b, b"y").unwrap();

        let provider = OpenAiProvider::new("test-key").with_base_url(server.uri());
        let resp = provider
            .describe_images("what happened?", &[a.as_path(), b.as_path()])
            .await
            .unwrap();

        assert_eq!(resp.description, "Empty porch");
        assert_eq!(
            resp.tokens,
            Some(ReportedTokens {
                input: 500,
                output: 30
            })
        );
    }

    #[tokio::test]
    async fn video_is_unsupported() {
        let provider = OpenAiProvider::new("test-key");
        let err = provider
            .describe_video("prompt", Path::new("/tmp/clip.mp4"))
            .await
            .unwrap_err();
        assert!(matches!(err, AiError::Unsupported(_)));
    }

    #[test]
    fn no_video_capability() {
        assert!(!OpenAiProvider::new("k").capabilities().video);
    }
}
