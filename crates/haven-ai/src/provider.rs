//! The AI provider abstraction.

use async_trait::async_trait;
use std::path::Path;

use crate::cost::ProviderRates;
use crate::error::{AiError, AiResult};

/// What a provider can accept per mode.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProviderCapabilities {
    pub single_image: bool,
    pub multi_image: bool,
    pub video: bool,
    /// Most images one multi-image call may carry.
    pub max_images: usize,
    /// Longest clip (seconds) a video call may carry.
    pub max_video_secs: f64,
}

/// Token counts as reported by a provider, when it reports them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportedTokens {
    pub input: u64,
    pub output: u64,
}

/// A provider's answer to one describe call.
#[derive(Debug, Clone)]
pub struct ProviderResponse {
    /// Natural-language description of the scene.
    pub description: String,
    /// Detected object labels, possibly empty.
    pub objects: Vec<String>,
    /// Provider confidence, 0.0-1.0.
    pub confidence: f64,
    /// Reported token usage; None means the orchestrator estimates.
    pub tokens: Option<ReportedTokens>,
}

/// One AI vendor client.
///
/// Implementations declare their capability set; the orchestrator only
/// routes calls a provider declared support for.
#[async_trait]
pub trait AiProvider: Send + Sync {
    /// Stable provider identifier ("gemini", "openai").
    fn name(&self) -> &str;

    fn capabilities(&self) -> ProviderCapabilities;

    /// Pricing and estimation constants for this provider.
    fn rates(&self) -> ProviderRates;

    /// Describe a frame sequence (one or more images, in order).
    async fn describe_images(&self, prompt: &str, frames: &[&Path]) -> AiResult<ProviderResponse>;

    /// Describe a single snapshot. Defaults to a one-image sequence call.
    async fn describe_image(&self, prompt: &str, frame: &Path) -> AiResult<ProviderResponse> {
        self.describe_images(prompt, &[frame]).await
    }

    /// Describe a native video clip. Providers without video capability
    /// keep the default.
    async fn describe_video(&self, _prompt: &str, _clip: &Path) -> AiResult<ProviderResponse> {
        Err(AiError::Unsupported("native video"))
    }
}

/// The JSON shape providers are prompted to answer with.
///
/// Both clients ask for a JSON object; when a provider answers with plain
/// prose anyway, the raw text becomes the description.
#[derive(Debug, serde::Deserialize)]
pub(crate) struct StructuredDescription {
    pub description: String,
    #[serde(default)]
    pub objects: Vec<String>,
    #[serde(default = "default_confidence")]
    pub confidence: f64,
}

fn default_confidence() -> f64 {
    0.5
}

pub(crate) fn parse_description(text: &str, tokens: Option<ReportedTokens>) -> ProviderResponse {
    match serde_json::from_str::<StructuredDescription>(text.trim()) {
        Ok(parsed) => ProviderResponse {
            description: parsed.description,
            objects: parsed.objects,
            confidence: parsed.confidence.clamp(0.0, 1.0),
            tokens,
        },
        Err(_) => ProviderResponse {
            description: text.trim().to_string(),
            objects: Vec::new(),
            confidence: 0.5,
            tokens,
        },
    }
}
