//! Analysis results and token accounting.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::fallback::FallbackTrail;
use crate::mode::AnalysisMode;

/// Token counts for one analysis call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct TokenUsage {
    /// Tokens submitted to the provider (prompt + media).
    pub input_tokens: u64,

    /// Tokens in the provider's response.
    pub output_tokens: u64,

    /// True when the provider did not report counts and they were estimated
    /// from frame count and response length.
    pub is_estimated: bool,
}

impl TokenUsage {
    /// Exact counts as reported by the provider.
    pub fn reported(input_tokens: u64, output_tokens: u64) -> Self {
        Self {
            input_tokens,
            output_tokens,
            is_estimated: false,
        }
    }

    /// Estimated counts.
    pub fn estimated(input_tokens: u64, output_tokens: u64) -> Self {
        Self {
            input_tokens,
            output_tokens,
            is_estimated: true,
        }
    }

    pub fn total(&self) -> u64 {
        self.input_tokens + self.output_tokens
    }
}

/// The outcome of one orchestrated analysis run.
///
/// Created once per processing event; immutable once attached to a
/// persisted event record.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AnalysisResult {
    /// Natural-language description of the event.
    pub description: String,

    /// Provider confidence, 0.0-1.0.
    pub confidence: f64,

    /// Detected object labels.
    #[serde(default)]
    pub objects: Vec<String>,

    /// The mode that actually produced the description.
    pub analysis_mode: AnalysisMode,

    /// Frames submitted; Some iff `analysis_mode` is `MultiFrame`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frame_count_used: Option<u32>,

    /// Why higher-fidelity modes were abandoned, in order.
    #[serde(default)]
    pub fallback_trail: FallbackTrail,

    /// Which provider produced the description.
    pub provider: String,

    /// Token counts, reported or estimated.
    pub token_usage: TokenUsage,

    /// Estimated cost of the call in USD.
    pub estimated_cost_usd: f64,

    /// True when every fallback stage failed and the description is a
    /// placeholder.
    #[serde(default)]
    pub degraded: bool,
}

impl AnalysisResult {
    /// Invariant check: frame count is present exactly for multi-frame mode.
    pub fn frame_count_coherent(&self) -> bool {
        match self.analysis_mode {
            AnalysisMode::MultiFrame => self.frame_count_used.is_some(),
            _ => self.frame_count_used.is_none(),
        }
    }

    /// A degraded placeholder result carrying the full trail.
    pub fn degraded(trail: FallbackTrail) -> Self {
        Self {
            description: "Motion detected (analysis unavailable)".to_string(),
            confidence: 0.0,
            objects: Vec::new(),
            analysis_mode: AnalysisMode::SingleFrame,
            frame_count_used: None,
            fallback_trail: trail,
            provider: "none".to_string(),
            token_usage: TokenUsage::default(),
            estimated_cost_usd: 0.0,
            degraded: true,
        }
    }
}
