//! Token and cost accounting.
//!
//! Providers that report token counts get exact cost; the rest are
//! estimated from media volume and text length, flagged `is_estimated`.
//! Both paths share one cost formula.

use haven_models::TokenUsage;

use crate::provider::ReportedTokens;

/// Rough chars-per-token for estimation.
const CHARS_PER_TOKEN: u64 = 4;

/// Per-provider pricing and estimation constants.
#[derive(Debug, Clone, Copy)]
pub struct ProviderRates {
    /// USD per 1K input tokens.
    pub input_per_1k: f64,
    /// USD per 1K output tokens.
    pub output_per_1k: f64,
    /// Estimated tokens one image costs this provider.
    pub tokens_per_image: u64,
    /// Estimated tokens one second of native video costs this provider.
    pub tokens_per_video_sec: u64,
}

/// Media volume of one call, for estimation.
#[derive(Debug, Clone, Copy)]
pub enum MediaUnits {
    Frames(u32),
    VideoSecs(f64),
}

impl MediaUnits {
    fn estimated_tokens(&self, rates: &ProviderRates) -> u64 {
        match *self {
            MediaUnits::Frames(n) => u64::from(n) * rates.tokens_per_image,
            MediaUnits::VideoSecs(secs) => {
                (secs.max(0.0) as u64) * rates.tokens_per_video_sec
            }
        }
    }
}

/// Resolve final token usage and cost for one call.
pub fn finalize_usage(
    reported: Option<ReportedTokens>,
    prompt: &str,
    response_text: &str,
    media: MediaUnits,
    rates: &ProviderRates,
) -> (TokenUsage, f64) {
    let usage = match reported {
        Some(t) => TokenUsage::reported(t.input, t.output),
        None => {
            let input =
                media.estimated_tokens(rates) + prompt.len() as u64 / CHARS_PER_TOKEN;
            let output = response_text.len() as u64 / CHARS_PER_TOKEN;
            TokenUsage::estimated(input, output)
        }
    };
    let cost = cost_usd(&usage, rates);
    (usage, cost)
}

/// The shared cost formula.
pub fn cost_usd(usage: &TokenUsage, rates: &ProviderRates) -> f64 {
    usage.input_tokens as f64 / 1000.0 * rates.input_per_1k
        + usage.output_tokens as f64 / 1000.0 * rates.output_per_1k
}
