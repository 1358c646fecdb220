//! Analysis mode definitions.
//!
//! The mode is the fidelity level of AI description generation:
//!
//! - `VideoNative`: submit the motion clip itself (highest fidelity)
//! - `MultiFrame`: submit a sampled frame sequence
//! - `SingleFrame`: submit the camera snapshot (terminal fallback)

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Analysis mode for AI description generation.
///
/// Modes form an ordered fallback chain; each failed mode advances to the
/// next lower one until `SingleFrame`, which is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisMode {
    /// Single snapshot analysis. Cheapest, always available.
    #[default]
    SingleFrame,

    /// Sampled frame-sequence analysis.
    MultiFrame,

    /// Native video clip analysis. Requires a clip-capable camera.
    VideoNative,
}

impl AnalysisMode {
    /// All modes, highest fidelity first (the fallback order).
    pub const FALLBACK_ORDER: &'static [AnalysisMode] = &[
        AnalysisMode::VideoNative,
        AnalysisMode::MultiFrame,
        AnalysisMode::SingleFrame,
    ];

    /// Returns the mode name as used in storage and fallback trails.
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisMode::SingleFrame => "single_frame",
            AnalysisMode::MultiFrame => "multi_frame",
            AnalysisMode::VideoNative => "video_native",
        }
    }

    /// The next lower mode in the fallback chain, if any.
    pub fn next_fallback(&self) -> Option<AnalysisMode> {
        match self {
            AnalysisMode::VideoNative => Some(AnalysisMode::MultiFrame),
            AnalysisMode::MultiFrame => Some(AnalysisMode::SingleFrame),
            AnalysisMode::SingleFrame => None,
        }
    }

    /// Returns true if this mode requires a clip source.
    pub fn needs_clip(&self) -> bool {
        matches!(self, AnalysisMode::VideoNative | AnalysisMode::MultiFrame)
    }

    /// Returns true if this is the terminal fallback mode.
    pub fn is_terminal(&self) -> bool {
        matches!(self, AnalysisMode::SingleFrame)
    }
}

impl fmt::Display for AnalysisMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
