//! Fallback trail records.
//!
//! Every time the analysis orchestrator abandons a mode it records a
//! `FallbackRecord { stage, cause }`. The records stay typed inside the
//! pipeline; the delimited `"{mode}:{cause}"` string form exists only at
//! the storage boundary so operators can inspect persisted events.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::mode::AnalysisMode;

/// Why a mode was abandoned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum FallbackCause {
    /// The camera has no clip source for this mode.
    NoClipSource,
    /// Clip download failed or the clip was unreadable.
    ClipDownloadFailed,
    /// A provider call exceeded its timeout.
    Timeout,
    /// Every capable provider failed for this mode.
    AllProvidersFailed,
    /// Frame sampling produced zero usable frames.
    FrameExtractionFailed,
    /// The provider returned an error for the submitted frames.
    AiFailed,
    /// No snapshot exists for the terminal single-frame stage.
    SnapshotUnavailable,
}

impl FallbackCause {
    pub fn as_str(&self) -> &'static str {
        match self {
            FallbackCause::NoClipSource => "no_clip_source",
            FallbackCause::ClipDownloadFailed => "clip_download_failed",
            FallbackCause::Timeout => "timeout",
            FallbackCause::AllProvidersFailed => "all_providers_failed",
            FallbackCause::FrameExtractionFailed => "frame_extraction_failed",
            FallbackCause::AiFailed => "ai_failed",
            FallbackCause::SnapshotUnavailable => "snapshot_unavailable",
        }
    }

    fn from_str(s: &str) -> Option<Self> {
        match s {
            "no_clip_source" => Some(FallbackCause::NoClipSource),
            "clip_download_failed" => Some(FallbackCause::ClipDownloadFailed),
            "timeout" => Some(FallbackCause::Timeout),
            "all_providers_failed" => Some(FallbackCause::AllProvidersFailed),
            "frame_extraction_failed" => Some(FallbackCause::FrameExtractionFailed),
            "ai_failed" => Some(FallbackCause::AiFailed),
            "snapshot_unavailable" => Some(FallbackCause::SnapshotUnavailable),
            _ => None,
        }
    }
}

/// One abandoned analysis stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct FallbackRecord {
    /// The mode that was abandoned.
    pub stage: AnalysisMode,
    /// Why it was abandoned.
    pub cause: FallbackCause,
}

impl FallbackRecord {
    pub fn new(stage: AnalysisMode, cause: FallbackCause) -> Self {
        Self { stage, cause }
    }
}

impl fmt::Display for FallbackRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.stage.as_str(), self.cause.as_str())
    }
}

/// Error parsing a stored fallback trail string.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TrailParseError {
    #[error("malformed trail segment: {0}")]
    MalformedSegment(String),

    #[error("unknown analysis mode: {0}")]
    UnknownMode(String),

    #[error("unknown fallback cause: {0}")]
    UnknownCause(String),
}

/// Ordered list of fallback records for one event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct FallbackTrail(Vec<FallbackRecord>);

impl FallbackTrail {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Append a record to the trail.
    pub fn push(&mut self, stage: AnalysisMode, cause: FallbackCause) {
        self.0.push(FallbackRecord::new(stage, cause));
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn records(&self) -> &[FallbackRecord] {
        &self.0
    }

    /// Returns true if any record belongs to the given stage.
    pub fn has_stage(&self, stage: AnalysisMode) -> bool {
        self.0.iter().any(|r| r.stage == stage)
    }

    /// Serialize for storage: comma-delimited `"{mode}:{cause}"` segments.
    ///
    /// Empty trails store as `None` so the column stays null for events
    /// that succeeded first try.
    pub fn to_storage_string(&self) -> Option<String> {
        if self.0.is_empty() {
            return None;
        }
        Some(
            self.0
                .iter()
                .map(|r| r.to_string())
                .collect::<Vec<_>>()
                .join(","),
        )
    }

    /// Parse the storage form back into typed records.
    pub fn parse_storage_string(s: &str) -> Result<Self, TrailParseError> {
        let mut records = Vec::new();
        for segment in s.split(',').filter(|s| !s.is_empty()) {
            let (mode, cause) = segment
                .split_once(':')
                .ok_or_else(|| TrailParseError::MalformedSegment(segment.to_string()))?;
            let stage = match mode {
                "single_frame" => AnalysisMode::SingleFrame,
                "multi_frame" => AnalysisMode::MultiFrame,
                "video_native" => AnalysisMode::VideoNative,
                other => return Err(TrailParseError::UnknownMode(other.to_string())),
            };
            let cause = FallbackCause::from_str(cause)
                .ok_or_else(|| TrailParseError::UnknownCause(cause.to_string()))?;
            records.push(FallbackRecord::new(stage, cause));
        }
        Ok(Self(records))
    }
}

impl fmt::Display for FallbackTrail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_storage_string().unwrap_or_default())
    }
}
