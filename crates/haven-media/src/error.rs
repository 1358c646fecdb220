//! Error types for media operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur while probing clips or extracting frames.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("FFmpeg not found in PATH")]
    FfmpegNotFound,

    #[error("FFprobe not found in PATH")]
    FfprobeNotFound,

    #[error("FFmpeg command failed: {message}")]
    FfmpegFailed {
        message: String,
        stderr: Option<String>,
    },

    #[error("FFprobe command failed: {message}")]
    FfprobeFailed {
        message: String,
        stderr: Option<String>,
    },

    #[error("file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("invalid clip: {0}")]
    InvalidClip(String),

    #[error("no clip available for {camera} in the requested range")]
    ClipNotFound { camera: String },

    #[error("frame decode failed: {0}")]
    FrameDecode(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),
}

impl MediaError {
    pub fn ffmpeg_failed(message: impl Into<String>, stderr: Option<String>) -> Self {
        Self::FfmpegFailed {
            message: message.into(),
            stderr,
        }
    }

    pub fn ffprobe_failed(message: impl Into<String>, stderr: Option<String>) -> Self {
        Self::FfprobeFailed {
            message: message.into(),
            stderr,
        }
    }

    pub fn invalid_clip(message: impl Into<String>) -> Self {
        Self::InvalidClip(message.into())
    }

    pub fn clip_not_found(camera: impl Into<String>) -> Self {
        Self::ClipNotFound {
            camera: camera.into(),
        }
    }

    pub fn frame_decode(message: impl Into<String>) -> Self {
        Self::FrameDecode(message.into())
    }

    /// Errors the sampler treats as "this clip is unusable" rather than an
    /// environment problem; they produce an explicit empty sample set.
    pub fn is_clip_fault(&self) -> bool {
        matches!(
            self,
            MediaError::InvalidClip(_)
                | MediaError::FileNotFound(_)
                | MediaError::FfprobeFailed { .. }
                | MediaError::FfmpegFailed { .. }
                | MediaError::FrameDecode(_)
        )
    }
}
