//! Clip probing and frame sampling.
//!
//! This crate provides:
//! - FFprobe clip information
//! - Single-frame FFmpeg extraction at chosen timestamps
//! - Three sampling strategies (uniform, adaptive, hybrid)
//! - Blur/quality filtering so unusable frames never reach the AI layer
//! - The `ClipSource` trait with a spool-directory implementation

pub mod clip_source;
pub mod error;
pub mod extract;
pub mod probe;
pub mod quality;
pub mod sampler;

pub use clip_source::{ClipRequest, ClipSource, SpoolClipSource};
pub use error::{MediaError, MediaResult};
pub use extract::extract_frame;
pub use probe::{probe_clip, ClipInfo};
pub use quality::{frame_difference, sharpness_score};
pub use sampler::{FrameSampler, SampledFrame, SamplerConfig, SamplingStrategy};
