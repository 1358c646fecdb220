//! Clip retrieval.
//!
//! The capture service owns clip recording; the pipeline only asks for "the
//! clip covering this camera and time range". `SpoolClipSource` serves
//! clips a Protect-style NVR drops into a spool directory, which is also
//! what the tests and the local simulator use.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use tracing::debug;

use haven_models::CameraId;

use crate::error::{MediaError, MediaResult};

/// A request for the clip backing a motion trigger.
#[derive(Debug, Clone)]
pub struct ClipRequest {
    pub camera_id: CameraId,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl ClipRequest {
    /// The window around a trigger timestamp the clip should cover.
    pub fn around(camera_id: CameraId, detected_at: DateTime<Utc>, pre_secs: i64, post_secs: i64) -> Self {
        Self {
            camera_id,
            start: detected_at - chrono::Duration::seconds(pre_secs),
            end: detected_at + chrono::Duration::seconds(post_secs),
        }
    }
}

/// Async clip retrieval keyed by camera and time range.
#[async_trait]
pub trait ClipSource: Send + Sync {
    /// Obtain a local clip path for the request, downloading if needed.
    async fn fetch_clip(&self, request: &ClipRequest) -> MediaResult<PathBuf>;
}

/// Serves clips from `<root>/<camera_id>/*.mp4`.
///
/// Picks the newest clip whose modification time falls at or after the
/// request start; NVR spools name files opaquely, so mtime is the only
/// portable ordering.
#[derive(Debug, Clone)]
pub struct SpoolClipSource {
    root: PathBuf,
}

impl SpoolClipSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl ClipSource for SpoolClipSource {
    async fn fetch_clip(&self, request: &ClipRequest) -> MediaResult<PathBuf> {
        let camera_dir = self.root.join(request.camera_id.as_str());
        let mut dir = match tokio::fs::read_dir(&camera_dir).await {
            Ok(dir) => dir,
            Err(_) => return Err(MediaError::clip_not_found(request.camera_id.as_str())),
        };

        let start: std::time::SystemTime = request.start.into();
        let mut best: Option<(std::time::SystemTime, PathBuf)> = None;

        while let Some(entry) = dir.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("mp4") {
                continue;
            }
            let modified = entry.metadata().await?.modified()?;
            if modified < start {
                continue;
            }
            match &best {
                Some((current, _)) if *current >= modified => {}
                _ => best = Some((modified, path)),
            }
        }

        match best {
            Some((_, path)) => {
                debug!(camera = %request.camera_id, clip = %path.display(), "clip located in spool");
                Ok(path)
            }
            None => Err(MediaError::clip_not_found(request.camera_id.as_str())),
        }
    }
}
