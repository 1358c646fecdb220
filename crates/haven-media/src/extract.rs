//! Single-frame extraction.

use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

use crate::error::{MediaError, MediaResult};

/// Extract one frame at `timestamp_secs` into `output` (PNG or JPEG by
/// extension).
///
/// Seeks before the input for speed; accuracy at keyframe granularity is
/// fine for motion sampling.
pub async fn extract_frame(
    clip: impl AsRef<Path>,
    timestamp_secs: f64,
    output: impl AsRef<Path>,
) -> MediaResult<()> {
    let clip = clip.as_ref();
    let output = output.as_ref();

    if !clip.exists() {
        return Err(MediaError::FileNotFound(clip.to_path_buf()));
    }
    which::which("ffmpeg").map_err(|_| MediaError::FfmpegNotFound)?;

    let ts = format!("{timestamp_secs:.3}");
    debug!(clip = %clip.display(), ts = %ts, "extracting frame");

    let status = Command::new("ffmpeg")
        .args(["-hide_banner", "-loglevel", "error", "-y", "-ss", &ts, "-i"])
        .arg(clip)
        .args(["-frames:v", "1", "-q:v", "2"])
        .arg(output)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .await?;

    if !status.status.success() {
        return Err(MediaError::ffmpeg_failed(
            format!("frame extraction at {ts}s failed"),
            Some(String::from_utf8_lossy(&status.stderr).to_string()),
        ));
    }

    // ffmpeg can exit zero without writing a frame when the seek lands
    // past the end of the stream
    if !output.exists() {
        return Err(MediaError::ffmpeg_failed(
            format!("no frame produced at {ts}s"),
            None,
        ));
    }

    Ok(())
}
