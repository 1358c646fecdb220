//! Frame quality scoring.
//!
//! Two metrics feed the sampler:
//! - `sharpness_score`: variance of a 4-neighbor Laplacian over the
//!   grayscale frame; low variance means blur or an empty scene.
//! - `frame_difference`: mean absolute pixel difference between two frames
//!   downscaled to a small thumbnail; the sampler's motion-energy signal.

use image::imageops::FilterType;
use image::{DynamicImage, GrayImage};
use std::path::Path;

use crate::error::{MediaError, MediaResult};

/// Thumbnail edge used for difference scoring. Small enough to make the
/// comparison cheap, large enough to keep real scene changes visible.
const DIFF_THUMB_EDGE: u32 = 64;

/// Load a frame from disk for scoring.
pub fn load_frame(path: impl AsRef<Path>) -> MediaResult<DynamicImage> {
    let path = path.as_ref();
    image::open(path).map_err(|e| MediaError::frame_decode(format!("{}: {e}", path.display())))
}

/// Variance of the Laplacian over the grayscale image.
///
/// Typical in-focus security frames score well above 50; heavy blur or a
/// covered lens scores in the single digits.
pub fn sharpness_score(image: &DynamicImage) -> f64 {
    let gray = image.to_luma8();
    let (w, h) = gray.dimensions();
    if w < 3 || h < 3 {
        return 0.0;
    }

    let px = |x: u32, y: u32| -> f64 { gray.get_pixel(x, y).0[0] as f64 };

    let mut sum = 0.0;
    let mut sum_sq = 0.0;
    let count = ((w - 2) * (h - 2)) as f64;

    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let lap = px(x - 1, y) + px(x + 1, y) + px(x, y - 1) + px(x, y + 1) - 4.0 * px(x, y);
            sum += lap;
            sum_sq += lap * lap;
        }
    }

    let mean = sum / count;
    (sum_sq / count) - mean * mean
}

/// Mean absolute grayscale difference between two frames, 0.0-255.0.
///
/// Frames are resized to a common thumbnail first so resolution changes
/// between sub-stream and main-stream frames do not register as motion.
pub fn frame_difference(a: &DynamicImage, b: &DynamicImage) -> f64 {
    let ta = diff_thumbnail(a);
    let tb = diff_thumbnail(b);

    let total: u64 = ta
        .pixels()
        .zip(tb.pixels())
        .map(|(pa, pb)| (pa.0[0] as i32 - pb.0[0] as i32).unsigned_abs() as u64)
        .sum();

    total as f64 / (DIFF_THUMB_EDGE * DIFF_THUMB_EDGE) as f64
}

fn diff_thumbnail(image: &DynamicImage) -> GrayImage {
    image::imageops::resize(
        &image.to_luma8(),
        DIFF_THUMB_EDGE,
        DIFF_THUMB_EDGE,
        FilterType::Triangle,
    )
}
