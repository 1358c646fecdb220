//! Frame sampling strategies.
//!
//! The sampler turns a motion clip into a small ordered set of frames for
//! multi-frame analysis. Extraction failures are never silent successes:
//! a corrupt or empty clip yields an explicit empty result the orchestrator
//! treats as a fallback trigger.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, warn};

use crate::error::MediaResult;
use crate::extract::extract_frame;
use crate::probe::probe_clip;
use crate::quality::{frame_difference, load_frame, sharpness_score};

/// How frames are chosen from a clip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SamplingStrategy {
    /// Fixed-interval extraction. Deterministic, cheapest, the default.
    #[default]
    Uniform,
    /// Content-aware: skips near-duplicates, favors motion energy.
    Adaptive,
    /// Uniform over-sampling followed by the adaptive cut.
    Hybrid,
}

impl SamplingStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            SamplingStrategy::Uniform => "uniform",
            SamplingStrategy::Adaptive => "adaptive",
            SamplingStrategy::Hybrid => "hybrid",
        }
    }
}

impl FromStr for SamplingStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "uniform" => Ok(SamplingStrategy::Uniform),
            "adaptive" => Ok(SamplingStrategy::Adaptive),
            "hybrid" => Ok(SamplingStrategy::Hybrid),
            other => Err(format!("unknown sampling strategy: {other}")),
        }
    }
}

/// Sampler tuning.
#[derive(Debug, Clone)]
pub struct SamplerConfig {
    /// Frames the caller wants to end up with.
    pub target_count: usize,
    /// Frames scoring below this Laplacian variance are discarded as blur.
    pub min_sharpness: f64,
    /// Candidates differing less than this from the previous kept frame
    /// are dropped as near-duplicates (adaptive/hybrid only).
    pub min_difference: f64,
    /// Upper bound on candidate extractions per clip.
    pub max_candidates: usize,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            target_count: 4,
            min_sharpness: 12.0,
            min_difference: 3.0,
            max_candidates: 16,
        }
    }
}

/// One sampled frame on disk.
#[derive(Debug, Clone)]
pub struct SampledFrame {
    pub path: PathBuf,
    pub timestamp_secs: f64,
    /// Position within the returned sequence.
    pub index: usize,
    pub sharpness: f64,
}

/// Extracts representative frames from motion clips.
#[derive(Debug, Clone, Default)]
pub struct FrameSampler {
    config: SamplerConfig,
}

// Candidate carried through scoring before the final cut.
struct Candidate {
    path: PathBuf,
    timestamp_secs: f64,
    sharpness: f64,
    energy: f64,
}

impl FrameSampler {
    pub fn new(config: SamplerConfig) -> Self {
        Self { config }
    }

    /// Sample frames from `clip` into `out_dir`.
    ///
    /// Returns an empty vec (never an error) when the clip itself is
    /// unusable; environment problems (no ffmpeg) still surface as errors.
    pub async fn sample(
        &self,
        clip: &Path,
        out_dir: &Path,
        strategy: SamplingStrategy,
    ) -> MediaResult<Vec<SampledFrame>> {
        let info = match probe_clip(clip).await {
            Ok(info) => info,
            Err(e) if e.is_clip_fault() => {
                warn!(clip = %clip.display(), error = %e, "clip unusable, returning empty sample set");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e),
        };

        let target = self.config.target_count.max(1);
        let candidate_count = match strategy {
            SamplingStrategy::Uniform => target,
            SamplingStrategy::Adaptive | SamplingStrategy::Hybrid => {
                (target * 2).clamp(target, self.config.max_candidates)
            }
        };

        let timestamps = uniform_timestamps(info.duration, candidate_count);
        let mut candidates = self.extract_candidates(clip, out_dir, &timestamps).await;

        if candidates.is_empty() {
            warn!(clip = %clip.display(), "no usable frames extracted");
            return Ok(Vec::new());
        }

        let selected = match strategy {
            SamplingStrategy::Uniform => candidates,
            SamplingStrategy::Adaptive | SamplingStrategy::Hybrid => {
                score_energy(&mut candidates);
                select_by_energy(candidates, target, self.config.min_difference)
            }
        };

        let frames: Vec<SampledFrame> = selected
            .into_iter()
            .take(target)
            .enumerate()
            .map(|(index, c)| SampledFrame {
                path: c.path,
                timestamp_secs: c.timestamp_secs,
                index,
                sharpness: c.sharpness,
            })
            .collect();

        debug!(
            clip = %clip.display(),
            strategy = strategy.as_str(),
            frames = frames.len(),
            "sampling complete"
        );
        Ok(frames)
    }

    /// Extract and blur-filter candidate frames. Individual extraction or
    /// decode failures skip the frame rather than failing the clip.
    async fn extract_candidates(
        &self,
        clip: &Path,
        out_dir: &Path,
        timestamps: &[f64],
    ) -> Vec<Candidate> {
        let mut candidates = Vec::with_capacity(timestamps.len());

        for (i, &ts) in timestamps.iter().enumerate() {
            let path = out_dir.join(format!("frame_{i:03}.jpg"));
            if let Err(e) = extract_frame(clip, ts, &path).await {
                warn!(ts, error = %e, "frame extraction failed, skipping");
                continue;
            }
            let image = match load_frame(&path) {
                Ok(img) => img,
                Err(e) => {
                    warn!(ts, error = %e, "frame decode failed, skipping");
                    continue;
                }
            };
            let sharpness = sharpness_score(&image);
            if sharpness < self.config.min_sharpness {
                debug!(ts, sharpness, "dropping blurry frame");
                continue;
            }
            candidates.push(Candidate {
                path,
                timestamp_secs: ts,
                sharpness,
                energy: 0.0,
            });
        }

        candidates
    }
}

/// Evenly spaced timestamps, centered within each interval so the first
/// frame is not the (often still-empty) clip start.
fn uniform_timestamps(duration: f64, count: usize) -> Vec<f64> {
    if duration <= 0.0 || count == 0 {
        return Vec::new();
    }
    (0..count)
        .map(|i| duration * (i as f64 + 0.5) / count as f64)
        .collect()
}

/// Fill in motion energy: difference against the previous candidate.
/// The first frame inherits the second's energy so it is not punished for
/// having no predecessor.
fn score_energy(candidates: &mut [Candidate]) {
    let mut prev_image = None;
    let mut energies = Vec::with_capacity(candidates.len());

    for candidate in candidates.iter() {
        let image = match load_frame(&candidate.path) {
            Ok(img) => img,
            Err(_) => {
                energies.push(0.0);
                continue;
            }
        };
        let energy = match &prev_image {
            Some(prev) => frame_difference(prev, &image),
            None => 0.0,
        };
        energies.push(energy);
        prev_image = Some(image);
    }

    if energies.len() > 1 {
        energies[0] = energies[1];
    }
    for (candidate, energy) in candidates.iter_mut().zip(energies) {
        candidate.energy = energy;
    }
}

/// The adaptive cut: drop near-duplicates, then keep the `target` highest-
/// energy frames in timestamp order.
fn select_by_energy(candidates: Vec<Candidate>, target: usize, min_difference: f64) -> Vec<Candidate> {
    // Near-duplicate pruning keeps the first of each run of static frames
    let mut pruned: Vec<Candidate> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        let is_duplicate = !pruned.is_empty() && candidate.energy < min_difference;
        if is_duplicate {
            continue;
        }
        pruned.push(candidate);
    }

    if pruned.len() <= target {
        return pruned;
    }

    // Rank by energy, keep the top `target`, then restore time order
    let mut order: Vec<usize> = (0..pruned.len()).collect();
    order.sort_by(|&a, &b| {
        pruned[b]
            .energy
            .partial_cmp(&pruned[a].energy)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    let mut keep: Vec<usize> = order.into_iter().take(target).collect();
    keep.sort_unstable();

    let mut kept = Vec::with_capacity(target);
    let mut pruned_iter = pruned.into_iter().enumerate();
    for idx in keep {
        for (i, c) in pruned_iter.by_ref() {
            if i == idx {
                kept.push(c);
                break;
            }
        }
    }
    kept
}
