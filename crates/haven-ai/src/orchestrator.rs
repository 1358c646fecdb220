//! The analysis fallback state machine.
//!
//! Modes cascade `video_native → multi_frame → single_frame`; within each
//! mode the configured providers are tried in order under a fixed timeout.
//! The orchestrator never fails outward: when the terminal single-frame
//! stage also exhausts its providers, it returns a degraded result carrying
//! the full fallback trail.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use haven_media::{probe_clip, ClipRequest, ClipSource, FrameSampler, SamplingStrategy};
use haven_models::{
    AnalysisMode, AnalysisResult, CameraConfig, FallbackCause, FallbackTrail, MotionTrigger,
};

use crate::cost::{finalize_usage, MediaUnits};
use crate::error::AiError;
use crate::provider::{AiProvider, ProviderResponse};

/// Orchestrator tuning.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Per-provider call timeout.
    pub provider_timeout: Duration,
    /// The describe prompt sent with every call.
    pub prompt: String,
    /// How multi-frame sampling picks frames.
    pub sampling_strategy: SamplingStrategy,
    /// Seconds of clip requested before the trigger timestamp.
    pub clip_pre_secs: i64,
    /// Seconds of clip requested after the trigger timestamp.
    pub clip_post_secs: i64,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            provider_timeout: Duration::from_secs(30),
            prompt: DEFAULT_PROMPT.to_string(),
            sampling_strategy: SamplingStrategy::default(),
            clip_pre_secs: 5,
            clip_post_secs: 10,
        }
    }
}

const DEFAULT_PROMPT: &str = "You are describing a home security camera event. \
Describe what happens in one or two sentences, naming any people, vehicles or \
animals. Answer as JSON: {\"description\": string, \"objects\": [string], \
\"confidence\": number between 0 and 1}.";

/// Chooses the analysis mode, cascades providers, records the trail.
pub struct AnalysisOrchestrator {
    providers: Vec<Arc<dyn AiProvider>>,
    clip_source: Option<Arc<dyn ClipSource>>,
    sampler: FrameSampler,
    config: OrchestratorConfig,
}

impl AnalysisOrchestrator {
    pub fn new(providers: Vec<Arc<dyn AiProvider>>, config: OrchestratorConfig) -> Self {
        Self {
            providers,
            clip_source: None,
            sampler: FrameSampler::default(),
            config,
        }
    }

    /// Attach a clip source for clip-capable cameras.
    pub fn with_clip_source(mut self, source: Arc<dyn ClipSource>) -> Self {
        self.clip_source = Some(source);
        self
    }

    /// Replace the frame sampler.
    pub fn with_sampler(mut self, sampler: FrameSampler) -> Self {
        self.sampler = sampler;
        self
    }

    /// Run the fallback chain for one trigger. Always returns a result;
    /// total failure yields a degraded placeholder with the full trail.
    pub async fn analyze(&self, camera: &CameraConfig, trigger: &MotionTrigger) -> AnalysisResult {
        let mut trail = FallbackTrail::new();
        let mut clip_path: Option<PathBuf> = None;

        if camera.analysis_mode == AnalysisMode::VideoNative {
            match self.obtain_clip(camera, trigger).await {
                ClipOutcome::Clip(path) => {
                    clip_path = Some(path.clone());
                    if let Some(result) = self.try_video_native(&path, &mut trail).await {
                        return result;
                    }
                }
                ClipOutcome::NoSource => {
                    trail.push(AnalysisMode::VideoNative, FallbackCause::NoClipSource);
                }
                ClipOutcome::DownloadFailed => {
                    trail.push(AnalysisMode::VideoNative, FallbackCause::ClipDownloadFailed);
                }
            }
        }

        if camera.analysis_mode.needs_clip() {
            if clip_path.is_none() {
                match self.obtain_clip(camera, trigger).await {
                    ClipOutcome::Clip(path) => clip_path = Some(path),
                    ClipOutcome::NoSource => {
                        trail.push(AnalysisMode::MultiFrame, FallbackCause::NoClipSource);
                    }
                    ClipOutcome::DownloadFailed => {
                        trail.push(AnalysisMode::MultiFrame, FallbackCause::ClipDownloadFailed);
                    }
                }
            }
            if let Some(clip) = clip_path.as_deref() {
                if let Some(result) = self.try_multi_frame(clip, &mut trail).await {
                    return result;
                }
            }
        }

        self.try_single_frame(camera, trigger, trail).await
    }

    /// Resolve the clip for this trigger, if the camera can have one.
    async fn obtain_clip(&self, camera: &CameraConfig, trigger: &MotionTrigger) -> ClipOutcome {
        let source = match (&self.clip_source, camera.clip_capable) {
            (Some(source), true) => source,
            _ => return ClipOutcome::NoSource,
        };

        let request = ClipRequest::around(
            camera.id.clone(),
            trigger.detected_at,
            self.config.clip_pre_secs,
            self.config.clip_post_secs,
        );
        match source.fetch_clip(&request).await {
            Ok(path) => ClipOutcome::Clip(path),
            Err(e) => {
                warn!(camera = %camera.id, error = %e, "clip download failed");
                ClipOutcome::DownloadFailed
            }
        }
    }

    /// The video_native stage: iterate video-capable providers.
    async fn try_video_native(
        &self,
        clip: &Path,
        trail: &mut FallbackTrail,
    ) -> Option<AnalysisResult> {
        let video_providers: Vec<_> = self
            .providers
            .iter()
            .filter(|p| p.capabilities().video)
            .collect();
        if video_providers.is_empty() {
            trail.push(AnalysisMode::VideoNative, FallbackCause::AllProvidersFailed);
            return None;
        }

        // Duration feeds token estimation; a clip the probe cannot read may
        // still be decodable by the provider, so probe failure is not fatal
        let duration = match probe_clip(clip).await {
            Ok(info) => info.duration,
            Err(_) => (self.config.clip_pre_secs + self.config.clip_post_secs) as f64,
        };

        for provider in video_providers {
            if provider.capabilities().max_video_secs < duration {
                debug!(
                    provider = provider.name(),
                    duration, "clip exceeds provider video limit, skipping"
                );
                continue;
            }
            match self
                .timed(provider.describe_video(&self.config.prompt, clip))
                .await
            {
                Ok(resp) => {
                    return Some(self.build_result(
                        AnalysisMode::VideoNative,
                        provider.as_ref(),
                        resp,
                        MediaUnits::VideoSecs(duration),
                        None,
                        std::mem::take(trail),
                    ));
                }
                Err(AiError::Timeout(secs)) => {
                    warn!(provider = provider.name(), secs, "video analysis timed out");
                    trail.push(AnalysisMode::VideoNative, FallbackCause::Timeout);
                }
                Err(e) => {
                    warn!(provider = provider.name(), error = %e, "video analysis failed");
                }
            }
        }

        trail.push(AnalysisMode::VideoNative, FallbackCause::AllProvidersFailed);
        None
    }

    /// The multi_frame stage: sample the clip, iterate multi-image providers.
    async fn try_multi_frame(
        &self,
        clip: &Path,
        trail: &mut FallbackTrail,
    ) -> Option<AnalysisResult> {
        let work_dir = match tempfile::tempdir() {
            Ok(dir) => dir,
            Err(e) => {
                warn!(error = %e, "could not create frame work dir");
                trail.push(AnalysisMode::MultiFrame, FallbackCause::FrameExtractionFailed);
                return None;
            }
        };

        let frames = match self
            .sampler
            .sample(clip, work_dir.path(), self.config.sampling_strategy)
            .await
        {
            Ok(frames) => frames,
            Err(e) => {
                warn!(error = %e, "frame sampling failed");
                trail.push(AnalysisMode::MultiFrame, FallbackCause::FrameExtractionFailed);
                return None;
            }
        };

        if frames.is_empty() {
            trail.push(AnalysisMode::MultiFrame, FallbackCause::FrameExtractionFailed);
            return None;
        }

        for provider in self.providers.iter().filter(|p| p.capabilities().multi_image) {
            let limit = provider.capabilities().max_images.max(1);
            let paths: Vec<&Path> = frames.iter().take(limit).map(|f| f.path.as_path()).collect();
            let sent = paths.len() as u32;

            match self
                .timed(provider.describe_images(&self.config.prompt, &paths))
                .await
            {
                Ok(resp) => {
                    return Some(self.build_result(
                        AnalysisMode::MultiFrame,
                        provider.as_ref(),
                        resp,
                        MediaUnits::Frames(sent),
                        Some(sent),
                        std::mem::take(trail),
                    ));
                }
                Err(AiError::Timeout(secs)) => {
                    warn!(provider = provider.name(), secs, "multi-frame analysis timed out");
                    trail.push(AnalysisMode::MultiFrame, FallbackCause::Timeout);
                }
                Err(e) => {
                    warn!(provider = provider.name(), error = %e, "multi-frame analysis failed");
                }
            }
        }

        trail.push(AnalysisMode::MultiFrame, FallbackCause::AiFailed);
        None
    }

    /// The terminal single_frame stage. Never errors outward.
    async fn try_single_frame(
        &self,
        camera: &CameraConfig,
        trigger: &MotionTrigger,
        mut trail: FallbackTrail,
    ) -> AnalysisResult {
        let snapshot = trigger
            .snapshot_path
            .clone()
            .or_else(|| camera.snapshot_path.clone());

        let Some(snapshot) = snapshot else {
            warn!(camera = %camera.id, "no snapshot available for single-frame analysis");
            trail.push(AnalysisMode::SingleFrame, FallbackCause::SnapshotUnavailable);
            return AnalysisResult::degraded(trail);
        };

        for provider in self.providers.iter().filter(|p| p.capabilities().single_image) {
            match self
                .timed(provider.describe_image(&self.config.prompt, &snapshot))
                .await
            {
                Ok(resp) => {
                    return self.build_result(
                        AnalysisMode::SingleFrame,
                        provider.as_ref(),
                        resp,
                        MediaUnits::Frames(1),
                        None,
                        trail,
                    );
                }
                Err(AiError::Timeout(secs)) => {
                    warn!(provider = provider.name(), secs, "single-frame analysis timed out");
                    trail.push(AnalysisMode::SingleFrame, FallbackCause::Timeout);
                }
                Err(e) => {
                    warn!(provider = provider.name(), error = %e, "single-frame analysis failed");
                }
            }
        }

        trail.push(AnalysisMode::SingleFrame, FallbackCause::AllProvidersFailed);
        info!(camera = %camera.id, trail = %trail, "analysis degraded, all stages exhausted");
        AnalysisResult::degraded(trail)
    }

    /// Wrap a provider call in the configured timeout.
    async fn timed<F>(&self, call: F) -> Result<ProviderResponse, AiError>
    where
        F: std::future::Future<Output = Result<ProviderResponse, AiError>>,
    {
        match tokio::time::timeout(self.config.provider_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(AiError::Timeout(self.config.provider_timeout.as_secs())),
        }
    }

    fn build_result(
        &self,
        mode: AnalysisMode,
        provider: &dyn AiProvider,
        resp: ProviderResponse,
        media: MediaUnits,
        frame_count_used: Option<u32>,
        trail: FallbackTrail,
    ) -> AnalysisResult {
        let (token_usage, cost) = finalize_usage(
            resp.tokens,
            &self.config.prompt,
            &resp.description,
            media,
            &provider.rates(),
        );

        metrics::counter!(
            "haven_analysis_total",
            "mode" => mode.as_str(),
            "provider" => provider.name().to_string()
        )
        .increment(1);
        metrics::histogram!("haven_analysis_cost_usd").record(cost);

        info!(
            mode = mode.as_str(),
            provider = provider.name(),
            cost_usd = cost,
            estimated = token_usage.is_estimated,
            "analysis complete"
        );

        AnalysisResult {
            description: resp.description,
            confidence: resp.confidence,
            objects: resp.objects,
            analysis_mode: mode,
            frame_count_used,
            fallback_trail: trail,
            provider: provider.name().to_string(),
            token_usage,
            estimated_cost_usd: cost,
            degraded: false,
        }
    }
}

enum ClipOutcome {
    Clip(PathBuf),
    NoSource,
    DownloadFailed,
}
