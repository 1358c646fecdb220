//! End-to-end pipeline tests: zone gate, fallback cascade, entity linking,
//! persistence failure isolation and cooldown, against in-memory stores and
//! a scripted AI provider.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use haven_ai::{
    AiError, AiProvider, AnalysisOrchestrator, OrchestratorConfig, ProviderCapabilities,
    ProviderResponse, ReportedTokens,
};
use haven_entities::{
    EmbeddingSource, EntityError, EntityMatcher, EntityResult, InMemoryEntityStore,
};
use haven_media::SpoolClipSource;
use haven_models::{
    AnalysisMode, CameraConfig, CameraId, DetectionZone, EventId, EventRecord, EventStatus,
    MotionTrigger, NormalizedPoint,
};
use haven_pipeline::{
    EventProcessor, EventStore, InMemoryEventStore, PipelineConfig, PipelineDeps, PipelineError,
    PipelineResult,
};
use haven_zones::{InMemoryZoneStore, ZoneFilter, ZoneStore};

/// Provider scripted per mode: video/multi/single succeed or fail.
struct ScriptedProvider {
    video_ok: bool,
    multi_ok: bool,
    single_ok: bool,
}

impl ScriptedProvider {
    fn all_ok() -> Self {
        Self {
            video_ok: true,
            multi_ok: true,
            single_ok: true,
        }
    }

    fn single_frame_only() -> Self {
        Self {
            video_ok: false,
            multi_ok: false,
            single_ok: true,
        }
    }

    fn all_broken() -> Self {
        Self {
            video_ok: false,
            multi_ok: false,
            single_ok: false,
        }
    }
}

#[async_trait]
impl AiProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities {
            single_image: true,
            multi_image: true,
            video: true,
            max_images: 8,
            max_video_secs: 120.0,
        }
    }

    fn rates(&self) -> haven_ai::ProviderRates {
        haven_ai::ProviderRates {
            input_per_1k: 0.1,
            output_per_1k: 0.4,
            tokens_per_image: 100,
            tokens_per_video_sec: 300,
        }
    }

    async fn describe_images(
        &self,
        _prompt: &str,
        frames: &[&Path],
    ) -> Result<ProviderResponse, AiError> {
        let ok = if frames.len() > 1 {
            self.multi_ok
        } else {
            self.single_ok
        };
        if ok {
            Ok(ProviderResponse {
                description: "A person crosses the driveway".to_string(),
                objects: vec!["person".to_string()],
                confidence: 0.85,
                tokens: Some(ReportedTokens {
                    input: 400,
                    output: 25,
                }),
            })
        } else {
            Err(AiError::provider("scripted", "scripted failure"))
        }
    }

    async fn describe_video(
        &self,
        _prompt: &str,
        _clip: &Path,
    ) -> Result<ProviderResponse, AiError> {
        if self.video_ok {
            Ok(ProviderResponse {
                description: "Video: a person walks to the door".to_string(),
                objects: vec!["person".to_string()],
                confidence: 0.9,
                tokens: None,
            })
        } else {
            Err(AiError::provider("scripted", "scripted video failure"))
        }
    }
}

/// Embedding service stub returning one fixed vector.
struct StaticEmbeddings(Vec<f32>);

#[async_trait]
impl EmbeddingSource for StaticEmbeddings {
    async fn get_embedding(&self, _event_id: &EventId) -> EntityResult<Vec<f32>> {
        Ok(self.0.clone())
    }
}

/// Embedding service that is down.
struct DownEmbeddings;

#[async_trait]
impl EmbeddingSource for DownEmbeddings {
    async fn get_embedding(&self, _event_id: &EventId) -> EntityResult<Vec<f32>> {
        Err(EntityError::embedding_unavailable("connection refused"))
    }
}

/// Store that rejects events from one camera, to prove pool isolation.
struct SelectiveFailStore {
    inner: InMemoryEventStore,
    poison_camera: CameraId,
}

#[async_trait]
impl EventStore for SelectiveFailStore {
    async fn create_event(&self, event: &EventRecord) -> PipelineResult<()> {
        if event.camera_id == self.poison_camera {
            return Err(PipelineError::store("disk full"));
        }
        self.inner.create_event(event).await
    }
}

struct Harness {
    processor: Arc<EventProcessor>,
    store: Arc<InMemoryEventStore>,
    run: tokio::task::JoinHandle<()>,
    _workdir: tempfile::TempDir,
}

impl Harness {
    async fn stop(self) {
        self.processor.shutdown();
        self.run.await.expect("processor run loop");
    }
}

struct HarnessOptions {
    provider: ScriptedProvider,
    cameras: Vec<CameraConfig>,
    zones: Vec<(CameraId, Vec<DetectionZone>)>,
    embeddings: Option<Arc<dyn EmbeddingSource>>,
    clip_spool: Option<PathBuf>,
    event_store: Option<Arc<dyn EventStore>>,
    cooldown: Duration,
}

impl Default for HarnessOptions {
    fn default() -> Self {
        Self {
            provider: ScriptedProvider::all_ok(),
            cameras: Vec::new(),
            zones: Vec::new(),
            embeddings: None,
            clip_spool: None,
            event_store: None,
            cooldown: Duration::ZERO,
        }
    }
}

async fn start(mut options: HarnessOptions) -> Harness {
    let workdir = tempfile::tempdir().unwrap();

    // Every camera gets a snapshot so single-frame analysis can run
    let snapshot = workdir.path().join("snapshot.jpg");
    std::fs::write(&snapshot, b"fake-jpeg").unwrap();
    for camera in &mut options.cameras {
        if camera.snapshot_path.is_none() {
            camera.snapshot_path = Some(snapshot.clone());
        }
    }

    let zone_store = Arc::new(InMemoryZoneStore::new());
    for (camera_id, zones) in options.zones {
        zone_store.save_zones(&camera_id, zones).await.unwrap();
    }

    let mut orchestrator = AnalysisOrchestrator::new(
        vec![Arc::new(options.provider)],
        OrchestratorConfig {
            provider_timeout: Duration::from_secs(5),
            ..OrchestratorConfig::default()
        },
    );
    if let Some(spool) = options.clip_spool {
        orchestrator = orchestrator.with_clip_source(Arc::new(SpoolClipSource::new(spool)));
    }

    let store = Arc::new(InMemoryEventStore::new());
    let event_store: Arc<dyn EventStore> = options
        .event_store
        .unwrap_or_else(|| store.clone() as Arc<dyn EventStore>);

    let cameras: HashMap<CameraId, CameraConfig> = options
        .cameras
        .into_iter()
        .map(|c| (c.id.clone(), c))
        .collect();

    let deps = PipelineDeps {
        zone_filter: Arc::new(ZoneFilter::new(zone_store)),
        orchestrator: Arc::new(orchestrator),
        matcher: Arc::new(EntityMatcher::new(Arc::new(InMemoryEntityStore::new()))),
        embeddings: options.embeddings,
        event_store,
        notifiers: Vec::new(),
        cameras,
    };

    let config = PipelineConfig {
        cooldown: options.cooldown,
        persist_base_delay: Duration::from_millis(1),
        shutdown_timeout: Duration::from_secs(5),
        ..PipelineConfig::default()
    };

    let processor = Arc::new(EventProcessor::new(config, deps));
    let run = tokio::spawn(Arc::clone(&processor).run());

    Harness {
        processor,
        store,
        run,
        _workdir: workdir,
    }
}

async fn wait_for_events(store: &InMemoryEventStore, count: usize) {
    for _ in 0..200 {
        if store.count() >= count {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("timed out waiting for {count} events, have {}", store.count());
}

fn left_half_zone() -> DetectionZone {
    DetectionZone::new(
        "left half",
        vec![
            NormalizedPoint::new(0.0, 0.0),
            NormalizedPoint::new(0.5, 0.0),
            NormalizedPoint::new(0.5, 1.0),
            NormalizedPoint::new(0.0, 1.0),
        ],
    )
}

fn trigger_at(camera: &str, x: f64, y: f64) -> MotionTrigger {
    MotionTrigger::new(CameraId::from(camera), NormalizedPoint::new(x, y).into())
        .with_hints(vec!["person".to_string()])
}

#[tokio::test]
async fn motion_inside_zone_creates_event_outside_does_not() {
    let camera = CameraConfig::new(CameraId::from("cam-1"), "Driveway");
    let harness = start(HarnessOptions {
        cameras: vec![camera],
        zones: vec![(CameraId::from("cam-1"), vec![left_half_zone()])],
        ..Default::default()
    })
    .await;

    assert!(harness.processor.submit(trigger_at("cam-1", 0.2, 0.5)));
    wait_for_events(&harness.store, 1).await;

    assert!(harness.processor.submit(trigger_at("cam-1", 0.8, 0.5)));
    // Give the outside event time to be (not) processed
    tokio::time::sleep(Duration::from_millis(100)).await;

    let events = harness.store.events();
    assert_eq!(events.len(), 1, "outside-zone motion must create no event");
    assert_eq!(events[0].analysis.analysis_mode, AnalysisMode::SingleFrame);
    assert_eq!(events[0].status, EventStatus::Described);

    harness.stop().await;
}

#[tokio::test]
async fn clip_download_failure_falls_back_with_reason() {
    // video_native-configured clip-capable camera, but the spool is empty
    let spool = tempfile::tempdir().unwrap();
    let camera = CameraConfig::new(CameraId::from("protect-1"), "Porch")
        .with_analysis_mode(AnalysisMode::VideoNative)
        .with_clip_capable(true);

    let harness = start(HarnessOptions {
        cameras: vec![camera],
        clip_spool: Some(spool.path().to_path_buf()),
        ..Default::default()
    })
    .await;

    assert!(harness.processor.submit(trigger_at("protect-1", 0.5, 0.5)));
    wait_for_events(&harness.store, 1).await;

    let events = harness.store.events();
    let event = &events[0];
    assert!(
        matches!(
            event.analysis.analysis_mode,
            AnalysisMode::MultiFrame | AnalysisMode::SingleFrame
        ),
        "mode was {:?}",
        event.analysis.analysis_mode
    );
    let reason = event
        .analysis
        .fallback_trail
        .to_storage_string()
        .expect("fallback reason must be non-null");
    assert!(reason.contains("video_native:clip_download_failed"));

    harness.stop().await;
}

#[tokio::test]
async fn fallback_chain_records_stages_in_order() {
    // Provider fails video and multi-frame but answers single-frame; the
    // clip exists but is unreadable, so sampling fails too.
    let spool = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(spool.path().join("protect-1")).unwrap();
    std::fs::write(spool.path().join("protect-1/motion.mp4"), b"garbage").unwrap();

    let camera = CameraConfig::new(CameraId::from("protect-1"), "Porch")
        .with_analysis_mode(AnalysisMode::VideoNative)
        .with_clip_capable(true);

    let harness = start(HarnessOptions {
        provider: ScriptedProvider::single_frame_only(),
        cameras: vec![camera],
        clip_spool: Some(spool.path().to_path_buf()),
        ..Default::default()
    })
    .await;

    assert!(harness.processor.submit(trigger_at("protect-1", 0.5, 0.5)));
    wait_for_events(&harness.store, 1).await;

    let events = harness.store.events();
    let event = &events[0];
    assert_eq!(event.analysis.analysis_mode, AnalysisMode::SingleFrame);
    assert_eq!(event.status, EventStatus::Described);
    assert!(event.analysis.frame_count_coherent());

    let records = event.analysis.fallback_trail.records();
    let video_pos = records
        .iter()
        .position(|r| r.stage == AnalysisMode::VideoNative)
        .expect("video_native marker present");
    let multi_pos = records
        .iter()
        .position(|r| r.stage == AnalysisMode::MultiFrame)
        .expect("multi_frame marker present");
    assert!(video_pos < multi_pos, "markers must be ordered");

    harness.stop().await;
}

#[tokio::test]
async fn total_provider_failure_persists_degraded_event() {
    let camera = CameraConfig::new(CameraId::from("cam-1"), "Yard");
    let harness = start(HarnessOptions {
        provider: ScriptedProvider::all_broken(),
        cameras: vec![camera],
        ..Default::default()
    })
    .await;

    assert!(harness.processor.submit(trigger_at("cam-1", 0.5, 0.5)));
    wait_for_events(&harness.store, 1).await;

    let events = harness.store.events();
    assert_eq!(events[0].status, EventStatus::Degraded);
    assert!(events[0].analysis.degraded);
    assert!(!events[0].analysis.fallback_trail.is_empty());

    harness.stop().await;
}

#[tokio::test]
async fn repeat_visitor_links_to_the_same_entity() {
    let camera = CameraConfig::new(CameraId::from("cam-1"), "Door");
    let embedding = vec![0.3f32, 0.6, 0.1, 0.8];
    let harness = start(HarnessOptions {
        cameras: vec![camera],
        embeddings: Some(Arc::new(StaticEmbeddings(embedding))),
        ..Default::default()
    })
    .await;

    assert!(harness.processor.submit(trigger_at("cam-1", 0.5, 0.5)));
    wait_for_events(&harness.store, 1).await;
    assert!(harness.processor.submit(trigger_at("cam-1", 0.4, 0.6)));
    wait_for_events(&harness.store, 2).await;

    let events = harness.store.events();
    let first = events[0].matched_entity.clone().expect("first event linked");
    let second = events[1].matched_entity.clone().expect("second event linked");
    assert_eq!(first, second, "identical embeddings cluster to one entity");

    harness.stop().await;
}

#[tokio::test]
async fn embedding_outage_leaves_events_unlinked_but_persisted() {
    let camera = CameraConfig::new(CameraId::from("cam-1"), "Door");
    let harness = start(HarnessOptions {
        cameras: vec![camera],
        embeddings: Some(Arc::new(DownEmbeddings)),
        ..Default::default()
    })
    .await;

    assert!(harness.processor.submit(trigger_at("cam-1", 0.5, 0.5)));
    wait_for_events(&harness.store, 1).await;

    let events = harness.store.events();
    assert!(events[0].matched_entity.is_none());
    assert_eq!(events[0].status, EventStatus::Described);

    harness.stop().await;
}

#[tokio::test]
async fn persistence_failure_never_halts_the_pool() {
    let good = CameraConfig::new(CameraId::from("good-cam"), "Front");
    let bad = CameraConfig::new(CameraId::from("bad-cam"), "Back");

    let inner = InMemoryEventStore::new();
    let failing_store = Arc::new(SelectiveFailStore {
        inner,
        poison_camera: CameraId::from("bad-cam"),
    });

    let harness = start(HarnessOptions {
        cameras: vec![good, bad],
        event_store: Some(failing_store.clone() as Arc<dyn EventStore>),
        ..Default::default()
    })
    .await;

    // The poisoned event exhausts retries and is marked failed; the next
    // event still processes normally
    assert!(harness.processor.submit(trigger_at("bad-cam", 0.5, 0.5)));
    assert!(harness.processor.submit(trigger_at("good-cam", 0.5, 0.5)));

    for _ in 0..200 {
        if failing_store.inner.count() >= 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    let events = failing_store.inner.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].camera_id, CameraId::from("good-cam"));

    harness.stop().await;
}

#[tokio::test]
async fn cooldown_suppresses_rapid_retriggers() {
    let camera = CameraConfig::new(CameraId::from("cam-1"), "Gate");
    let harness = start(HarnessOptions {
        cameras: vec![camera],
        cooldown: Duration::from_secs(30),
        ..Default::default()
    })
    .await;

    assert!(harness.processor.submit(trigger_at("cam-1", 0.5, 0.5)));
    assert!(
        !harness.processor.submit(trigger_at("cam-1", 0.5, 0.5)),
        "second trigger inside the quiet period must be suppressed"
    );
    wait_for_events(&harness.store, 1).await;
    assert_eq!(harness.store.count(), 1);

    harness.stop().await;
}
