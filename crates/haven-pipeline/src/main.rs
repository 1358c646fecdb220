//! Haven event pipeline worker binary.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use haven_ai::{AiProvider, AnalysisOrchestrator, GeminiProvider, OpenAiProvider, OrchestratorConfig};
use haven_entities::{EmbeddingSource, EntityMatcher, HttpEmbeddingSource, InMemoryEntityStore};
use haven_media::{FrameSampler, SamplerConfig, SamplingStrategy, SpoolClipSource};
use haven_models::{CameraConfig, CameraId};
use haven_pipeline::{
    spawn_producer, EventProcessor, InMemoryEventStore, LogNotifier, Notifier, PipelineConfig,
    PipelineDeps, SimulatedMotionSource,
};
use haven_zones::{InMemoryZoneStore, ZoneFilter, ZoneStore};

#[tokio::main]
async fn main() {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Colored output for dev, JSON for production
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env()
        .add_directive("haven=info".parse().expect("static directive parses"));

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }

    info!("starting haven-worker");

    if let Err(e) = metrics_exporter_prometheus::PrometheusBuilder::new().install() {
        warn!(error = %e, "prometheus exporter unavailable, metrics disabled");
    }

    let config = PipelineConfig::from_env();
    info!(?config, "pipeline config");

    // Cameras
    let cameras = match load_cameras() {
        Ok(cameras) => cameras,
        Err(e) => {
            error!(error = %e, "failed to load camera config");
            std::process::exit(1);
        }
    };
    info!(count = cameras.len(), "cameras loaded");

    // Zone store seeded from camera config
    let zone_store = Arc::new(InMemoryZoneStore::new());
    for camera in cameras.values() {
        if camera.zones.is_empty() {
            continue;
        }
        if let Err(e) = zone_store.save_zones(&camera.id, camera.zones.clone()).await {
            error!(camera = %camera.id, error = %e, "invalid zone config");
            std::process::exit(1);
        }
    }
    let zone_filter = Arc::new(ZoneFilter::new(zone_store));

    // Providers, in configured order: Gemini first when both are available
    let mut providers: Vec<Arc<dyn AiProvider>> = Vec::new();
    match GeminiProvider::from_env() {
        Ok(p) => providers.push(Arc::new(p)),
        Err(_) => info!("GEMINI_API_KEY not set, skipping Gemini"),
    }
    match OpenAiProvider::from_env() {
        Ok(p) => providers.push(Arc::new(p)),
        Err(_) => info!("OPENAI_API_KEY not set, skipping OpenAI"),
    }
    if providers.is_empty() {
        warn!("no AI providers configured, every event will be degraded");
    }

    // Orchestrator
    let sampling_strategy = std::env::var("HAVEN_SAMPLING_STRATEGY")
        .ok()
        .and_then(|s| s.parse::<SamplingStrategy>().ok())
        .unwrap_or_default();
    let orchestrator_config = OrchestratorConfig {
        sampling_strategy,
        ..OrchestratorConfig::default()
    };
    let mut orchestrator = AnalysisOrchestrator::new(providers, orchestrator_config)
        .with_sampler(FrameSampler::new(SamplerConfig::default()));
    if let Ok(spool) = std::env::var("HAVEN_CLIP_SPOOL") {
        orchestrator = orchestrator.with_clip_source(Arc::new(SpoolClipSource::new(spool)));
    }
    let orchestrator = Arc::new(orchestrator);

    // Entities
    let entity_store = Arc::new(InMemoryEntityStore::new());
    let matcher = Arc::new(EntityMatcher::new(entity_store));
    let embeddings: Option<Arc<dyn EmbeddingSource>> = std::env::var("HAVEN_EMBEDDING_URL")
        .ok()
        .map(|url| Arc::new(HttpEmbeddingSource::new(url)) as Arc<dyn EmbeddingSource>);
    if embeddings.is_none() {
        info!("HAVEN_EMBEDDING_URL not set, entity matching disabled");
    }

    let notifiers: Vec<Arc<dyn Notifier>> = vec![Arc::new(LogNotifier)];

    let deps = PipelineDeps {
        zone_filter,
        orchestrator,
        matcher,
        embeddings,
        event_store: Arc::new(InMemoryEventStore::new()),
        notifiers,
        cameras: cameras.clone(),
    };

    let processor = Arc::new(EventProcessor::new(config, deps));

    // One producer per enabled camera. Without a real capture service the
    // simulated source stands in when HAVEN_SIMULATE_MOTION is set.
    let (producer_shutdown, producer_rx) = tokio::sync::watch::channel(false);
    let simulate = std::env::var("HAVEN_SIMULATE_MOTION").is_ok();
    let mut producers = Vec::new();
    if simulate {
        for camera in cameras.values().filter(|c| c.enabled) {
            let source = Arc::new(SimulatedMotionSource::new(
                camera.id.clone(),
                Duration::from_secs(10),
            ));
            producers.push(spawn_producer(
                Arc::clone(&processor),
                source,
                producer_rx.clone(),
            ));
        }
        info!(count = producers.len(), "simulated motion producers started");
    } else {
        info!("no motion source configured, waiting on external triggers");
    }

    // Ctrl-C triggers graceful drain
    {
        let processor = Arc::clone(&processor);
        tokio::spawn(async move {
            tokio::signal::ctrl_c().await.ok();
            info!("received shutdown signal");
            let _ = producer_shutdown.send(true);
            processor.shutdown();
        });
    }

    Arc::clone(&processor).run().await;

    for producer in producers {
        producer.abort();
    }

    info!("haven-worker shutdown complete");
}

/// Load cameras from `HAVEN_CAMERAS` (a JSON array file) or fall back to a
/// single simulated snapshot camera.
fn load_cameras() -> Result<HashMap<CameraId, CameraConfig>, String> {
    let cameras: Vec<CameraConfig> = match std::env::var("HAVEN_CAMERAS") {
        Ok(path) => {
            let json = std::fs::read_to_string(&path)
                .map_err(|e| format!("read {path}: {e}"))?;
            serde_json::from_str(&json).map_err(|e| format!("parse {path}: {e}"))?
        }
        Err(_) => {
            warn!("HAVEN_CAMERAS not set, using a single demo camera");
            vec![CameraConfig::new(CameraId::from("demo-cam"), "Demo camera")]
        }
    };

    Ok(cameras.into_iter().map(|c| (c.id.clone(), c)).collect())
}
