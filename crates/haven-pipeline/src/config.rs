//! Pipeline configuration.

use std::time::Duration;

/// Worker count ceiling; more workers than this just contend on providers.
const MAX_WORKERS: usize = 5;

/// Pipeline configuration.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Bounded queue capacity; overflow drops the oldest pending event.
    pub queue_capacity: usize,
    /// Worker tasks draining the queue (clamped to 1..=5).
    pub worker_count: usize,
    /// Default per-camera quiet period after a trigger.
    pub cooldown: Duration,
    /// How long shutdown waits for workers to drain in-flight events.
    pub shutdown_timeout: Duration,
    /// Bounded retries for event persistence.
    pub persist_max_retries: u32,
    /// Base delay for persistence backoff (doubles each attempt).
    pub persist_base_delay: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 50,
            worker_count: 2,
            cooldown: Duration::from_secs(30),
            shutdown_timeout: Duration::from_secs(30),
            persist_max_retries: 3,
            persist_base_delay: Duration::from_millis(200),
        }
    }
}

impl PipelineConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            queue_capacity: env_parse("HAVEN_QUEUE_CAPACITY", defaults.queue_capacity),
            worker_count: env_parse("HAVEN_WORKERS", defaults.worker_count),
            cooldown: Duration::from_secs(env_parse(
                "HAVEN_COOLDOWN_SECS",
                defaults.cooldown.as_secs(),
            )),
            shutdown_timeout: Duration::from_secs(env_parse(
                "HAVEN_SHUTDOWN_TIMEOUT_SECS",
                defaults.shutdown_timeout.as_secs(),
            )),
            persist_max_retries: env_parse("HAVEN_PERSIST_RETRIES", defaults.persist_max_retries),
            persist_base_delay: Duration::from_millis(env_parse(
                "HAVEN_PERSIST_BASE_DELAY_MS",
                defaults.persist_base_delay.as_millis() as u64,
            )),
        }
        .clamped()
    }

    /// Apply bounds: at least one worker, at most five, nonzero capacity.
    pub fn clamped(mut self) -> Self {
        self.worker_count = self.worker_count.clamp(1, MAX_WORKERS);
        self.queue_capacity = self.queue_capacity.max(1);
        self
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}
