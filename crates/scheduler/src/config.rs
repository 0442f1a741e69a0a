use otto_core::{config::env_parsed, config::env_string, FetcherError};

/// Crawler Scheduler configuration, read from `CRAWLER_SCHEDULER_*`
/// environment variables (§6, §10.3).
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub redis_url: String,
    pub input_queue: String,
    pub output_queue: String,
    pub max_queue_size: usize,
    pub seed_file_path: String,
    pub poll_timeout_seconds: f64,
    pub metrics_listen_addr: String,
}

impl SchedulerConfig {
    pub fn from_env() -> Result<Self, FetcherError> {
        Ok(Self {
            redis_url: env_string("CRAWLER_SCHEDULER_REDIS_URL", "redis://localhost:6379"),
            input_queue: env_string("CRAWLER_SCHEDULER_INPUT_QUEUE", "url_filter_output"),
            output_queue: env_string("CRAWLER_SCHEDULER_OUTPUT_QUEUE", "crawler_queue"),
            max_queue_size: env_parsed("CRAWLER_SCHEDULER_MAX_QUEUE_SIZE", 100_000)?,
            seed_file_path: env_string("CRAWLER_SCHEDULER_SEED_FILE_PATH", "seeds.yaml"),
            poll_timeout_seconds: env_parsed("CRAWLER_SCHEDULER_POLL_TIMEOUT_SECONDS", 5.0)?,
            metrics_listen_addr: env_string(
                "CRAWLER_SCHEDULER_METRICS_LISTEN_ADDR",
                "0.0.0.0:9101",
            ),
        })
    }
}
