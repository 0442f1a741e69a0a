use std::time::Duration;

use otto_core::{config::env_parsed, config::env_string, FetcherError};

/// Page Fetcher configuration, read from `PAGE_FETCHER_*` environment
/// variables (§6, §10.3). Defaults match the upstream Python service so a
/// deployment can switch binaries without retuning its environment.
#[derive(Debug, Clone)]
pub struct FetcherConfig {
    pub redis_url: String,
    pub kafka_bootstrap_servers: String,

    pub input_queue: String,
    pub dlq_queue: String,

    pub webpage_log_topic: String,

    pub request_timeout: Duration,
    pub max_retries: u32,
    pub retry_backoff_base: f64,
    pub user_agent: String,
    pub max_redirects: usize,

    pub cache_ttl_seconds: u64,

    pub rate_limit_per_second: f64,

    pub circuit_breaker_failure_threshold: u32,
    pub circuit_breaker_initial_backoff: Duration,
    pub circuit_breaker_max_backoff: Duration,
    pub circuit_breaker_backoff_multiplier: f64,

    pub robots_txt_cache_ttl_seconds: u64,

    pub poll_timeout_seconds: f64,

    /// Domain probed while a worker's circuit is half-open.
    pub crawl_domain: String,

    /// Number of concurrent fetch-loop tasks to run in this process.
    pub worker_count: usize,

    pub metrics_listen_addr: String,
}

impl FetcherConfig {
    pub fn from_env() -> Result<Self, FetcherError> {
        Ok(Self {
            redis_url: env_string("PAGE_FETCHER_REDIS_URL", "redis://localhost:6379"),
            kafka_bootstrap_servers: env_string(
                "PAGE_FETCHER_KAFKA_BOOTSTRAP_SERVERS",
                "localhost:9092",
            ),
            input_queue: env_string("PAGE_FETCHER_INPUT_QUEUE", "crawler_queue"),
            dlq_queue: env_string("PAGE_FETCHER_DLQ_QUEUE", "page_fetcher_dlq"),
            webpage_log_topic: env_string("PAGE_FETCHER_WEBPAGE_LOG_TOPIC", "webpage_log"),
            request_timeout: Duration::from_secs_f64(env_parsed(
                "PAGE_FETCHER_REQUEST_TIMEOUT_SECONDS",
                30.0,
            )?),
            max_retries: env_parsed("PAGE_FETCHER_MAX_RETRIES", 3)?,
            retry_backoff_base: env_parsed("PAGE_FETCHER_RETRY_BACKOFF_BASE_SECONDS", 2.0)?,
            user_agent: env_string("PAGE_FETCHER_USER_AGENT", "OttoBot/1.0"),
            max_redirects: env_parsed("PAGE_FETCHER_MAX_REDIRECTS", 5)?,
            cache_ttl_seconds: env_parsed("PAGE_FETCHER_CACHE_TTL_SECONDS", 3600)?,
            rate_limit_per_second: env_parsed("PAGE_FETCHER_RATE_LIMIT_PER_SECOND", 1.0)?,
            circuit_breaker_failure_threshold: env_parsed(
                "PAGE_FETCHER_CIRCUIT_BREAKER_FAILURE_THRESHOLD",
                5,
            )?,
            circuit_breaker_initial_backoff: Duration::from_secs_f64(env_parsed(
                "PAGE_FETCHER_CIRCUIT_BREAKER_INITIAL_BACKOFF_SECONDS",
                30.0,
            )?),
            circuit_breaker_max_backoff: Duration::from_secs_f64(env_parsed(
                "PAGE_FETCHER_CIRCUIT_BREAKER_MAX_BACKOFF_SECONDS",
                300.0,
            )?),
            circuit_breaker_backoff_multiplier: env_parsed(
                "PAGE_FETCHER_CIRCUIT_BREAKER_BACKOFF_MULTIPLIER",
                2.0,
            )?,
            robots_txt_cache_ttl_seconds: env_parsed(
                "PAGE_FETCHER_ROBOTS_TXT_CACHE_TTL_SECONDS",
                86_400,
            )?,
            poll_timeout_seconds: env_parsed("PAGE_FETCHER_POLL_TIMEOUT_SECONDS", 5.0)?,
            crawl_domain: env_string("PAGE_FETCHER_CRAWL_DOMAIN", "polovniautomobili.com"),
            worker_count: env_parsed("PAGE_FETCHER_WORKER_COUNT", 4)?,
            metrics_listen_addr: env_string("PAGE_FETCHER_METRICS_LISTEN_ADDR", "0.0.0.0:9100"),
        })
    }
}
