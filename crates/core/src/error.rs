use thiserror::Error;

/// Infrastructure-level error shared by the KV, event-sink, and rate-limiter
/// crates. Fetch *outcomes* (robots skip, site-wide failure, URL-specific
/// failure) are never represented as `Err` — see `FetchOutcome` in
/// [`crate::types`]. This type is reserved for failures the caller cannot
/// classify as belonging to a particular URL: the broker itself is down,
/// a config value doesn't parse, serialization failed.
#[derive(Error, Debug)]
pub enum FetcherError {
    #[error("redis error: {0}")]
    Redis(String),

    #[error("kafka error: {0}")]
    Kafka(String),

    #[error("http error: {0}")]
    Http(String),

    #[error("invalid url: {0}")]
    InvalidUrl(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("config error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}
