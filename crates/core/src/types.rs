use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Lowercase hex SHA-256 digest of `bytes`.
pub fn sha256_hex(bytes: impl AsRef<[u8]>) -> String {
    let digest = Sha256::digest(bytes.as_ref());
    hex::encode(digest)
}

/// Raw SHA-256 digest bytes, used as the event-topic partition key.
pub fn sha256_bytes(bytes: impl AsRef<[u8]>) -> Vec<u8> {
    Sha256::digest(bytes.as_ref()).to_vec()
}

/// The cache key a fetched page's body is stored under.
pub fn webpage_cache_key(url: &str) -> String {
    format!("webpage:{}", sha256_hex(url))
}

/// The cache key a domain's cached robots.txt body is stored under.
pub fn robots_cache_key(domain: &str) -> String {
    format!("robots:{domain}")
}

/// The KV key a domain's rate-limit bookkeeping is stored under.
pub fn rate_limit_key(domain: &str) -> String {
    format!("rate_limit:{domain}")
}

/// Lowercased host portion of `url`, or the empty string if `url` has no host.
pub fn domain_of(url: &str) -> String {
    url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_lowercase()))
        .unwrap_or_default()
}

/// Emitted once per successful fetch. Serialized as a single JSON object onto
/// the `webpage_log` event topic, keyed by the raw SHA-256 digest of `url`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebpageEvent {
    #[serde(rename = "type")]
    pub event_type: WebpageEventType,
    pub url: String,
    pub cache_key: String,
    pub status_code: u16,
    pub content_type: Option<String>,
    pub content_length: usize,
    pub content_hash: String,
    pub fetched_at: DateTime<Utc>,
}

/// Constant discriminator, kept as its own type so serde always emits the
/// literal string `"webpage_fetched"` regardless of how the struct evolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WebpageEventType {
    #[serde(rename = "webpage_fetched")]
    WebpageFetched,
}

impl WebpageEvent {
    pub fn new(
        url: String,
        status_code: u16,
        content_type: Option<String>,
        body: &[u8],
        fetched_at: DateTime<Utc>,
    ) -> Self {
        Self {
            event_type: WebpageEventType::WebpageFetched,
            cache_key: webpage_cache_key(&url),
            url,
            status_code,
            content_type,
            content_length: body.len(),
            content_hash: sha256_hex(body),
            fetched_at,
        }
    }
}

/// A failure whose cause is plausibly the whole site, not this one URL:
/// connection refused, DNS failure, timeout, TLS error, or any HTTP 5xx.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteWideFailure {
    pub reason: String,
}

/// A failure specific to this URL: HTTP 4xx, or a non-retriable application
/// error. Not retried; the URL is dead-lettered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UrlSpecificFailure {
    pub status_code: Option<u16>,
    pub reason: String,
}

/// Result of [`Fetcher::process`](../otto_fetcher/struct.Fetcher.html#method.process)
/// for a single URL. Matched exhaustively at the worker driver.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Fetched(WebpageEvent),
    SkippedRobots { url: String },
    SiteWide(SiteWideFailure),
    UrlSpecific(UrlSpecificFailure),
}
