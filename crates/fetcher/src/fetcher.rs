use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use metrics::{counter, histogram};
use otto_core::{domain_of, webpage_cache_key, FetchOutcome, FetcherError, WebpageEvent};
use otto_eventsink::EventSink;
use otto_kv::Cache;
use otto_metrics::page_fetcher::{
    CIRCUIT_BREAKER_PROBES_TOTAL, CONTENT_SIZE_BYTES, FETCH_DURATION_SECONDS, RETRIES_TOTAL,
};
use otto_ratelimiter::RateLimiter;
use otto_robots::RobotsChecker;
use tracing::debug;

use crate::classify::{classify_status, classify_transport_error, ClassifiedFailure};

/// Orchestrates a single URL's fetch: robots check, rate limit, HTTP GET
/// with retry, cache write, event publish (§4.7).
pub struct Fetcher {
    http: reqwest::Client,
    probe_http: reqwest::Client,
    cache: Arc<dyn Cache>,
    event_sink: Arc<dyn EventSink>,
    rate_limiter: Arc<RateLimiter>,
    robots: Arc<RobotsChecker>,
    topic: String,
    cache_ttl_seconds: u64,
    max_retries: u32,
    retry_backoff_base: f64,
}

impl Fetcher {
    pub fn new(
        http: reqwest::Client,
        probe_http: reqwest::Client,
        cache: Arc<dyn Cache>,
        event_sink: Arc<dyn EventSink>,
        rate_limiter: Arc<RateLimiter>,
        robots: Arc<RobotsChecker>,
        topic: String,
        cache_ttl_seconds: u64,
        max_retries: u32,
        retry_backoff_base: f64,
    ) -> Self {
        Self {
            http,
            probe_http,
            cache,
            event_sink,
            rate_limiter,
            robots,
            topic,
            cache_ttl_seconds,
            max_retries,
            retry_backoff_base,
        }
    }

    /// Fetch `url`, retrying transient failures up to `max_retries` times.
    /// Site-wide failures are never retried locally: the caller re-enqueues
    /// the URL and lets the circuit breaker decide when to resume.
    pub async fn process(&self, url: &str) -> Result<FetchOutcome, FetcherError> {
        if !self.robots.is_allowed(url).await? {
            return Ok(FetchOutcome::SkippedRobots {
                url: url.to_string(),
            });
        }
        let domain = domain_of(url);
        self.rate_limiter.acquire(&domain).await?;

        let mut last_outcome = None;
        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                counter!(RETRIES_TOTAL).increment(1);
                let backoff = self.retry_backoff_base.powi(attempt as i32);
                tokio::time::sleep(Duration::from_secs_f64(backoff)).await;
            }
            let outcome = self.do_fetch(url).await?;
            match &outcome {
                FetchOutcome::Fetched(_) | FetchOutcome::SkippedRobots { .. } => {
                    return Ok(outcome)
                }
                FetchOutcome::SiteWide(_) => return Ok(outcome),
                FetchOutcome::UrlSpecific(failure) => {
                    let retriable = failure.status_code.map(|c| c >= 500).unwrap_or(false);
                    last_outcome = Some(outcome);
                    if !retriable {
                        break;
                    }
                }
            }
        }
        Ok(last_outcome.expect("at least one fetch attempt always runs"))
    }

    async fn do_fetch(&self, url: &str) -> Result<FetchOutcome, FetcherError> {
        let start = Instant::now();
        let resp = match self.http.get(url).send().await {
            Ok(resp) => resp,
            Err(err) => {
                histogram!(FETCH_DURATION_SECONDS).record(start.elapsed());
                return Ok(FetchOutcome::SiteWide(classify_transport_error(&err)));
            }
        };
        histogram!(FETCH_DURATION_SECONDS).record(start.elapsed());

        let status = resp.status();
        if status.as_u16() >= 400 {
            let reason = status.canonical_reason().unwrap_or("").to_string();
            return Ok(match classify_status(status.as_u16(), &reason) {
                ClassifiedFailure::SiteWide(f) => FetchOutcome::SiteWide(f),
                ClassifiedFailure::UrlSpecific(f) => FetchOutcome::UrlSpecific(f),
            });
        }

        let content_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());
        let body = resp
            .bytes()
            .await
            .map_err(|e| FetcherError::Http(e.to_string()))?;
        histogram!(CONTENT_SIZE_BYTES).record(body.len() as f64);

        let cache_key = webpage_cache_key(url);
        let body_str = String::from_utf8_lossy(&body).into_owned();
        self.cache
            .set(&cache_key, &body_str, Some(self.cache_ttl_seconds))
            .await?;

        let event = WebpageEvent::new(url.to_string(), status.as_u16(), content_type, &body, Utc::now());
        let payload = serde_json::to_vec(&event)?;
        let key = otto_core::sha256_bytes(url);
        self.event_sink.send(&self.topic, &key, &payload).await?;
        Ok(FetchOutcome::Fetched(event))
    }

    /// HEAD request to `https://{domain}/`, used by the worker loop to probe
    /// a half-open circuit before resuming normal dequeuing. Uses a client
    /// with its own 10 s timeout and a 3-redirect cap, distinct from the
    /// general fetch's timeout and `max_redirects` (§4.7).
    pub async fn probe_domain(&self, domain: &str) -> bool {
        let url = format!("https://{domain}/");
        let start = Instant::now();
        let result = self.probe_http.head(&url).send().await;
        histogram!(FETCH_DURATION_SECONDS).record(start.elapsed());
        match result {
            Ok(resp) => {
                let ok = resp.status().as_u16() < 400;
                debug!(domain, ok, "probe complete");
                counter!(CIRCUIT_BREAKER_PROBES_TOTAL, "result" => if ok { "success" } else { "failure" }).increment(1);
                ok
            }
            Err(_) => {
                counter!(CIRCUIT_BREAKER_PROBES_TOTAL, "result" => "failure").increment(1);
                false
            }
        }
    }
}
