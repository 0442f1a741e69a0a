//! Metric name constants and the Prometheus exporter installer (§10.4).
//!
//! Every metric the fetcher and scheduler record is listed here as a
//! constant so a typo in a call site is a compile error waiting to happen
//! (a `counter!("page_fetcher_pages_ftched_total")` typo would otherwise
//! silently create a new, unobserved metric).

use std::net::SocketAddr;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use otto_core::FetcherError;

pub mod page_fetcher {
    pub const PAGES_FETCHED_TOTAL: &str = "page_fetcher_pages_fetched_total";
    pub const PAGES_FAILED_TOTAL: &str = "page_fetcher_pages_failed_total";
    pub const PAGES_SKIPPED_ROBOTS_TOTAL: &str = "page_fetcher_pages_skipped_robots_total";
    pub const PAGES_REQUEUED_TOTAL: &str = "page_fetcher_pages_requeued_total";
    pub const RETRIES_TOTAL: &str = "page_fetcher_retries_total";
    pub const DLQ_ENQUEUED_TOTAL: &str = "page_fetcher_dlq_enqueued_total";
    pub const CIRCUIT_BREAKER_PROBES_TOTAL: &str = "page_fetcher_circuit_breaker_probes_total";
    pub const CIRCUIT_BREAKER_OPENED_TOTAL: &str = "page_fetcher_circuit_breaker_opened_total";
    pub const CIRCUIT_BREAKER_CLOSED_TOTAL: &str = "page_fetcher_circuit_breaker_closed_total";
    pub const CIRCUIT_BREAKER_STATE: &str = "page_fetcher_circuit_breaker_state";
    pub const CIRCUIT_BREAKER_CONSECUTIVE_FAILURES: &str =
        "page_fetcher_circuit_breaker_consecutive_failures";
    pub const CIRCUIT_BREAKER_CURRENT_BACKOFF_SECONDS: &str =
        "page_fetcher_circuit_breaker_current_backoff_seconds";
    pub const INPUT_QUEUE_SIZE: &str = "page_fetcher_input_queue_size";
    pub const DLQ_SIZE: &str = "page_fetcher_dlq_size";
    pub const FETCH_DURATION_SECONDS: &str = "page_fetcher_fetch_duration_seconds";
    pub const CONTENT_SIZE_BYTES: &str = "page_fetcher_content_size_bytes";
}

pub mod crawler_scheduler {
    pub const URLS_ENQUEUED_TOTAL: &str = "crawler_scheduler_urls_enqueued_total";
    pub const SEED_URLS_ENQUEUED_TOTAL: &str = "crawler_scheduler_seed_urls_enqueued_total";
    pub const CRAWLER_QUEUE_SIZE: &str = "crawler_scheduler_crawler_queue_size";
    pub const LOOP_LAG_SECONDS: &str = "crawler_scheduler_loop_lag_seconds";
}

/// Installs a Prometheus recorder and serves it on `listen_addr`, returning
/// a handle that can be dropped to keep the exporter alive for the life of
/// the process. The circuit breaker's own gauges are registered lazily by
/// the first call to `gauge!`/`counter!` in `otto-circuitbreaker`; nothing
/// here needs to know about them by name.
pub async fn install_prometheus_exporter(
    listen_addr: SocketAddr,
) -> Result<PrometheusHandle, FetcherError> {
    let (recorder, exporter) = PrometheusBuilder::new()
        .with_http_listener(listen_addr)
        .build()
        .map_err(|e| FetcherError::Other(format!("failed to build prometheus exporter: {e}")))?;
    let handle = recorder.handle();
    metrics::set_global_recorder(recorder)
        .map_err(|e| FetcherError::Other(format!("failed to install metrics recorder: {e}")))?;
    tokio::spawn(exporter);
    Ok(handle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metric_names_carry_their_component_prefix() {
        assert!(page_fetcher::PAGES_FETCHED_TOTAL.starts_with("page_fetcher_"));
        assert!(crawler_scheduler::URLS_ENQUEUED_TOTAL.starts_with("crawler_scheduler_"));
    }
}
