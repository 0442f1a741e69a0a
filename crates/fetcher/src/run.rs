use std::sync::Arc;

use metrics::{counter, gauge};
use otto_circuitbreaker::{CircuitBreaker, CircuitBreakerConfig};
use otto_core::FetchOutcome;
use otto_eventsink::{EventSink, KafkaEventSink};
use otto_kv::{Cache, Queue, RedisCache, RedisQueue};
use otto_metrics::page_fetcher::{
    DLQ_ENQUEUED_TOTAL, DLQ_SIZE, INPUT_QUEUE_SIZE, PAGES_FAILED_TOTAL, PAGES_FETCHED_TOTAL,
    PAGES_REQUEUED_TOTAL, PAGES_SKIPPED_ROBOTS_TOTAL,
};
use otto_ratelimiter::RateLimiter;
use otto_robots::RobotsChecker;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{info, warn};

use crate::config::FetcherConfig;
use crate::fetcher::Fetcher;
use crate::robots_fetch::HttpRobotsFetch;

/// Runs the Page Fetcher: `worker_count` independent fetch-loop tasks
/// sharing one Redis/Kafka connection pool each, until a shutdown signal
/// arrives.
///
/// Each task owns its own [`CircuitBreaker`] (§9 open question: breaker
/// state is per-worker, not shared or persisted — two workers can double
/// count failures against the same domain; this is an accepted limitation,
/// not mitigated here).
pub async fn run_fetcher(config: FetcherConfig) -> anyhow::Result<()> {
    let cache: Arc<dyn Cache> = Arc::new(RedisCache::new(&config.redis_url).await?);
    let event_sink: Arc<dyn EventSink> =
        Arc::new(KafkaEventSink::new(&config.kafka_bootstrap_servers)?);
    let input_queue: Arc<dyn Queue> =
        Arc::new(RedisQueue::new(&config.redis_url, &config.input_queue).await?);
    let dlq: Arc<dyn Queue> = Arc::new(RedisQueue::new(&config.redis_url, &config.dlq_queue).await?);
    let rate_limiter = Arc::new(
        RateLimiter::new(
            &config.redis_url,
            config.rate_limit_per_second,
            std::time::Duration::from_millis(100),
        )
        .await?,
    );

    let http = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
        .timeout(config.request_timeout)
        .user_agent(config.user_agent.clone())
        .build()?;
    let probe_http = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::limited(3))
        .timeout(std::time::Duration::from_secs(10))
        .user_agent(config.user_agent.clone())
        .build()?;

    let robots = Arc::new(RobotsChecker::new(
        Arc::clone(&cache),
        Arc::new(HttpRobotsFetch::new(config.user_agent.clone())?),
        config.robots_txt_cache_ttl_seconds,
        config.user_agent.clone(),
    ));

    let fetcher = Arc::new(Fetcher::new(
        http,
        probe_http,
        Arc::clone(&cache),
        Arc::clone(&event_sink),
        Arc::clone(&rate_limiter),
        Arc::clone(&robots),
        config.webpage_log_topic.clone(),
        config.cache_ttl_seconds,
        config.max_retries,
        config.retry_backoff_base,
    ));

    otto_metrics::install_prometheus_exporter(config.metrics_listen_addr.parse()?).await?;

    info!(
        redis_url = %config.redis_url,
        input_queue = %config.input_queue,
        dlq_queue = %config.dlq_queue,
        crawl_domain = %config.crawl_domain,
        worker_count = config.worker_count,
        "page fetcher starting"
    );

    let (shutdown_tx, _) = tokio::sync::broadcast::channel::<()>(1);
    let mut worker_handles = Vec::with_capacity(config.worker_count);

    for worker_id in 0..config.worker_count {
        let fetcher = Arc::clone(&fetcher);
        let input_queue = Arc::clone(&input_queue);
        let dlq = Arc::clone(&dlq);
        let crawl_domain = config.crawl_domain.clone();
        let poll_timeout_seconds = config.poll_timeout_seconds;
        let breaker_config = CircuitBreakerConfig {
            failure_threshold: config.circuit_breaker_failure_threshold,
            initial_backoff: config.circuit_breaker_initial_backoff,
            max_backoff: config.circuit_breaker_max_backoff,
            backoff_multiplier: config.circuit_breaker_backoff_multiplier,
        };
        let mut shutdown = shutdown_tx.subscribe();

        let handle = tokio::spawn(async move {
            let mut breaker = CircuitBreaker::new(breaker_config);
            loop {
                tokio::select! {
                    _ = shutdown.recv() => {
                        info!(worker_id, "worker shutting down");
                        break;
                    }
                    _ = fetch_loop_tick(
                        worker_id,
                        &fetcher,
                        &mut breaker,
                        &*input_queue,
                        &*dlq,
                        &crawl_domain,
                        poll_timeout_seconds,
                    ) => {}
                }
            }
        });
        worker_handles.push(handle);
    }

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigquit = signal(SignalKind::quit())?;
    tokio::select! {
        _ = sigint.recv() => info!("received SIGINT"),
        _ = sigterm.recv() => info!("received SIGTERM"),
        _ = sigquit.recv() => info!("received SIGQUIT"),
    }
    let _ = shutdown_tx.send(());
    for handle in worker_handles {
        let _ = handle.await;
    }
    if let Err(err) = event_sink.close().await {
        warn!(error = %err, "failed to flush event sink on shutdown");
    }

    info!("page fetcher shut down");
    Ok(())
}

/// One iteration of a worker's main loop: wait out an open circuit, probe a
/// half-open one, or dequeue and process one URL.
async fn fetch_loop_tick(
    worker_id: usize,
    fetcher: &Fetcher,
    breaker: &mut otto_circuitbreaker::CircuitBreaker,
    input_queue: &dyn Queue,
    dlq: &dyn Queue,
    crawl_domain: &str,
    poll_timeout_seconds: f64,
) {
    breaker.wait_if_open().await;

    if breaker.should_probe() {
        if fetcher.probe_domain(crawl_domain).await {
            breaker.record_success();
            info!(worker_id, domain = crawl_domain, "circuit closed after successful probe");
        } else {
            breaker.record_probe_failure();
            breaker.record_site_wide_failure();
        }
        return;
    }

    let url = match input_queue.dequeue(Some(poll_timeout_seconds)).await {
        Ok(url) => url,
        Err(err) => {
            warn!(worker_id, error = %err, "queue error");
            tokio::time::sleep(std::time::Duration::from_secs(1)).await;
            return;
        }
    };
    let Some(url) = url else {
        report_queue_sizes(input_queue, dlq).await;
        return;
    };
    report_queue_sizes(input_queue, dlq).await;

    match fetcher.process(&url).await {
        Ok(FetchOutcome::Fetched(event)) => {
            breaker.record_success();
            counter!(PAGES_FETCHED_TOTAL).increment(1);
            info!(worker_id, url = %url, status_code = event.status_code, "page fetched");
        }
        Ok(FetchOutcome::SkippedRobots { .. }) => {
            counter!(PAGES_SKIPPED_ROBOTS_TOTAL).increment(1);
            tracing::debug!(worker_id, url = %url, "skipped by robots.txt");
        }
        Ok(FetchOutcome::SiteWide(failure)) => {
            if let Err(err) = input_queue.enqueue(&url).await {
                warn!(worker_id, url = %url, error = %err, "failed to re-enqueue");
            }
            counter!(PAGES_REQUEUED_TOTAL).increment(1);
            breaker.record_site_wide_failure();
            warn!(worker_id, url = %url, reason = %failure.reason, "site-wide failure, re-enqueued");
        }
        Ok(FetchOutcome::UrlSpecific(failure)) => {
            if let Err(err) = dlq.enqueue(&url).await {
                warn!(worker_id, url = %url, error = %err, "failed to send to dlq");
            }
            counter!(PAGES_FAILED_TOTAL).increment(1);
            counter!(DLQ_ENQUEUED_TOTAL).increment(1);
            warn!(worker_id, url = %url, reason = %failure.reason, "url failed, sent to dlq");
        }
        Err(err) => {
            warn!(worker_id, url = %url, error = %err, "infrastructure error processing url");
        }
    }
}

async fn report_queue_sizes(input_queue: &dyn Queue, dlq: &dyn Queue) {
    if let Ok(size) = input_queue.size().await {
        gauge!(INPUT_QUEUE_SIZE).set(size as f64);
    }
    if let Ok(size) = dlq.size().await {
        gauge!(DLQ_SIZE).set(size as f64);
    }
}
