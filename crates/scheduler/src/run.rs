use std::path::Path;
use std::time::{Duration, Instant};

use metrics::{counter, gauge};
use otto_core::FetcherError;
use otto_kv::{Queue, RedisQueue};
use otto_metrics::crawler_scheduler::{
    CRAWLER_QUEUE_SIZE, LOOP_LAG_SECONDS, SEED_URLS_ENQUEUED_TOTAL, URLS_ENQUEUED_TOTAL,
};
use tokio::signal::unix::{signal, SignalKind};
use tracing::{info, warn};

use crate::config::SchedulerConfig;
use crate::seeds::{enqueue_seeds, load_seeds};

/// Runs the Crawler Scheduler: seeds the output queue once at startup, then
/// moves URLs from the upstream queue to it with backpressure until a
/// shutdown signal arrives (§4.9).
pub async fn run_scheduler(config: SchedulerConfig) -> anyhow::Result<()> {
    let input_queue = RedisQueue::new(&config.redis_url, &config.input_queue).await?;
    let output_queue = RedisQueue::new(&config.redis_url, &config.output_queue).await?;

    otto_metrics::install_prometheus_exporter(config.metrics_listen_addr.parse()?).await?;

    info!(
        redis_url = %config.redis_url,
        input_queue = %config.input_queue,
        output_queue = %config.output_queue,
        max_queue_size = config.max_queue_size,
        seed_file = %config.seed_file_path,
        "scheduler starting"
    );

    let seeds = load_seeds(Path::new(&config.seed_file_path));
    if seeds.is_empty() {
        info!(seed_file = %config.seed_file_path, "no seeds to enqueue");
    } else {
        let enqueued = enqueue_seeds(&output_queue, config.max_queue_size, &seeds).await?;
        counter!(SEED_URLS_ENQUEUED_TOTAL).increment(enqueued as u64);
        info!(seed_count = seeds.len(), enqueued, "seeds enqueued");
    }

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigquit = signal(SignalKind::quit())?;

    let mut last_success_at = Instant::now();
    loop {
        tokio::select! {
            _ = sigint.recv() => { info!("received SIGINT"); break; }
            _ = sigterm.recv() => { info!("received SIGTERM"); break; }
            _ = sigquit.recv() => { info!("received SIGQUIT"); break; }
            _ = scheduler_tick(&input_queue as &dyn Queue, &output_queue as &dyn Queue, &config, &mut last_success_at) => {}
        }
    }

    info!("scheduler shutting down");
    Ok(())
}

async fn scheduler_tick(
    input_queue: &dyn Queue,
    output_queue: &dyn Queue,
    config: &SchedulerConfig,
    last_success_at: &mut Instant,
) {
    let url = match input_queue.dequeue(Some(config.poll_timeout_seconds)).await {
        Ok(url) => url,
        Err(err) => {
            let backoff = if is_connection_error(&err) {
                warn!(error = %err, "redis connection error, will retry");
                Duration::from_secs(2)
            } else {
                warn!(error = %err, "redis error");
                Duration::from_secs(1)
            };
            tokio::time::sleep(backoff).await;
            return;
        }
    };
    let Some(url) = url else {
        gauge!(LOOP_LAG_SECONDS).set(last_success_at.elapsed().as_secs_f64());
        return;
    };

    let current_size = match output_queue.size().await {
        Ok(size) => size,
        Err(err) => {
            warn!(error = %err, "redis error checking output queue size");
            tokio::time::sleep(Duration::from_secs(1)).await;
            return;
        }
    };
    gauge!(CRAWLER_QUEUE_SIZE).set(current_size as f64);

    if current_size >= config.max_queue_size {
        warn!(url, current = current_size, "backpressure: output queue at max size, re-queuing to input");
        if let Err(err) = input_queue.requeue_at_head(&url).await {
            warn!(url, error = %err, "failed to re-queue url after backpressure");
        }
        return;
    }

    if let Err(err) = output_queue.enqueue(&url).await {
        warn!(url, error = %err, "failed to enqueue url to output queue");
        return;
    }
    counter!(URLS_ENQUEUED_TOTAL).increment(1);
    *last_success_at = Instant::now();
    gauge!(LOOP_LAG_SECONDS).set(0.0);
    info!(url, output_queue_size = current_size + 1, "url moved to crawler queue");
}

/// Redis connection-level failures (as opposed to e.g. a script error) get
/// a longer backoff before retrying, matching the original two-tier
/// distinction between `ConnectionError` and other `RedisError`s.
fn is_connection_error(err: &FetcherError) -> bool {
    matches!(err, FetcherError::Redis(msg) if msg.to_lowercase().contains("connection"))
}
