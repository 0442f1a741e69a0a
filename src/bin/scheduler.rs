use anyhow::Result;
use clap::Parser;

use otto_scheduler::{run_scheduler, SchedulerConfig};

/// Crawler Scheduler: moves URLs from an upstream queue into the crawler
/// queue with backpressure, and seeds it once at startup. Configured
/// entirely via `CRAWLER_SCHEDULER_*` environment variables.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {}

fn main() -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(async_main())
}

async fn async_main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let Cli {} = Cli::parse();
    let config = SchedulerConfig::from_env()?;
    run_scheduler(config).await
}
