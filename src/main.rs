use anyhow::Result;
use clap::Parser;

// mimalloc handles the bursty allocation pattern of a worker pool under
// high concurrency better than glibc malloc, which doesn't release memory
// back to the OS as readily.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use otto_fetcher::{run_fetcher, FetcherConfig};

/// Page Fetcher: consumes URLs from the crawler queue, fetches them, and
/// publishes `webpage_fetched` events. Configured entirely via
/// `PAGE_FETCHER_*` environment variables; see README for the full list.
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
    let config = FetcherConfig::from_env()?;
    run_fetcher(config).await
}
