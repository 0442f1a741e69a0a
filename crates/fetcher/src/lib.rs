//! Page Fetcher: the worker pool that consumes URLs from the crawler queue,
//! checks robots.txt, rate-limits per domain, fetches, caches, and emits
//! `webpage_fetched` events (§4.5-§4.8).

pub mod classify;
pub mod config;
pub mod fetcher;
pub mod robots_fetch;
pub mod run;

pub use config::FetcherConfig;
pub use fetcher::Fetcher;
pub use run::run_fetcher;
