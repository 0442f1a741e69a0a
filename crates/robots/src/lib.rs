//! robots.txt fetching, caching, and rule evaluation (§4.5).
//!
//! Parsed rules are never cached in memory; the cache holds the raw
//! robots.txt body, and [`robotstxt::DefaultMatcher`] re-parses it on every
//! call. This matches the upstream behavior: cheap to re-parse, and keeps
//! this crate free of its own expiry bookkeeping since it defers to the
//! shared [`Cache`].

use async_trait::async_trait;
use otto_core::{robots_cache_key, domain_of, FetcherError};
use otto_kv::Cache;
use robotstxt::DefaultMatcher;
use std::sync::Arc;
use tracing::debug;

/// Fetches the raw robots.txt body for a domain. Implemented by the HTTP
/// client in `otto-fetcher`; kept as a trait here so this crate has no
/// direct dependency on `reqwest`.
#[async_trait]
pub trait RobotsFetch: Send + Sync {
    /// Returns `None` if the domain has no robots.txt, or the fetch failed
    /// in a way that should be treated permissively.
    async fn fetch_robots_txt(&self, domain: &str) -> Option<String>;
}

pub struct RobotsChecker {
    cache: Arc<dyn Cache>,
    fetcher: Arc<dyn RobotsFetch>,
    cache_ttl_seconds: u64,
    user_agent: String,
}

impl RobotsChecker {
    pub fn new(
        cache: Arc<dyn Cache>,
        fetcher: Arc<dyn RobotsFetch>,
        cache_ttl_seconds: u64,
        user_agent: impl Into<String>,
    ) -> Self {
        Self {
            cache,
            fetcher,
            cache_ttl_seconds,
            user_agent: user_agent.into(),
        }
    }

    /// Returns whether `url` may be fetched. Defaults to `true` (permissive)
    /// when the URL has no host, or when robots.txt could not be fetched.
    pub async fn is_allowed(&self, url: &str) -> Result<bool, FetcherError> {
        let domain = domain_of(url);
        if domain.is_empty() {
            return Ok(true);
        }
        let cache_key = robots_cache_key(&domain);
        let body = match self.cache.get(&cache_key).await? {
            Some(cached) => cached,
            None => match self.fetcher.fetch_robots_txt(&domain).await {
                Some(body) => {
                    self.cache
                        .set(&cache_key, &body, Some(self.cache_ttl_seconds))
                        .await?;
                    body
                }
                None => {
                    debug!(domain, "robots.txt unavailable, defaulting to allow");
                    return Ok(true);
                }
            },
        };
        let mut matcher = DefaultMatcher::default();
        Ok(matcher.one_agent_allowed_by_robots(&body, &self.user_agent, url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct FixedFetcher(Option<String>);

    #[async_trait]
    impl RobotsFetch for FixedFetcher {
        async fn fetch_robots_txt(&self, _domain: &str) -> Option<String> {
            self.0.clone()
        }
    }

    #[derive(Default)]
    struct MemCache(Mutex<std::collections::HashMap<String, String>>);

    #[async_trait]
    impl Cache for MemCache {
        async fn get(&self, key: &str) -> Result<Option<String>, FetcherError> {
            Ok(self.0.lock().unwrap().get(key).cloned())
        }
        async fn set(
            &self,
            key: &str,
            value: &str,
            _ttl_seconds: Option<u64>,
        ) -> Result<(), FetcherError> {
            self.0.lock().unwrap().insert(key.to_string(), value.to_string());
            Ok(())
        }
    }

    #[tokio::test]
    async fn url_with_no_host_is_allowed() {
        let checker = RobotsChecker::new(
            Arc::new(MemCache::default()),
            Arc::new(FixedFetcher(None)),
            3600,
            "OttoBot/1.0",
        );
        assert!(checker.is_allowed("not a url").await.unwrap());
    }

    #[tokio::test]
    async fn unfetchable_robots_defaults_to_allow() {
        let checker = RobotsChecker::new(
            Arc::new(MemCache::default()),
            Arc::new(FixedFetcher(None)),
            3600,
            "OttoBot/1.0",
        );
        assert!(checker.is_allowed("https://example.com/anything").await.unwrap());
    }

    #[tokio::test]
    async fn disallowed_path_is_rejected() {
        let robots = "User-agent: *\nDisallow: /private\n";
        let checker = RobotsChecker::new(
            Arc::new(MemCache::default()),
            Arc::new(FixedFetcher(Some(robots.to_string()))),
            3600,
            "OttoBot/1.0",
        );
        assert!(!checker.is_allowed("https://example.com/private/page").await.unwrap());
        assert!(checker.is_allowed("https://example.com/public").await.unwrap());
    }

    #[tokio::test]
    async fn second_call_for_same_domain_uses_cache_not_fetcher() {
        struct CountingFetcher(std::sync::atomic::AtomicUsize);

        #[async_trait]
        impl RobotsFetch for CountingFetcher {
            async fn fetch_robots_txt(&self, _domain: &str) -> Option<String> {
                self.0.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                Some("User-agent: *\nAllow: /\n".to_string())
            }
        }
        let fetcher = Arc::new(CountingFetcher(std::sync::atomic::AtomicUsize::new(0)));
        let checker = RobotsChecker::new(
            Arc::new(MemCache::default()),
            fetcher.clone(),
            3600,
            "OttoBot/1.0",
        );
        checker.is_allowed("https://example.com/a").await.unwrap();
        checker.is_allowed("https://example.com/b").await.unwrap();
        assert_eq!(fetcher.0.load(std::sync::atomic::Ordering::SeqCst), 1);
    }
}
