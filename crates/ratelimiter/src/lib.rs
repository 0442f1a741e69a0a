//! Distributed per-domain rate limiter (§4.4): every fetcher process shares
//! one Redis instance, so the limit holds across the whole worker fleet, not
//! just within a single process.
//!
//! The check-and-set is a single atomic Lua script rather than a
//! GET-then-SET pair, so two workers racing on the same domain can't both
//! observe "allowed" for the same interval.

use std::time::{SystemTime, UNIX_EPOCH};

use otto_core::FetcherError;
use redis::aio::ConnectionManager;
use redis::Script;

const RATE_LIMIT_SCRIPT: &str = r#"
local key = KEYS[1]
local now = tonumber(ARGV[1])
local min_interval = tonumber(ARGV[2])
local ttl = tonumber(ARGV[3])
local last = redis.call('GET', key)
if last == false then
  redis.call('SET', key, now, 'EX', ttl)
  return 1
end
last = tonumber(last)
if now - last >= min_interval then
  redis.call('SET', key, now, 'EX', ttl)
  return 1
end
return 0
"#;

/// Blocks the caller until a request is allowed for a given domain, polling
/// a shared Redis key that records the domain's last-allowed timestamp.
pub struct RateLimiter {
    conn: ConnectionManager,
    script: Script,
    min_interval_seconds: f64,
    ttl_seconds: usize,
    poll_interval: std::time::Duration,
}

impl RateLimiter {
    pub async fn new(
        redis_url: &str,
        requests_per_second: f64,
        poll_interval: std::time::Duration,
    ) -> Result<Self, FetcherError> {
        let client = redis::Client::open(redis_url)
            .map_err(|e| FetcherError::Redis(format!("invalid redis url: {e}")))?;
        let conn = client
            .get_connection_manager()
            .await
            .map_err(|e| FetcherError::Redis(e.to_string()))?;
        let min_interval_seconds = if requests_per_second > 0.0 {
            1.0 / requests_per_second
        } else {
            0.0
        };
        let ttl_seconds = 2.max(min_interval_seconds as usize + 1);
        Ok(Self {
            conn,
            script: Script::new(RATE_LIMIT_SCRIPT),
            min_interval_seconds,
            ttl_seconds,
            poll_interval,
        })
    }

    /// Blocks until a request for `domain` is allowed, then returns. Retries
    /// at `poll_interval` while denied.
    pub async fn acquire(&self, domain: &str) -> Result<(), FetcherError> {
        let key = otto_core::rate_limit_key(domain);
        loop {
            let now = wall_clock_seconds();
            let mut conn = self.conn.clone();
            let allowed: i64 = self
                .script
                .key(&key)
                .arg(now)
                .arg(self.min_interval_seconds)
                .arg(self.ttl_seconds)
                .invoke_async(&mut conn)
                .await
                .map_err(|e| FetcherError::Redis(e.to_string()))?;
            if allowed == 1 {
                return Ok(());
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

/// Wall-clock seconds since the epoch, as a float, so independently running
/// fetcher processes agree on "now" without a shared clock source.
fn wall_clock_seconds() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}
