use async_trait::async_trait;
use otto_core::FetcherError;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

/// Opaque string key-value store with optional expiry (§4.2), used to cache
/// fetched page bodies and robots.txt contents.
#[async_trait]
pub trait Cache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, FetcherError>;

    /// Store `value` under `key`. `ttl_seconds` of `None` means no expiry.
    async fn set(
        &self,
        key: &str,
        value: &str,
        ttl_seconds: Option<u64>,
    ) -> Result<(), FetcherError>;
}

/// Cache backed by plain Redis `GET`/`SET`/`SETEX`.
#[derive(Clone)]
pub struct RedisCache {
    conn: ConnectionManager,
}

impl RedisCache {
    pub async fn new(redis_url: &str) -> Result<Self, FetcherError> {
        let client = redis::Client::open(redis_url)
            .map_err(|e| FetcherError::Redis(format!("invalid redis url: {e}")))?;
        let conn = client
            .get_connection_manager()
            .await
            .map_err(|e| FetcherError::Redis(e.to_string()))?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl Cache for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<String>, FetcherError> {
        let mut conn = self.conn.clone();
        conn.get(key).await.map_err(|e| FetcherError::Redis(e.to_string()))
    }

    async fn set(
        &self,
        key: &str,
        value: &str,
        ttl_seconds: Option<u64>,
    ) -> Result<(), FetcherError> {
        let mut conn = self.conn.clone();
        match ttl_seconds {
            Some(ttl) if ttl > 0 => conn
                .set_ex::<_, _, ()>(key, value, ttl)
                .await
                .map_err(|e| FetcherError::Redis(e.to_string())),
            _ => conn
                .set::<_, _, ()>(key, value)
                .await
                .map_err(|e| FetcherError::Redis(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Requires a reachable Redis instance at `redis://127.0.0.1:6379`.
    #[ignore]
    #[tokio::test]
    async fn set_then_get_round_trips() {
        let cache = RedisCache::new("redis://127.0.0.1:6379")
            .await
            .expect("connect to redis");
        let key = format!("otto-kv-test-cache-{}", std::process::id());
        cache.set(&key, "body", Some(60)).await.unwrap();
        assert_eq!(cache.get(&key).await.unwrap().as_deref(), Some("body"));
    }

    #[ignore]
    #[tokio::test]
    async fn get_missing_key_is_none() {
        let cache = RedisCache::new("redis://127.0.0.1:6379")
            .await
            .expect("connect to redis");
        let result = cache.get("otto-kv-test-cache-missing-key").await.unwrap();
        assert_eq!(result, None);
    }
}
