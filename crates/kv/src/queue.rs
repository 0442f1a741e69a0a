use async_trait::async_trait;
use otto_core::FetcherError;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

/// FIFO queue of UTF-8 string items (§4.1). No exactly-once delivery: a
/// single producer's enqueues are observed in order by any single consumer,
/// but there is no cross-consumer ordering guarantee.
#[async_trait]
pub trait Queue: Send + Sync {
    /// Append `item` to the tail of the queue.
    async fn enqueue(&self, item: &str) -> Result<(), FetcherError>;

    /// Push `item` back onto the *head* of the queue, so it is the next
    /// item a consumer sees. Used for scheduler backpressure (§4.9) and is
    /// distinct from `enqueue`, which appends at the tail.
    async fn requeue_at_head(&self, item: &str) -> Result<(), FetcherError>;

    /// Remove and return the item at the head of the queue.
    ///
    /// `timeout_seconds` of `None` or `Some(0.0)` is non-blocking: returns
    /// `None` immediately if the queue is empty. A positive timeout blocks
    /// up to that many seconds, returning `None` on timeout.
    async fn dequeue(&self, timeout_seconds: Option<f64>) -> Result<Option<String>, FetcherError>;

    /// Current queue length. May be stale under concurrent writers.
    async fn size(&self) -> Result<usize, FetcherError>;
}

/// Queue backed by a Redis list: `RPUSH`/`LPUSH` at the tail/head,
/// `BLPOP`/`LPOP` from the head.
#[derive(Clone)]
pub struct RedisQueue {
    conn: ConnectionManager,
    name: String,
}

impl RedisQueue {
    pub async fn new(redis_url: &str, name: impl Into<String>) -> Result<Self, FetcherError> {
        let client = redis::Client::open(redis_url)
            .map_err(|e| FetcherError::Redis(format!("invalid redis url: {e}")))?;
        let conn = client
            .get_connection_manager()
            .await
            .map_err(|e| FetcherError::Redis(e.to_string()))?;
        Ok(Self {
            conn,
            name: name.into(),
        })
    }
}

#[async_trait]
impl Queue for RedisQueue {
    async fn enqueue(&self, item: &str) -> Result<(), FetcherError> {
        let mut conn = self.conn.clone();
        conn.rpush::<_, _, ()>(&self.name, item)
            .await
            .map_err(|e| FetcherError::Redis(e.to_string()))
    }

    async fn requeue_at_head(&self, item: &str) -> Result<(), FetcherError> {
        let mut conn = self.conn.clone();
        conn.lpush::<_, _, ()>(&self.name, item)
            .await
            .map_err(|e| FetcherError::Redis(e.to_string()))
    }

    async fn dequeue(&self, timeout_seconds: Option<f64>) -> Result<Option<String>, FetcherError> {
        let mut conn = self.conn.clone();
        match timeout_seconds {
            None => conn
                .lpop(&self.name, None)
                .await
                .map_err(|e| FetcherError::Redis(e.to_string())),
            Some(t) if t <= 0.0 => conn
                .lpop(&self.name, None)
                .await
                .map_err(|e| FetcherError::Redis(e.to_string())),
            Some(t) => {
                let result: Option<(String, String)> = conn
                    .blpop(&self.name, t)
                    .await
                    .map_err(|e| FetcherError::Redis(e.to_string()))?;
                Ok(result.map(|(_key, value)| value))
            }
        }
    }

    async fn size(&self) -> Result<usize, FetcherError> {
        let mut conn = self.conn.clone();
        conn.llen(&self.name)
            .await
            .map_err(|e| FetcherError::Redis(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Requires a reachable Redis instance at `redis://127.0.0.1:6379`.
    /// Run with `cargo test -- --ignored` against a local Redis container.
    #[ignore]
    #[tokio::test]
    async fn enqueue_dequeue_round_trip() {
        let name = format!("otto-kv-test-{}", std::process::id());
        let queue = RedisQueue::new("redis://127.0.0.1:6379", &name)
            .await
            .expect("connect to redis");
        queue.enqueue("https://example.com/a").await.unwrap();
        queue.enqueue("https://example.com/b").await.unwrap();
        assert_eq!(queue.size().await.unwrap(), 2);
        let first = queue.dequeue(None).await.unwrap();
        assert_eq!(first.as_deref(), Some("https://example.com/a"));
    }

    #[ignore]
    #[tokio::test]
    async fn requeue_at_head_is_lifo_relative_to_enqueue() {
        let name = format!("otto-kv-test-head-{}", std::process::id());
        let queue = RedisQueue::new("redis://127.0.0.1:6379", &name)
            .await
            .expect("connect to redis");
        queue.enqueue("https://example.com/newer").await.unwrap();
        queue
            .requeue_at_head("https://example.com/retry")
            .await
            .unwrap();
        let first = queue.dequeue(None).await.unwrap();
        assert_eq!(first.as_deref(), Some("https://example.com/retry"));
    }

    #[ignore]
    #[tokio::test]
    async fn dequeue_times_out_on_empty_queue() {
        let name = format!("otto-kv-test-empty-{}", std::process::id());
        let queue = RedisQueue::new("redis://127.0.0.1:6379", &name)
            .await
            .expect("connect to redis");
        let result = queue.dequeue(Some(0.2)).await.unwrap();
        assert_eq!(result, None);
    }
}
