//! Event sink abstraction over the partitioned log events are published to
//! (§4.3). The only implementation is Kafka, but callers depend on the
//! [`EventSink`] trait so a unit test can swap in a recording fake.

use std::time::Duration;

use async_trait::async_trait;
use otto_core::FetcherError;
use rdkafka::config::ClientConfig;
use rdkafka::producer::{FutureProducer, FutureRecord};
use tracing::warn;

/// Publishes a message to a topic, partitioned by `key` when given.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn send(&self, topic: &str, key: &[u8], value: &[u8]) -> Result<(), FetcherError>;

    /// Flushes any pending sends. Called once at shutdown so in-flight
    /// publishes aren't dropped when the process exits.
    async fn close(&self) -> Result<(), FetcherError>;
}

/// `rdkafka` `FutureProducer` wrapper. One producer handle is shared (and
/// cheaply cloned) across every worker task in a process.
#[derive(Clone)]
pub struct KafkaEventSink {
    producer: FutureProducer,
}

impl KafkaEventSink {
    pub fn new(bootstrap_servers: &str) -> Result<Self, FetcherError> {
        let producer = ClientConfig::new()
            .set("bootstrap.servers", bootstrap_servers)
            .set("message.timeout.ms", "30000")
            .create()
            .map_err(|e| FetcherError::Kafka(e.to_string()))?;
        Ok(Self { producer })
    }
}

#[async_trait]
impl EventSink for KafkaEventSink {
    async fn send(&self, topic: &str, key: &[u8], value: &[u8]) -> Result<(), FetcherError> {
        let record = FutureRecord::to(topic).key(key).payload(value);
        match self.producer.send(record, Duration::from_secs(30)).await {
            Ok(_) => Ok(()),
            Err((err, _)) => {
                warn!(topic, error = %err, "kafka send failed");
                Err(FetcherError::Kafka(err.to_string()))
            }
        }
    }

    async fn close(&self) -> Result<(), FetcherError> {
        let producer = self.producer.clone();
        tokio::task::spawn_blocking(move || producer.flush(Duration::from_secs(30)))
            .await
            .map_err(|e| FetcherError::Kafka(e.to_string()))?
            .map_err(|e| FetcherError::Kafka(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// In-memory sink for exercising fetcher/scheduler logic without a
    /// broker. Records every publish for assertion.
    #[derive(Default)]
    pub struct RecordingEventSink {
        pub sent: Mutex<Vec<(String, Vec<u8>, Vec<u8>)>>,
    }

    #[async_trait]
    impl EventSink for RecordingEventSink {
        async fn send(&self, topic: &str, key: &[u8], value: &[u8]) -> Result<(), FetcherError> {
            self.sent
                .lock()
                .unwrap()
                .push((topic.to_string(), key.to_vec(), value.to_vec()));
            Ok(())
        }

        async fn close(&self) -> Result<(), FetcherError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn recording_sink_captures_topic_key_and_value() {
        let sink = RecordingEventSink::default();
        sink.send("webpage_log", b"key1", b"value1").await.unwrap();
        let sent = sink.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "webpage_log");
        assert_eq!(sent[0].1, b"key1");
        assert_eq!(sent[0].2, b"value1");
    }
}
