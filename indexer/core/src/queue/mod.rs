use std::{fmt, future::Future, sync::Arc};

use serde::{de::DeserializeOwned, Serialize};

mod in_memory;
pub use in_memory::InMemoryQueue;

mod redis;
pub use self::redis::RedisQueue;

/// The named queues, one per entity kind synced in the background.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueueName {
    Blocks,
    Params,
    Nodes,
}

impl QueueName {
    pub const ALL: [QueueName; 3] = [QueueName::Blocks, QueueName::Params, QueueName::Nodes];

    /// Broker key of the queue.
    pub fn as_str(&self) -> &'static str {
        match self {
            QueueName::Blocks => "blockHeightsToProcess",
            QueueName::Params => "paramHeightsToProcess",
            QueueName::Nodes => "nodeHeightsToProcess",
        }
    }
}

impl fmt::Display for QueueName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("queue broker error: {0}")]
    Broker(#[from] ::redis::RedisError),
    #[error("malformed payload on {queue}: {source}")]
    Payload {
        queue: QueueName,
        #[source]
        source: serde_json::Error,
    },
    #[error("queue {0} closed")]
    Closed(QueueName),
}

/// FIFO job queues shared between producers and consumers.
///
/// Delivery is at-most-once: a value is gone from the queue as soon as it is dequeued, whether or
/// not the consumer finishes its work.
pub trait JobQueue: Send + Sync {
    /// Serializes `value` and appends it to `queue`.
    fn enqueue<T>(
        &self,
        queue: QueueName,
        value: &T,
    ) -> impl Future<Output = Result<(), QueueError>> + Send
    where
        T: Serialize + Sync;

    /// Waits until `queue` has an item, then removes and deserializes it.
    fn dequeue<T>(&self, queue: QueueName) -> impl Future<Output = Result<T, QueueError>> + Send
    where
        T: DeserializeOwned + Send;
}

impl<Q> JobQueue for Arc<Q>
where
    Q: JobQueue,
{
    fn enqueue<T>(
        &self,
        queue: QueueName,
        value: &T,
    ) -> impl Future<Output = Result<(), QueueError>> + Send
    where
        T: Serialize + Sync,
    {
        (**self).enqueue(queue, value)
    }

    fn dequeue<T>(&self, queue: QueueName) -> impl Future<Output = Result<T, QueueError>> + Send
    where
        T: DeserializeOwned + Send,
    {
        (**self).dequeue(queue)
    }
}

fn encode<T: Serialize>(queue: QueueName, value: &T) -> Result<String, QueueError> {
    serde_json::to_string(value).map_err(|source| QueueError::Payload { queue, source })
}

fn decode<T: DeserializeOwned>(queue: QueueName, payload: &str) -> Result<T, QueueError> {
    serde_json::from_str(payload).map_err(|source| QueueError::Payload { queue, source })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_names_are_fixed() {
        let names: Vec<&str> = QueueName::ALL.iter().map(QueueName::as_str).collect();
        assert_eq!(
            names,
            vec![
                "blockHeightsToProcess",
                "paramHeightsToProcess",
                "nodeHeightsToProcess"
            ]
        );
    }

    #[test]
    fn test_height_wire_format() {
        assert_eq!(encode(QueueName::Blocks, &42u64).unwrap(), "42");
        assert_eq!(decode::<u64>(QueueName::Blocks, "42").unwrap(), 42);
        assert!(matches!(
            decode::<u64>(QueueName::Params, "\"forty-two\""),
            Err(QueueError::Payload {
                queue: QueueName::Params,
                ..
            })
        ));
    }
}
