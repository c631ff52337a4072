use std::{
    collections::{HashMap, VecDeque},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
};

use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::Notify;

use crate::queue::{decode, encode, JobQueue, QueueError, QueueName};

/// In-process job queue, useful for development and testing purposes. Values go through the same
/// JSON encoding as the broker-backed queue.
#[derive(Debug, Clone, Default)]
pub struct InMemoryQueue {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    queues: Mutex<HashMap<QueueName, VecDeque<String>>>,
    notify: Notify,
    closed: AtomicBool,
}

impl InMemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of items waiting on `queue`.
    pub fn len(&self, queue: QueueName) -> usize {
        self.queues().get(&queue).map_or(0, VecDeque::len)
    }

    pub fn is_empty(&self, queue: QueueName) -> bool {
        self.len(queue) == 0
    }

    /// Makes every pending and future dequeue on an empty queue fail with [`QueueError::Closed`],
    /// the in-memory stand-in for a lost broker.
    pub fn close(&self) {
        self.inner.closed.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }

    fn queues(&self) -> std::sync::MutexGuard<'_, HashMap<QueueName, VecDeque<String>>> {
        self.inner
            .queues
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn pop(&self, queue: QueueName) -> Option<String> {
        self.queues().get_mut(&queue).and_then(VecDeque::pop_front)
    }
}

impl JobQueue for InMemoryQueue {
    async fn enqueue<T>(&self, queue: QueueName, value: &T) -> Result<(), QueueError>
    where
        T: Serialize + Sync,
    {
        let payload = encode(queue, value)?;
        self.queues().entry(queue).or_default().push_back(payload);
        self.inner.notify.notify_waiters();
        Ok(())
    }

    async fn dequeue<T>(&self, queue: QueueName) -> Result<T, QueueError>
    where
        T: DeserializeOwned + Send,
    {
        loop {
            let notified = self.inner.notify.notified();
            tokio::pin!(notified);
            // Register before checking so a push between the check and the await is not missed.
            notified.as_mut().enable();

            if let Some(payload) = self.pop(queue) {
                return decode(queue, &payload);
            }
            if self.inner.closed.load(Ordering::SeqCst) {
                return Err(QueueError::Closed(queue));
            }

            notified.await;
        }
    }
}
