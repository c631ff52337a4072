use log::trace;
use redis::{
    aio::{ConnectionManager, MultiplexedConnection},
    AsyncCommands, Client,
};
use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::Mutex;

use crate::queue::{decode, encode, JobQueue, QueueError, QueueName};

/// Job queue on Redis lists: `RPUSH` to enqueue, `BLPOP` with no timeout to dequeue.
///
/// A pending `BLPOP` ties up its connection, so every clone opens its own connection for
/// dequeues on first use. Give each consumer its own clone.
pub struct RedisQueue {
    client: Client,
    conn: ConnectionManager,
    blocking: Mutex<Option<MultiplexedConnection>>,
}

impl RedisQueue {
    pub async fn new(redis_url: &str) -> Result<Self, QueueError> {
        let client = Client::open(redis_url)?;
        let conn = ConnectionManager::new(client.clone()).await?;

        Ok(Self {
            client,
            conn,
            blocking: Mutex::new(None),
        })
    }
}

impl Clone for RedisQueue {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            conn: self.conn.clone(),
            blocking: Mutex::new(None),
        }
    }
}

impl JobQueue for RedisQueue {
    async fn enqueue<T>(&self, queue: QueueName, value: &T) -> Result<(), QueueError>
    where
        T: Serialize + Sync,
    {
        let payload = encode(queue, value)?;
        let mut conn = self.conn.clone();
        conn.rpush::<_, _, ()>(queue.as_str(), payload).await?;
        Ok(())
    }

    async fn dequeue<T>(&self, queue: QueueName) -> Result<T, QueueError>
    where
        T: DeserializeOwned + Send,
    {
        let mut blocking = self.blocking.lock().await;
        let mut conn = match blocking.take() {
            Some(conn) => conn,
            None => {
                trace!("Opening blocking connection for {}", queue);
                self.client.get_multiplexed_async_connection().await?
            }
        };

        let (_, payload) = redis::cmd("BLPOP")
            .arg(queue.as_str())
            .arg(0)
            .query_async::<_, (String, String)>(&mut conn)
            .await?;

        // A failed pop drops the connection; the next call reconnects.
        *blocking = Some(conn);
        decode(queue, &payload)
    }
}
