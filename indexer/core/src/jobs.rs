use log::{debug, info};

use crate::{
    block::BlockService,
    param::ParamService,
    queue::{JobQueue, QueueName},
    Result,
};

/// Number of heights pushed per queue by one [`JobCreator::enqueue_missing`] walk.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct EnqueueReport {
    pub blocks: u64,
    pub params: u64,
}

/// Producer side of the background sync: finds heights that are not cached yet and queues them
/// for the worker pools.
#[derive(Debug, Clone)]
pub struct JobCreator<B, P, Q> {
    blocks: B,
    params: P,
    queue: Q,
}

impl<B, P, Q> JobCreator<B, P, Q>
where
    B: BlockService,
    P: ParamService,
    Q: JobQueue,
{
    pub fn new(blocks: B, params: P, queue: Q) -> Self {
        Self {
            blocks,
            params,
            queue,
        }
    }

    /// Walks `from_height` down to 1 and queues every height missing a cached block or param
    /// set. A queue failure aborts the walk; heights already pushed stay queued.
    pub async fn enqueue_missing(&self, from_height: u64) -> Result<EnqueueReport> {
        let cached_blocks = self.blocks.cached_heights().await?;
        let cached_params = self.params.cached_heights().await?;
        debug!(
            "{} blocks and {} param sets already cached",
            cached_blocks.len(),
            cached_params.len()
        );

        let mut report = EnqueueReport::default();
        for height in (1..=from_height).rev() {
            if !cached_blocks.contains(&height) {
                self.queue.enqueue(QueueName::Blocks, &height).await?;
                report.blocks += 1;
            }
            if !cached_params.contains(&height) {
                self.queue.enqueue(QueueName::Params, &height).await?;
                report.params += 1;
            }
        }

        info!(
            "Queued {} block heights and {} param heights below #{}",
            report.blocks, report.params, from_height
        );
        Ok(report)
    }

    /// Queues one node-sync job for `height`.
    pub async fn enqueue_nodes(&self, height: u64) -> Result<()> {
        self.queue.enqueue(QueueName::Nodes, &height).await?;
        debug!("Queued node sync for #{}", height);
        Ok(())
    }

    /// Current chain height, as seen by the block service.
    pub async fn chain_height(&self) -> Result<u64> {
        self.blocks.height().await
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use serde::Serialize;

    use super::*;
    use crate::{
        block::{Block, BlockFetcher, CachedBlockService},
        param::{CachedParamService, ParamFetcher, ParamGroups},
        queue::{InMemoryQueue, QueueError},
        storage::{BlockRepo, InMemoryRepo, ParamRepo},
        testing::{full_params, StubProvider},
        Error,
    };

    type Creator<Q> = JobCreator<
        CachedBlockService<BlockFetcher<StubProvider>, InMemoryRepo>,
        CachedParamService<ParamFetcher<StubProvider>, InMemoryRepo>,
        Q,
    >;

    fn creator<Q: JobQueue>(provider: &StubProvider, repo: &InMemoryRepo, queue: Q) -> Creator<Q> {
        JobCreator::new(
            CachedBlockService::new(BlockFetcher::new(provider.clone()), repo.clone()),
            CachedParamService::new(ParamFetcher::new(provider.clone()), repo.clone()),
            queue,
        )
    }

    async fn drain(queue: &InMemoryQueue, name: QueueName) -> Vec<u64> {
        let mut heights = Vec::new();
        while !queue.is_empty(name) {
            heights.push(queue.dequeue::<u64>(name).await.unwrap());
        }
        heights
    }

    #[tokio::test]
    async fn test_enqueues_only_uncached_heights() {
        let provider = StubProvider::default().with_height(5);
        let repo = InMemoryRepo::new();
        let queue = InMemoryQueue::new();

        for height in [2, 4] {
            let block = Block {
                height,
                time: Utc.timestamp_opt(1_650_000_000, 0).unwrap(),
                proposer_address: "proposer".to_string(),
                num_txs: 0,
            };
            repo.insert_block(&block).await.unwrap();
        }
        repo.insert_params(&ParamGroups::from_rpc(3, full_params()))
            .await
            .unwrap();

        let creator = creator(&provider, &repo, queue.clone());
        let height = creator.chain_height().await.unwrap();
        let report = creator.enqueue_missing(height).await.unwrap();

        assert_eq!(report, EnqueueReport { blocks: 3, params: 4 });
        assert_eq!(drain(&queue, QueueName::Blocks).await, vec![5, 3, 1]);
        assert_eq!(drain(&queue, QueueName::Params).await, vec![5, 4, 2, 1]);
        assert_eq!(provider.calls().get_block, 0);
        assert_eq!(provider.calls().get_all_params, 0);
    }

    #[tokio::test]
    async fn test_enqueue_nodes() {
        let queue = InMemoryQueue::new();
        let creator = creator(&StubProvider::default(), &InMemoryRepo::new(), queue.clone());

        creator.enqueue_nodes(12).await.unwrap();
        assert_eq!(drain(&queue, QueueName::Nodes).await, vec![12]);
        assert!(queue.is_empty(QueueName::Blocks));
    }

    /// Queue whose broker is gone.
    struct DownQueue;

    impl JobQueue for DownQueue {
        async fn enqueue<T>(&self, queue: QueueName, _value: &T) -> Result<(), QueueError>
        where
            T: Serialize + Sync,
        {
            Err(QueueError::Closed(queue))
        }

        async fn dequeue<T>(&self, queue: QueueName) -> Result<T, QueueError>
        where
            T: serde::de::DeserializeOwned + Send,
        {
            Err(QueueError::Closed(queue))
        }
    }

    #[tokio::test]
    async fn test_queue_failure_aborts_walk() {
        let creator = creator(&StubProvider::default(), &InMemoryRepo::new(), DownQueue);

        assert!(matches!(
            creator.enqueue_missing(3).await,
            Err(Error::Queue(QueueError::Closed(QueueName::Blocks)))
        ));
    }
}
