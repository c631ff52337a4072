use std::collections::BTreeSet;

use log::debug;

use crate::{
    block::{Block, BlockService},
    errors::ResultExt,
    storage::BlockRepo,
    Result,
};

/// Cache-aside decorator over a [`BlockService`]. Reads hit the repo first; a miss is fetched from
/// the inner service and written through before being returned.
///
/// Two callers missing on the same height both fetch and both insert. With a uniqueness-enforcing
/// repo the loser gets a duplicate-key error.
#[derive(Debug, Clone)]
pub struct CachedBlockService<S, R> {
    inner: S,
    repo: R,
}

impl<S, R> CachedBlockService<S, R> {
    pub fn new(inner: S, repo: R) -> Self {
        Self { inner, repo }
    }
}

impl<S, R> BlockService for CachedBlockService<S, R>
where
    S: BlockService,
    R: BlockRepo,
{
    async fn height(&self) -> Result<u64> {
        self.inner.height().await
    }

    async fn block(&self, height: u64) -> Result<Block> {
        let context = || format!("CachedBlockService::block [#{}]", height);

        if let Some(block) = self.repo.fetch_block(height).await.context(context())? {
            return Ok(block);
        }

        let block = self.inner.block(height).await?;
        self.repo.insert_block(&block).await.context(context())?;
        debug!("Cached block #{}", height);

        Ok(block)
    }

    async fn cached_heights(&self) -> Result<BTreeSet<u64>> {
        self.repo
            .fetch_all_heights()
            .await
            .context("CachedBlockService::cached_heights")
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tokio::sync::Barrier;

    use super::*;
    use crate::{
        block::BlockFetcher,
        storage::{InMemoryRepo, RepoError},
        testing::StubProvider,
    };

    #[tokio::test]
    async fn test_miss_fetches_and_writes_through() {
        let provider = StubProvider::default().with_block(10, 2);
        let repo = InMemoryRepo::new();
        let service = CachedBlockService::new(BlockFetcher::new(provider.clone()), repo.clone());

        let block = service.block(10).await.unwrap();
        assert_eq!(block.num_txs, 2);
        assert_eq!(repo.fetch_block(10).await.unwrap(), Some(block));
        assert_eq!(provider.calls().get_block, 1);
    }

    #[tokio::test]
    async fn test_hit_never_consults_provider() {
        let provider = StubProvider::default().with_block(10, 2);
        let repo = InMemoryRepo::new();
        let service = CachedBlockService::new(BlockFetcher::new(provider.clone()), repo);

        let first = service.block(10).await.unwrap();
        let second = service.block(10).await.unwrap();
        let third = service.block(10).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(second, third);
        assert_eq!(provider.calls().get_block, 1);
    }

    /// Repo that never stores anything.
    struct RejectingRepo;

    impl BlockRepo for RejectingRepo {
        async fn fetch_block(&self, _height: u64) -> Result<Option<Block>, RepoError> {
            Ok(None)
        }

        async fn fetch_all_heights(&self) -> Result<BTreeSet<u64>, RepoError> {
            Ok(BTreeSet::new())
        }

        async fn insert_block(&self, block: &Block) -> Result<(), RepoError> {
            Err(RepoError::Duplicate {
                entity: "block",
                key: block.height.to_string(),
            })
        }
    }

    #[tokio::test]
    async fn test_failed_write_through_fails_the_call() {
        let provider = StubProvider::default().with_block(10, 2);
        let service = CachedBlockService::new(BlockFetcher::new(provider.clone()), RejectingRepo);

        assert!(service.block(10).await.is_err());
        assert_eq!(provider.calls().get_block, 1);
    }

    #[tokio::test]
    async fn test_height_is_never_cached() {
        let provider = StubProvider::default().with_height(42);
        let service = CachedBlockService::new(BlockFetcher::new(provider.clone()), InMemoryRepo::new());

        assert_eq!(service.height().await.unwrap(), 42);
        assert_eq!(service.height().await.unwrap(), 42);
        assert_eq!(provider.calls().get_block_height, 2);
    }

    #[tokio::test]
    async fn test_cached_heights_reads_repo() {
        let provider = StubProvider::default().with_block(3, 0).with_block(5, 1);
        let service = CachedBlockService::new(BlockFetcher::new(provider), InMemoryRepo::new());

        service.block(5).await.unwrap();
        service.block(3).await.unwrap();

        let heights: Vec<u64> = service.cached_heights().await.unwrap().into_iter().collect();
        assert_eq!(heights, vec![3, 5]);
    }

    #[tokio::test]
    async fn test_concurrent_misses_race_to_duplicate_key() {
        let barrier = Arc::new(Barrier::new(2));
        let provider = StubProvider::default()
            .with_block(7, 0)
            .with_barrier(barrier);
        let service = Arc::new(CachedBlockService::new(
            BlockFetcher::new(provider.clone()),
            InMemoryRepo::new(),
        ));

        let (a, b) = tokio::join!(service.block(7), service.block(7));

        // Both callers missed, so the provider served both.
        assert_eq!(provider.calls().get_block, 2);

        let results = [a, b];
        let ok = results.iter().filter(|r| r.is_ok()).count();
        let duplicates = results
            .iter()
            .filter(|r| matches!(r, Err(e) if e.is_duplicate_key()))
            .count();
        assert_eq!(ok, 1);
        assert_eq!(duplicates, 1);
    }
}
