use std::{collections::BTreeSet, future::Future, sync::Arc};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Result;

mod fetcher;
pub use fetcher::BlockFetcher;

mod cache;
pub use cache::CachedBlockService;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub height: u64,
    pub time: DateTime<Utc>,
    pub proposer_address: String,
    /// Number of transactions the chain declares for this block.
    pub num_txs: u64,
}

pub trait BlockService: Send + Sync {
    /// Current chain height. Never cached.
    fn height(&self) -> impl Future<Output = Result<u64>> + Send;

    fn block(&self, height: u64) -> impl Future<Output = Result<Block>> + Send;

    /// Heights already present in the local store.
    fn cached_heights(&self) -> impl Future<Output = Result<BTreeSet<u64>>> + Send;
}

impl<S> BlockService for Arc<S>
where
    S: BlockService,
{
    fn height(&self) -> impl Future<Output = Result<u64>> + Send {
        (**self).height()
    }

    fn block(&self, height: u64) -> impl Future<Output = Result<Block>> + Send {
        (**self).block(height)
    }

    fn cached_heights(&self) -> impl Future<Output = Result<BTreeSet<u64>>> + Send {
        (**self).cached_heights()
    }
}
