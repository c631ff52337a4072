use std::{future::Future, sync::Arc};

use crate::{
    block::BlockService, node::NodeService, param::ParamService,
    transaction::TransactionService, Result,
};

/// One unit of background work: bring the records of one height into the local store through a
/// cache-aside service.
pub trait SyncTask: Send + Sync {
    /// Entity name used in logs.
    fn entity(&self) -> &'static str;

    /// Syncs `height`, returning the number of records it covered.
    fn sync(&self, height: u64) -> impl Future<Output = Result<usize>> + Send;
}

impl<T> SyncTask for Arc<T>
where
    T: SyncTask,
{
    fn entity(&self) -> &'static str {
        (**self).entity()
    }

    fn sync(&self, height: u64) -> impl Future<Output = Result<usize>> + Send {
        (**self).sync(height)
    }
}

#[derive(Debug, Clone)]
pub struct BlockSync<S>(pub S);

impl<S: BlockService> SyncTask for BlockSync<S> {
    fn entity(&self) -> &'static str {
        "block"
    }

    async fn sync(&self, height: u64) -> Result<usize> {
        self.0.block(height).await.map(|_| 1)
    }
}

#[derive(Debug, Clone)]
pub struct ParamSync<S>(pub S);

impl<S: ParamService> SyncTask for ParamSync<S> {
    fn entity(&self) -> &'static str {
        "params"
    }

    async fn sync(&self, height: u64) -> Result<usize> {
        self.0.params(height).await.map(|_| 1)
    }
}

#[derive(Debug, Clone)]
pub struct NodeSync<S>(pub S);

impl<S: NodeService> SyncTask for NodeSync<S> {
    fn entity(&self) -> &'static str {
        "nodes"
    }

    async fn sync(&self, height: u64) -> Result<usize> {
        self.0.nodes_at_height(height).await.map(|nodes| nodes.len())
    }
}

#[derive(Debug, Clone)]
pub struct TransactionSync<S>(pub S);

impl<S: TransactionService> SyncTask for TransactionSync<S> {
    fn entity(&self) -> &'static str {
        "transactions"
    }

    async fn sync(&self, height: u64) -> Result<usize> {
        self.0
            .block_transactions(height)
            .await
            .map(|batch| batch.transactions.len())
    }
}
