use std::{collections::BTreeSet, future::Future, sync::Arc};

use crate::{block::Block, node::Node, param::ParamGroups, transaction::Transaction};

mod in_memory;
pub use in_memory::InMemoryRepo;

mod sql_lite;
pub use sql_lite::SqliteDb;

mod redis_kv;
pub use redis_kv::RedisKvRepo;

#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error("duplicate {entity} {key}")]
    Duplicate { entity: &'static str, key: String },
    #[error("sqlx error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("{field} value {value} does not fit a storage integer")]
    Overflow { field: &'static str, value: u64 },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Schema lifecycle, performed once before any service runs.
pub trait Schema {
    fn create_schema(&self) -> impl Future<Output = Result<(), RepoError>> + Send;

    fn drop_schema_if_exists(&self) -> impl Future<Output = Result<(), RepoError>> + Send;
}

pub trait BlockRepo: Send + Sync {
    fn fetch_block(
        &self,
        height: u64,
    ) -> impl Future<Output = Result<Option<Block>, RepoError>> + Send;

    fn fetch_all_heights(&self) -> impl Future<Output = Result<BTreeSet<u64>, RepoError>> + Send;

    fn insert_block(&self, block: &Block) -> impl Future<Output = Result<(), RepoError>> + Send;
}

pub trait ParamRepo: Send + Sync {
    fn fetch_params(
        &self,
        height: u64,
    ) -> impl Future<Output = Result<Option<ParamGroups>, RepoError>> + Send;

    fn fetch_all_heights(&self) -> impl Future<Output = Result<BTreeSet<u64>, RepoError>> + Send;

    fn insert_params(
        &self,
        params: &ParamGroups,
    ) -> impl Future<Output = Result<(), RepoError>> + Send;

    /// Overwrites every group stored at `params.height`, inserting if none are stored.
    fn replace_params(
        &self,
        params: &ParamGroups,
    ) -> impl Future<Output = Result<(), RepoError>> + Send;
}

pub trait NodeRepo: Send + Sync {
    fn fetch_nodes_at_height(
        &self,
        height: u64,
    ) -> impl Future<Output = Result<Vec<Node>, RepoError>> + Send;

    /// Inserts the node, or replaces the one stored under the same `(address, height)`.
    fn upsert_node(&self, node: &Node) -> impl Future<Output = Result<(), RepoError>> + Send;
}

pub trait TransactionRepo: Send + Sync {
    fn fetch_transaction(
        &self,
        hash: &str,
    ) -> impl Future<Output = Result<Option<Transaction>, RepoError>> + Send;

    fn fetch_transactions_at_height(
        &self,
        height: u64,
    ) -> impl Future<Output = Result<Vec<Transaction>, RepoError>> + Send;

    fn count_at_height(&self, height: u64) -> impl Future<Output = Result<u64, RepoError>> + Send;

    fn insert_transaction(
        &self,
        tx: &Transaction,
    ) -> impl Future<Output = Result<(), RepoError>> + Send;
}

impl<R: Schema> Schema for Arc<R> {
    fn create_schema(&self) -> impl Future<Output = Result<(), RepoError>> + Send {
        (**self).create_schema()
    }

    fn drop_schema_if_exists(&self) -> impl Future<Output = Result<(), RepoError>> + Send {
        (**self).drop_schema_if_exists()
    }
}

impl<R: BlockRepo> BlockRepo for Arc<R> {
    fn fetch_block(
        &self,
        height: u64,
    ) -> impl Future<Output = Result<Option<Block>, RepoError>> + Send {
        (**self).fetch_block(height)
    }

    fn fetch_all_heights(&self) -> impl Future<Output = Result<BTreeSet<u64>, RepoError>> + Send {
        (**self).fetch_all_heights()
    }

    fn insert_block(&self, block: &Block) -> impl Future<Output = Result<(), RepoError>> + Send {
        (**self).insert_block(block)
    }
}

impl<R: ParamRepo> ParamRepo for Arc<R> {
    fn fetch_params(
        &self,
        height: u64,
    ) -> impl Future<Output = Result<Option<ParamGroups>, RepoError>> + Send {
        (**self).fetch_params(height)
    }

    fn fetch_all_heights(&self) -> impl Future<Output = Result<BTreeSet<u64>, RepoError>> + Send {
        (**self).fetch_all_heights()
    }

    fn insert_params(
        &self,
        params: &ParamGroups,
    ) -> impl Future<Output = Result<(), RepoError>> + Send {
        (**self).insert_params(params)
    }

    fn replace_params(
        &self,
        params: &ParamGroups,
    ) -> impl Future<Output = Result<(), RepoError>> + Send {
        (**self).replace_params(params)
    }
}

impl<R: NodeRepo> NodeRepo for Arc<R> {
    fn fetch_nodes_at_height(
        &self,
        height: u64,
    ) -> impl Future<Output = Result<Vec<Node>, RepoError>> + Send {
        (**self).fetch_nodes_at_height(height)
    }

    fn upsert_node(&self, node: &Node) -> impl Future<Output = Result<(), RepoError>> + Send {
        (**self).upsert_node(node)
    }
}

impl<R: TransactionRepo> TransactionRepo for Arc<R> {
    fn fetch_transaction(
        &self,
        hash: &str,
    ) -> impl Future<Output = Result<Option<Transaction>, RepoError>> + Send {
        (**self).fetch_transaction(hash)
    }

    fn fetch_transactions_at_height(
        &self,
        height: u64,
    ) -> impl Future<Output = Result<Vec<Transaction>, RepoError>> + Send {
        (**self).fetch_transactions_at_height(height)
    }

    fn count_at_height(&self, height: u64) -> impl Future<Output = Result<u64, RepoError>> + Send {
        (**self).count_at_height(height)
    }

    fn insert_transaction(
        &self,
        tx: &Transaction,
    ) -> impl Future<Output = Result<(), RepoError>> + Send {
        (**self).insert_transaction(tx)
    }
}
