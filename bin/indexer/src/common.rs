use std::time::Duration;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use pokt_indexer_core::{
    block::{BlockFetcher, CachedBlockService},
    node::{CachedNodeService, NodeFetcher},
    param::{CachedParamService, ParamFetcher},
    provider::{PocketRpcProvider, RpcProviderConfig},
    storage::{BlockRepo, NodeRepo, ParamRepo, RedisKvRepo, Schema, SqliteDb, TransactionRepo},
    transaction::{CachedTransactionService, TransactionFetcher, UnknownMessagePolicy},
};
use url::Url;

pub const DEFAULT_DB_PATH: &str = "pokt-indexer.db";
pub const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379";

/// 10 seconds.
pub const GRACEFUL_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Parser)]
pub struct RpcOptions {
    /// Pocket node RPC URL
    #[clap(long, env)]
    pub rpc_url: Url,
    /// Attempts per provider call, including the first one
    #[clap(long, env, default_value_t = 3)]
    pub provider_retries: u32,
    /// Timeout of a single provider HTTP request, in seconds
    #[clap(long, env, default_value_t = 30)]
    pub provider_timeout_secs: u64,
}

impl RpcOptions {
    pub fn provider(&self) -> Result<PocketRpcProvider> {
        let mut config = RpcProviderConfig::new(self.rpc_url.clone());
        config.retries = self.provider_retries;
        config.timeout = Duration::from_secs(self.provider_timeout_secs);

        Ok(PocketRpcProvider::new(config)?)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StoreBackend {
    Sqlite,
    Redis,
}

#[derive(Debug, Parser)]
pub struct StoreOptions {
    /// Where synced records are kept
    #[clap(long, env, value_enum, default_value_t = StoreBackend::Sqlite)]
    pub store: StoreBackend,
    /// Path to the SQLite database file
    #[clap(long, env, default_value = DEFAULT_DB_PATH)]
    pub db_path: String,
    /// Maximum number of pooled database connections
    #[clap(long, env, default_value_t = 20)]
    pub max_db_connections: u32,
    /// Redis URL, used by the job queue and by the redis store
    #[clap(long, env, default_value = DEFAULT_REDIS_URL)]
    pub redis_url: String,
    /// Expiry of blocks and params in the redis store, in seconds. 0 keeps them forever
    #[clap(long, env, default_value_t = 10_800)]
    pub kv_ttl_secs: u64,
}

impl StoreOptions {
    pub async fn sqlite(&self) -> Result<SqliteDb> {
        Ok(SqliteDb::new(&self.db_path, self.max_db_connections).await?)
    }

    pub async fn redis(&self) -> Result<RedisKvRepo> {
        let ttl = (self.kv_ttl_secs > 0).then(|| Duration::from_secs(self.kv_ttl_secs));
        Ok(RedisKvRepo::new(&self.redis_url, ttl).await?)
    }
}

/// Everything a command needs from a store backend.
pub trait Repo:
    Schema + BlockRepo + ParamRepo + NodeRepo + TransactionRepo + Clone + Send + Sync + 'static
{
}

impl<T> Repo for T where
    T: Schema + BlockRepo + ParamRepo + NodeRepo + TransactionRepo + Clone + Send + Sync + 'static
{
}

pub type Blocks<R> = CachedBlockService<BlockFetcher<PocketRpcProvider>, R>;
pub type Params<R> = CachedParamService<ParamFetcher<PocketRpcProvider>, R>;
pub type Nodes<R> = CachedNodeService<NodeFetcher<PocketRpcProvider>, R>;
pub type Transactions<R> =
    CachedTransactionService<TransactionFetcher<PocketRpcProvider>, Blocks<R>, R>;

pub fn blocks<R: Repo>(provider: &PocketRpcProvider, repo: &R) -> Blocks<R> {
    CachedBlockService::new(BlockFetcher::new(provider.clone()), repo.clone())
}

pub fn params<R: Repo>(provider: &PocketRpcProvider, repo: &R) -> Params<R> {
    CachedParamService::new(ParamFetcher::new(provider.clone()), repo.clone())
}

pub fn nodes<R: Repo>(provider: &PocketRpcProvider, repo: &R) -> Nodes<R> {
    CachedNodeService::new(NodeFetcher::new(provider.clone()), repo.clone())
}

pub fn transactions<R: Repo>(
    provider: &PocketRpcProvider,
    repo: &R,
    policy: UnknownMessagePolicy,
) -> Transactions<R> {
    CachedTransactionService::new(
        TransactionFetcher::new(provider.clone()).with_unknown_message_policy(policy),
        blocks(provider, repo),
        repo.clone(),
    )
}
