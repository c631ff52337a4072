use std::{collections::BTreeSet, time::Duration};

use log::trace;
use redis::{aio::ConnectionManager, AsyncCommands, Client};
use serde::{de::DeserializeOwned, Serialize};

use crate::{
    block::Block,
    node::Node,
    param::ParamGroups,
    storage::{BlockRepo, NodeRepo, ParamRepo, RepoError, Schema, TransactionRepo},
    transaction::Transaction,
};

const BLOCK_HEIGHTS: &str = "block_heights";
const PARAM_HEIGHTS: &str = "param_heights";
const KEY_PATTERNS: [&str; 6] = ["block:*", "params:*", "node:*", "nodes:*", "tx:*", "txs:*"];

fn block_key(height: u64) -> String {
    format!("block:{}", height)
}

fn params_key(height: u64) -> String {
    format!("params:{}", height)
}

fn node_key(height: u64, address: &str) -> String {
    format!("node:{}:{}", height, address)
}

fn nodes_index_key(height: u64) -> String {
    format!("nodes:{}", height)
}

fn tx_key(hash: &str) -> String {
    format!("tx:{}", hash)
}

fn txs_index_key(height: u64) -> String {
    format!("txs:{}", height)
}

/// Key-value repo on Redis. Values are JSON under composite keys, with per-height index sets.
///
/// Writes are plain `SET`s, so a second insert for an existing key silently overwrites it. Blocks
/// and params optionally expire after `ttl`, after which they are fetched again.
#[derive(Clone)]
pub struct RedisKvRepo {
    conn: ConnectionManager,
    ttl: Option<Duration>,
}

impl RedisKvRepo {
    pub async fn new(redis_url: &str, ttl: Option<Duration>) -> Result<Self, RepoError> {
        let client = Client::open(redis_url)?;
        let conn = ConnectionManager::new(client).await?;

        Ok(Self { conn, ttl })
    }

    async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, RepoError> {
        let mut conn = self.conn.clone();
        let cached: Option<String> = conn.get(key).await?;
        match cached {
            Some(data) => Ok(Some(serde_json::from_str(&data)?)),
            None => Ok(None),
        }
    }

    async fn get_many_json<T: DeserializeOwned>(&self, keys: &[String]) -> Result<Vec<T>, RepoError> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let mut conn = self.conn.clone();
        let values: Vec<Option<String>> = redis::cmd("MGET").arg(keys).query_async(&mut conn).await?;
        values
            .into_iter()
            .flatten()
            .map(|data| serde_json::from_str(&data).map_err(RepoError::from))
            .collect()
    }

    async fn set_json<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        ttl: Option<Duration>,
    ) -> Result<(), RepoError> {
        let mut conn = self.conn.clone();
        let serialized = serde_json::to_string(value)?;

        match ttl {
            Some(ttl) => conn.set_ex::<_, _, ()>(key, serialized, ttl.as_secs().max(1)).await?,
            None => conn.set::<_, _, ()>(key, serialized).await?,
        }
        trace!("SET {}", key);
        Ok(())
    }

    /// Heights in `index` whose value under `key_of` has not expired.
    async fn live_heights(
        &self,
        index: &str,
        key_of: fn(u64) -> String,
    ) -> Result<BTreeSet<u64>, RepoError> {
        let mut conn = self.conn.clone();
        let heights: Vec<u64> = conn.smembers(index).await?;
        if heights.is_empty() {
            return Ok(BTreeSet::new());
        }

        let mut pipe = redis::pipe();
        for height in &heights {
            pipe.exists(key_of(*height));
        }
        let exists: Vec<bool> = pipe.query_async(&mut conn).await?;

        Ok(heights
            .into_iter()
            .zip(exists)
            .filter_map(|(height, exists)| exists.then_some(height))
            .collect())
    }
}

impl Schema for RedisKvRepo {
    async fn create_schema(&self) -> Result<(), RepoError> {
        Ok(())
    }

    async fn drop_schema_if_exists(&self) -> Result<(), RepoError> {
        let mut conn = self.conn.clone();
        let mut keys: Vec<String> = vec![BLOCK_HEIGHTS.to_string(), PARAM_HEIGHTS.to_string()];
        for pattern in KEY_PATTERNS {
            let matched: Vec<String> = conn.keys(pattern).await?;
            keys.extend(matched);
        }
        conn.del::<_, ()>(keys).await?;
        Ok(())
    }
}

impl BlockRepo for RedisKvRepo {
    async fn fetch_block(&self, height: u64) -> Result<Option<Block>, RepoError> {
        self.get_json(&block_key(height)).await
    }

    async fn fetch_all_heights(&self) -> Result<BTreeSet<u64>, RepoError> {
        self.live_heights(BLOCK_HEIGHTS, block_key).await
    }

    async fn insert_block(&self, block: &Block) -> Result<(), RepoError> {
        self.set_json(&block_key(block.height), block, self.ttl).await?;
        let mut conn = self.conn.clone();
        conn.sadd::<_, _, ()>(BLOCK_HEIGHTS, block.height).await?;
        Ok(())
    }
}

impl ParamRepo for RedisKvRepo {
    async fn fetch_params(&self, height: u64) -> Result<Option<ParamGroups>, RepoError> {
        self.get_json(&params_key(height)).await
    }

    async fn fetch_all_heights(&self) -> Result<BTreeSet<u64>, RepoError> {
        self.live_heights(PARAM_HEIGHTS, params_key).await
    }

    async fn insert_params(&self, params: &ParamGroups) -> Result<(), RepoError> {
        self.set_json(&params_key(params.height), params, self.ttl).await?;
        let mut conn = self.conn.clone();
        conn.sadd::<_, _, ()>(PARAM_HEIGHTS, params.height).await?;
        Ok(())
    }

    async fn replace_params(&self, params: &ParamGroups) -> Result<(), RepoError> {
        self.insert_params(params).await
    }
}

impl NodeRepo for RedisKvRepo {
    async fn fetch_nodes_at_height(&self, height: u64) -> Result<Vec<Node>, RepoError> {
        let mut conn = self.conn.clone();
        let mut addresses: Vec<String> = conn.smembers(nodes_index_key(height)).await?;
        addresses.sort();

        let keys: Vec<String> = addresses.iter().map(|a| node_key(height, a)).collect();
        self.get_many_json(&keys).await
    }

    async fn upsert_node(&self, node: &Node) -> Result<(), RepoError> {
        self.set_json(&node_key(node.height, &node.address), node, None)
            .await?;
        let mut conn = self.conn.clone();
        conn.sadd::<_, _, ()>(nodes_index_key(node.height), &node.address)
            .await?;
        Ok(())
    }
}

impl TransactionRepo for RedisKvRepo {
    async fn fetch_transaction(&self, hash: &str) -> Result<Option<Transaction>, RepoError> {
        self.get_json(&tx_key(hash)).await
    }

    async fn fetch_transactions_at_height(&self, height: u64) -> Result<Vec<Transaction>, RepoError> {
        let mut conn = self.conn.clone();
        let mut hashes: Vec<String> = conn.smembers(txs_index_key(height)).await?;
        hashes.sort();

        let keys: Vec<String> = hashes.iter().map(|h| tx_key(h)).collect();
        self.get_many_json(&keys).await
    }

    async fn count_at_height(&self, height: u64) -> Result<u64, RepoError> {
        let mut conn = self.conn.clone();
        Ok(conn.scard(txs_index_key(height)).await?)
    }

    async fn insert_transaction(&self, tx: &Transaction) -> Result<(), RepoError> {
        self.set_json(&tx_key(&tx.hash), tx, None).await?;
        let mut conn = self.conn.clone();
        conn.sadd::<_, _, ()>(txs_index_key(tx.height), &tx.hash)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    async fn setup_repo(ttl: Option<Duration>) -> RedisKvRepo {
        let url = std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1/".to_string());
        let repo = RedisKvRepo::new(&url, ttl).await.expect("Failed to connect to redis");
        repo.drop_schema_if_exists().await.expect("Failed to clear redis");
        repo
    }

    fn block(height: u64) -> Block {
        Block {
            height,
            time: Utc.timestamp_opt(1_650_000_000, 0).unwrap(),
            proposer_address: "p1".to_string(),
            num_txs: 1,
        }
    }

    #[tokio::test]
    #[ignore = "requires a running redis server"]
    async fn test_duplicate_block_insert_overwrites() {
        let repo = setup_repo(None).await;

        repo.insert_block(&block(3)).await.unwrap();
        repo.insert_block(&block(3)).await.unwrap();

        assert_eq!(repo.fetch_block(3).await.unwrap(), Some(block(3)));
        assert_eq!(
            BlockRepo::fetch_all_heights(&repo).await.unwrap().into_iter().collect::<Vec<_>>(),
            vec![3]
        );
    }

    #[tokio::test]
    #[ignore = "requires a running redis server"]
    async fn test_block_expires_after_ttl() {
        let repo = setup_repo(Some(Duration::from_secs(1))).await;

        repo.insert_block(&block(4)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(2100)).await;

        assert_eq!(repo.fetch_block(4).await.unwrap(), None);
        assert!(BlockRepo::fetch_all_heights(&repo).await.unwrap().is_empty());
    }
}
