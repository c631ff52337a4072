use std::{
    collections::{BTreeMap, BTreeSet, HashMap},
    sync::{Arc, Mutex, MutexGuard},
};

use crate::{
    block::Block,
    node::Node,
    param::ParamGroups,
    storage::{BlockRepo, NodeRepo, ParamRepo, RepoError, Schema, TransactionRepo},
    transaction::Transaction,
};

/// An entirely in-memory repo for every entity, useful for development and testing purposes.
///
/// Enforces the same unique keys as the SQL backend: inserting an existing block height, param
/// height or transaction hash fails with [`RepoError::Duplicate`].
#[derive(Debug, Clone, Default)]
pub struct InMemoryRepo {
    state: Arc<Mutex<State>>,
}

#[derive(Debug, Default)]
struct State {
    blocks: BTreeMap<u64, Block>,
    params: BTreeMap<u64, ParamGroups>,
    nodes: BTreeMap<(u64, String), Node>,
    transactions: HashMap<String, Transaction>,
    /// Hashes per height, in insertion order.
    transactions_by_height: BTreeMap<u64, Vec<String>>,
}

impl InMemoryRepo {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        // A panic while holding the lock cannot leave the maps half-written.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Schema for InMemoryRepo {
    async fn create_schema(&self) -> Result<(), RepoError> {
        Ok(())
    }

    async fn drop_schema_if_exists(&self) -> Result<(), RepoError> {
        *self.state() = State::default();
        Ok(())
    }
}

impl BlockRepo for InMemoryRepo {
    async fn fetch_block(&self, height: u64) -> Result<Option<Block>, RepoError> {
        Ok(self.state().blocks.get(&height).cloned())
    }

    async fn fetch_all_heights(&self) -> Result<BTreeSet<u64>, RepoError> {
        Ok(self.state().blocks.keys().copied().collect())
    }

    async fn insert_block(&self, block: &Block) -> Result<(), RepoError> {
        let mut state = self.state();
        if state.blocks.contains_key(&block.height) {
            return Err(RepoError::Duplicate {
                entity: "block",
                key: block.height.to_string(),
            });
        }
        state.blocks.insert(block.height, block.clone());
        Ok(())
    }
}

impl ParamRepo for InMemoryRepo {
    async fn fetch_params(&self, height: u64) -> Result<Option<ParamGroups>, RepoError> {
        Ok(self.state().params.get(&height).cloned())
    }

    async fn fetch_all_heights(&self) -> Result<BTreeSet<u64>, RepoError> {
        Ok(self.state().params.keys().copied().collect())
    }

    async fn insert_params(&self, params: &ParamGroups) -> Result<(), RepoError> {
        let mut state = self.state();
        if state.params.contains_key(&params.height) {
            return Err(RepoError::Duplicate {
                entity: "params",
                key: params.height.to_string(),
            });
        }
        state.params.insert(params.height, params.clone());
        Ok(())
    }

    async fn replace_params(&self, params: &ParamGroups) -> Result<(), RepoError> {
        self.state().params.insert(params.height, params.clone());
        Ok(())
    }
}

impl NodeRepo for InMemoryRepo {
    async fn fetch_nodes_at_height(&self, height: u64) -> Result<Vec<Node>, RepoError> {
        Ok(self
            .state()
            .nodes
            .range((height, String::new())..)
            .take_while(|((h, _), _)| *h == height)
            .map(|(_, node)| node.clone())
            .collect())
    }

    async fn upsert_node(&self, node: &Node) -> Result<(), RepoError> {
        self.state()
            .nodes
            .insert((node.height, node.address.clone()), node.clone());
        Ok(())
    }
}

impl TransactionRepo for InMemoryRepo {
    async fn fetch_transaction(&self, hash: &str) -> Result<Option<Transaction>, RepoError> {
        Ok(self.state().transactions.get(hash).cloned())
    }

    async fn fetch_transactions_at_height(&self, height: u64) -> Result<Vec<Transaction>, RepoError> {
        let state = self.state();
        Ok(state
            .transactions_by_height
            .get(&height)
            .into_iter()
            .flatten()
            .filter_map(|hash| state.transactions.get(hash).cloned())
            .collect())
    }

    async fn count_at_height(&self, height: u64) -> Result<u64, RepoError> {
        Ok(self
            .state()
            .transactions_by_height
            .get(&height)
            .map_or(0, |hashes| hashes.len() as u64))
    }

    async fn insert_transaction(&self, tx: &Transaction) -> Result<(), RepoError> {
        let mut state = self.state();
        if state.transactions.contains_key(&tx.hash) {
            return Err(RepoError::Duplicate {
                entity: "transaction",
                key: tx.hash.clone(),
            });
        }
        state.transactions.insert(tx.hash.clone(), tx.clone());
        state
            .transactions_by_height
            .entry(tx.height)
            .or_default()
            .push(tx.hash.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::{param::ParamGroup, testing::full_params};

    fn node(address: &str, height: u64, tokens: u64) -> Node {
        Node {
            address: address.to_string(),
            height,
            public_key: format!("{}-pk", address),
            jailed: false,
            status: 2,
            chains: vec!["0021".to_string()],
            service_url: "https://node.example.com:443".to_string(),
            tokens,
            unstaking_time: Utc.timestamp_opt(0, 0).unwrap(),
            output_address: String::new(),
        }
    }

    #[tokio::test]
    async fn test_block_height_is_unique() {
        let repo = InMemoryRepo::new();
        let block = Block {
            height: 3,
            time: Utc.timestamp_opt(1_650_000_000, 0).unwrap(),
            proposer_address: "p1".to_string(),
            num_txs: 0,
        };

        repo.insert_block(&block).await.unwrap();
        let err = repo.insert_block(&block).await.unwrap_err();
        assert!(matches!(err, RepoError::Duplicate { entity: "block", .. }));
    }

    #[tokio::test]
    async fn test_params_insert_is_unique_but_replace_overwrites() {
        let repo = InMemoryRepo::new();
        let mut first = ParamGroups::from_rpc(4, full_params());
        first.node = ParamGroup::default();
        repo.insert_params(&first).await.unwrap();

        let second = ParamGroups::from_rpc(4, full_params());
        let err = repo.insert_params(&second).await.unwrap_err();
        assert!(matches!(err, RepoError::Duplicate { entity: "params", .. }));

        repo.replace_params(&second).await.unwrap();
        assert_eq!(repo.fetch_params(4).await.unwrap(), Some(second));
    }

    #[tokio::test]
    async fn test_nodes_are_scoped_by_height_and_upserted() {
        let repo = InMemoryRepo::new();
        repo.upsert_node(&node("a", 1, 10)).await.unwrap();
        repo.upsert_node(&node("a", 2, 10)).await.unwrap();
        repo.upsert_node(&node("b", 2, 10)).await.unwrap();
        repo.upsert_node(&node("a", 2, 99)).await.unwrap();

        let at_two = repo.fetch_nodes_at_height(2).await.unwrap();
        assert_eq!(at_two.len(), 2);
        assert_eq!(at_two[0].tokens, 99);
        assert_eq!(repo.fetch_nodes_at_height(1).await.unwrap().len(), 1);
        assert!(repo.fetch_nodes_at_height(3).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_drop_schema_clears_everything() {
        let repo = InMemoryRepo::new();
        repo.upsert_node(&node("a", 1, 10)).await.unwrap();

        repo.drop_schema_if_exists().await.unwrap();
        assert!(repo.fetch_nodes_at_height(1).await.unwrap().is_empty());
    }
}
