use std::{future::Future, sync::Arc};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Result;

mod fetcher;
pub use fetcher::NodeFetcher;

mod cache;
pub use cache::CachedNodeService;

/// A staked validator as seen at one height. Keyed by `(address, height)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub address: String,
    pub height: u64,
    pub public_key: String,
    pub jailed: bool,
    pub status: i32,
    pub chains: Vec<String>,
    pub service_url: String,
    pub tokens: u64,
    pub unstaking_time: DateTime<Utc>,
    pub output_address: String,
}

pub trait NodeService: Send + Sync {
    fn nodes_at_height(&self, height: u64) -> impl Future<Output = Result<Vec<Node>>> + Send;

    /// Nodes already stored for `height`, without consulting the provider.
    fn cached_nodes_at_height(
        &self,
        height: u64,
    ) -> impl Future<Output = Result<Vec<Node>>> + Send;
}

impl<S> NodeService for Arc<S>
where
    S: NodeService,
{
    fn nodes_at_height(&self, height: u64) -> impl Future<Output = Result<Vec<Node>>> + Send {
        (**self).nodes_at_height(height)
    }

    fn cached_nodes_at_height(
        &self,
        height: u64,
    ) -> impl Future<Output = Result<Vec<Node>>> + Send {
        (**self).cached_nodes_at_height(height)
    }
}
