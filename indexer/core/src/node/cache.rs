use log::debug;

use crate::{
    errors::ResultExt,
    node::{Node, NodeService},
    storage::NodeRepo,
    Result,
};

/// Write-through decorator over a [`NodeService`]. Nodes are mutable, so every call re-reads the
/// provider and upserts each node.
#[derive(Debug, Clone)]
pub struct CachedNodeService<S, R> {
    inner: S,
    repo: R,
}

impl<S, R> CachedNodeService<S, R> {
    pub fn new(inner: S, repo: R) -> Self {
        Self { inner, repo }
    }
}

impl<S, R> NodeService for CachedNodeService<S, R>
where
    S: NodeService,
    R: NodeRepo,
{
    async fn nodes_at_height(&self, height: u64) -> Result<Vec<Node>> {
        let nodes = self.inner.nodes_at_height(height).await?;

        for node in &nodes {
            self.repo.upsert_node(node).await.context(format!(
                "CachedNodeService::nodes_at_height [#{} {}]",
                height, node.address
            ))?;
        }
        debug!("Upserted {} nodes at #{}", nodes.len(), height);

        Ok(nodes)
    }

    async fn cached_nodes_at_height(&self, height: u64) -> Result<Vec<Node>> {
        self.repo
            .fetch_nodes_at_height(height)
            .await
            .context(format!("CachedNodeService::cached_nodes_at_height [#{}]", height))
    }
}
