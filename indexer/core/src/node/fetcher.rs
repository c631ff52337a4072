use crate::{
    errors::{DecodeError, ResultExt},
    node::{Node, NodeService},
    pagination::{collect_pages, Page, PER_PAGE},
    provider::{PageRequest, Provider, ProviderError, RpcNode},
    utils::parse_int,
    Result,
};

#[derive(Debug, Clone)]
pub struct NodeFetcher<P> {
    provider: P,
    per_page: u64,
}

impl<P> NodeFetcher<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            per_page: PER_PAGE,
        }
    }

    pub fn with_per_page(mut self, per_page: u64) -> Self {
        self.per_page = per_page.max(1);
        self
    }
}

impl<P> NodeService for NodeFetcher<P>
where
    P: Provider,
{
    async fn nodes_at_height(&self, height: u64) -> Result<Vec<Node>> {
        let context = || format!("NodeFetcher::nodes_at_height [#{}]", height);

        let nodes = collect_pages(self.per_page, |page| async move {
            let output = self
                .provider
                .get_nodes(PageRequest {
                    height,
                    page,
                    per_page: self.per_page,
                })
                .await?;
            Ok::<_, ProviderError>(Page {
                items: output.result,
                total_pages: output.total_pages,
            })
        })
        .await
        .context(context())?;

        nodes
            .into_iter()
            .map(|node| into_node(height, node).context(context()))
            .collect()
    }

    async fn cached_nodes_at_height(&self, _height: u64) -> Result<Vec<Node>> {
        Ok(Vec::new())
    }
}

fn into_node(height: u64, node: RpcNode) -> Result<Node, DecodeError> {
    Ok(Node {
        tokens: parse_int("tokens", &node.tokens)?,
        address: node.address,
        height,
        public_key: node.public_key,
        jailed: node.jailed,
        status: node.status,
        chains: node.chains,
        service_url: node.service_url,
        unstaking_time: node.unstaking_time,
        output_address: node.output_address,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        testing::{rpc_node, StubProvider},
        Error,
    };

    #[tokio::test]
    async fn test_walks_every_page() {
        let nodes = (0..25).map(|i| rpc_node(&format!("node{:02}", i), "1000")).collect();
        let provider = StubProvider::default().with_nodes(8, nodes);
        let fetcher = NodeFetcher::new(provider.clone()).with_per_page(10);

        let nodes = fetcher.nodes_at_height(8).await.unwrap();
        assert_eq!(nodes.len(), 25);
        assert!(nodes.iter().all(|n| n.height == 8 && n.tokens == 1000));
        assert_eq!(provider.calls().get_nodes, 3);
    }

    #[tokio::test]
    async fn test_invalid_tokens_is_a_decode_error() {
        let provider = StubProvider::default().with_nodes(8, vec![rpc_node("node00", "lots")]);
        let fetcher = NodeFetcher::new(provider);

        assert!(matches!(
            fetcher.nodes_at_height(8).await,
            Err(Error::Decode { .. })
        ));
    }
}
