use std::collections::BTreeSet;

use log::trace;

use crate::{
    block::{Block, BlockService},
    errors::ResultExt,
    provider::{Provider, ProviderError},
    Result,
};

/// Uncached block service reading straight from the provider.
#[derive(Debug, Clone)]
pub struct BlockFetcher<P> {
    provider: P,
}

impl<P> BlockFetcher<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }
}

impl<P> BlockService for BlockFetcher<P>
where
    P: Provider,
{
    async fn height(&self) -> Result<u64> {
        self.provider
            .get_block_height()
            .await
            .context("BlockFetcher::height")
    }

    async fn block(&self, height: u64) -> Result<Block> {
        let context = || format!("BlockFetcher::block [#{}]", height);

        let output = self.provider.get_block(height).await.context(context())?;
        let header = output.block.header;

        let num_txs = header
            .num_txs
            .trim()
            .parse::<u64>()
            .map_err(|_| ProviderError::InvalidField {
                field: "num_txs",
                value: header.num_txs.clone(),
            })
            .context(context())?;

        trace!("Fetched block #{} with {} transactions", height, num_txs);

        Ok(Block {
            height,
            time: header.time,
            proposer_address: header.proposer_address,
            num_txs,
        })
    }

    async fn cached_heights(&self) -> Result<BTreeSet<u64>> {
        Ok(BTreeSet::new())
    }
}
