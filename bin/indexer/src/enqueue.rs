use anyhow::Result;
use clap::Parser;
use log::info;
use pokt_indexer_core::{jobs::JobCreator, queue::RedisQueue};

use crate::common::{self, Repo, RpcOptions, StoreBackend, StoreOptions};

#[derive(Debug, Parser)]
pub struct Enqueue {
    #[clap(flatten)]
    rpc: RpcOptions,
    #[clap(flatten)]
    store: StoreOptions,
    /// Highest height to consider. Defaults to the current chain height
    #[clap(long)]
    from_height: Option<u64>,
}

impl Enqueue {
    pub async fn run(self) -> Result<()> {
        match self.store.store {
            StoreBackend::Sqlite => self.run_with(self.store.sqlite().await?).await,
            StoreBackend::Redis => self.run_with(self.store.redis().await?).await,
        }
    }

    async fn run_with<R: Repo>(&self, repo: R) -> Result<()> {
        let provider = self.rpc.provider()?;
        let queue = RedisQueue::new(&self.store.redis_url).await?;

        let creator = JobCreator::new(
            common::blocks(&provider, &repo),
            common::params(&provider, &repo),
            queue,
        );

        let height = match self.from_height {
            Some(height) => height,
            None => creator.chain_height().await?,
        };

        let report = creator.enqueue_missing(height).await?;
        creator.enqueue_nodes(height).await?;

        info!(
            "Enqueued {} blocks, {} param sets and node sync at #{}",
            report.blocks, report.params, height
        );
        Ok(())
    }
}
