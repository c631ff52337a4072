use std::time::Duration;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use log::{info, warn};
use pokt_indexer_core::{
    backfill::{Backfill as BatchDriver, BackfillConfig, BackfillReport},
    block::BlockService,
    sync::{BlockSync, NodeSync, ParamSync, SyncTask, TransactionSync},
    transaction::UnknownMessagePolicy,
};

use crate::common::{self, Repo, RpcOptions, StoreBackend, StoreOptions};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Entity {
    Blocks,
    Params,
    Nodes,
    Transactions,
}

#[derive(Debug, Parser)]
pub struct Backfill {
    #[clap(flatten)]
    rpc: RpcOptions,
    #[clap(flatten)]
    store: StoreOptions,
    /// Records to sync
    #[clap(long, value_enum, default_value_t = Entity::Blocks)]
    entity: Entity,
    /// Highest height to sync. Defaults to the current chain height
    #[clap(long)]
    from_height: Option<u64>,
    /// Number of heights synced concurrently
    #[clap(long, env, default_value_t = 10)]
    batch_size: usize,
    /// Upper bound on the sync of a single height, in seconds
    #[clap(long, env)]
    request_timeout_secs: Option<u64>,
    /// What to do with transactions of an unmodelled type: `retain` or `reject`
    #[clap(long, env, default_value = "retain")]
    unknown_messages: UnknownMessagePolicy,
}

impl Backfill {
    pub async fn run(self) -> Result<()> {
        match self.store.store {
            StoreBackend::Sqlite => self.run_with(self.store.sqlite().await?).await,
            StoreBackend::Redis => self.run_with(self.store.redis().await?).await,
        }
    }

    async fn run_with<R: Repo>(&self, repo: R) -> Result<()> {
        let provider = self.rpc.provider()?;

        let from_height = match self.from_height {
            Some(height) => height,
            None => common::blocks(&provider, &repo).height().await?,
        };
        info!("Backfilling {:?} from #{}", self.entity, from_height);

        let report = match self.entity {
            Entity::Blocks => {
                self.drive(BlockSync(common::blocks(&provider, &repo)), from_height)
                    .await
            }
            Entity::Params => {
                self.drive(ParamSync(common::params(&provider, &repo)), from_height)
                    .await
            }
            Entity::Nodes => {
                self.drive(NodeSync(common::nodes(&provider, &repo)), from_height)
                    .await
            }
            Entity::Transactions => {
                let service = common::transactions(&provider, &repo, self.unknown_messages);
                self.drive(TransactionSync(service), from_height).await
            }
        };

        if !report.failed.is_empty() {
            let heights: Vec<u64> = report.failed.iter().map(|(height, _)| *height).collect();
            warn!("{} heights failed to sync: {:?}", heights.len(), heights);
        }
        Ok(())
    }

    async fn drive<T: SyncTask + 'static>(&self, task: T, from_height: u64) -> BackfillReport {
        let config = BackfillConfig {
            batch_size: self.batch_size,
            request_timeout: self.request_timeout_secs.map(Duration::from_secs),
        };
        BatchDriver::new(task, config).run(from_height).await
    }
}
