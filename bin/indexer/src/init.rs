use anyhow::Result;
use clap::Parser;
use log::info;
use pokt_indexer_core::storage::Schema;

use crate::common::{Repo, StoreBackend, StoreOptions};

#[derive(Debug, Parser)]
pub struct Init {
    #[clap(flatten)]
    store: StoreOptions,
}

impl Init {
    pub async fn run(self) -> Result<()> {
        match self.store.store {
            StoreBackend::Sqlite => Self::reset(self.store.sqlite().await?).await,
            StoreBackend::Redis => Self::reset(self.store.redis().await?).await,
        }
    }

    async fn reset<R: Repo>(repo: R) -> Result<()> {
        repo.drop_schema_if_exists().await?;
        repo.create_schema().await?;

        info!("Schema recreated");
        Ok(())
    }
}
