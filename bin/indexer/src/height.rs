use anyhow::Result;
use clap::Parser;
use pokt_indexer_core::block::{BlockFetcher, BlockService};

use crate::common::RpcOptions;

#[derive(Debug, Parser)]
pub struct Height {
    #[clap(flatten)]
    rpc: RpcOptions,
}

impl Height {
    pub async fn run(self) -> Result<()> {
        let height = BlockFetcher::new(self.rpc.provider()?).height().await?;
        println!("{}", height);
        Ok(())
    }
}
