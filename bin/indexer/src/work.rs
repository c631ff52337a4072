use anyhow::Result;
use clap::Parser;
use log::{error, info};
use pokt_indexer_core::{
    queue::{QueueName, RedisQueue},
    lifecycle::{Spawnable, StopHandle},
    sync::{BlockSync, NodeSync, ParamSync},
    worker::{PoolExit, WorkerPoolBuilder},
};
use tokio::sync::mpsc;

use crate::common::{self, Repo, RpcOptions, StoreBackend, StoreOptions, GRACEFUL_SHUTDOWN_TIMEOUT};

const EXIT_CHANNEL_SIZE: usize = 16;

#[derive(Debug, Parser)]
pub struct Work {
    #[clap(flatten)]
    rpc: RpcOptions,
    #[clap(flatten)]
    store: StoreOptions,
    /// Number of consumers on the block queue
    #[clap(long, env, default_value_t = 5)]
    block_workers: usize,
    /// Number of consumers on the params queue
    #[clap(long, env, default_value_t = 5)]
    param_workers: usize,
    /// Number of consumers on the node queue
    #[clap(long, env, default_value_t = 1)]
    node_workers: usize,
}

impl Work {
    pub async fn run(self) -> Result<()> {
        match self.store.store {
            StoreBackend::Sqlite => self.run_with(self.store.sqlite().await?).await,
            StoreBackend::Redis => self.run_with(self.store.redis().await?).await,
        }
    }

    async fn run_with<R: Repo>(&self, repo: R) -> Result<()> {
        let provider = self.rpc.provider()?;
        let queue = RedisQueue::new(&self.store.redis_url).await?;
        let (exits_tx, mut exits_rx) = mpsc::channel::<PoolExit>(EXIT_CHANNEL_SIZE);

        let block_pool = WorkerPoolBuilder::new(
            queue.clone(),
            QueueName::Blocks,
            BlockSync(common::blocks(&provider, &repo)),
        )
        .workers(self.block_workers)
        .exits(exits_tx.clone())
        .build();

        let param_pool = WorkerPoolBuilder::new(
            queue.clone(),
            QueueName::Params,
            ParamSync(common::params(&provider, &repo)),
        )
        .workers(self.param_workers)
        .exits(exits_tx.clone())
        .build();

        let node_pool = WorkerPoolBuilder::new(
            queue,
            QueueName::Nodes,
            NodeSync(common::nodes(&provider, &repo)),
        )
        .workers(self.node_workers)
        .exits(exits_tx)
        .build();

        let handles: Vec<StopHandle> = vec![
            block_pool.stop_handle(),
            param_pool.stop_handle(),
            node_pool.stop_handle(),
        ];
        block_pool.spawn();
        param_pool.spawn();
        node_pool.spawn();
        info!(
            "Workers started: {} block, {} param, {} node",
            self.block_workers, self.param_workers, self.node_workers
        );

        let mut sigterm_handle =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;
        let ctrl_c_handle = tokio::signal::ctrl_c();

        let exit = tokio::select! {
            _ = sigterm_handle.recv() => None,
            _ = ctrl_c_handle => None,
            exit = exits_rx.recv() => exit,
        };

        // Graceful shutdown
        for handle in &handles {
            handle.request_stop();
        }
        if tokio::time::timeout(GRACEFUL_SHUTDOWN_TIMEOUT, all_stopped(&handles))
            .await
            .is_err()
        {
            let running = handles.iter().filter(|h| !h.is_stopped()).count();
            return Err(anyhow::anyhow!(
                "timeout waiting for graceful shutdown: {} pools still running",
                running
            ));
        }

        match exit {
            Some(exit) => {
                error!(
                    "Worker {} on {} stopped: {}",
                    exit.worker, exit.queue, exit.error
                );
                Err(anyhow::anyhow!("job queue {} failed: {}", exit.queue, exit.error))
            }
            None => Ok(()),
        }
    }
}

async fn all_stopped(handles: &[StopHandle]) {
    for handle in handles {
        handle.stopped().await;
    }
}
