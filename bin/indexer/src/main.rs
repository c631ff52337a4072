//! # Pocket indexer
//!
//! `pokt-indexer` is a binary crate for a command line application keeping a local store of
//! Pocket chain records in sync. Producers (`enqueue`) and consumers (`work`) run as separate
//! processes sharing a Redis job queue; `backfill` walks heights directly without the queue.

use anyhow::Result;
use clap::{Parser, Subcommand};

mod backfill;
use backfill::Backfill;

mod enqueue;
use enqueue::Enqueue;

mod height;
use height::Height;

mod init;
use init::Init;

mod work;
use work::Work;

mod common;

#[derive(Debug, Parser)]
#[clap(about, version)]
struct Cli {
    #[clap(subcommand)]
    command: Subcommands,
}

#[derive(Debug, Subcommand)]
enum Subcommands {
    /// Drop and recreate the store schema.
    Init(Init),
    /// Sync every height from the chain tip down to 1 in bounded batches.
    Backfill(Backfill),
    /// Queue every height missing from the store for the workers.
    Enqueue(Enqueue),
    /// Run the worker pools draining the job queues.
    Work(Work),
    /// Print the current chain height.
    Height(Height),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info,pokt_indexer=debug,pokt_indexer_core=debug");
    }
    env_logger::init();

    match cli.command {
        Subcommands::Init(cmd) => cmd.run().await,
        Subcommands::Backfill(cmd) => cmd.run().await,
        Subcommands::Enqueue(cmd) => cmd.run().await,
        Subcommands::Work(cmd) => cmd.run().await,
        Subcommands::Height(cmd) => cmd.run().await,
    }
}
