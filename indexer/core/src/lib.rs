//! # Pocket indexer
//!
//! Keeps a local store of Pocket chain records (blocks, network params, nodes and transactions)
//! in sync with a remote RPC endpoint. The `pokt-indexer-core` crate provides the fetch, cache
//! and decode pipeline together with the job queue and worker pool that drive it. Refer to the
//! `pokt-indexer` crate for the executable binary.

/// Remote RPC provider abstraction and the built-in HTTP implementation.
pub mod provider;

/// Persistent repository abstractions and built-in implementations.
pub mod storage;

/// Blocks: base fetcher and cache-aside service.
pub mod block;

/// Network params: base fetcher and cache-aside service.
pub mod param;

/// Nodes: paginated fetcher and write-through service.
pub mod node;

/// Transactions: paginated fetcher, message decoder and completeness-checking cache.
pub mod transaction;

/// Claim/proof correlation by session.
pub mod session;

/// Multi-page listing walker shared by node and transaction fetches.
pub mod pagination;

/// Named job queues backed by an external broker.
pub mod queue;

/// Sync tasks bridging queue jobs to the cache-aside services.
pub mod sync;

/// Fixed-size consumer pools draining the job queues.
pub mod worker;

/// Bounded-concurrency height backfill.
pub mod backfill;

/// Producer side of the job queues.
pub mod jobs;

/// Stop signalling for spawned worker pools.
pub mod lifecycle;

mod errors;
pub use errors::{DecodeError, Error, Result};

/// Internal utilities.
mod utils;

#[cfg(test)]
pub(crate) mod testing;
