use std::collections::HashSet;

use log::{debug, warn};

use crate::{
    block::BlockService,
    errors::ResultExt,
    storage::TransactionRepo,
    transaction::{TransactionBatch, TransactionService},
    Error, Result,
};

/// Bounds the re-fetching done when the cached transaction set of a height is short of the
/// block's declared count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompletenessPolicy {
    /// Provider fetches allowed per call while the set is still short.
    pub max_fetch_attempts: u32,
    /// Whether a set still short after the last attempt is returned (with a warning) rather than
    /// failing with [`Error::IncompleteTransactions`].
    pub accept_partial: bool,
}

impl Default for CompletenessPolicy {
    fn default() -> Self {
        Self {
            max_fetch_attempts: 2,
            accept_partial: true,
        }
    }
}

/// Cache-aside decorator over a [`TransactionService`].
///
/// A height counts as cached when the number of stored transactions equals the owning block's
/// declared count. Otherwise the whole height is fetched again and every transaction not already
/// stored is inserted one by one. A failed insert aborts the call and leaves the earlier inserts in
/// place.
#[derive(Debug, Clone)]
pub struct CachedTransactionService<S, B, R> {
    inner: S,
    blocks: B,
    repo: R,
    policy: CompletenessPolicy,
}

impl<S, B, R> CachedTransactionService<S, B, R> {
    pub fn new(inner: S, blocks: B, repo: R) -> Self {
        Self {
            inner,
            blocks,
            repo,
            policy: CompletenessPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: CompletenessPolicy) -> Self {
        self.policy = policy;
        self
    }
}

impl<S, B, R> TransactionService for CachedTransactionService<S, B, R>
where
    S: TransactionService,
    B: BlockService,
    R: TransactionRepo,
{
    async fn block_transactions(&self, height: u64) -> Result<TransactionBatch> {
        let context = || format!("CachedTransactionService::block_transactions [#{}]", height);

        let block = self.blocks.block(height).await?;
        let expected = block.num_txs;

        let cached_count = self.repo.count_at_height(height).await.context(context())?;
        let cached = self
            .repo
            .fetch_transactions_at_height(height)
            .await
            .context(context())?;
        if cached_count == expected {
            return Ok(TransactionBatch {
                height,
                transactions: cached,
                rejected: Vec::new(),
            });
        }

        let mut stored: HashSet<String> = cached.into_iter().map(|tx| tx.hash).collect();
        let mut attempts = 0;
        let batch = loop {
            attempts += 1;
            let batch = self.inner.block_transactions(height).await?;

            for tx in &batch.transactions {
                if stored.contains(&tx.hash) {
                    continue;
                }
                self.repo
                    .insert_transaction(tx)
                    .await
                    .context(format!("{} {}", context(), tx.hash))?;
                stored.insert(tx.hash.clone());
            }

            if stored.len() as u64 >= expected || attempts >= self.policy.max_fetch_attempts {
                break batch;
            }
            debug!(
                "Transactions at #{} still incomplete ({}/{}), fetching again",
                height,
                stored.len(),
                expected
            );
        };

        let got = stored.len() as u64;
        if got < expected {
            if !self.policy.accept_partial {
                return Err(Error::IncompleteTransactions {
                    height,
                    expected,
                    got,
                });
            }
            warn!(
                "Accepting partial transaction set at #{}: {}/{} after {} attempts",
                height, got, expected, attempts
            );
        }

        Ok(batch)
    }
}
