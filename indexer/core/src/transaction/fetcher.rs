use log::warn;

use crate::{
    errors::ResultExt,
    pagination::{collect_pages, Page, PER_PAGE},
    provider::{PageRequest, Provider, ProviderError},
    transaction::{
        decode_transaction, RejectedTransaction, TransactionBatch, TransactionService,
        UnknownMessagePolicy,
    },
    Result,
};

/// Uncached transaction service. Walks every page of a height's transaction listing and decodes
/// each envelope on its own.
#[derive(Debug, Clone)]
pub struct TransactionFetcher<P> {
    provider: P,
    per_page: u64,
    policy: UnknownMessagePolicy,
}

impl<P> TransactionFetcher<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            per_page: PER_PAGE,
            policy: UnknownMessagePolicy::default(),
        }
    }

    pub fn with_per_page(mut self, per_page: u64) -> Self {
        self.per_page = per_page.max(1);
        self
    }

    pub fn with_unknown_message_policy(mut self, policy: UnknownMessagePolicy) -> Self {
        self.policy = policy;
        self
    }
}

impl<P> TransactionService for TransactionFetcher<P>
where
    P: Provider,
{
    async fn block_transactions(&self, height: u64) -> Result<TransactionBatch> {
        let per_page = self.per_page;

        let raw = collect_pages(per_page, |page| async move {
            let output = self
                .provider
                .get_block_transactions(PageRequest {
                    height,
                    page,
                    per_page,
                })
                .await?;
            Ok::<_, ProviderError>(Page {
                items: output.txs,
                total_pages: output.total_txs.div_ceil(per_page),
            })
        })
        .await
        .context(format!(
            "TransactionFetcher::block_transactions [#{}]",
            height
        ))?;

        let mut batch = TransactionBatch {
            height,
            ..Default::default()
        };
        for tx in raw {
            let hash = tx.hash.clone();
            match decode_transaction(tx, self.policy) {
                Ok(tx) => batch.transactions.push(tx),
                Err(error) => {
                    warn!("Failed to decode transaction {} at #{}: {}", hash, height, error);
                    batch.rejected.push(RejectedTransaction { hash, error });
                }
            }
        }

        Ok(batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        errors::DecodeError,
        testing::{rpc_claim_tx, rpc_send_tx, StubProvider},
    };

    #[tokio::test]
    async fn test_malformed_record_does_not_poison_batch() {
        let mut bad = rpc_claim_tx("C2", 12, "app1", "0021", 9);
        bad.std_tx.msg["value"]["total_proofs"] = serde_json::json!("many");

        let provider = StubProvider::default().with_transactions(
            12,
            vec![
                rpc_send_tx("S1", 12, "b2", "5"),
                bad,
                rpc_claim_tx("C3", 12, "app1", "0021", 9),
            ],
        );
        let fetcher = TransactionFetcher::new(provider);

        let batch = fetcher.block_transactions(12).await.unwrap();
        let hashes: Vec<_> = batch.transactions.iter().map(|tx| tx.hash.as_str()).collect();
        assert_eq!(hashes, vec!["S1", "C3"]);
        assert_eq!(batch.rejected.len(), 1);
        assert_eq!(batch.rejected[0].hash, "C2");
        assert!(matches!(
            batch.rejected[0].error,
            DecodeError::InvalidInteger { .. }
        ));
    }

    #[tokio::test]
    async fn test_walks_pages_of_transactions() {
        let txs = (0..7)
            .map(|i| rpc_send_tx(&format!("S{}", i), 3, "b2", "1"))
            .collect();
        let provider = StubProvider::default().with_transactions(3, txs);
        let fetcher = TransactionFetcher::new(provider.clone()).with_per_page(3);

        let batch = fetcher.block_transactions(3).await.unwrap();
        assert_eq!(batch.transactions.len(), 7);
        assert_eq!(provider.calls().get_block_transactions, 3);
    }

    #[tokio::test]
    async fn test_reject_policy_moves_unknown_tags_to_rejected() {
        let provider = StubProvider::default().with_transactions(
            3,
            vec![
                rpc_send_tx("S1", 3, "b2", "1"),
                crate::testing::rpc_tx("U1", 3, "unjail_validator", serde_json::json!({})),
            ],
        );
        let fetcher = TransactionFetcher::new(provider)
            .with_unknown_message_policy(UnknownMessagePolicy::Reject);

        let batch = fetcher.block_transactions(3).await.unwrap();
        assert_eq!(batch.transactions.len(), 1);
        assert_eq!(batch.rejected[0].hash, "U1");
    }
}
