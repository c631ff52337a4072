use std::{future::Future, sync::Arc};

use serde::{Deserialize, Serialize};

use crate::{errors::DecodeError, Result};

mod decoder;
pub use decoder::{decode_transaction, UnknownMessagePolicy};

mod fetcher;
pub use fetcher::TransactionFetcher;

mod cache;
pub use cache::{CachedTransactionService, CompletenessPolicy};

pub const TX_TYPE_SEND: &str = "send";
pub const TX_TYPE_CLAIM: &str = "claim";
pub const TX_TYPE_PROOF: &str = "proof";
pub const TX_TYPE_STAKE: &str = "stake_validator";

/// A decoded transaction. `payload` is present exactly when `tx_type` is one of the modelled
/// message kinds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub hash: String,
    pub height: u64,
    pub tx_type: String,
    pub fee: u64,
    pub from_address: String,
    pub memo: String,
    /// Result code reported by the chain. Zero means success.
    pub result_code: u32,
    pub payload: Option<TxPayload>,
}

impl Transaction {
    pub fn is_success(&self) -> bool {
        self.result_code == 0
    }

    pub fn claim(&self) -> Option<&TxClaim> {
        match &self.payload {
            Some(TxPayload::Claim(claim)) => Some(claim),
            _ => None,
        }
    }

    pub fn proof(&self) -> Option<&TxProof> {
        match &self.payload {
            Some(TxPayload::Proof(proof)) => Some(proof),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TxPayload {
    Send(TxSend),
    Claim(TxClaim),
    Proof(TxProof),
    Stake(TxStake),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxSend {
    pub to_address: String,
    pub amount: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxClaim {
    pub chain: String,
    pub app_public_key: String,
    pub session_height: u64,
    pub total_proofs: u64,
    /// 1 for relays, 2 for challenges.
    pub evidence_type: u8,
    pub expiration_height: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxProof {
    pub app_public_key: String,
    pub client_public_key: String,
    pub servicer_public_key: String,
    pub chain: String,
    pub request_hash: String,
    pub session_height: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxStake {
    pub amount: u64,
    pub chains: Vec<String>,
    pub public_key_type: String,
    pub public_key: String,
    pub service_url: String,
}

/// A record dropped by the decoder. The rest of its batch is unaffected.
#[derive(Debug)]
pub struct RejectedTransaction {
    pub hash: String,
    pub error: DecodeError,
}

/// All transactions of one height, together with the ones that failed to decode.
#[derive(Debug, Default)]
pub struct TransactionBatch {
    pub height: u64,
    pub transactions: Vec<Transaction>,
    pub rejected: Vec<RejectedTransaction>,
}

pub trait TransactionService: Send + Sync {
    fn block_transactions(
        &self,
        height: u64,
    ) -> impl Future<Output = Result<TransactionBatch>> + Send;
}

impl<S> TransactionService for Arc<S>
where
    S: TransactionService,
{
    fn block_transactions(
        &self,
        height: u64,
    ) -> impl Future<Output = Result<TransactionBatch>> + Send {
        (**self).block_transactions(height)
    }
}
