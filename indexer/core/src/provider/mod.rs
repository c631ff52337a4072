use std::{future::Future, sync::Arc};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

mod error;
pub use error::ProviderError;

mod rpc;
pub use rpc::{PocketRpcProvider, RpcProviderConfig};

/// Typed surface of the remote chain RPC. Implementations own their retry and timeout policy and
/// never retain state between calls.
pub trait Provider: Send + Sync {
    fn get_block_height(&self) -> impl Future<Output = Result<u64, ProviderError>> + Send;

    fn get_block(
        &self,
        height: u64,
    ) -> impl Future<Output = Result<GetBlockOutput, ProviderError>> + Send;

    fn get_nodes(
        &self,
        request: PageRequest,
    ) -> impl Future<Output = Result<GetNodesOutput, ProviderError>> + Send;

    fn get_block_transactions(
        &self,
        request: PageRequest,
    ) -> impl Future<Output = Result<GetBlockTransactionsOutput, ProviderError>> + Send;

    fn get_all_params(
        &self,
        height: u64,
    ) -> impl Future<Output = Result<AllParams, ProviderError>> + Send;
}

impl<P> Provider for Arc<P>
where
    P: Provider,
{
    fn get_block_height(&self) -> impl Future<Output = Result<u64, ProviderError>> + Send {
        (**self).get_block_height()
    }

    fn get_block(
        &self,
        height: u64,
    ) -> impl Future<Output = Result<GetBlockOutput, ProviderError>> + Send {
        (**self).get_block(height)
    }

    fn get_nodes(
        &self,
        request: PageRequest,
    ) -> impl Future<Output = Result<GetNodesOutput, ProviderError>> + Send {
        (**self).get_nodes(request)
    }

    fn get_block_transactions(
        &self,
        request: PageRequest,
    ) -> impl Future<Output = Result<GetBlockTransactionsOutput, ProviderError>> + Send {
        (**self).get_block_transactions(request)
    }

    fn get_all_params(
        &self,
        height: u64,
    ) -> impl Future<Output = Result<AllParams, ProviderError>> + Send {
        (**self).get_all_params(height)
    }
}

/// One page of a paginated listing at a fixed height. Pages are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageRequest {
    pub height: u64,
    pub page: u64,
    pub per_page: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetBlockOutput {
    pub block: RpcBlock,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcBlock {
    pub header: RpcBlockHeader,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcBlockHeader {
    #[serde(default)]
    pub chain_id: String,
    pub height: String,
    pub time: DateTime<Utc>,
    /// Declared number of transactions in the block, as a decimal string.
    pub num_txs: String,
    pub proposer_address: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetNodesOutput {
    pub result: Vec<RpcNode>,
    #[serde(default)]
    pub page: u64,
    pub total_pages: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcNode {
    pub address: String,
    pub public_key: String,
    pub jailed: bool,
    pub status: i32,
    #[serde(default)]
    pub chains: Vec<String>,
    pub service_url: String,
    /// Staked amount, as a decimal string.
    pub tokens: String,
    pub unstaking_time: DateTime<Utc>,
    #[serde(default)]
    pub output_address: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetBlockTransactionsOutput {
    pub txs: Vec<RpcTransaction>,
    pub total_txs: u64,
}

/// A transaction envelope as returned by the block transaction listing. The message body is kept
/// opaque until it reaches the decoder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcTransaction {
    pub hash: String,
    pub height: u64,
    #[serde(default)]
    pub index: u32,
    pub tx_result: RpcTxResult,
    #[serde(rename = "stdTx")]
    pub std_tx: RpcStdTx,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcTxResult {
    #[serde(default)]
    pub code: u32,
    #[serde(default)]
    pub codespace: String,
    #[serde(default)]
    pub signer: String,
    #[serde(default)]
    pub recipient: String,
    pub message_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcStdTx {
    #[serde(default)]
    pub fee: Vec<RpcCoin>,
    #[serde(default)]
    pub memo: String,
    pub msg: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcCoin {
    pub amount: String,
    pub denom: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllParams {
    #[serde(default)]
    pub app_params: Vec<RpcParam>,
    #[serde(default)]
    pub auth_params: Vec<RpcParam>,
    #[serde(default)]
    pub gov_params: Vec<RpcParam>,
    #[serde(default)]
    pub node_params: Vec<RpcParam>,
    #[serde(default)]
    pub pocket_params: Vec<RpcParam>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcParam {
    #[serde(rename = "param_key")]
    pub key: String,
    #[serde(rename = "param_value")]
    pub value: String,
}
