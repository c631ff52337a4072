//! Provider stub and wire fixtures shared by the unit tests.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
};

use chrono::{DateTime, TimeZone, Utc};
use serde_json::{json, Value};
use tokio::sync::Barrier;

use crate::provider::{
    AllParams, GetBlockOutput, GetBlockTransactionsOutput, GetNodesOutput, PageRequest, Provider,
    ProviderError, RpcBlock, RpcBlockHeader, RpcCoin, RpcNode, RpcParam, RpcStdTx, RpcTransaction,
    RpcTxResult,
};

/// Number of calls made to each provider operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub get_block_height: usize,
    pub get_block: usize,
    pub get_nodes: usize,
    pub get_block_transactions: usize,
    pub get_all_params: usize,
}

#[derive(Debug, Default)]
struct State {
    height: Option<u64>,
    blocks: HashMap<u64, GetBlockOutput>,
    params: HashMap<u64, AllParams>,
    nodes: HashMap<u64, Vec<RpcNode>>,
    transactions: HashMap<u64, Vec<RpcTransaction>>,
    barrier: Option<Arc<Barrier>>,
    calls: CallCounts,
}

/// In-process provider serving canned responses and counting calls. Clones share state.
///
/// Blocks, params and the chain height are unavailable unless configured. Node and transaction
/// listings of an unknown height are empty.
#[derive(Debug, Clone, Default)]
pub struct StubProvider {
    state: Arc<Mutex<State>>,
}

impl StubProvider {
    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    pub fn with_height(self, height: u64) -> Self {
        self.state().height = Some(height);
        self
    }

    pub fn with_block(self, height: u64, num_txs: u64) -> Self {
        self.with_raw_block(height, &num_txs.to_string())
    }

    /// Block whose declared transaction count is sent verbatim.
    pub fn with_raw_block(self, height: u64, num_txs: &str) -> Self {
        let output = GetBlockOutput {
            block: RpcBlock {
                header: RpcBlockHeader {
                    chain_id: "mainnet".to_string(),
                    height: height.to_string(),
                    time: block_time(height),
                    num_txs: num_txs.to_string(),
                    proposer_address: format!("proposer{}", height % 3),
                },
            },
        };
        self.state().blocks.insert(height, output);
        self
    }

    pub fn with_params(self, height: u64, params: AllParams) -> Self {
        self.state().params.insert(height, params);
        self
    }

    pub fn with_nodes(self, height: u64, nodes: Vec<RpcNode>) -> Self {
        self.set_nodes(height, nodes);
        self
    }

    /// Replaces the node listing of `height` on a shared stub.
    pub fn set_nodes(&self, height: u64, nodes: Vec<RpcNode>) {
        self.state().nodes.insert(height, nodes);
    }

    pub fn with_transactions(self, height: u64, transactions: Vec<RpcTransaction>) -> Self {
        self.state().transactions.insert(height, transactions);
        self
    }

    /// Makes every `get_block` wait on `barrier` before answering.
    pub fn with_barrier(self, barrier: Arc<Barrier>) -> Self {
        self.state().barrier = Some(barrier);
        self
    }

    pub fn calls(&self) -> CallCounts {
        self.state().calls
    }
}

fn page_of<T: Clone>(items: &[T], request: PageRequest) -> Vec<T> {
    let per_page = request.per_page.max(1) as usize;
    let start = (request.page.saturating_sub(1) as usize).saturating_mul(per_page);
    items.iter().skip(start).take(per_page).cloned().collect()
}

fn unavailable(what: &str, height: u64) -> ProviderError {
    ProviderError::Unavailable(format!("no {} at height {}", what, height))
}

impl Provider for StubProvider {
    async fn get_block_height(&self) -> Result<u64, ProviderError> {
        let mut state = self.state();
        state.calls.get_block_height += 1;
        state
            .height
            .ok_or_else(|| ProviderError::Unavailable("no chain height".to_string()))
    }

    async fn get_block(&self, height: u64) -> Result<GetBlockOutput, ProviderError> {
        let (block, barrier) = {
            let mut state = self.state();
            state.calls.get_block += 1;
            (state.blocks.get(&height).cloned(), state.barrier.clone())
        };

        if let Some(barrier) = barrier {
            barrier.wait().await;
        }
        block.ok_or_else(|| unavailable("block", height))
    }

    async fn get_nodes(&self, request: PageRequest) -> Result<GetNodesOutput, ProviderError> {
        let mut state = self.state();
        state.calls.get_nodes += 1;

        let nodes = state.nodes.get(&request.height).cloned().unwrap_or_default();
        Ok(GetNodesOutput {
            result: page_of(&nodes, request),
            page: request.page,
            total_pages: (nodes.len() as u64).div_ceil(request.per_page.max(1)),
        })
    }

    async fn get_block_transactions(
        &self,
        request: PageRequest,
    ) -> Result<GetBlockTransactionsOutput, ProviderError> {
        let mut state = self.state();
        state.calls.get_block_transactions += 1;

        let txs = state
            .transactions
            .get(&request.height)
            .cloned()
            .unwrap_or_default();
        Ok(GetBlockTransactionsOutput {
            txs: page_of(&txs, request),
            total_txs: txs.len() as u64,
        })
    }

    async fn get_all_params(&self, height: u64) -> Result<AllParams, ProviderError> {
        let mut state = self.state();
        state.calls.get_all_params += 1;
        state
            .params
            .get(&height)
            .cloned()
            .ok_or_else(|| unavailable("params", height))
    }
}

pub fn block_time(height: u64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_600_000_000 + height as i64 * 900, 0)
        .single()
        .unwrap()
}

fn param(key: &str, value: &str) -> RpcParam {
    RpcParam {
        key: key.to_string(),
        value: value.to_string(),
    }
}

/// Every group populated, with the reward params set to known values.
pub fn full_params() -> AllParams {
    AllParams {
        app_params: vec![
            param("application/MaxApplications", "9223372036854775807"),
            param("application/AppUnstakingTime", "1814000000000000"),
        ],
        auth_params: vec![param("auth/MaxMemoCharacters", "75")],
        gov_params: vec![param("gov/daoOwner", "a83172b67b5ffbfcb8acb95acc0fd0466a9d4bc4")],
        node_params: vec![
            param("pos/RelaysToTokensMultiplier", "8461"),
            param("pos/DAOAllocation", "10"),
            param("pos/ProposerPercentage", "1"),
            param("pos/StakeMinimum", "15000000000"),
        ],
        pocket_params: vec![
            param("pocketcore/ClaimExpiration", "24"),
            param("pocketcore/SessionNodeCount", "24"),
        ],
    }
}

pub fn rpc_node(address: &str, tokens: &str) -> RpcNode {
    RpcNode {
        address: address.to_string(),
        public_key: format!("{}-pk", address),
        jailed: false,
        status: 2,
        chains: vec!["0001".to_string(), "0021".to_string()],
        service_url: format!("https://{}.example.com:443", address),
        tokens: tokens.to_string(),
        unstaking_time: Utc.timestamp_opt(0, 0).single().unwrap(),
        output_address: String::new(),
    }
}

/// Envelope around `msg` with a 10000 upokt fee, signed by `signer1`.
pub fn rpc_tx(hash: &str, height: u64, message_type: &str, msg: Value) -> RpcTransaction {
    RpcTransaction {
        hash: hash.to_string(),
        height,
        index: 0,
        tx_result: RpcTxResult {
            code: 0,
            codespace: String::new(),
            signer: "signer1".to_string(),
            recipient: String::new(),
            message_type: message_type.to_string(),
        },
        std_tx: RpcStdTx {
            fee: vec![RpcCoin {
                amount: "10000".to_string(),
                denom: "upokt".to_string(),
            }],
            memo: String::new(),
            msg,
        },
    }
}

pub fn rpc_send_tx(hash: &str, height: u64, to_address: &str, amount: &str) -> RpcTransaction {
    rpc_tx(
        hash,
        height,
        "send",
        json!({
            "type": "pos/Send",
            "value": {
                "amount": amount,
                "from_address": "signer1",
                "to_address": to_address,
            }
        }),
    )
}

pub fn rpc_claim_tx(
    hash: &str,
    height: u64,
    app_public_key: &str,
    chain: &str,
    session_height: u64,
) -> RpcTransaction {
    rpc_tx(
        hash,
        height,
        "claim",
        json!({
            "type": "pocketcore/claim",
            "value": {
                "evidence_type": "1",
                "expiration_height": "0",
                "from_address": "signer1",
                "header": {
                    "app_public_key": app_public_key,
                    "chain": chain,
                    "session_height": session_height.to_string(),
                },
                "merkle_root": {"merkleHash": "root", "range": {"lower": "0", "upper": "1"}},
                "total_proofs": "250",
            }
        }),
    )
}

pub fn rpc_proof_tx(
    hash: &str,
    height: u64,
    app_public_key: &str,
    chain: &str,
    session_height: u64,
) -> RpcTransaction {
    rpc_tx(
        hash,
        height,
        "proof",
        json!({
            "type": "pocketcore/proof",
            "value": {
                "evidence_type": "1",
                "leaf": {
                    "type": "pocketcore/relay_proof",
                    "value": {
                        "aat": {
                            "app_pub_key": app_public_key,
                            "client_pub_key": "client1",
                            "signature": "",
                            "version": "0.0.1",
                        },
                        "blockchain": chain,
                        "entropy": "7",
                        "request_hash": "rq1",
                        "servicer_pub_key": "servicer1",
                        "session_block_height": session_height.to_string(),
                        "signature": "",
                        "token": "",
                    }
                },
            }
        }),
    )
}

pub fn rpc_stake_tx(hash: &str, height: u64, chains: &[&str], amount: &str) -> RpcTransaction {
    rpc_tx(
        hash,
        height,
        "stake_validator",
        json!({
            "type": "pos/8.0MsgStake",
            "value": {
                "chains": chains,
                "public_key": {
                    "type": "crypto/ed25519_public_key",
                    "value": "pk1",
                },
                "service_url": "https://node1.example.com:443",
                "value": amount,
                "output_address": "",
            }
        }),
    )
}
