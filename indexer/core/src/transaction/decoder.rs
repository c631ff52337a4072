use std::{fmt, str::FromStr};

use serde::Deserialize;

use crate::{
    errors::DecodeError,
    provider::RpcTransaction,
    transaction::{
        Transaction, TxClaim, TxPayload, TxProof, TxSend, TxStake, TX_TYPE_CLAIM, TX_TYPE_PROOF,
        TX_TYPE_SEND, TX_TYPE_STAKE,
    },
    utils::parse_int,
};

/// What to do with a message whose type tag has no modelled payload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UnknownMessagePolicy {
    /// Keep the common fields and leave the payload empty.
    #[default]
    Retain,
    /// Fail the record with [`DecodeError::UnknownMessageType`].
    Reject,
}

impl FromStr for UnknownMessagePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "retain" => Ok(Self::Retain),
            "reject" => Ok(Self::Reject),
            other => Err(format!("unknown message policy {:?}", other)),
        }
    }
}

impl fmt::Display for UnknownMessagePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Retain => write!(f, "retain"),
            Self::Reject => write!(f, "reject"),
        }
    }
}

/// Message kinds keyed by the envelope's type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MessageKind {
    Send,
    Claim,
    Proof,
    Stake,
    Other,
}

impl MessageKind {
    fn from_tag(tag: &str) -> Self {
        match tag {
            TX_TYPE_SEND => Self::Send,
            TX_TYPE_CLAIM => Self::Claim,
            TX_TYPE_PROOF => Self::Proof,
            TX_TYPE_STAKE => Self::Stake,
            _ => Self::Other,
        }
    }
}

/// Decodes one transaction envelope. Errors only ever concern this record.
pub fn decode_transaction(
    raw: RpcTransaction,
    policy: UnknownMessagePolicy,
) -> Result<Transaction, DecodeError> {
    let fee = match raw.std_tx.fee.first() {
        Some(coin) => parse_int("fee", &coin.amount)?,
        None => 0,
    };

    let msg = &raw.std_tx.msg;
    let payload = match MessageKind::from_tag(&raw.tx_result.message_type) {
        MessageKind::Send => Some(TxPayload::Send(decode_send(msg)?)),
        MessageKind::Claim => Some(TxPayload::Claim(decode_claim(msg)?)),
        MessageKind::Proof => Some(TxPayload::Proof(decode_proof(msg)?)),
        MessageKind::Stake => Some(TxPayload::Stake(decode_stake(msg)?)),
        MessageKind::Other => match policy {
            UnknownMessagePolicy::Retain => None,
            UnknownMessagePolicy::Reject => {
                return Err(DecodeError::UnknownMessageType(
                    raw.tx_result.message_type,
                ))
            }
        },
    };

    Ok(Transaction {
        hash: raw.hash,
        height: raw.height,
        tx_type: raw.tx_result.message_type,
        fee,
        from_address: raw.tx_result.signer,
        memo: raw.std_tx.memo,
        result_code: raw.tx_result.code,
        payload,
    })
}

#[derive(Deserialize)]
struct Message<V> {
    value: V,
}

fn message<'a, V>(kind: &'static str, msg: &'a serde_json::Value) -> Result<V, DecodeError>
where
    V: Deserialize<'a>,
{
    Message::<V>::deserialize(msg)
        .map(|m| m.value)
        .map_err(|source| DecodeError::Malformed { kind, source })
}

#[derive(Deserialize)]
struct SendValue<'a> {
    amount: &'a str,
    to_address: String,
}

fn decode_send(msg: &serde_json::Value) -> Result<TxSend, DecodeError> {
    let value: SendValue<'_> = message(TX_TYPE_SEND, msg)?;

    Ok(TxSend {
        amount: parse_int("send.amount", value.amount)?,
        to_address: value.to_address,
    })
}

#[derive(Deserialize)]
struct ClaimValue<'a> {
    evidence_type: &'a str,
    expiration_height: &'a str,
    header: ClaimHeader<'a>,
    total_proofs: &'a str,
}

#[derive(Deserialize)]
struct ClaimHeader<'a> {
    app_public_key: String,
    chain: String,
    session_height: &'a str,
}

fn decode_claim(msg: &serde_json::Value) -> Result<TxClaim, DecodeError> {
    let value: ClaimValue<'_> = message(TX_TYPE_CLAIM, msg)?;

    Ok(TxClaim {
        session_height: parse_int("claim.header.session_height", value.header.session_height)?,
        total_proofs: parse_int("claim.total_proofs", value.total_proofs)?,
        evidence_type: parse_int("claim.evidence_type", value.evidence_type)?,
        expiration_height: parse_int("claim.expiration_height", value.expiration_height)?,
        chain: value.header.chain,
        app_public_key: value.header.app_public_key,
    })
}

#[derive(Deserialize)]
struct ProofValue<'a> {
    #[serde(borrow)]
    leaf: Message<LeafValue<'a>>,
}

#[derive(Deserialize)]
struct LeafValue<'a> {
    aat: Aat,
    blockchain: String,
    request_hash: String,
    servicer_pub_key: String,
    session_block_height: &'a str,
}

#[derive(Deserialize)]
struct Aat {
    app_pub_key: String,
    client_pub_key: String,
}

fn decode_proof(msg: &serde_json::Value) -> Result<TxProof, DecodeError> {
    let value: ProofValue<'_> = message(TX_TYPE_PROOF, msg)?;
    let leaf = value.leaf.value;

    Ok(TxProof {
        session_height: parse_int("proof.leaf.session_block_height", leaf.session_block_height)?,
        app_public_key: leaf.aat.app_pub_key,
        client_public_key: leaf.aat.client_pub_key,
        servicer_public_key: leaf.servicer_pub_key,
        chain: leaf.blockchain,
        request_hash: leaf.request_hash,
    })
}

#[derive(Deserialize)]
struct StakeValue<'a> {
    #[serde(default)]
    chains: Vec<String>,
    public_key: PublicKey,
    service_url: String,
    value: &'a str,
}

#[derive(Deserialize)]
struct PublicKey {
    #[serde(rename = "type")]
    key_type: String,
    value: String,
}

fn decode_stake(msg: &serde_json::Value) -> Result<TxStake, DecodeError> {
    let value: StakeValue<'_> = message(TX_TYPE_STAKE, msg)?;

    Ok(TxStake {
        amount: parse_int("stake.value", value.value)?,
        chains: value.chains,
        public_key_type: value.public_key.key_type,
        public_key: value.public_key.value,
        service_url: value.service_url,
    })
}
