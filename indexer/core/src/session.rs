use std::collections::BTreeMap;

use crate::transaction::{Transaction, TxClaim, TxProof};

/// Scope under which a claim and its proof are correlated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionKey {
    pub session_height: u64,
    pub app_public_key: String,
    pub chain: String,
}

impl From<&TxClaim> for SessionKey {
    fn from(claim: &TxClaim) -> Self {
        Self {
            session_height: claim.session_height,
            app_public_key: claim.app_public_key.clone(),
            chain: claim.chain.clone(),
        }
    }
}

impl From<&TxProof> for SessionKey {
    fn from(proof: &TxProof) -> Self {
        Self {
            session_height: proof.session_height,
            app_public_key: proof.app_public_key.clone(),
            chain: proof.chain.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionClaim<'a> {
    pub key: SessionKey,
    pub claim: &'a Transaction,
    pub proof: Option<&'a Transaction>,
    /// A matching proof exists and succeeded on chain.
    pub confirmed: bool,
}

/// Pairs every claim in `txs` with the proof of the same session, if any.
///
/// One entry is reported per session, ordered by session key. When a session has several claims or
/// several proofs, the last one in `txs` is used.
pub fn pair_claims_with_proofs(txs: &[Transaction]) -> Vec<SessionClaim<'_>> {
    let mut claims = BTreeMap::new();
    let mut proofs = BTreeMap::new();

    for tx in txs {
        if let Some(claim) = tx.claim() {
            claims.insert(SessionKey::from(claim), tx);
        } else if let Some(proof) = tx.proof() {
            proofs.insert(SessionKey::from(proof), tx);
        }
    }

    claims
        .into_iter()
        .map(|(key, claim)| {
            let proof = proofs.get(&key).copied();
            SessionClaim {
                confirmed: proof.is_some_and(Transaction::is_success),
                key,
                claim,
                proof,
            }
        })
        .collect()
}
