use sqlx::{query, sqlite::SqliteRow, Row, Sqlite, Transaction as DbTransaction};

use super::{
    utils::{map_unique, to_i64, to_u64},
    SqliteDb,
};
use crate::{
    storage::{RepoError, TransactionRepo},
    transaction::{Transaction, TxClaim, TxPayload, TxProof, TxSend, TxStake},
};

const SELECT_TRANSACTIONS: &str = "
    SELECT t.hash, t.height, t.tx_type, t.fee, t.from_address, t.memo, t.result_code,
        s.to_address AS send_to_address, s.amount AS send_amount,
        c.chain AS claim_chain, c.app_public_key AS claim_app_public_key,
        c.session_height AS claim_session_height, c.total_proofs AS claim_total_proofs,
        c.evidence_type AS claim_evidence_type, c.expiration_height AS claim_expiration_height,
        p.app_public_key AS proof_app_public_key, p.client_public_key AS proof_client_public_key,
        p.servicer_public_key AS proof_servicer_public_key, p.chain AS proof_chain,
        p.request_hash AS proof_request_hash, p.session_height AS proof_session_height,
        k.amount AS stake_amount, k.chains AS stake_chains,
        k.public_key_type AS stake_public_key_type, k.public_key AS stake_public_key,
        k.service_url AS stake_service_url
    FROM transactions t
    LEFT JOIN tx_send s ON s.hash = t.hash
    LEFT JOIN tx_claim c ON c.hash = t.hash
    LEFT JOIN tx_proof p ON p.hash = t.hash
    LEFT JOIN tx_stake k ON k.hash = t.hash";

fn payload_from_row(row: &SqliteRow) -> Result<Option<TxPayload>, RepoError> {
    if let Some(to_address) = row.try_get::<Option<String>, _>("send_to_address")? {
        return Ok(Some(TxPayload::Send(TxSend {
            to_address,
            amount: to_u64(row.try_get("send_amount")?),
        })));
    }

    if let Some(chain) = row.try_get::<Option<String>, _>("claim_chain")? {
        return Ok(Some(TxPayload::Claim(TxClaim {
            chain,
            app_public_key: row.try_get("claim_app_public_key")?,
            session_height: to_u64(row.try_get("claim_session_height")?),
            total_proofs: to_u64(row.try_get("claim_total_proofs")?),
            evidence_type: row.try_get("claim_evidence_type")?,
            expiration_height: to_u64(row.try_get("claim_expiration_height")?),
        })));
    }

    if let Some(chain) = row.try_get::<Option<String>, _>("proof_chain")? {
        return Ok(Some(TxPayload::Proof(TxProof {
            app_public_key: row.try_get("proof_app_public_key")?,
            client_public_key: row.try_get("proof_client_public_key")?,
            servicer_public_key: row.try_get("proof_servicer_public_key")?,
            chain,
            request_hash: row.try_get("proof_request_hash")?,
            session_height: to_u64(row.try_get("proof_session_height")?),
        })));
    }

    if let Some(chains) = row.try_get::<Option<String>, _>("stake_chains")? {
        return Ok(Some(TxPayload::Stake(TxStake {
            amount: to_u64(row.try_get("stake_amount")?),
            chains: serde_json::from_str(&chains)?,
            public_key_type: row.try_get("stake_public_key_type")?,
            public_key: row.try_get("stake_public_key")?,
            service_url: row.try_get("stake_service_url")?,
        })));
    }

    Ok(None)
}

fn transaction_from_row(row: SqliteRow) -> Result<Transaction, RepoError> {
    Ok(Transaction {
        payload: payload_from_row(&row)?,
        hash: row.try_get("hash")?,
        height: to_u64(row.try_get("height")?),
        tx_type: row.try_get("tx_type")?,
        fee: to_u64(row.try_get("fee")?),
        from_address: row.try_get("from_address")?,
        memo: row.try_get("memo")?,
        result_code: row.try_get("result_code")?,
    })
}

async fn insert_payload(
    db_tx: &mut DbTransaction<'_, Sqlite>,
    hash: &str,
    payload: &TxPayload,
) -> Result<(), RepoError> {
    match payload {
        TxPayload::Send(send) => {
            query("INSERT INTO tx_send (hash, to_address, amount) VALUES (?1, ?2, ?3)")
                .bind(hash)
                .bind(&send.to_address)
                .bind(to_i64("send.amount", send.amount)?)
                .execute(&mut **db_tx)
                .await?;
        }
        TxPayload::Claim(claim) => {
            query(
                "INSERT INTO tx_claim (hash, chain, app_public_key, session_height, total_proofs, \
                 evidence_type, expiration_height) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )
            .bind(hash)
            .bind(&claim.chain)
            .bind(&claim.app_public_key)
            .bind(to_i64("claim.session_height", claim.session_height)?)
            .bind(to_i64("claim.total_proofs", claim.total_proofs)?)
            .bind(claim.evidence_type)
            .bind(to_i64("claim.expiration_height", claim.expiration_height)?)
            .execute(&mut **db_tx)
            .await?;
        }
        TxPayload::Proof(proof) => {
            query(
                "INSERT INTO tx_proof (hash, app_public_key, client_public_key, \
                 servicer_public_key, chain, request_hash, session_height) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )
            .bind(hash)
            .bind(&proof.app_public_key)
            .bind(&proof.client_public_key)
            .bind(&proof.servicer_public_key)
            .bind(&proof.chain)
            .bind(&proof.request_hash)
            .bind(to_i64("proof.session_height", proof.session_height)?)
            .execute(&mut **db_tx)
            .await?;
        }
        TxPayload::Stake(stake) => {
            query(
                "INSERT INTO tx_stake (hash, amount, chains, public_key_type, public_key, \
                 service_url) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )
            .bind(hash)
            .bind(to_i64("stake.amount", stake.amount)?)
            .bind(serde_json::to_string(&stake.chains)?)
            .bind(&stake.public_key_type)
            .bind(&stake.public_key)
            .bind(&stake.service_url)
            .execute(&mut **db_tx)
            .await?;
        }
    }
    Ok(())
}

impl TransactionRepo for SqliteDb {
    async fn fetch_transaction(&self, hash: &str) -> Result<Option<Transaction>, RepoError> {
        query(&format!("{} WHERE t.hash = ?1", SELECT_TRANSACTIONS))
            .bind(hash)
            .fetch_optional(&self.pool)
            .await?
            .map(transaction_from_row)
            .transpose()
    }

    async fn fetch_transactions_at_height(&self, height: u64) -> Result<Vec<Transaction>, RepoError> {
        let rows = query(&format!(
            "{} WHERE t.height = ?1 ORDER BY t.rowid",
            SELECT_TRANSACTIONS
        ))
        .bind(to_i64("height", height)?)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(transaction_from_row).collect()
    }

    async fn count_at_height(&self, height: u64) -> Result<u64, RepoError> {
        let count: i64 = query("SELECT COUNT(*) AS n FROM transactions WHERE height = ?1")
            .bind(to_i64("height", height)?)
            .fetch_one(&self.pool)
            .await?
            .try_get("n")?;
        Ok(to_u64(count))
    }

    /// Writes the transaction row and its payload row atomically.
    async fn insert_transaction(&self, tx: &Transaction) -> Result<(), RepoError> {
        let mut db_tx = self.pool.begin().await?;

        query(
            "INSERT INTO transactions (hash, height, tx_type, fee, from_address, memo, result_code) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )
        .bind(&tx.hash)
        .bind(to_i64("height", tx.height)?)
        .bind(&tx.tx_type)
        .bind(to_i64("fee", tx.fee)?)
        .bind(&tx.from_address)
        .bind(&tx.memo)
        .bind(tx.result_code)
        .execute(&mut *db_tx)
        .await
        .map_err(map_unique("transaction", &tx.hash))?;

        if let Some(payload) = &tx.payload {
            insert_payload(&mut db_tx, &tx.hash, payload).await?;
        }

        db_tx.commit().await?;
        Ok(())
    }
}
