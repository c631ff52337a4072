use std::{fs, path::Path};

use log::trace;
use sqlx::{query, sqlite::SqlitePoolOptions, Pool, Sqlite};

use crate::storage::{RepoError, Schema};

mod blocks;
mod nodes;
mod params;
mod transactions;
mod utils;

/// SQLite-backed repo for every entity. Enforces unique keys; violations surface as
/// [`RepoError::Duplicate`].
#[derive(Debug, Clone)]
pub struct SqliteDb {
    pub(crate) pool: Pool<Sqlite>,
}

const TABLES: [&str; 8] = [
    "tx_stake",
    "tx_proof",
    "tx_claim",
    "tx_send",
    "transactions",
    "nodes",
    "params",
    "blocks",
];

impl SqliteDb {
    pub async fn new(path: &str, max_connections: u32) -> Result<Self, RepoError> {
        // Check if there is a database file at the path
        if !Path::new(path).try_exists()? {
            trace!(
                "Database file not found. A new one will be created at: {}",
                path
            );
            fs::File::create(path)?;
        } else {
            trace!("Database file found at: {}", path);
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect(&format!("sqlite:{}", path))
            .await?;

        Ok(Self { pool })
    }

    pub fn from_pool(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    pub async fn create_block_table(pool: &Pool<Sqlite>) -> Result<(), RepoError> {
        query(
            "CREATE TABLE IF NOT EXISTS blocks (
                height INTEGER PRIMARY KEY,
                time TEXT NOT NULL,
                proposer_address TEXT NOT NULL,
                num_txs INTEGER NOT NULL
            );",
        )
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn create_params_table(pool: &Pool<Sqlite>) -> Result<(), RepoError> {
        query(
            "CREATE TABLE IF NOT EXISTS params (
                height INTEGER NOT NULL,
                param_group TEXT NOT NULL,
                param_key TEXT NOT NULL,
                param_value TEXT NOT NULL,
                PRIMARY KEY (height, param_group, param_key)
            );",
        )
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn create_nodes_table(pool: &Pool<Sqlite>) -> Result<(), RepoError> {
        query(
            "CREATE TABLE IF NOT EXISTS nodes (
                address TEXT NOT NULL,
                height INTEGER NOT NULL,
                public_key TEXT NOT NULL,
                jailed BOOLEAN NOT NULL,
                status INTEGER NOT NULL,
                chains TEXT NOT NULL,
                service_url TEXT NOT NULL,
                tokens INTEGER NOT NULL,
                unstaking_time TEXT NOT NULL,
                output_address TEXT NOT NULL,
                PRIMARY KEY (address, height)
            );",
        )
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn create_transaction_tables(pool: &Pool<Sqlite>) -> Result<(), RepoError> {
        query(
            "CREATE TABLE IF NOT EXISTS transactions (
                hash TEXT PRIMARY KEY,
                height INTEGER NOT NULL,
                tx_type TEXT NOT NULL,
                fee INTEGER NOT NULL,
                from_address TEXT NOT NULL,
                memo TEXT NOT NULL,
                result_code INTEGER NOT NULL
            );",
        )
        .execute(pool)
        .await?;
        query("CREATE INDEX IF NOT EXISTS transactions_height ON transactions (height);")
            .execute(pool)
            .await?;
        query(
            "CREATE TABLE IF NOT EXISTS tx_send (
                hash TEXT PRIMARY KEY REFERENCES transactions(hash),
                to_address TEXT NOT NULL,
                amount INTEGER NOT NULL
            );",
        )
        .execute(pool)
        .await?;
        query(
            "CREATE TABLE IF NOT EXISTS tx_claim (
                hash TEXT PRIMARY KEY REFERENCES transactions(hash),
                chain TEXT NOT NULL,
                app_public_key TEXT NOT NULL,
                session_height INTEGER NOT NULL,
                total_proofs INTEGER NOT NULL,
                evidence_type INTEGER NOT NULL,
                expiration_height INTEGER NOT NULL
            );",
        )
        .execute(pool)
        .await?;
        query(
            "CREATE TABLE IF NOT EXISTS tx_proof (
                hash TEXT PRIMARY KEY REFERENCES transactions(hash),
                app_public_key TEXT NOT NULL,
                client_public_key TEXT NOT NULL,
                servicer_public_key TEXT NOT NULL,
                chain TEXT NOT NULL,
                request_hash TEXT NOT NULL,
                session_height INTEGER NOT NULL
            );",
        )
        .execute(pool)
        .await?;
        query(
            "CREATE TABLE IF NOT EXISTS tx_stake (
                hash TEXT PRIMARY KEY REFERENCES transactions(hash),
                amount INTEGER NOT NULL,
                chains TEXT NOT NULL,
                public_key_type TEXT NOT NULL,
                public_key TEXT NOT NULL,
                service_url TEXT NOT NULL
            );",
        )
        .execute(pool)
        .await?;
        Ok(())
    }
}

impl Schema for SqliteDb {
    async fn create_schema(&self) -> Result<(), RepoError> {
        trace!("Creating tables...");
        Self::create_block_table(&self.pool).await?;
        Self::create_params_table(&self.pool).await?;
        Self::create_nodes_table(&self.pool).await?;
        Self::create_transaction_tables(&self.pool).await?;
        Ok(())
    }

    async fn drop_schema_if_exists(&self) -> Result<(), RepoError> {
        for table in TABLES {
            trace!("Dropping table '{}'", table);
            query(&format!("DROP TABLE IF EXISTS {};", table))
                .execute(&self.pool)
                .await?;
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use sqlx::{sqlite::SqlitePoolOptions, Row};

    use super::*;

    pub(crate) async fn setup_db() -> SqliteDb {
        // A single connection keeps every query on the same in-memory database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("Failed to create database pool in memory");

        let db = SqliteDb { pool };
        db.create_schema().await.expect("Failed to create schema");
        db
    }

    async fn table_count(db: &SqliteDb) -> i64 {
        sqlx::query("SELECT COUNT(*) AS n FROM sqlite_master WHERE type = 'table'")
            .fetch_one(&db.pool)
            .await
            .unwrap()
            .get("n")
    }

    #[tokio::test]
    async fn test_create_schema_is_repeatable() {
        let db = setup_db().await;
        db.create_schema().await.expect("Failed to create schema twice");
        assert_eq!(table_count(&db).await, TABLES.len() as i64);
    }

    #[tokio::test]
    async fn test_drop_schema_if_exists() {
        let db = setup_db().await;
        db.drop_schema_if_exists().await.expect("Failed to drop schema");
        db.drop_schema_if_exists().await.expect("Failed to drop missing schema");
        assert_eq!(table_count(&db).await, 0);
    }
}
