use sqlx::{query, sqlite::SqliteRow, Row};

use super::{
    utils::{to_i64, to_u64},
    SqliteDb,
};
use crate::{
    node::Node,
    storage::{NodeRepo, RepoError},
};

fn node_from_row(row: SqliteRow) -> Result<Node, RepoError> {
    let chains: String = row.try_get("chains")?;
    Ok(Node {
        address: row.try_get("address")?,
        height: to_u64(row.try_get("height")?),
        public_key: row.try_get("public_key")?,
        jailed: row.try_get("jailed")?,
        status: row.try_get("status")?,
        chains: serde_json::from_str(&chains)?,
        service_url: row.try_get("service_url")?,
        tokens: to_u64(row.try_get("tokens")?),
        unstaking_time: row.try_get("unstaking_time")?,
        output_address: row.try_get("output_address")?,
    })
}

impl NodeRepo for SqliteDb {
    async fn fetch_nodes_at_height(&self, height: u64) -> Result<Vec<Node>, RepoError> {
        let rows = query(
            "SELECT address, height, public_key, jailed, status, chains, service_url, tokens, \
             unstaking_time, output_address FROM nodes WHERE height = ?1 ORDER BY address",
        )
        .bind(to_i64("height", height)?)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(node_from_row).collect()
    }

    async fn upsert_node(&self, node: &Node) -> Result<(), RepoError> {
        query(
            "INSERT INTO nodes (address, height, public_key, jailed, status, chains, service_url, \
             tokens, unstaking_time, output_address) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10) \
             ON CONFLICT (address, height) DO UPDATE SET \
             public_key = excluded.public_key, \
             jailed = excluded.jailed, \
             status = excluded.status, \
             chains = excluded.chains, \
             service_url = excluded.service_url, \
             tokens = excluded.tokens, \
             unstaking_time = excluded.unstaking_time, \
             output_address = excluded.output_address",
        )
        .bind(&node.address)
        .bind(to_i64("height", node.height)?)
        .bind(&node.public_key)
        .bind(node.jailed)
        .bind(node.status)
        .bind(serde_json::to_string(&node.chains)?)
        .bind(&node.service_url)
        .bind(to_i64("tokens", node.tokens)?)
        .bind(node.unstaking_time)
        .bind(&node.output_address)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
