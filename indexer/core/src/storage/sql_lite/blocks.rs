use std::collections::BTreeSet;

use sqlx::{query, Row};

use super::{
    utils::{map_unique, to_i64, to_u64},
    SqliteDb,
};
use crate::{
    block::Block,
    storage::{BlockRepo, RepoError},
};

impl BlockRepo for SqliteDb {
    async fn fetch_block(&self, height: u64) -> Result<Option<Block>, RepoError> {
        let row = query(
            "SELECT height, time, proposer_address, num_txs FROM blocks WHERE height = ?1",
        )
        .bind(to_i64("height", height)?)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| -> Result<Block, RepoError> {
            Ok(Block {
                height: to_u64(row.try_get("height")?),
                time: row.try_get("time")?,
                proposer_address: row.try_get("proposer_address")?,
                num_txs: to_u64(row.try_get("num_txs")?),
            })
        })
        .transpose()
    }

    async fn fetch_all_heights(&self) -> Result<BTreeSet<u64>, RepoError> {
        let rows = query("SELECT height FROM blocks")
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter()
            .map(|row| -> Result<u64, RepoError> { Ok(to_u64(row.try_get("height")?)) })
            .collect()
    }

    async fn insert_block(&self, block: &Block) -> Result<(), RepoError> {
        let key = block.height.to_string();
        query("INSERT INTO blocks (height, time, proposer_address, num_txs) VALUES (?1, ?2, ?3, ?4)")
            .bind(to_i64("height", block.height)?)
            .bind(block.time)
            .bind(&block.proposer_address)
            .bind(to_i64("num_txs", block.num_txs)?)
            .execute(&self.pool)
            .await
            .map_err(map_unique("block", &key))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::storage::sql_lite::tests::setup_db;

    fn block(height: u64) -> Block {
        Block {
            height,
            time: Utc.timestamp_opt(1_650_000_000 + height as i64, 0).unwrap(),
            proposer_address: format!("proposer{}", height),
            num_txs: height % 3,
        }
    }

    #[tokio::test]
    async fn test_insert_and_fetch_block() {
        let db = setup_db().await;

        db.insert_block(&block(10)).await.expect("Failed to insert block");

        let fetched = db.fetch_block(10).await.expect("Failed to fetch block");
        assert_eq!(fetched, Some(block(10)));
        assert_eq!(db.fetch_block(11).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_duplicate_block_height() {
        let db = setup_db().await;

        db.insert_block(&block(10)).await.unwrap();
        let err = db.insert_block(&block(10)).await.unwrap_err();
        assert!(matches!(err, RepoError::Duplicate { entity: "block", ref key } if key == "10"));
    }

    #[tokio::test]
    async fn test_fetch_all_heights() {
        let db = setup_db().await;
        for height in [5, 1, 3] {
            db.insert_block(&block(height)).await.unwrap();
        }

        let heights: Vec<u64> = BlockRepo::fetch_all_heights(&db)
            .await
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(heights, vec![1, 3, 5]);
    }

    #[tokio::test]
    async fn test_height_beyond_i64_is_rejected() {
        let db = setup_db().await;
        let err = db.insert_block(&block(u64::MAX)).await.unwrap_err();
        assert!(matches!(err, RepoError::Overflow { field: "height", .. }));
    }
}
