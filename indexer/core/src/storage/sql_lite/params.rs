use std::collections::BTreeSet;

use sqlx::{query, Row, Sqlite, Transaction};

use super::{
    utils::{map_unique, to_i64, to_u64},
    SqliteDb,
};
use crate::{
    param::{ParamGroup, ParamGroups},
    storage::{ParamRepo, RepoError},
};

impl ParamRepo for SqliteDb {
    async fn fetch_params(&self, height: u64) -> Result<Option<ParamGroups>, RepoError> {
        let rows = query(
            "SELECT param_group, param_key, param_value FROM params WHERE height = ?1",
        )
        .bind(to_i64("height", height)?)
        .fetch_all(&self.pool)
        .await?;

        if rows.is_empty() {
            return Ok(None);
        }

        let mut params = ParamGroups {
            height,
            app: ParamGroup::default(),
            auth: ParamGroup::default(),
            gov: ParamGroup::default(),
            node: ParamGroup::default(),
            pocket: ParamGroup::default(),
        };
        for row in rows {
            let group: String = row.try_get("param_group")?;
            if let Some(group) = params.group_mut(&group) {
                group.insert(
                    row.try_get::<String, _>("param_key")?,
                    row.try_get::<String, _>("param_value")?,
                );
            }
        }

        Ok(Some(params))
    }

    async fn fetch_all_heights(&self) -> Result<BTreeSet<u64>, RepoError> {
        let rows = query("SELECT DISTINCT height FROM params")
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter()
            .map(|row| -> Result<u64, RepoError> { Ok(to_u64(row.try_get("height")?)) })
            .collect()
    }

    async fn insert_params(&self, params: &ParamGroups) -> Result<(), RepoError> {
        let mut tx = self.pool.begin().await?;
        insert_rows(&mut tx, params).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn replace_params(&self, params: &ParamGroups) -> Result<(), RepoError> {
        let mut tx = self.pool.begin().await?;
        query("DELETE FROM params WHERE height = ?1")
            .bind(to_i64("height", params.height)?)
            .execute(&mut *tx)
            .await?;
        insert_rows(&mut tx, params).await?;
        tx.commit().await?;
        Ok(())
    }
}

async fn insert_rows(
    tx: &mut Transaction<'_, Sqlite>,
    params: &ParamGroups,
) -> Result<(), RepoError> {
    let height = to_i64("height", params.height)?;
    let key = params.height.to_string();

    for (group, values) in params.groups() {
        for (param_key, param_value) in values.iter() {
            query(
                "INSERT INTO params (height, param_group, param_key, param_value) \
                 VALUES (?1, ?2, ?3, ?4)",
            )
            .bind(height)
            .bind(group)
            .bind(param_key)
            .bind(param_value)
            .execute(&mut **tx)
            .await
            .map_err(map_unique("params", &key))?;
        }
    }
    Ok(())
}
