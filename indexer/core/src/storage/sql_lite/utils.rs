use crate::storage::RepoError;

/// SQLite integers are signed 64-bit.
pub(super) fn to_i64(field: &'static str, value: u64) -> Result<i64, RepoError> {
    i64::try_from(value).map_err(|_| RepoError::Overflow { field, value })
}

pub(super) fn to_u64(value: i64) -> u64 {
    value.max(0) as u64
}

/// Maps a unique-key violation to [`RepoError::Duplicate`], and any other error unchanged.
pub(super) fn map_unique<'a>(entity: &'static str, key: &'a str) -> impl FnOnce(sqlx::Error) -> RepoError + 'a {
    move |error| match error {
        sqlx::Error::Database(ref db) if db.is_unique_violation() => RepoError::Duplicate {
            entity,
            key: key.to_string(),
        },
        other => RepoError::Sqlx(other),
    }
}
