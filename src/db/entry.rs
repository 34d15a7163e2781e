use crate::db::{decode_error, height_param, latest_heights};
use crate::models::{AccountEntry, Address, Height};
use chrono::{DateTime, Utc};
use sqlx::{Pool, Row, Sqlite};
use std::collections::HashMap;

/// Stores an account entry keyed by its hash. Returns `false` on a duplicate.
pub async fn save_entry(
    pool: &Pool<Sqlite>,
    entry: &AccountEntry,
    persisted_at: DateTime<Utc>,
) -> Result<bool, sqlx::Error> {
    let payload = serde_json::to_string(entry).map_err(|e| sqlx::Error::Encode(Box::new(e)))?;

    let height = height_param(entry.height)?;

    let result = sqlx::query(
        r#"
        INSERT INTO account_entries
        (hash, algorithm, public_key, height, payload, persisted_at)
        VALUES (?, ?, ?, ?, ?, ?)
        ON CONFLICT(hash) DO NOTHING
        "#,
    )
    .bind(entry.hash.to_hex())
    .bind(entry.algorithm.as_str())
    .bind(entry.public_key.to_hex())
    .bind(height)
    .bind(payload)
    .bind(persisted_at.timestamp_millis())
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn find_latest_heights(
    pool: &Pool<Sqlite>,
    addresses: &[Address],
) -> Result<HashMap<Address, Height>, sqlx::Error> {
    latest_heights(pool, "account_entries", addresses).await
}

pub async fn find_by_persisted_range(
    pool: &Pool<Sqlite>,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Result<Vec<AccountEntry>, sqlx::Error> {
    let rows = sqlx::query(
        r#"SELECT payload FROM account_entries
           WHERE persisted_at BETWEEN ? AND ?
           ORDER BY persisted_at, height"#,
    )
    .bind(from.timestamp_millis())
    .bind(to.timestamp_millis())
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|row| {
            let payload: String = row.try_get("payload")?;
            serde_json::from_str(&payload).map_err(decode_error)
        })
        .collect()
}
