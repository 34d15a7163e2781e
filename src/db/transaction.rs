use crate::db::{decode_error, height_param, latest_heights};
use crate::models::{Address, Height, Transaction};
use chrono::{DateTime, Utc};
use sqlx::{Pool, Row, Sqlite};
use std::collections::HashMap;

/// Stores a transaction keyed by its hash.
///
/// Returns `false` when the hash was already stored; the existing row,
/// including its `persisted_at`, is left untouched.
pub async fn save_transaction(
    pool: &Pool<Sqlite>,
    transaction: &Transaction,
    received_at: DateTime<Utc>,
    persisted_at: DateTime<Utc>,
) -> Result<bool, sqlx::Error> {
    let payload = serde_json::to_string(transaction).map_err(|e| sqlx::Error::Encode(Box::new(e)))?;

    let height = height_param(transaction.height())?;

    let result = sqlx::query(
        r#"
        INSERT INTO transactions
        (hash, algorithm, public_key, height, payload, received_at, persisted_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(hash) DO NOTHING
        "#,
    )
    .bind(transaction.hash.to_hex())
    .bind(transaction.block.algorithm().as_str())
    .bind(transaction.block.public_key().to_hex())
    .bind(height)
    .bind(payload)
    .bind(received_at.timestamp_millis())
    .bind(persisted_at.timestamp_millis())
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn find_latest_heights(
    pool: &Pool<Sqlite>,
    addresses: &[Address],
) -> Result<HashMap<Address, Height>, sqlx::Error> {
    latest_heights(pool, "transactions", addresses).await
}

/// Transactions persisted within `[from, to]`, oldest first.
pub async fn find_by_persisted_range(
    pool: &Pool<Sqlite>,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Result<Vec<Transaction>, sqlx::Error> {
    let rows = sqlx::query(
        r#"SELECT payload FROM transactions
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

pub async fn count_transactions(pool: &Pool<Sqlite>) -> Result<i64, sqlx::Error> {
    let count = sqlx::query("SELECT COUNT(*) FROM transactions")
        .fetch_one(pool)
        .await?
        .get::<i64, _>(0);

    Ok(count)
}
