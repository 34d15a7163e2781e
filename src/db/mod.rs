pub mod account;
pub mod connection;
pub mod entry;
pub mod migration;
pub mod transaction;

use crate::models::{Address, Algorithm, Height, PublicKey};
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};
use std::collections::HashMap;

pub(crate) fn decode_error<E>(err: E) -> sqlx::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    sqlx::Error::Decode(Box::new(err))
}

/// Heights are stored as SQLite INTEGER, which cannot hold the top half of `u64`.
pub(crate) fn height_param(height: Height) -> Result<i64, sqlx::Error> {
    i64::try_from(height).map_err(|e| sqlx::Error::Encode(Box::new(e)))
}

/// Highest persisted height per address in one of the height-indexed tables.
///
/// Addresses without rows are absent from the result.
pub(crate) async fn latest_heights(
    pool: &SqlitePool,
    table: &'static str,
    addresses: &[Address],
) -> Result<HashMap<Address, Height>, sqlx::Error> {
    if addresses.is_empty() {
        return Ok(HashMap::new());
    }

    let mut query = QueryBuilder::<Sqlite>::new(format!(
        "SELECT algorithm, public_key, MAX(height) AS height FROM {} WHERE public_key IN (",
        table
    ));
    let mut keys = query.separated(", ");
    for address in addresses {
        keys.push_bind(address.public_key.to_hex());
    }
    keys.push_unseparated(") GROUP BY algorithm, public_key");

    let rows = query.build().fetch_all(pool).await?;

    let mut heights = HashMap::with_capacity(rows.len());
    for row in rows {
        let algorithm: Algorithm = row.try_get::<String, _>("algorithm")?.parse().map_err(decode_error)?;
        let public_key: PublicKey = row.try_get::<String, _>("public_key")?.parse().map_err(decode_error)?;
        let height: i64 = row.try_get("height")?;

        let address = Address::new(algorithm, public_key);
        // Same key under another algorithm is a different account
        if addresses.contains(&address) {
            heights.insert(address, Height::try_from(height).map_err(decode_error)?);
        }
    }

    Ok(heights)
}
