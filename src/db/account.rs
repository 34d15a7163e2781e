// Monitored account rows. Accounts are never deleted, only disabled.

use crate::models::{from_millis, Address, MonitoredAccount};
use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqliteRow, Pool, Row, Sqlite};

fn account_from_row(row: &SqliteRow) -> Result<MonitoredAccount, sqlx::Error> {
    Ok(MonitoredAccount {
        address: row.try_get("address")?,
        version: row.try_get("version")?,
        persisted_at: from_millis(row.try_get("persisted_at")?),
        updated_at: from_millis(row.try_get("updated_at")?),
        disabled_at: row.try_get::<Option<i64>, _>("disabled_at")?.map(from_millis),
    })
}

pub async fn find_account(
    pool: &Pool<Sqlite>,
    address: &Address,
) -> Result<Option<MonitoredAccount>, sqlx::Error> {
    let row = sqlx::query(
        "SELECT address, version, persisted_at, updated_at, disabled_at
         FROM monitored_accounts WHERE address = ?",
    )
    .bind(address.path())
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(account_from_row).transpose()
}

pub async fn find_all_accounts(pool: &Pool<Sqlite>) -> Result<Vec<MonitoredAccount>, sqlx::Error> {
    let rows = sqlx::query(
        "SELECT address, version, persisted_at, updated_at, disabled_at
         FROM monitored_accounts ORDER BY persisted_at, address",
    )
    .fetch_all(pool)
    .await?;

    rows.iter().map(account_from_row).collect()
}

/// Inserts a new enabled account.
///
/// Returns `None` when a row for the address already exists, which happens
/// when two monitor requests for the same address race.
pub async fn insert_account(
    pool: &Pool<Sqlite>,
    address: &Address,
    now: DateTime<Utc>,
) -> Result<Option<MonitoredAccount>, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO monitored_accounts (address, version, persisted_at, updated_at, disabled_at)
         VALUES (?, 0, ?, ?, NULL)
         ON CONFLICT(address) DO NOTHING",
    )
    .bind(address.path())
    .bind(now.timestamp_millis())
    .bind(now.timestamp_millis())
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Ok(None);
    }

    Ok(Some(MonitoredAccount {
        address: address.path(),
        version: 0,
        persisted_at: now,
        updated_at: now,
        disabled_at: None,
    }))
}

/// Sets `disabled_at` and bumps the row version. Returns the stored row, or
/// `None` if the account does not exist.
pub async fn update_disabled_at(
    pool: &Pool<Sqlite>,
    address: &Address,
    disabled_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Result<Option<MonitoredAccount>, sqlx::Error> {
    let row = sqlx::query(
        "UPDATE monitored_accounts
         SET disabled_at = ?, updated_at = ?, version = version + 1
         WHERE address = ?
         RETURNING address, version, persisted_at, updated_at, disabled_at",
    )
    .bind(disabled_at.map(|at| at.timestamp_millis()))
    .bind(now.timestamp_millis())
    .bind(address.path())
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(account_from_row).transpose()
}
