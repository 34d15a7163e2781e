use sqlx::SqlitePool;
use tracing::info;

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS monitored_accounts (
        address TEXT PRIMARY KEY,
        version INTEGER NOT NULL DEFAULT 0,
        persisted_at INTEGER NOT NULL,
        updated_at INTEGER NOT NULL,
        disabled_at INTEGER
    )",
    "CREATE TABLE IF NOT EXISTS transactions (
        hash TEXT PRIMARY KEY,
        algorithm TEXT NOT NULL,
        public_key TEXT NOT NULL,
        height INTEGER NOT NULL,
        payload TEXT NOT NULL,
        received_at INTEGER NOT NULL,
        persisted_at INTEGER NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_transactions_account_height
     ON transactions(algorithm, public_key, height)",
    "CREATE INDEX IF NOT EXISTS idx_transactions_persisted_at
     ON transactions(persisted_at)",
    "CREATE TABLE IF NOT EXISTS account_entries (
        hash TEXT PRIMARY KEY,
        algorithm TEXT NOT NULL,
        public_key TEXT NOT NULL,
        height INTEGER NOT NULL,
        payload TEXT NOT NULL,
        persisted_at INTEGER NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_account_entries_account_height
     ON account_entries(algorithm, public_key, height)",
    "CREATE INDEX IF NOT EXISTS idx_account_entries_persisted_at
     ON account_entries(persisted_at)",
];

pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    info!("Running database migrations...");

    for statement in SCHEMA {
        sqlx::query(*statement).execute(pool).await?;
    }

    info!("Database migrations completed successfully");
    Ok(())
}
