// Ledger value types shared by the node client, storage and API layers.
// Everything here is plain data; behaviour lives in the sync and db modules.

pub mod account;
pub mod address;
pub mod receivable;
pub mod transaction;

pub use account::{AccountSnapshot, AccountState, MonitoredAccount};
pub use address::{Address, Algorithm, Hash, PublicKey};
pub use receivable::Receivable;
pub use transaction::{AccountEntry, Block, BlockType, Transaction};

use chrono::{DateTime, Utc};

/// Block height within a single account chain. The first block is height 1.
pub type Height = u64;

/// Raw ledger amount.
pub type Amount = u64;

/// Current wall clock truncated to millisecond precision, the resolution
/// timestamps are stored with.
pub fn now_millis() -> DateTime<Utc> {
    from_millis(Utc::now().timestamp_millis())
}

pub fn from_millis(millis: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(millis).unwrap_or_default()
}
