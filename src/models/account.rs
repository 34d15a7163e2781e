use super::{Address, Algorithm, Amount, Hash, Height, PublicKey};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Row of `monitored_accounts`. An account is enabled while `disabled_at` is unset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitoredAccount {
    pub address: String,
    pub version: i64,
    #[serde(skip_serializing, default)]
    pub persisted_at: DateTime<Utc>,
    #[serde(skip_serializing, default)]
    pub updated_at: DateTime<Utc>,
    pub disabled_at: Option<DateTime<Utc>>,
}

impl MonitoredAccount {
    pub fn is_enabled(&self) -> bool {
        self.disabled_at.is_none()
    }
}

/// Account state as reported by the node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountSnapshot {
    pub algorithm: Algorithm,
    pub public_key: PublicKey,
    pub network: String,
    pub version: u16,
    pub height: Height,
    pub balance: Amount,
    pub last_transaction_hash: Hash,
    pub last_transaction_timestamp: DateTime<Utc>,
    pub representative_algorithm: Algorithm,
    pub representative_public_key: PublicKey,
}

impl AccountSnapshot {
    pub fn address(&self) -> Address {
        Address::new(self.algorithm, self.public_key)
    }
}

/// In-memory projection of one watched address.
#[derive(Debug, Clone)]
pub struct AccountState {
    pub address: Address,
    pub account: MonitoredAccount,
    pub snapshot: Option<AccountSnapshot>,
}

impl AccountState {
    pub fn is_enabled(&self) -> bool {
        self.account.is_enabled()
    }
}
