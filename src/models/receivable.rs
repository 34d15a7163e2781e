use super::{Address, Algorithm, Amount, Hash, PublicKey};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A send that has been confirmed on the sender's chain but not yet
/// received by the receiver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Receivable {
    pub hash: Hash,
    pub version: u16,
    pub algorithm: Algorithm,
    pub public_key: PublicKey,
    pub receiver_algorithm: Algorithm,
    pub receiver_public_key: PublicKey,
    pub amount: Amount,
    pub timestamp: DateTime<Utc>,
}

impl Receivable {
    pub fn receiver_address(&self) -> Address {
        Address::new(self.receiver_algorithm, self.receiver_public_key)
    }
}
