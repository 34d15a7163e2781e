use super::{Address, Algorithm, Amount, Hash, Height, PublicKey};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BlockType {
    Send,
    Receive,
    Open,
    Change,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendBlock {
    pub network: String,
    pub version: u16,
    pub algorithm: Algorithm,
    pub public_key: PublicKey,
    pub height: Height,
    pub balance: Amount,
    pub timestamp: DateTime<Utc>,
    pub previous: Hash,
    pub receiver_algorithm: Algorithm,
    pub receiver_public_key: PublicKey,
    pub amount: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiveBlock {
    pub network: String,
    pub version: u16,
    pub algorithm: Algorithm,
    pub public_key: PublicKey,
    pub height: Height,
    pub balance: Amount,
    pub timestamp: DateTime<Utc>,
    pub previous: Hash,
    pub send_hash_algorithm: Algorithm,
    pub send_hash: Hash,
}

/// First block of an account chain; always at height 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenBlock {
    pub network: String,
    pub version: u16,
    pub algorithm: Algorithm,
    pub public_key: PublicKey,
    pub balance: Amount,
    pub timestamp: DateTime<Utc>,
    pub send_hash_algorithm: Algorithm,
    pub send_hash: Hash,
    pub representative_algorithm: Algorithm,
    pub representative_public_key: PublicKey,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeBlock {
    pub network: String,
    pub version: u16,
    pub algorithm: Algorithm,
    pub public_key: PublicKey,
    pub height: Height,
    pub balance: Amount,
    pub timestamp: DateTime<Utc>,
    pub previous: Hash,
    pub representative_algorithm: Algorithm,
    pub representative_public_key: PublicKey,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Block {
    Send(SendBlock),
    Receive(ReceiveBlock),
    Open(OpenBlock),
    Change(ChangeBlock),
}

impl Block {
    pub fn algorithm(&self) -> Algorithm {
        match self {
            Block::Send(b) => b.algorithm,
            Block::Receive(b) => b.algorithm,
            Block::Open(b) => b.algorithm,
            Block::Change(b) => b.algorithm,
        }
    }

    pub fn public_key(&self) -> PublicKey {
        match self {
            Block::Send(b) => b.public_key,
            Block::Receive(b) => b.public_key,
            Block::Open(b) => b.public_key,
            Block::Change(b) => b.public_key,
        }
    }

    pub fn height(&self) -> Height {
        match self {
            Block::Send(b) => b.height,
            Block::Receive(b) => b.height,
            Block::Open(_) => 1,
            Block::Change(b) => b.height,
        }
    }

    pub fn address(&self) -> Address {
        Address::new(self.algorithm(), self.public_key())
    }

    /// Hash of the send this block claims, for blocks that receive funds.
    pub fn received_send_hash(&self) -> Option<Hash> {
        match self {
            Block::Receive(b) => Some(b.send_hash),
            Block::Open(b) => Some(b.send_hash),
            Block::Send(_) | Block::Change(_) => None,
        }
    }
}

/// A signed block as confirmed by the node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub hash: Hash,
    pub block: Block,
    pub signature: String,
    pub work: String,
}

impl Transaction {
    pub fn address(&self) -> Address {
        self.block.address()
    }

    pub fn height(&self) -> Height {
        self.block.height()
    }
}

/// Human readable view of a block on one account chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountEntry {
    pub hash: Hash,
    pub algorithm: Algorithm,
    pub public_key: PublicKey,
    pub height: Height,
    pub block_type: BlockType,
    pub subject_algorithm: Algorithm,
    pub subject_public_key: PublicKey,
    pub previous_balance: Amount,
    pub balance: Amount,
    pub timestamp: DateTime<Utc>,
}

impl AccountEntry {
    pub fn address(&self) -> Address {
        Address::new(self.algorithm, self.public_key)
    }
}
