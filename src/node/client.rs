//! Operations consumed from the remote ledger node.

use crate::models::{AccountEntry, AccountSnapshot, Address, Height, Receivable, Transaction};
use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio_util::codec::LinesCodecError;

#[derive(Error, Debug)]
pub enum NodeError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Stream framing error: {0}")]
    Framing(#[from] LinesCodecError),

    #[error("Invalid node payload: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Live push stream from the node. Dropping it closes the subscription.
pub type NodeStream<T> = BoxStream<'static, Result<T, NodeError>>;

/// Where to resume one account chain from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountHeightSearch {
    pub address: Address,
    pub from_height: Height,
}

/// Resume request for the height-indexed streams. The node delivers every
/// record at or above `from_height` for each listed address.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeightSearch {
    pub search: Vec<AccountHeightSearch>,
}

impl HeightSearch {
    pub fn from_height(&self, address: &Address) -> Option<Height> {
        self.search
            .iter()
            .find(|s| &s.address == address)
            .map(|s| s.from_height)
    }
}

#[async_trait]
pub trait NodeClient: Send + Sync {
    /// One-shot bulk fetch of the current account snapshots.
    async fn fetch_account_snapshots(&self, addresses: &[Address]) -> Result<Vec<AccountSnapshot>, NodeError>;

    async fn subscribe_account_snapshots(&self, addresses: &[Address]) -> Result<NodeStream<AccountSnapshot>, NodeError>;

    async fn subscribe_receivables(&self, addresses: &[Address]) -> Result<NodeStream<Receivable>, NodeError>;

    async fn subscribe_transactions(&self, search: &HeightSearch) -> Result<NodeStream<Transaction>, NodeError>;

    async fn subscribe_account_entries(&self, search: &HeightSearch) -> Result<NodeStream<AccountEntry>, NodeError>;
}
