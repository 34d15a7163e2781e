//! Height-resumable transaction and entry synchronizers, and the account
//! snapshot refresher.

use crate::db::{entry, transaction};
use crate::events::{EventPublisher, TransactionSaved};
use crate::models::{now_millis, AccountEntry, AccountSnapshot, Address, Height, Transaction};
use crate::node::{AccountHeightSearch, HeightSearch, NodeClient, NodeStream};
use crate::sync::registry::AccountRegistry;
use crate::sync::stream::StreamSource;
use crate::sync::SyncError;
use async_trait::async_trait;
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Stand-in for the latest height of an address with nothing persisted, so
/// the first request starts at height 1.
const NO_RECORDS_HEIGHT: Height = 0;

/// Builds the per-address resume request: one past the latest persisted
/// height, or height 1 for addresses without records.
pub fn resume_search(latest: &HashMap<Address, Height>, addresses: &[Address]) -> HeightSearch {
    let search = addresses
        .iter()
        .map(|address| AccountHeightSearch {
            address: *address,
            from_height: latest.get(address).copied().unwrap_or(NO_RECORDS_HEIGHT) + 1,
        })
        .collect();

    HeightSearch { search }
}

pub struct TransactionSync {
    pool: SqlitePool,
    node: Arc<dyn NodeClient>,
    events: EventPublisher,
}

impl TransactionSync {
    pub fn new(pool: SqlitePool, node: Arc<dyn NodeClient>, events: EventPublisher) -> Self {
        Self { pool, node, events }
    }
}

#[async_trait]
impl StreamSource for TransactionSync {
    type Item = Transaction;

    fn name(&self) -> &'static str {
        "transactions"
    }

    async fn subscribe(&self, addresses: &[Address]) -> Result<NodeStream<Transaction>, SyncError> {
        let latest = transaction::find_latest_heights(&self.pool, addresses).await?;
        let search = resume_search(&latest, addresses);
        debug!("Resuming transactions from {:?}", search);

        Ok(self.node.subscribe_transactions(&search).await?)
    }

    async fn handle(&self, transaction: Transaction) -> Result<(), SyncError> {
        let received_at = now_millis();
        debug!("Saving transaction {}", transaction.hash);

        let inserted = transaction::save_transaction(&self.pool, &transaction, received_at, now_millis()).await?;
        if !inserted {
            debug!("Transaction {} already stored", transaction.hash);
            return Ok(());
        }

        info!(
            "Saved transaction {} for {} at height {}",
            transaction.hash,
            transaction.address(),
            transaction.height()
        );
        self.events.publish(TransactionSaved { transaction });
        Ok(())
    }
}

pub struct AccountEntrySync {
    pool: SqlitePool,
    node: Arc<dyn NodeClient>,
}

impl AccountEntrySync {
    pub fn new(pool: SqlitePool, node: Arc<dyn NodeClient>) -> Self {
        Self { pool, node }
    }
}

#[async_trait]
impl StreamSource for AccountEntrySync {
    type Item = AccountEntry;

    fn name(&self) -> &'static str {
        "account entries"
    }

    async fn subscribe(&self, addresses: &[Address]) -> Result<NodeStream<AccountEntry>, SyncError> {
        let latest = entry::find_latest_heights(&self.pool, addresses).await?;
        let search = resume_search(&latest, addresses);
        debug!("Resuming account entries from {:?}", search);

        Ok(self.node.subscribe_account_entries(&search).await?)
    }

    async fn handle(&self, account_entry: AccountEntry) -> Result<(), SyncError> {
        if entry::save_entry(&self.pool, &account_entry, now_millis()).await? {
            info!(
                "Saved account entry {} for {} at height {}",
                account_entry.hash,
                account_entry.address(),
                account_entry.height
            );
        } else {
            debug!("Account entry {} already stored", account_entry.hash);
        }
        Ok(())
    }
}

/// Keeps the registry's account snapshots current. Snapshots carry no
/// cursor; every subscription starts from the node's current state.
pub struct SnapshotSync {
    node: Arc<dyn NodeClient>,
    registry: Arc<AccountRegistry>,
}

impl SnapshotSync {
    pub fn new(node: Arc<dyn NodeClient>, registry: Arc<AccountRegistry>) -> Self {
        Self { node, registry }
    }
}

#[async_trait]
impl StreamSource for SnapshotSync {
    type Item = AccountSnapshot;

    fn name(&self) -> &'static str {
        "accounts"
    }

    async fn subscribe(&self, addresses: &[Address]) -> Result<NodeStream<AccountSnapshot>, SyncError> {
        Ok(self.node.subscribe_account_snapshots(addresses).await?)
    }

    async fn handle(&self, snapshot: AccountSnapshot) -> Result<(), SyncError> {
        let address = snapshot.address();
        let height = snapshot.height;
        if self.registry.apply_snapshot_update(snapshot) {
            info!("Updated account {} at height {}", address, height);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Algorithm, PublicKey};

    fn address(byte: u8) -> Address {
        Address::new(Algorithm::V1, PublicKey([byte; 32]))
    }

    #[test]
    fn resumes_one_past_latest_height() {
        let known = address(1);
        let fresh = address(2);
        let latest = HashMap::from([(known, 7)]);

        let search = resume_search(&latest, &[known, fresh]);

        assert_eq!(search.from_height(&known), Some(8));
        assert_eq!(search.from_height(&fresh), Some(1));
        assert_eq!(search.search.len(), 2);
    }

    #[test]
    fn ignores_heights_for_addresses_outside_the_set() {
        let latest = HashMap::from([(address(3), 40)]);
        let search = resume_search(&latest, &[address(4)]);

        assert_eq!(search.search, vec![AccountHeightSearch { address: address(4), from_height: 1 }]);
    }
}
