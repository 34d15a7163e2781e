//! Receivable reconciliation.
//!
//! Two independent sources touch the same transfer hash: the node announces
//! a receivable, and the transaction synchronizer reports the receive that
//! settles it. Either may arrive first, so each hash is tracked as a small
//! state machine:
//!
//! | event        | absent      | Pending     | Received    |
//! |--------------|-------------|-------------|-------------|
//! | announcement | Pending     | Pending     | absent      |
//! | confirmation | Received    | absent      | Received    |
//!
//! A `Received` tombstone keeps a late announcement from resurrecting a
//! settled transfer and is consumed by that announcement. Receives synced
//! from history are never announced, so tombstones also expire after a
//! configured time to live.

use crate::events::{TransactionSaved, TransactionSavedListener};
use crate::models::{Address, Amount, Hash, Receivable};
use crate::node::{NodeClient, NodeStream};
use crate::sync::stream::StreamSource;
use crate::sync::SyncError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::cmp::Reverse;
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Clone)]
enum ReceivableState {
    Pending(Receivable),
    Received { confirmed_at: DateTime<Utc> },
}

/// How long a receive confirmation waits for its announcement.
pub const DEFAULT_RECEIVED_TTL: Duration = Duration::from_secs(60 * 60);

pub struct ReceivableTracker {
    states: Mutex<HashMap<Hash, ReceivableState>>,
    received_ttl: Duration,
}

impl Default for ReceivableTracker {
    fn default() -> Self {
        Self::new(DEFAULT_RECEIVED_TTL)
    }
}

impl ReceivableTracker {
    pub fn new(received_ttl: Duration) -> Self {
        Self {
            states: Mutex::new(HashMap::new()),
            received_ttl,
        }
    }

    /// Records a receivable announced by the node.
    pub fn announce(&self, receivable: Receivable) {
        self.announce_at(receivable, Utc::now());
    }

    /// Records that the send `send_hash` has been received.
    pub fn confirm(&self, send_hash: Hash) {
        self.confirm_at(send_hash, Utc::now());
    }

    pub(crate) fn announce_at(&self, receivable: Receivable, now: DateTime<Utc>) {
        let hash = receivable.hash;
        let mut states = self.lock();
        self.prune_received(&mut states, now);

        if let Some(ReceivableState::Received { confirmed_at }) = states.get(&hash) {
            debug!("Receivable {} was already received at {}", hash, confirmed_at);
            states.remove(&hash);
            return;
        }

        info!(
            "Receivable {} of {} pending for {}",
            hash,
            receivable.amount,
            receivable.receiver_address()
        );
        states.insert(hash, ReceivableState::Pending(receivable));
    }

    pub(crate) fn confirm_at(&self, send_hash: Hash, now: DateTime<Utc>) {
        let mut states = self.lock();
        self.prune_received(&mut states, now);

        match states.remove(&send_hash) {
            Some(ReceivableState::Pending(_)) => {
                info!("Receivable {} has been received", send_hash);
            }
            Some(ReceivableState::Received { .. }) | None => {
                debug!("Receive of {} confirmed before its announcement", send_hash);
                states.insert(send_hash, ReceivableState::Received { confirmed_at: now });
            }
        }
    }

    /// Pending receivables worth at least `min_amount`, largest first.
    pub fn pending(&self, min_amount: Amount) -> Vec<Receivable> {
        let mut pending: Vec<Receivable> = self
            .lock()
            .values()
            .filter_map(|state| match state {
                ReceivableState::Pending(receivable) if receivable.amount >= min_amount => Some(receivable.clone()),
                _ => None,
            })
            .collect();

        pending.sort_by_key(|r| (Reverse(r.amount), r.timestamp, r.hash));
        pending
    }

    /// Pending receivables addressed to one of `receivers`.
    pub fn pending_for(&self, receivers: &BTreeSet<Address>, min_amount: Amount) -> Vec<Receivable> {
        self.pending(min_amount)
            .into_iter()
            .filter(|r| receivers.contains(&r.receiver_address()))
            .collect()
    }

    /// Number of tracked hashes, pending and received.
    pub fn tracked(&self) -> usize {
        self.lock().len()
    }

    fn prune_received(&self, states: &mut HashMap<Hash, ReceivableState>, now: DateTime<Utc>) {
        let before = states.len();
        states.retain(|_, state| match state {
            ReceivableState::Received { confirmed_at } => now
                .signed_duration_since(*confirmed_at)
                .to_std()
                .map_or(true, |age| age <= self.received_ttl),
            ReceivableState::Pending(_) => true,
        });

        let expired = before - states.len();
        if expired > 0 {
            debug!("Dropped {} expired receive confirmations", expired);
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Hash, ReceivableState>> {
        self.states.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl TransactionSavedListener for ReceivableTracker {
    fn on_transaction_saved(&self, event: &TransactionSaved) {
        if let Some(send_hash) = event.transaction.block.received_send_hash() {
            self.confirm(send_hash);
        }
    }
}

/// Feeds node receivable announcements into the tracker.
pub struct ReceivableSync {
    node: Arc<dyn NodeClient>,
    tracker: Arc<ReceivableTracker>,
}

impl ReceivableSync {
    pub fn new(node: Arc<dyn NodeClient>, tracker: Arc<ReceivableTracker>) -> Self {
        Self { node, tracker }
    }
}

#[async_trait]
impl StreamSource for ReceivableSync {
    type Item = Receivable;

    fn name(&self) -> &'static str {
        "receivables"
    }

    async fn subscribe(&self, addresses: &[Address]) -> Result<NodeStream<Receivable>, SyncError> {
        Ok(self.node.subscribe_receivables(addresses).await?)
    }

    async fn handle(&self, receivable: Receivable) -> Result<(), SyncError> {
        self.tracker.announce(receivable);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Algorithm, PublicKey};

    fn receivable(seed: u8, amount: Amount) -> Receivable {
        Receivable {
            hash: Hash([seed; 32]),
            version: 0,
            algorithm: Algorithm::V1,
            public_key: PublicKey([100; 32]),
            receiver_algorithm: Algorithm::V1,
            receiver_public_key: PublicKey([seed; 32]),
            amount,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn announce_then_confirm_clears_pending() {
        let tracker = ReceivableTracker::default();
        let r = receivable(1, 100);

        tracker.announce(r.clone());
        assert_eq!(tracker.pending(0), vec![r.clone()]);

        tracker.confirm(r.hash);
        assert!(tracker.pending(0).is_empty());
        assert_eq!(tracker.tracked(), 0);
    }

    #[test]
    fn confirm_then_announce_never_becomes_pending() {
        let tracker = ReceivableTracker::default();
        let r = receivable(2, 100);

        tracker.confirm(r.hash);
        assert_eq!(tracker.tracked(), 1);

        tracker.announce(r.clone());
        assert!(tracker.pending(0).is_empty());
        // tombstone consumed
        assert_eq!(tracker.tracked(), 0);
    }

    #[test]
    fn repeated_announcement_stays_pending_once() {
        let tracker = ReceivableTracker::default();
        let r = receivable(3, 10);

        tracker.announce(r.clone());
        tracker.announce(r.clone());

        assert_eq!(tracker.pending(0), vec![r]);
    }

    #[test]
    fn pending_filters_by_amount_and_sorts_descending() {
        let tracker = ReceivableTracker::default();
        tracker.announce(receivable(1, 50));
        tracker.announce(receivable(2, 300));
        tracker.announce(receivable(3, 100));

        let amounts: Vec<Amount> = tracker.pending(60).iter().map(|r| r.amount).collect();
        assert_eq!(amounts, vec![300, 100]);

        let receiver = receivable(2, 0).receiver_address();
        assert_eq!(tracker.pending_for(&BTreeSet::from([receiver]), 0).len(), 1);
        assert!(tracker.pending_for(&BTreeSet::new(), 0).is_empty());
    }

    #[test]
    fn expired_confirmation_no_longer_suppresses() {
        let tracker = ReceivableTracker::new(Duration::from_secs(60));
        let now = Utc::now();
        let stale = receivable(4, 10);
        let fresh = receivable(5, 10);

        tracker.confirm_at(stale.hash, now - chrono::Duration::seconds(120));
        tracker.confirm_at(fresh.hash, now - chrono::Duration::seconds(30));
        assert_eq!(tracker.tracked(), 2);

        // Stale tombstone pruned, fresh one consumed
        tracker.announce_at(fresh, now);
        assert_eq!(tracker.tracked(), 0);
        assert!(tracker.pending(0).is_empty());

        tracker.announce_at(stale.clone(), now);
        assert_eq!(tracker.pending(0), vec![stale]);
    }

    #[test]
    fn historical_receives_do_not_accumulate() {
        let tracker = ReceivableTracker::new(Duration::from_secs(60));
        let synced_at = Utc::now() - chrono::Duration::minutes(10);

        for seed in 0..200u8 {
            let mut hash = [0x11; 32];
            hash[0] = seed;
            tracker.confirm_at(Hash(hash), synced_at);
        }
        assert_eq!(tracker.tracked(), 200);

        tracker.confirm(Hash([0x22; 32]));
        assert_eq!(tracker.tracked(), 1);
    }
}
