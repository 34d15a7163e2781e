//! Local notifications between the synchronizers.

use crate::models::Transaction;
use std::sync::Arc;
use tracing::debug;

/// Fired once a transaction row has been written for the first time.
#[derive(Debug, Clone)]
pub struct TransactionSaved {
    pub transaction: Transaction,
}

pub trait TransactionSavedListener: Send + Sync {
    fn on_transaction_saved(&self, event: &TransactionSaved);
}

/// Delivers events synchronously, in registration order, on the publishing task.
#[derive(Clone, Default)]
pub struct EventPublisher {
    listeners: Vec<Arc<dyn TransactionSavedListener>>,
}

impl EventPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_listener(mut self, listener: Arc<dyn TransactionSavedListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    pub fn publish(&self, event: TransactionSaved) {
        debug!(
            "Publishing TransactionSaved for {} to {} listeners",
            event.transaction.hash,
            self.listeners.len()
        );
        for listener in &self.listeners {
            listener.on_transaction_saved(&event);
        }
    }
}
