use crate::config::Config;
use crate::events::EventPublisher;
use crate::node::NodeClient;
use crate::sync::{AccountRegistry, ReceivableTracker, RegistryError};
use sqlx::SqlitePool;
use std::sync::Arc;

pub struct AppState {
    pub config: Config,
    pub db_pool: SqlitePool,
    pub node: Arc<dyn NodeClient>,
    pub registry: Arc<AccountRegistry>,
    pub receivables: Arc<ReceivableTracker>,
    pub events: EventPublisher,
}

impl AppState {
    /// Loads the registry (publishing the initial active set) and wires the
    /// receivable tracker to transaction notifications. Must complete before
    /// any synchronizer starts.
    pub async fn initialize(
        config: Config,
        db_pool: SqlitePool,
        node: Arc<dyn NodeClient>,
    ) -> Result<Arc<Self>, RegistryError> {
        let registry = Arc::new(AccountRegistry::load(db_pool.clone(), node.as_ref()).await?);
        let receivables = Arc::new(ReceivableTracker::new(config.received_ttl));
        let events = EventPublisher::new().with_listener(receivables.clone());

        Ok(Arc::new(Self {
            config,
            db_pool,
            node,
            registry,
            receivables,
            events,
        }))
    }
}
