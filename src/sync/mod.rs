// Live synchronization with the node:
// - registry: watched addresses and the published active set
// - stream: generic replace-on-change subscription loop
// - supervisor: fixed-delay restart around each loop
// - sources: transaction, account entry and snapshot synchronizers
// - receivable: pending receivable reconciliation

pub mod receivable;
pub mod registry;
pub mod sources;
pub mod stream;
pub mod supervisor;

pub use receivable::{ReceivableSync, ReceivableTracker};
pub use registry::{AccountRegistry, ActiveAddresses, RegistryError};
pub use sources::{AccountEntrySync, SnapshotSync, TransactionSync};
pub use stream::{run_subscription, StreamSource};
pub use supervisor::supervise;

use crate::node::NodeError;
use crate::state::AppState;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Failure inside a subscription loop. Always transient: the supervisor
/// restarts the loop.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Node error: {0}")]
    Node(#[from] NodeError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Node closed the {0} stream")]
    StreamClosed(&'static str),
}

/// Starts the three synchronizers and the receivable stream, each under its
/// own supervisor. Every task ends once `shutdown` is cancelled.
pub fn spawn_synchronizers(state: &AppState, shutdown: CancellationToken) -> JoinSet<()> {
    let mut tasks = JoinSet::new();
    let retry_delay = state.config.retry_delay;

    spawn_source(
        &mut tasks,
        TransactionSync::new(state.db_pool.clone(), state.node.clone(), state.events.clone()),
        &state.registry,
        retry_delay,
        &shutdown,
    );
    spawn_source(
        &mut tasks,
        AccountEntrySync::new(state.db_pool.clone(), state.node.clone()),
        &state.registry,
        retry_delay,
        &shutdown,
    );
    spawn_source(
        &mut tasks,
        SnapshotSync::new(state.node.clone(), state.registry.clone()),
        &state.registry,
        retry_delay,
        &shutdown,
    );
    spawn_source(
        &mut tasks,
        ReceivableSync::new(state.node.clone(), state.receivables.clone()),
        &state.registry,
        retry_delay,
        &shutdown,
    );

    info!("Started {} synchronizers", tasks.len());
    tasks
}

pub fn spawn_source<S: StreamSource>(
    tasks: &mut JoinSet<()>,
    source: S,
    registry: &AccountRegistry,
    retry_delay: Duration,
    shutdown: &CancellationToken,
) {
    let source = Arc::new(source);
    let active = registry.subscribe();
    let shutdown = shutdown.clone();

    tasks.spawn(async move {
        let name = source.name();
        supervise(name, retry_delay, shutdown.clone(), || {
            let source = source.clone();
            let active = active.clone();
            let shutdown = shutdown.clone();
            async move { run_subscription(source.as_ref(), active, &shutdown).await }
        })
        .await;
    });
}
