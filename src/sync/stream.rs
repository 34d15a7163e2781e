//! Replace-on-change subscription loop shared by every node stream.

use crate::models::Address;
use crate::node::{NodeError, NodeStream};
use crate::sync::registry::ActiveAddresses;
use crate::sync::SyncError;
use async_trait::async_trait;
use futures::StreamExt;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// One kind of node stream kept in step with the active address set.
#[async_trait]
pub trait StreamSource: Send + Sync + 'static {
    type Item: Send + 'static;

    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Opens a subscription for a non-empty address set, resolving any
    /// resume cursors first.
    async fn subscribe(&self, addresses: &[Address]) -> Result<NodeStream<Self::Item>, SyncError>;

    /// Processes one delivered item.
    async fn handle(&self, item: Self::Item) -> Result<(), SyncError>;
}

enum Next {
    Resubscribe,
    Shutdown,
}

/// Keeps at most one live subscription for `source`, scoped to the newest
/// active set. A set change drops the current subscription and opens a new
/// one; an empty set leaves no subscription open.
///
/// Returns `Ok(())` only on shutdown (or when the registry is gone). Any
/// node, storage or stream-end failure is returned as an error for the
/// supervisor to retry.
pub async fn run_subscription<S: StreamSource + ?Sized>(
    source: &S,
    mut active: watch::Receiver<ActiveAddresses>,
    shutdown: &CancellationToken,
) -> Result<(), SyncError> {
    loop {
        let addresses: Vec<Address> = active.borrow_and_update().iter().copied().collect();

        let mut stream = if addresses.is_empty() {
            debug!("No active addresses, {} subscription idle", source.name());
            None
        } else {
            tokio::select! {
                _ = shutdown.cancelled() => return Ok(()),
                changed = active.changed() => {
                    if changed.is_err() {
                        return Ok(());
                    }
                    continue;
                }
                stream = source.subscribe(&addresses) => Some(stream?),
            }
        };

        if stream.is_some() {
            info!("Started listening {} for {} addresses", source.name(), addresses.len());
        }

        let next = loop {
            tokio::select! {
                _ = shutdown.cancelled() => break Next::Shutdown,
                changed = active.changed() => {
                    break if changed.is_ok() { Next::Resubscribe } else { Next::Shutdown };
                }
                item = next_item(&mut stream) => match item {
                    Some(Ok(item)) => source.handle(item).await?,
                    Some(Err(e)) => return Err(e.into()),
                    None => return Err(SyncError::StreamClosed(source.name())),
                },
            }
        };

        if stream.take().is_some() {
            info!("Stopped listening {}", source.name());
        }

        if let Next::Shutdown = next {
            return Ok(());
        }
    }
}

async fn next_item<T>(stream: &mut Option<NodeStream<T>>) -> Option<Result<T, NodeError>> {
    match stream {
        Some(stream) => stream.next().await,
        None => std::future::pending().await,
    }
}
