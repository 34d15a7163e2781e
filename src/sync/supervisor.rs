use crate::sync::SyncError;
use backon::{ConstantBuilder, Retryable};
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Runs `task` until it returns `Ok` or `shutdown` is cancelled, restarting
/// it after `retry_delay` on every error. There is no attempt limit.
pub async fn supervise<F, Fut>(name: &'static str, retry_delay: Duration, shutdown: CancellationToken, task: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<(), SyncError>>,
{
    let backoff = ConstantBuilder::default()
        .with_delay(retry_delay)
        .with_max_times(usize::MAX);

    let attempts = task.retry(backoff).notify(|err: &SyncError, delay: Duration| {
        error!("Error while listening {} stream. Retrying in {:?}: {}", name, delay, err);
    });

    tokio::select! {
        result = attempts => {
            if let Err(e) = result {
                error!("Giving up on {} stream: {}", name, e);
            }
        }
        _ = shutdown.cancelled() => {}
    }

    info!("Stopped {} synchronizer", name);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn restarts_after_fixed_delay_until_success() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let started = Instant::now();

        let counter = attempts.clone();
        supervise("test", Duration::from_secs(10), CancellationToken::new(), move || {
            let counter = counter.clone();
            async move {
                match counter.fetch_add(1, Ordering::SeqCst) {
                    0 | 1 => Err(SyncError::StreamClosed("test")),
                    _ => Ok(()),
                }
            }
        })
        .await;

        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        assert!(started.elapsed() >= Duration::from_secs(20));
        assert!(started.elapsed() < Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_stops_pending_retry() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let shutdown = CancellationToken::new();

        let counter = attempts.clone();
        let handle = tokio::spawn(supervise("test", Duration::from_secs(10), shutdown.clone(), move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(SyncError::StreamClosed("test"))
            }
        }));

        tokio::time::sleep(Duration::from_secs(25)).await;
        shutdown.cancel();
        handle.await.unwrap();

        let seen = attempts.load(Ordering::SeqCst);
        assert_eq!(seen, 3);

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(attempts.load(Ordering::SeqCst), seen);
    }
}
