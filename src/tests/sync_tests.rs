//! End-to-end synchronizer tests: registry, supervisors and stream loops
//! running against the in-process node.

#[cfg(test)]
mod tests {
    use crate::config::Config;
    use crate::db::{account, connection, entry, transaction};
    use crate::models::{from_millis, now_millis, Address, Height};
    use crate::node::{HeightSearch, NodeClient};
    use crate::state::AppState;
    use crate::sync::spawn_synchronizers;
    use crate::tests::fixtures::{
        address, entry as entry_at, eventually, receivable, receive_tx, send_tx, snapshot, unique_hash,
    };
    use crate::tests::mock_node::MockNode;
    use chrono::Duration as ChronoDuration;
    use sqlx::SqlitePool;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::task::JoinSet;
    use tokio_util::sync::CancellationToken;

    struct Harness {
        state: Arc<AppState>,
        node: Arc<MockNode>,
        shutdown: CancellationToken,
        tasks: JoinSet<()>,
    }

    impl Harness {
        async fn start(pool: SqlitePool, node: Arc<MockNode>) -> Self {
            let config = Config {
                retry_delay: Duration::from_millis(50),
                ..Config::default()
            };
            let client: Arc<dyn NodeClient> = node.clone();
            let state = AppState::initialize(config, pool, client)
                .await
                .expect("Failed to initialize state");

            let shutdown = CancellationToken::new();
            let tasks = spawn_synchronizers(&state, shutdown.clone());

            Self {
                state,
                node,
                shutdown,
                tasks,
            }
        }

        async fn fresh() -> Self {
            let pool = connection::establish_in_memory().await.unwrap();
            Self::start(pool, Arc::new(MockNode::new())).await
        }

        async fn stop(mut self) {
            self.shutdown.cancel();
            while let Some(result) = self.tasks.join_next().await {
                result.expect("synchronizer panicked");
            }
        }

        async fn transaction_count(&self) -> i64 {
            transaction::count_transactions(&self.state.db_pool).await.unwrap()
        }

        async fn entry_count(&self) -> usize {
            let to = now_millis() + ChronoDuration::hours(1);
            entry::find_by_persisted_range(&self.state.db_pool, from_millis(0), to)
                .await
                .unwrap()
                .len()
        }

        fn last_transaction_search(&self) -> Option<HeightSearch> {
            self.node.transaction_searches().pop()
        }
    }

    fn resumes_from(search: &Option<HeightSearch>, address: Address, height: Height) -> bool {
        search
            .as_ref()
            .is_some_and(|s| s.from_height(&address) == Some(height))
    }

    #[tokio::test]
    async fn monitored_address_transactions_are_persisted() {
        let harness = Harness::fresh().await;
        let h = &harness;
        let a = address(1);

        h.state.registry.create(a).await.unwrap();
        h.node.publish_transaction(send_tx(a, 1, address(2), 10));
        h.node.publish_transaction(send_tx(a, 2, address(2), 10));

        eventually("two transactions stored", || async move { h.transaction_count().await == 2 }).await;

        let first = h.node.transaction_searches().first().cloned();
        assert!(resumes_from(&first, a, 1));
        harness.stop().await;
    }

    #[tokio::test]
    async fn restart_resumes_after_latest_stored_height() {
        let pool = connection::establish_in_memory().await.unwrap();
        let a = address(3);
        let now = now_millis();
        account::insert_account(&pool, &a, now).await.unwrap();
        for height in 1..=3 {
            transaction::save_transaction(&pool, &send_tx(a, height, address(4), 1), now, now)
                .await
                .unwrap();
        }

        let harness = Harness::start(pool, Arc::new(MockNode::new())).await;
        let h = &harness;

        eventually("resumed subscription", || async move {
            resumes_from(&h.last_transaction_search(), a, 4)
        })
        .await;
        assert_eq!(h.node.transaction_searches().len(), 1);
        harness.stop().await;
    }

    #[tokio::test]
    async fn new_address_resubscribes_with_per_address_cursors() {
        let harness = Harness::fresh().await;
        let h = &harness;
        let a = address(5);
        let b = address(6);

        h.state.registry.create(a).await.unwrap();
        for height in 1..=3 {
            h.node.publish_transaction(send_tx(a, height, b, 1));
        }
        eventually("A history stored", || async move { h.transaction_count().await == 3 }).await;

        h.state.registry.create(b).await.unwrap();

        eventually("subscription for both addresses", || async move {
            let last = h.last_transaction_search();
            resumes_from(&last, a, 4) && resumes_from(&last, b, 1)
        })
        .await;

        h.node.publish_transaction(receive_tx(b, 1, unique_hash()));
        eventually("B transaction stored", || async move { h.transaction_count().await == 4 }).await;

        // Nothing from A was delivered twice
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(h.transaction_count().await, 4);
        harness.stop().await;
    }

    #[tokio::test]
    async fn empty_active_set_opens_no_subscriptions() {
        let harness = Harness::fresh().await;
        let h = &harness;

        tokio::time::sleep(Duration::from_millis(100)).await;

        assert!(h.node.transaction_searches().is_empty());
        assert!(h.node.entry_searches().is_empty());
        assert!(h.node.snapshot_subscriptions().is_empty());
        assert!(h.node.receivable_subscriptions().is_empty());
        harness.stop().await;
    }

    #[tokio::test]
    async fn disabling_last_address_closes_stream() {
        let harness = Harness::fresh().await;
        let h = &harness;
        let a = address(7);

        h.state.registry.create(a).await.unwrap();
        eventually("stream opened", || async move { h.node.open_transaction_streams() == 1 }).await;

        h.state.registry.disable(a).await.unwrap();
        eventually("stream closed", || async move { h.node.open_transaction_streams() == 0 }).await;

        let searches = h.node.transaction_searches().len();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(h.node.transaction_searches().len(), searches);
        harness.stop().await;
    }

    #[tokio::test]
    async fn subscription_failures_are_retried() {
        let node = Arc::new(MockNode::new());
        node.fail_next_transaction_subscriptions(2);
        let pool = connection::establish_in_memory().await.unwrap();
        let harness = Harness::start(pool, node).await;
        let h = &harness;
        let a = address(8);

        h.state.registry.create(a).await.unwrap();
        h.node.publish_transaction(send_tx(a, 1, address(9), 5));

        eventually("stored after retries", || async move { h.transaction_count().await == 1 }).await;
        assert!(h.node.transaction_searches().len() >= 3);
        harness.stop().await;
    }

    #[tokio::test]
    async fn disconnect_resumes_from_next_height() {
        let harness = Harness::fresh().await;
        let h = &harness;
        let a = address(10);

        h.state.registry.create(a).await.unwrap();
        h.node.publish_transaction(send_tx(a, 1, address(11), 5));
        eventually("first stored", || async move { h.transaction_count().await == 1 }).await;

        h.node.disconnect_all();
        eventually("resubscribed from height 2", || async move {
            resumes_from(&h.last_transaction_search(), a, 2)
        })
        .await;

        h.node.publish_transaction(send_tx(a, 2, address(11), 5));
        eventually("second stored", || async move { h.transaction_count().await == 2 }).await;
        harness.stop().await;
    }

    #[tokio::test]
    async fn account_entries_are_persisted_and_resumed() {
        let harness = Harness::fresh().await;
        let h = &harness;
        let a = address(12);

        h.state.registry.create(a).await.unwrap();
        h.node.publish_entry(entry_at(a, 1));
        h.node.publish_entry(entry_at(a, 2));
        eventually("entries stored", || async move { h.entry_count().await == 2 }).await;

        h.node.disconnect_all();
        eventually("entries resubscribed", || async move {
            let last = h.node.entry_searches().pop();
            resumes_from(&last, a, 3)
        })
        .await;
        assert_eq!(h.entry_count().await, 2);
        harness.stop().await;
    }

    #[tokio::test]
    async fn announced_receivable_is_cleared_by_receive() {
        let harness = Harness::fresh().await;
        let h = &harness;
        let a = address(13);

        h.state.registry.create(a).await.unwrap();
        eventually("receivable stream open", || async move {
            !h.node.receivable_subscriptions().is_empty()
        })
        .await;

        let pending = receivable(a, 100);
        let expected = &pending;
        h.node.publish_receivable(pending.clone());
        eventually("receivable pending", || async move {
            h.state.receivables.pending(1) == vec![expected.clone()]
        })
        .await;

        h.node.publish_transaction(receive_tx(a, 1, pending.hash));
        eventually("receivable settled", || async move { h.state.receivables.pending(1).is_empty() }).await;
        assert_eq!(h.state.receivables.tracked(), 0);
        harness.stop().await;
    }

    #[tokio::test]
    async fn receive_before_announcement_never_surfaces() {
        let harness = Harness::fresh().await;
        let h = &harness;
        let a = address(14);

        h.state.registry.create(a).await.unwrap();
        eventually("receivable stream open", || async move {
            !h.node.receivable_subscriptions().is_empty()
        })
        .await;

        let late = receivable(a, 100);
        h.node.publish_transaction(receive_tx(a, 1, late.hash));
        eventually("receive recorded", || async move { h.state.receivables.tracked() == 1 }).await;

        h.node.publish_receivable(late);
        eventually("tombstone consumed", || async move { h.state.receivables.tracked() == 0 }).await;
        assert!(h.state.receivables.pending(0).is_empty());
        harness.stop().await;
    }

    #[tokio::test]
    async fn snapshot_stream_updates_registry() {
        let harness = Harness::fresh().await;
        let h = &harness;
        let a = address(15);

        h.state.registry.create(a).await.unwrap();
        eventually("snapshot stream open", || async move {
            h.node.snapshot_subscriptions().iter().any(|s| s.contains(&a))
        })
        .await;

        let update = snapshot(a, 5, 900);
        let expected = &update;
        h.node.publish_snapshot(update.clone());
        eventually("snapshot applied", || async move {
            h.state.registry.account_details(&a) == Some(expected.clone())
        })
        .await;
        harness.stop().await;
    }

    #[tokio::test]
    async fn reenabled_address_resumes_from_last_height() {
        let harness = Harness::fresh().await;
        let h = &harness;
        let a = address(16);

        h.state.registry.create(a).await.unwrap();
        h.node.publish_transaction(send_tx(a, 1, address(17), 5));
        h.node.publish_transaction(send_tx(a, 2, address(17), 5));
        eventually("history stored", || async move { h.transaction_count().await == 2 }).await;

        h.state.registry.disable(a).await.unwrap();
        eventually("stream closed", || async move { h.node.open_transaction_streams() == 0 }).await;

        h.state.registry.enable(a).await.unwrap();
        eventually("resumed from height 3", || async move {
            resumes_from(&h.last_transaction_search(), a, 3)
        })
        .await;
        assert_eq!(h.transaction_count().await, 2);
        harness.stop().await;
    }
}
