//! Integration tests for Store action broadcasting
//!
//! Covers observing the actions produced by effects, which lets a caller
//! send a request and await its outcome without reaching into state.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic
#![allow(clippy::needless_continue, clippy::match_same_arms)] // Test code - allow pedantic warnings

use std::sync::Arc;
use std::time::Duration;

use todoflow_core::{effect::Effect, reducer::Reducer, smallvec, SmallVec};
use todoflow_runtime::{Store, StoreConfig, StoreError};
use tokio::sync::broadcast::error::{RecvError, TryRecvError};

// ============================================================================
// Test Fixtures
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
enum SyncAction {
    /// Start syncing a list, page by page
    SyncRequested { list: u64 },
    /// One page of todos arrived
    PageLoaded { list: u64, page: u32 },
    /// Every page arrived (terminal)
    SyncCompleted { list: u64 },
    /// Sync gave up (terminal, never produced here)
    SyncFailed { list: u64, error: String },
    /// Toggle a todo
    ToggleRequested,
    /// Toggle acknowledged by the backend
    Toggled { revision: u32 },
}

#[derive(Debug, Clone, Default)]
struct SyncState {
    revision: u32,
    pages: Vec<u32>,
}

#[derive(Clone)]
struct SyncEnvironment;

#[derive(Clone)]
struct SyncReducer;

impl Reducer for SyncReducer {
    type State = SyncState;
    type Action = SyncAction;
    type Environment = SyncEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        _env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            SyncAction::SyncRequested { list } => {
                smallvec![Effect::Future(Box::pin(async move {
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    Some(SyncAction::PageLoaded { list, page: 1 })
                }))]
            },

            SyncAction::PageLoaded { list, page } => {
                state.pages.push(page);

                if page < 3 {
                    smallvec![Effect::Future(Box::pin(async move {
                        tokio::time::sleep(Duration::from_millis(10)).await;
                        Some(SyncAction::PageLoaded { list, page: page + 1 })
                    }))]
                } else {
                    smallvec![Effect::Future(Box::pin(async move {
                        Some(SyncAction::SyncCompleted { list })
                    }))]
                }
            },

            SyncAction::SyncCompleted { .. } | SyncAction::SyncFailed { .. } => {
                smallvec![Effect::None]
            },

            SyncAction::ToggleRequested => {
                state.revision += 1;
                let revision = state.revision;
                smallvec![Effect::Future(Box::pin(async move {
                    Some(SyncAction::Toggled { revision })
                }))]
            },

            SyncAction::Toggled { .. } => smallvec![Effect::None],
        }
    }
}

fn new_store() -> Store<SyncState, SyncAction, SyncEnvironment, SyncReducer> {
    Store::new(SyncState::default(), SyncReducer, SyncEnvironment)
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_send_and_wait_for_immediate() {
    let store = new_store();

    let result = store
        .send_and_wait_for(
            SyncAction::ToggleRequested,
            |action| matches!(action, SyncAction::Toggled { .. }),
            Duration::from_secs(1),
        )
        .await;

    assert_eq!(result.unwrap(), SyncAction::Toggled { revision: 1 });
}

#[tokio::test]
async fn test_send_and_wait_for_multi_step() {
    let store = new_store();

    let result = store
        .send_and_wait_for(
            SyncAction::SyncRequested { list: 42 },
            |action| matches!(action, SyncAction::SyncCompleted { list: 42 }),
            Duration::from_secs(1),
        )
        .await;

    assert_eq!(result.unwrap(), SyncAction::SyncCompleted { list: 42 });
    assert_eq!(store.state(|s| s.pages.clone()).await, vec![1, 2, 3]);
}

#[tokio::test]
async fn test_send_and_wait_for_timeout() {
    let store = new_store();

    let result = store
        .send_and_wait_for(
            SyncAction::SyncRequested { list: 99 },
            |action| matches!(action, SyncAction::SyncFailed { list: 99, .. }),
            Duration::from_millis(50),
        )
        .await;

    assert!(matches!(result, Err(StoreError::Timeout)));
}

#[tokio::test]
async fn test_send_and_wait_for_rejected_during_shutdown() {
    let store = new_store();
    store.shutdown(Duration::from_secs(1)).await.unwrap();

    let result = store
        .send_and_wait_for(
            SyncAction::ToggleRequested,
            |_| true,
            Duration::from_millis(50),
        )
        .await;

    assert!(matches!(result, Err(StoreError::ShutdownInProgress)));
}

/// Predicates keyed on the list id keep concurrent requests apart
#[tokio::test]
async fn test_concurrent_waiters_filter_by_list() {
    let store = Arc::new(new_store());

    let mut handles = vec![];
    for list in 1..=5 {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            store
                .send_and_wait_for(
                    SyncAction::SyncRequested { list },
                    move |action| matches!(action, SyncAction::SyncCompleted { list: done } if *done == list),
                    Duration::from_secs(2),
                )
                .await
        }));
    }

    for (i, handle) in handles.into_iter().enumerate() {
        let result = handle.await.expect("Task panicked");
        let list = u64::try_from(i + 1).unwrap();
        assert_eq!(result.unwrap(), SyncAction::SyncCompleted { list });
    }

    assert_eq!(store.state(|s| s.pages.len()).await, 15);
}

#[tokio::test]
async fn test_subscribe_actions_in_order() {
    let store = new_store();
    let mut rx = store.subscribe_actions();

    store.send(SyncAction::SyncRequested { list: 100 }).await.unwrap();

    let mut received = Vec::new();
    for _ in 0..4 {
        let action = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("Timeout")
            .expect("Channel closed");
        received.push(action);
    }

    assert_eq!(
        received,
        vec![
            SyncAction::PageLoaded { list: 100, page: 1 },
            SyncAction::PageLoaded { list: 100, page: 2 },
            SyncAction::PageLoaded { list: 100, page: 3 },
            SyncAction::SyncCompleted { list: 100 },
        ]
    );
}

/// Only actions produced by effects are broadcast
#[tokio::test]
async fn test_sent_actions_not_broadcast() {
    let store = new_store();
    let mut rx = store.subscribe_actions();

    let mut handle = store.send(SyncAction::ToggleRequested).await.unwrap();
    handle.wait().await;

    let actions: Vec<_> = std::iter::from_fn(|| rx.try_recv().ok()).collect();
    assert_eq!(actions, vec![SyncAction::Toggled { revision: 1 }]);
}

#[tokio::test]
async fn test_multiple_independent_observers() {
    let store = new_store();

    let mut observers = [store.subscribe_actions(), store.subscribe_actions(), store.subscribe_actions()];

    for _ in 0..2 {
        let mut handle = store.send(SyncAction::ToggleRequested).await.unwrap();
        handle.wait().await;
    }

    for rx in &mut observers {
        assert_eq!(count_available_actions(rx), 2);
    }
}

#[tokio::test]
async fn test_lagging_observer_skips_but_continues() {
    let store = Store::with_config(
        SyncState::default(),
        SyncReducer,
        SyncEnvironment,
        StoreConfig::default().with_broadcast_capacity(4),
    );
    let mut rx = store.subscribe_actions();

    for _ in 0..20 {
        let mut handle = store.send(SyncAction::ToggleRequested).await.unwrap();
        handle.wait().await;
    }

    let mut received = 0;
    let mut lagged = false;
    loop {
        match rx.try_recv() {
            Ok(_) => received += 1,
            Err(TryRecvError::Lagged(_)) => {
                lagged = true;
                continue;
            },
            Err(TryRecvError::Empty | TryRecvError::Closed) => break,
        }
    }

    assert!(lagged, "Expected observer to lag");
    assert_eq!(received, 4);
}

#[tokio::test]
async fn test_delayed_action_broadcast() {
    #[derive(Debug, Clone, PartialEq)]
    enum AlertAction {
        Shown,
        Dismissed,
    }

    #[derive(Clone, Default)]
    struct AlertState;

    #[derive(Clone)]
    struct AlertReducer;

    impl Reducer for AlertReducer {
        type State = AlertState;
        type Action = AlertAction;
        type Environment = SyncEnvironment;

        fn reduce(
            &self,
            _state: &mut Self::State,
            action: Self::Action,
            _env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]> {
            match action {
                AlertAction::Shown => smallvec![Effect::Delay {
                    duration: Duration::from_millis(10),
                    action: Box::new(AlertAction::Dismissed),
                }],
                AlertAction::Dismissed => smallvec![Effect::None],
            }
        }
    }

    let store = Store::new(AlertState, AlertReducer, SyncEnvironment);
    let mut rx = store.subscribe_actions();

    store.send(AlertAction::Shown).await.unwrap();

    let action = tokio::time::timeout(Duration::from_secs(1), rx.recv())
        .await
        .expect("Timeout waiting for delayed action")
        .expect("Channel closed");
    assert_eq!(action, AlertAction::Dismissed);
}

#[tokio::test]
async fn test_channel_closed_when_store_dropped() {
    let store = new_store();
    let mut observer = store.subscribe_actions();

    let waiting = tokio::spawn(async move { observer.recv().await });
    tokio::time::sleep(Duration::from_millis(20)).await;

    drop(store);

    let result = waiting.await.expect("Task panicked");
    assert!(matches!(result, Err(RecvError::Closed)));
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Count available actions in receiver without blocking
fn count_available_actions(rx: &mut tokio::sync::broadcast::Receiver<SyncAction>) -> usize {
    let mut count = 0;
    loop {
        match rx.try_recv() {
            Ok(_) => count += 1,
            Err(TryRecvError::Lagged(_)) => continue,
            Err(_) => break,
        }
    }
    count
}
