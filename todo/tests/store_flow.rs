//! Integration tests for the application store running against the
//! in-memory service
//!
//! Covers the full loop: a command is reduced, its effect calls the service,
//! and the outcome comes back as an action that lands in state.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use futures::StreamExt;
use todo_list::{
    app_reducer, select_all_completed_todos, select_all_open_todos, select_info_message,
    select_is_loading, AppAction, AppEnvironment, AppState, AppStore, InMemoryTodoService, Todo,
    TodoId, TodoService,
};
use todoflow_testing::{init_test_tracing, test_clock};

fn seed() -> Vec<Todo> {
    let done = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    vec![
        Todo::new(TodoId::new(1), "Buy milk", ""),
        Todo::new(TodoId::new(2), "Write docs", "").completed_at(done),
        Todo::new(TodoId::new(3), "Deploy", ""),
    ]
}

fn setup(todos: Vec<Todo>) -> (AppStore, Arc<InMemoryTodoService>) {
    init_test_tracing();
    let service = Arc::new(InMemoryTodoService::with_todos(todos));
    let shared: Arc<dyn TodoService> = Arc::clone(&service) as Arc<dyn TodoService>;
    let env = AppEnvironment::new(shared, Arc::new(test_clock()));
    (AppStore::new(AppState::default(), app_reducer(), env), service)
}

async fn loaded(todos: Vec<Todo>) -> (AppStore, Arc<InMemoryTodoService>) {
    let (store, service) = setup(todos);
    let mut handle = store.send(AppAction::AllTodosRequested).await.unwrap();
    handle.wait().await;
    (store, service)
}

async fn info_message(store: &AppStore) -> Option<String> {
    store.state(|s| s.todo.info_message.clone()).await
}

fn ids(todos: &[Todo]) -> Vec<i64> {
    todos.iter().map(|todo| todo.id.get()).collect()
}

#[tokio::test]
async fn loading_fills_collection_in_service_order() {
    let (store, _service) = loaded(seed()).await;

    let state = store.snapshot().await;
    assert!(!state.todo.is_loading);
    assert_eq!(ids(&state.todo.todos), vec![1, 2, 3]);
    assert_eq!(ids(&select_all_open_todos(&state)), vec![1, 3]);
    assert_eq!(ids(&select_all_completed_todos(&state)), vec![2]);
    assert_eq!(state.todo.info_message, None);
}

#[tokio::test]
async fn loading_flag_rises_then_falls() {
    let (store, _service) = setup(seed());
    let mut loading = store.select(select_is_loading).await;

    assert_eq!(loading.next().await, Some(false));
    store.send(AppAction::AllTodosRequested).await.unwrap();
    assert_eq!(loading.next().await, Some(true));
    assert_eq!(loading.next().await, Some(false));
}

#[tokio::test]
async fn outcome_can_be_awaited_as_an_action() {
    let (store, _service) = setup(seed());

    let outcome = store
        .send_and_wait_for(
            AppAction::AllTodosRequested,
            |action| {
                matches!(
                    action,
                    AppAction::AllTodosLoaded { .. } | AppAction::AllTodosLoadFailed { .. }
                )
            },
            Duration::from_secs(1),
        )
        .await
        .unwrap();

    match outcome {
        AppAction::AllTodosLoaded { todos } => assert_eq!(todos.len(), 3),
        other => panic!("expected AllTodosLoaded, got {other:?}"),
    }
}

#[tokio::test]
async fn failed_load_reports_message_and_stops_loading() {
    let (store, service) = setup(seed());
    service.set_online(false);

    let mut handle = store.send(AppAction::AllTodosRequested).await.unwrap();
    handle.wait().await;

    let state = store.snapshot().await;
    assert!(!state.todo.is_loading);
    assert!(state.todo.todos.is_empty());
    assert_eq!(
        state.todo.info_message.as_deref(),
        Some("Could not load todos: service unavailable: in-memory service is offline")
    );
}

#[tokio::test]
async fn delete_removes_locally_and_in_service() {
    let (store, service) = loaded(seed()).await;

    let mut handle = store
        .send(AppAction::TodoDeleteRequested { id: TodoId::new(1) })
        .await
        .unwrap();

    // The reducer removes the todo before the service call finishes.
    assert_eq!(store.state(|s| s.todo.count()).await, 2);

    handle.wait().await;
    assert_eq!(info_message(&store).await.as_deref(), Some("Todo deleted"));
    assert!(service.find_by_id(TodoId::new(1)).await.is_err());
}

#[tokio::test]
async fn failed_delete_becomes_info_message() {
    let (store, service) = loaded(seed()).await;
    service.set_online(false);

    let mut handle = store
        .send(AppAction::TodoDeleteRequested { id: TodoId::new(3) })
        .await
        .unwrap();
    handle.wait().await;

    assert_eq!(
        info_message(&store).await.as_deref(),
        Some("Could not delete todo 3: service unavailable: in-memory service is offline")
    );
}

#[tokio::test]
async fn delete_of_todo_missing_from_service_reports_not_found() {
    let (store, service) = loaded(seed()).await;
    service.delete_by_id(TodoId::new(3)).await.unwrap();

    let mut handle = store
        .send(AppAction::TodoDeleteRequested { id: TodoId::new(3) })
        .await
        .unwrap();
    handle.wait().await;

    assert_eq!(
        info_message(&store).await.as_deref(),
        Some("Could not delete todo 3: todo 3 not found")
    );
}

#[tokio::test]
async fn unknown_delete_starts_no_service_call() {
    let (store, _service) = loaded(seed()).await;
    let before = store.snapshot().await;

    let handle = store
        .send(AppAction::TodoDeleteRequested { id: TodoId::new(99) })
        .await
        .unwrap();

    assert_eq!(handle.pending(), 0);
    assert_eq!(*store.snapshot().await, *before);
}

#[tokio::test]
async fn completing_persists_status_and_date() {
    let (store, service) = loaded(seed()).await;
    let todo = store.state(|s| s.todo.get(TodoId::new(1)).cloned()).await.unwrap();
    let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

    let mut handle = store
        .send(AppAction::TodoUpdateStatusRequested {
            todo,
            new_status: true,
            completed_date: Some(at),
        })
        .await
        .unwrap();
    handle.wait().await;

    assert_eq!(info_message(&store).await.as_deref(), Some("Todo completed"));
    let stored = service.find_by_id(TodoId::new(1)).await.unwrap();
    assert!(stored.completed);
    assert_eq!(stored.completed_date, Some(at));
}

#[tokio::test]
async fn reopening_clears_date_everywhere() {
    let (store, service) = loaded(seed()).await;
    let todo = store.state(|s| s.todo.get(TodoId::new(2)).cloned()).await.unwrap();

    let mut handle = store
        .send(AppAction::TodoUpdateStatusRequested {
            todo,
            new_status: false,
            completed_date: Some(Utc::now()),
        })
        .await
        .unwrap();
    handle.wait().await;

    assert_eq!(info_message(&store).await.as_deref(), Some("Todo reopened"));
    let local = store.state(|s| s.todo.get(TodoId::new(2)).cloned()).await.unwrap();
    let stored = service.find_by_id(TodoId::new(2)).await.unwrap();
    assert_eq!(local.completed_date, None);
    assert_eq!(stored.completed_date, None);
    assert!(!stored.completed);
}

#[tokio::test]
async fn failed_update_keeps_local_change_and_reports() {
    let (store, service) = loaded(seed()).await;
    service.set_online(false);
    let todo = store.state(|s| s.todo.get(TodoId::new(3)).cloned()).await.unwrap();

    let mut handle = store
        .send(AppAction::TodoUpdateStatusRequested {
            todo,
            new_status: true,
            completed_date: None,
        })
        .await
        .unwrap();
    handle.wait().await;

    let local = store.state(|s| s.todo.get(TodoId::new(3)).cloned()).await.unwrap();
    assert!(local.completed);
    assert_eq!(local.completed_date, Some(test_clock_now()));
    assert_eq!(
        info_message(&store).await.as_deref(),
        Some("Could not update todo 3: service unavailable: in-memory service is offline")
    );
}

fn test_clock_now() -> chrono::DateTime<Utc> {
    use todoflow_core::environment::Clock;
    test_clock().now()
}

#[tokio::test]
async fn info_message_view_tracks_set_and_reset() {
    let (store, _service) = loaded(seed()).await;
    let mut messages = store.select(select_info_message).await;

    assert_eq!(messages.next().await.unwrap().message, None);

    store
        .send(AppAction::InfoMessageSet {
            message: "Todo deleted".to_string(),
        })
        .await
        .unwrap();
    store.send(AppAction::ResetInfoMessage).await.unwrap();

    assert_eq!(
        messages.next().await.unwrap().message.as_deref(),
        Some("Todo deleted")
    );
    assert_eq!(messages.next().await.unwrap().message, None);
}

#[tokio::test]
async fn subscribers_observe_every_commit_in_order() {
    let (store, _service) = loaded(seed()).await;
    let mut states = store.subscribe().await;
    let _current = states.next().await.unwrap();

    store
        .send(AppAction::InfoMessageSet {
            message: "first".to_string(),
        })
        .await
        .unwrap();
    store.send(AppAction::ActivateTodoControls).await.unwrap();
    store
        .send(AppAction::InfoMessageSet {
            message: "second".to_string(),
        })
        .await
        .unwrap();

    let first = states.next().await.unwrap();
    let activated = states.next().await.unwrap();
    let second = states.next().await.unwrap();

    assert_eq!(first.todo.info_message.as_deref(), Some("first"));
    assert!(!first.layout.controls_active);
    assert!(activated.layout.controls_active);
    assert_eq!(second.todo.info_message.as_deref(), Some("second"));

    // The todo collection was never touched, so it kept its identity.
    assert!(Arc::ptr_eq(&first.todo.todos, &second.todo.todos));
}

#[tokio::test]
async fn modify_signal_only_touches_layout() {
    let (store, _service) = loaded(seed()).await;
    let before = store.snapshot().await;
    let todo = before.todo.get(TodoId::new(1)).cloned().unwrap();

    store
        .send(AppAction::OpenModifyTodoModal { todo: todo.clone() })
        .await
        .unwrap();

    let after = store.snapshot().await;
    assert_eq!(after.layout.modify_todo, Some(todo));
    assert_eq!(after.todo, before.todo);
}
