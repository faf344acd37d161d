//! Command-line demo of the todo list.
//!
//! Seeds an in-memory service, mounts the headless list view and walks
//! through the gestures it supports, printing the selector outputs along the
//! way.
//!
//! Configuration comes from the environment (see [`AppConfig`]); set
//! `TODO_METRICS_ADDR` to expose Prometheus metrics while the demo runs.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use todo_list::{
    app_reducer, select_all_completed_todos, select_all_open_todos, AppConfig, AppEnvironment,
    AppState, AppStore, InMemoryTodoService, Todo, TodoId, TodoListBinding, TodoService, ViewState,
};
use todoflow_core::environment::SystemClock;
use todoflow_runtime::{metrics::MetricsServer, EffectHandle, Selection};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "todo_list=info,todoflow_runtime=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;
    config.validate()?;
    tracing::debug!(?config, "Configuration loaded");

    if let Some(addr) = config.metrics_addr {
        MetricsServer::new(addr).serve()?;
    }

    println!("=== Todo List ===\n");

    let service = Arc::new(InMemoryTodoService::with_todos(seed_todos()));
    let shared: Arc<dyn TodoService> = Arc::clone(&service) as Arc<dyn TodoService>;
    let env = AppEnvironment::new(shared, Arc::new(SystemClock));
    let store = AppStore::with_config(AppState::default(), app_reducer(), env, config.store_config());

    let mut view = TodoListBinding::new(store.clone(), config.view_timings());
    view.mount().await?;

    // Wait for the initial fetch
    let mut loading = view.is_loading().await;
    while let Some(is_loading) = loading.next().await {
        if !is_loading {
            break;
        }
    }
    drop(loading);
    print_lists(&store).await;

    let first_open = store.state(|s| select_all_open_todos(s).into_iter().next()).await;
    if let Some(todo) = first_open {
        println!("\n>>> Completing '{}'", todo.title);
        let messages = view.success_message().await;
        show_outcome(messages, view.complete(todo).await?).await;
    }

    let first_done = store
        .state(|s| select_all_completed_todos(s).into_iter().next())
        .await;
    if let Some(todo) = first_done {
        println!("\n>>> Reopening '{}'", todo.title);
        let messages = view.success_message().await;
        show_outcome(messages, view.reopen(todo).await?).await;
    }

    println!("\n>>> Deleting todo 3");
    let messages = view.success_message().await;
    show_outcome(messages, view.delete(TodoId::new(3)).await?).await;

    println!("\n>>> Deleting todo 2 while the service is offline");
    service.set_online(false);
    let messages = view.success_message().await;
    show_outcome(messages, view.delete(TodoId::new(2)).await?).await;
    service.set_online(true);

    print_lists(&store).await;

    view.destroy().await?;
    store.shutdown(config.shutdown_timeout()).await?;

    println!("\n=== Done ===");
    Ok(())
}

fn seed_todos() -> Vec<Todo> {
    vec![
        Todo::new(TodoId::new(1), "Buy milk", "Two litres, semi-skimmed"),
        Todo::new(TodoId::new(2), "Write documentation", "Cover the view timers"),
        Todo::new(TodoId::new(3), "Deploy to production", "After the review"),
    ]
}

async fn print_lists(store: &AppStore) {
    let (open, completed) = store
        .state(|s| (select_all_open_todos(s), select_all_completed_todos(s)))
        .await;

    println!("\nOpen:");
    for todo in &open {
        println!("  [ ] {} {}", todo.id, todo.title);
    }
    println!("Completed:");
    for todo in &completed {
        println!("  [x] {} {}", todo.id, todo.title);
    }
}

/// Waits for a gesture's service call and prints the message the view shows
///
/// `messages` must be subscribed before the gesture is sent; its first item
/// is whatever was shown at that point.
async fn show_outcome(mut messages: Selection<ViewState, Option<String>>, mut handle: EffectHandle) {
    let _ = messages.next().await;

    handle.wait().await;

    let shown = tokio::time::timeout(Duration::from_secs(1), async {
        while let Some(message) = messages.next().await {
            if message.is_some() {
                return message;
            }
        }
        None
    })
    .await;

    match shown {
        Ok(Some(message)) => println!("    {message}"),
        _ => println!("    (no message)"),
    }
}
