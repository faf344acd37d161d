//! Todo list built on the Todoflow store.
//!
//! One application store holds the todo collection and the UI-facing flags.
//! Everything that changes it goes through the reducers in [`reducer`];
//! everything that reads it goes through the selectors in [`selectors`].
//! The headless list view in [`view`] subscribes to those selectors, turns
//! gestures into actions, and owns the two short-lived UI timers.
//!
//! - Todo entity with the completed/completion-date pairing
//! - Todo and layout reducers, combined over slices of one state
//! - Service calls as effects whose failures become info messages
//! - Memoized list selectors
//! - List view with a fire-once alert and a debounced success message
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use todo_list::{
//!     app_reducer, AppEnvironment, AppState, AppStore, InMemoryTodoService, TodoListBinding,
//!     ViewTimings,
//! };
//! use todoflow_core::environment::SystemClock;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let env = AppEnvironment::new(Arc::new(InMemoryTodoService::new()), Arc::new(SystemClock));
//! let store = AppStore::new(AppState::default(), app_reducer(), env);
//!
//! let mut view = TodoListBinding::new(store.clone(), ViewTimings::default());
//! view.mount().await?;
//!
//! let open = store.state(|s| s.todo.todos.iter().filter(|t| !t.completed).count()).await;
//! println!("Open todos: {open}");
//!
//! view.destroy().await?;
//! store.shutdown_default().await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod reducer;
pub mod selectors;
pub mod service;
pub mod types;
pub mod view;

// Re-export commonly used types
pub use config::{AppConfig, ConfigError};
pub use reducer::{app_reducer, AppEnvironment, AppReducer, AppStore, LayoutReducer, TodoReducer};
pub use selectors::{
    select_all_completed_todos, select_all_open_todos, select_all_todos, select_info_message,
    select_is_loading, TodoSelectors,
};
pub use service::{InMemoryTodoService, ServiceError, TodoService};
pub use types::{AppAction, AppState, InfoMessage, LayoutState, NewTodo, Todo, TodoId, TodoState};
pub use view::{TodoListBinding, TodoListView, ViewAction, ViewState, ViewStore, ViewTimings};
