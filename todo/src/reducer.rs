//! Reducer logic for the todo list.
//!
//! Two reducers, each scoped onto its own slice of [`AppState`] and combined
//! into the single reducer the store runs:
//!
//! - [`TodoReducer`] owns the todo collection, the loading flag and the info
//!   message, and starts the service calls.
//! - [`LayoutReducer`] records the UI signals.
//!
//! Service calls run as effects. Their outcome comes back as an action, so a
//! failing service shows up as an info message and never as a reducer error.

use std::collections::HashSet;
use std::sync::Arc;

use todoflow_core::{
    async_effect,
    composition::{combine_reducers, scope_reducer, CombinedReducer},
    effect::Effect,
    environment::Clock,
    reducer::Reducer,
    smallvec, DateTime, SmallVec, Utc,
};
use todoflow_runtime::Store;

use crate::service::TodoService;
use crate::types::{AppAction, AppState, LayoutState, Todo, TodoId, TodoState};

/// Environment dependencies for the todo reducers
#[derive(Clone)]
pub struct AppEnvironment {
    /// Backing todo service
    pub service: Arc<dyn TodoService>,
    /// Clock for completion timestamps
    pub clock: Arc<dyn Clock>,
}

impl AppEnvironment {
    /// Creates a new `AppEnvironment`
    #[must_use]
    pub fn new(service: Arc<dyn TodoService>, clock: Arc<dyn Clock>) -> Self {
        Self { service, clock }
    }
}

/// Reducer for the todo slice
#[derive(Clone, Debug, Default)]
pub struct TodoReducer;

impl TodoReducer {
    /// Creates a new `TodoReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn load_all(env: &AppEnvironment) -> Effect<AppAction> {
        let service = Arc::clone(&env.service);
        async_effect! {
            match service.find_all_todos().await {
                Ok(todos) => Some(AppAction::AllTodosLoaded { todos }),
                Err(error) => {
                    tracing::warn!(error = %error, "Loading todos failed");
                    metrics::counter!("todo.service.failures", "operation" => "load").increment(1);
                    Some(AppAction::AllTodosLoadFailed {
                        message: format!("Could not load todos: {error}"),
                    })
                },
            }
        }
    }

    fn delete(env: &AppEnvironment, id: TodoId) -> Effect<AppAction> {
        let service = Arc::clone(&env.service);
        async_effect! {
            let message = match service.delete_by_id(id).await {
                Ok(()) => "Todo deleted".to_string(),
                Err(error) => {
                    tracing::warn!(todo_id = %id, error = %error, "Deleting todo failed");
                    metrics::counter!("todo.service.failures", "operation" => "delete").increment(1);
                    format!("Could not delete todo {id}: {error}")
                },
            };
            Some(AppAction::InfoMessageSet { message })
        }
    }

    fn update(env: &AppEnvironment, todo: Todo) -> Effect<AppAction> {
        let service = Arc::clone(&env.service);
        async_effect! {
            let id = todo.id;
            let message = match service.update_todo(todo).await {
                Ok(stored) if stored.completed => "Todo completed".to_string(),
                Ok(_) => "Todo reopened".to_string(),
                Err(error) => {
                    tracing::warn!(todo_id = %id, error = %error, "Updating todo failed");
                    metrics::counter!("todo.service.failures", "operation" => "update").increment(1);
                    format!("Could not update todo {id}: {error}")
                },
            };
            Some(AppAction::InfoMessageSet { message })
        }
    }

    /// Brings a fetched list in line with the store's invariants
    ///
    /// Open todos lose any completion date, completed todos without one get
    /// the clock's time. Only the first todo for each id is kept.
    fn normalize_loaded(todos: Vec<Todo>, clock: &dyn Clock) -> Vec<Todo> {
        let mut seen = HashSet::with_capacity(todos.len());
        todos
            .into_iter()
            .filter(|todo| {
                let first = seen.insert(todo.id);
                if !first {
                    tracing::warn!(todo_id = %todo.id, "Dropping duplicate todo from service");
                }
                first
            })
            .map(|todo| {
                let (completed, completed_date) = (todo.completed, todo.completed_date);
                Self::with_status(todo, completed, completed_date, clock)
            })
            .collect()
    }

    /// Applies a status change to the view's copy of a todo
    ///
    /// Reopening always drops the completion date. Completing without a date
    /// uses the clock.
    fn with_status(
        mut todo: Todo,
        new_status: bool,
        completed_date: Option<DateTime<Utc>>,
        clock: &dyn Clock,
    ) -> Todo {
        if new_status {
            todo.mark_completed(completed_date.unwrap_or_else(|| clock.now()));
        } else {
            todo.reopen();
        }
        todo
    }
}

impl Reducer for TodoReducer {
    type State = TodoState;
    type Action = AppAction;
    type Environment = AppEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            // ========== Commands ==========
            AppAction::AllTodosRequested => {
                state.is_loading = true;
                smallvec![Self::load_all(env)]
            },

            AppAction::TodoDeleteRequested { id } => {
                let Some(position) = state.position(id) else {
                    tracing::debug!(todo_id = %id, "Delete ignored: unknown todo");
                    return SmallVec::new();
                };

                Arc::make_mut(&mut state.todos).remove(position);
                smallvec![Self::delete(env, id)]
            },

            AppAction::TodoUpdateStatusRequested {
                todo,
                new_status,
                completed_date,
            } => {
                let Some(position) = state.position(todo.id) else {
                    tracing::debug!(todo_id = %todo.id, "Status update ignored: unknown todo");
                    return SmallVec::new();
                };

                let updated = Self::with_status(todo, new_status, completed_date, env.clock.as_ref());
                Arc::make_mut(&mut state.todos)[position] = updated.clone();
                smallvec![Self::update(env, updated)]
            },

            AppAction::ResetInfoMessage => {
                state.info_message = None;
                SmallVec::new()
            },

            // ========== Events ==========
            AppAction::AllTodosLoaded { todos } => {
                state.todos = Arc::new(Self::normalize_loaded(todos, env.clock.as_ref()));
                state.is_loading = false;
                SmallVec::new()
            },

            AppAction::AllTodosLoadFailed { message } => {
                state.is_loading = false;
                state.info_message = Some(message);
                SmallVec::new()
            },

            AppAction::InfoMessageSet { message } => {
                state.info_message = Some(message);
                SmallVec::new()
            },

            // Layout signals never touch the todo slice
            AppAction::ActivateTodoControls | AppAction::OpenModifyTodoModal { .. } => {
                SmallVec::new()
            },
        }
    }
}

/// Reducer for the layout slice
#[derive(Clone, Debug, Default)]
pub struct LayoutReducer;

impl Reducer for LayoutReducer {
    type State = LayoutState;
    type Action = AppAction;
    type Environment = AppEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        _env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            AppAction::ActivateTodoControls => state.controls_active = true,
            AppAction::OpenModifyTodoModal { todo } => state.modify_todo = Some(todo),
            _ => {},
        }
        SmallVec::new()
    }
}

/// The reducer the application store runs
pub type AppReducer = CombinedReducer<AppState, AppAction, AppEnvironment>;

/// The application store
pub type AppStore = Store<AppState, AppAction, AppEnvironment, AppReducer>;

fn todo_slice(state: &AppState) -> &TodoState {
    &state.todo
}

fn set_todo_slice(state: &mut AppState, todo: TodoState) {
    state.todo = todo;
}

fn layout_slice(state: &AppState) -> &LayoutState {
    &state.layout
}

fn set_layout_slice(state: &mut AppState, layout: LayoutState) {
    state.layout = layout;
}

/// Builds the application reducer from the slice reducers
#[must_use]
pub fn app_reducer() -> AppReducer {
    combine_reducers(vec![
        Box::new(scope_reducer(TodoReducer::new(), todo_slice, set_todo_slice)),
        Box::new(scope_reducer(LayoutReducer, layout_slice, set_layout_slice)),
    ])
}
