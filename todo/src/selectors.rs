//! Derived views of the application state.
//!
//! The plain `select_*` functions are the pure derivations. [`TodoSelectors`]
//! memoizes the filtered lists so that transitions which leave the todo
//! collection alone (info messages, loading flag, layout signals) do not
//! re-filter it.

use std::sync::Arc;

use todoflow_core::selector::{create_selector, MemoizedSelector};

use crate::types::{AppState, InfoMessage, Todo};

/// Every todo, in store order
#[must_use]
pub fn select_all_todos(state: &AppState) -> Arc<Vec<Todo>> {
    Arc::clone(&state.todo.todos)
}

/// Todos that are not completed, in store order
#[must_use]
pub fn select_all_open_todos(state: &AppState) -> Vec<Todo> {
    open_todos(&state.todo.todos)
}

/// Completed todos, in store order
#[must_use]
pub fn select_all_completed_todos(state: &AppState) -> Vec<Todo> {
    completed_todos(&state.todo.todos)
}

/// True while the todos are being fetched
#[must_use]
pub const fn select_is_loading(state: &AppState) -> bool {
    state.todo.is_loading
}

/// The pending info message
#[must_use]
pub fn select_info_message(state: &AppState) -> InfoMessage {
    InfoMessage {
        message: state.todo.info_message.clone(),
    }
}

fn todos_slice(state: &AppState) -> &Arc<Vec<Todo>> {
    &state.todo.todos
}

fn open_todos(todos: &Vec<Todo>) -> Vec<Todo> {
    todos.iter().filter(|todo| !todo.completed).cloned().collect()
}

fn completed_todos(todos: &Vec<Todo>) -> Vec<Todo> {
    todos.iter().filter(|todo| todo.completed).cloned().collect()
}

fn shared_open_todos(todos: &Vec<Todo>) -> Arc<Vec<Todo>> {
    Arc::new(open_todos(todos))
}

fn shared_completed_todos(todos: &Vec<Todo>) -> Arc<Vec<Todo>> {
    Arc::new(completed_todos(todos))
}

/// Memoized list selectors
///
/// Each list is recomputed only when the todo collection changes identity;
/// otherwise the previous `Arc` is handed out again.
#[derive(Debug)]
pub struct TodoSelectors {
    open: MemoizedSelector<AppState, Vec<Todo>, Arc<Vec<Todo>>>,
    completed: MemoizedSelector<AppState, Vec<Todo>, Arc<Vec<Todo>>>,
}

impl Default for TodoSelectors {
    fn default() -> Self {
        Self::new()
    }
}

impl TodoSelectors {
    /// Creates the selectors with empty caches
    #[must_use]
    pub fn new() -> Self {
        Self {
            open: create_selector(todos_slice, shared_open_todos),
            completed: create_selector(todos_slice, shared_completed_todos),
        }
    }

    /// Every todo, in store order
    #[must_use]
    pub fn all(&self, state: &AppState) -> Arc<Vec<Todo>> {
        select_all_todos(state)
    }

    /// Open todos, memoized
    #[must_use]
    pub fn open(&self, state: &AppState) -> Arc<Vec<Todo>> {
        self.open.select(state)
    }

    /// Completed todos, memoized
    #[must_use]
    pub fn completed(&self, state: &AppState) -> Arc<Vec<Todo>> {
        self.completed.select(state)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code can use unwrap
mod tests {
    use super::*;
    use crate::types::{TodoId, TodoState};
    use chrono::{TimeZone, Utc};

    fn sample() -> AppState {
        let done = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        AppState::with_todos(vec![
            Todo::new(TodoId::new(1), "Buy milk", ""),
            Todo::new(TodoId::new(2), "Write docs", "").completed_at(done),
            Todo::new(TodoId::new(3), "Deploy", ""),
        ])
    }

    fn ids(todos: &[Todo]) -> Vec<i64> {
        todos.iter().map(|todo| todo.id.get()).collect()
    }

    #[test]
    fn filters_keep_store_order() {
        let state = sample();

        assert_eq!(ids(&select_all_todos(&state)), vec![1, 2, 3]);
        assert_eq!(ids(&select_all_open_todos(&state)), vec![1, 3]);
        assert_eq!(ids(&select_all_completed_todos(&state)), vec![2]);
    }

    #[test]
    fn flags_and_message() {
        let mut state = sample();
        assert!(!select_is_loading(&state));
        assert_eq!(select_info_message(&state), InfoMessage { message: None });

        state.todo = TodoState {
            is_loading: true,
            info_message: Some("Todo deleted".to_string()),
            ..state.todo
        };
        assert!(select_is_loading(&state));
        assert_eq!(
            select_info_message(&state).message.as_deref(),
            Some("Todo deleted")
        );
    }

    #[test]
    fn memoized_lists_survive_unrelated_changes() {
        let selectors = TodoSelectors::new();
        let state = sample();

        let open = selectors.open(&state);
        let completed = selectors.completed(&state);

        let mut next = state.clone();
        next.todo.info_message = Some("Todo completed".to_string());
        next.layout.controls_active = true;

        assert!(Arc::ptr_eq(&open, &selectors.open(&next)));
        assert!(Arc::ptr_eq(&completed, &selectors.completed(&next)));
        assert!(Arc::ptr_eq(&selectors.all(&state), &selectors.all(&next)));
    }

    #[test]
    fn memoized_lists_follow_collection_changes() {
        let selectors = TodoSelectors::new();
        let state = sample();
        assert_eq!(ids(&selectors.open(&state)), vec![1, 3]);

        let mut next = state.clone();
        Arc::make_mut(&mut next.todo.todos).retain(|todo| todo.id != TodoId::new(1));

        assert_eq!(ids(&selectors.open(&next)), vec![3]);
        assert_eq!(ids(&selectors.completed(&next)), vec![2]);
    }
}
