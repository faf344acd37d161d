//! Domain types for the todo list.
//!
//! The application state is split into two slices: the todo slice, owned by
//! [`TodoReducer`](crate::reducer::TodoReducer), and the layout slice, which
//! only tracks UI signals. The todo collection sits behind an `Arc` so that
//! transitions which leave it alone keep its identity, which is what the
//! memoized selectors key on.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use todoflow_macros::Action;

/// Unique identifier for a todo, immutable once assigned
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TodoId(i64);

impl TodoId {
    /// Wraps a raw identifier
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Returns the raw identifier
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for TodoId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single todo
///
/// `completed_date` is set exactly when `completed` is true. The mutators
/// below keep that pairing; [`Todo::is_consistent`] checks it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Todo {
    /// Unique identifier
    pub id: TodoId,
    /// Short title
    pub title: String,
    /// Longer description
    pub description: String,
    /// Whether the todo is done
    pub completed: bool,
    /// When the todo was completed (if completed)
    pub completed_date: Option<DateTime<Utc>>,
}

impl Todo {
    /// Creates an open todo
    #[must_use]
    pub fn new(id: TodoId, title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            description: description.into(),
            completed: false,
            completed_date: None,
        }
    }

    /// Marks the todo as completed at the given time
    pub fn mark_completed(&mut self, at: DateTime<Utc>) {
        self.completed = true;
        self.completed_date = Some(at);
    }

    /// Marks the todo as open again, dropping the completion date
    pub fn reopen(&mut self) {
        self.completed = false;
        self.completed_date = None;
    }

    /// Builder form of [`Todo::mark_completed`]
    #[must_use]
    pub fn completed_at(mut self, at: DateTime<Utc>) -> Self {
        self.mark_completed(at);
        self
    }

    /// Returns true if `completed` and `completed_date` agree
    #[must_use]
    pub const fn is_consistent(&self) -> bool {
        self.completed == self.completed_date.is_some()
    }
}

/// Fields of a todo that does not exist yet
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTodo {
    /// Short title, must not be blank
    pub title: String,
    /// Longer description
    pub description: String,
}

impl NewTodo {
    /// Creates a new todo request
    #[must_use]
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
        }
    }
}

/// State of the todo slice
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TodoState {
    /// All todos, in the order the service returned them; ids are unique
    pub todos: Arc<Vec<Todo>>,
    /// True while a fetch of all todos is outstanding
    pub is_loading: bool,
    /// Short-lived message for the user, cleared once shown
    pub info_message: Option<String>,
}

impl TodoState {
    /// Creates a todo slice holding the given todos
    #[must_use]
    pub fn with_todos(todos: Vec<Todo>) -> Self {
        Self {
            todos: Arc::new(todos),
            ..Self::default()
        }
    }

    /// Returns the number of todos
    #[must_use]
    pub fn count(&self) -> usize {
        self.todos.len()
    }

    /// Returns a todo by id
    #[must_use]
    pub fn get(&self, id: TodoId) -> Option<&Todo> {
        self.todos.iter().find(|todo| todo.id == id)
    }

    /// Position of the todo with this id
    #[must_use]
    pub fn position(&self, id: TodoId) -> Option<usize> {
        self.todos.iter().position(|todo| todo.id == id)
    }
}

/// State of the layout slice (UI signals only)
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LayoutState {
    /// Set once the list view has activated its controls
    pub controls_active: bool,
    /// Todo selected for editing in the modify dialog
    pub modify_todo: Option<Todo>,
}

/// Whole application state held by the store
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AppState {
    /// Todo slice
    pub todo: TodoState,
    /// Layout slice
    pub layout: LayoutState,
}

impl AppState {
    /// Creates an application state whose todo slice holds the given todos
    #[must_use]
    pub fn with_todos(todos: Vec<Todo>) -> Self {
        Self {
            todo: TodoState::with_todos(todos),
            layout: LayoutState::default(),
        }
    }
}

/// Info message view: `{ message: string | null }`
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InfoMessage {
    /// The message, if one is pending
    pub message: Option<String>,
}

/// Everything that can happen to the application state
///
/// Commands come from the list view, events are produced by the service
/// effects, and signals only concern the layout slice.
#[derive(Action, Clone, Debug, PartialEq)]
pub enum AppAction {
    // ========== Commands ==========
    /// Command: Load every todo from the service
    #[command]
    AllTodosRequested,

    /// Command: Delete a todo
    #[command]
    TodoDeleteRequested {
        /// Todo to delete
        id: TodoId,
    },

    /// Command: Complete or reopen a todo
    #[command]
    TodoUpdateStatusRequested {
        /// The todo as the view saw it
        todo: Todo,
        /// Completed when true, open when false
        new_status: bool,
        /// Completion time; ignored when reopening
        completed_date: Option<DateTime<Utc>>,
    },

    /// Command: Clear the pending info message
    #[command]
    ResetInfoMessage,

    // ========== Events ==========
    /// Event: The service returned every todo
    #[event]
    AllTodosLoaded {
        /// Todos in service order
        todos: Vec<Todo>,
    },

    /// Event: Loading the todos failed
    #[event]
    AllTodosLoadFailed {
        /// Human-readable reason
        message: String,
    },

    /// Event: A service call finished and has something to tell the user
    #[event]
    InfoMessageSet {
        /// Text to show
        message: String,
    },

    // ========== Signals ==========
    /// Signal: The list view switched its controls on
    #[signal]
    ActivateTodoControls,

    /// Signal: Open the modify dialog for a todo
    #[signal]
    OpenModifyTodoModal {
        /// Todo to edit
        todo: Todo,
    },
}
