//! Backing todo service.
//!
//! The reducer never talks to the service directly. It returns effects that
//! call the service through the environment and turn the outcome into an
//! action, so every failure reaches the state as data.

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};

use chrono::Utc;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::types::{NewTodo, Todo, TodoId};

/// Errors returned by a [`TodoService`]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// No todo has this id
    #[error("todo {0} not found")]
    NotFound(TodoId),

    /// The service cannot be reached
    #[error("service unavailable: {0}")]
    Unavailable(String),

    /// The request was rejected
    #[error("invalid request: {0}")]
    Invalid(String),
}

/// Boxed future returned by [`TodoService`] methods
pub type ServiceFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, ServiceError>> + Send + 'a>>;

/// Access to the stored todos
///
/// This trait uses explicit `Pin<Box<dyn Future>>` returns instead of
/// `async fn` so it stays object safe and can be injected as
/// `Arc<dyn TodoService>`.
pub trait TodoService: Send + Sync {
    /// All todos, ordered by id
    fn find_all_todos(&self) -> ServiceFuture<'_, Vec<Todo>>;

    /// Completed todos, ordered by id
    fn find_complete_todos(&self) -> ServiceFuture<'_, Vec<Todo>>;

    /// Open todos, ordered by id
    fn find_incomplete_todos(&self) -> ServiceFuture<'_, Vec<Todo>>;

    /// One todo by id
    ///
    /// Fails with [`ServiceError::NotFound`] if the id is unknown.
    fn find_by_id(&self, id: TodoId) -> ServiceFuture<'_, Todo>;

    /// Stores a new open todo and returns it with its assigned id
    fn create_new_todo(&self, todo: NewTodo) -> ServiceFuture<'_, Todo>;

    /// Replaces a stored todo and returns the stored value
    fn update_todo(&self, todo: Todo) -> ServiceFuture<'_, Todo>;

    /// Removes a todo
    fn delete_by_id(&self, id: TodoId) -> ServiceFuture<'_, ()>;
}

/// In-memory [`TodoService`]
///
/// Ids are assigned sequentially starting at 1. Writes normalize the
/// completion date: an open todo never keeps one. The service can be switched
/// offline to exercise failure handling.
#[derive(Debug)]
pub struct InMemoryTodoService {
    todos: RwLock<BTreeMap<TodoId, Todo>>,
    next_id: AtomicI64,
    online: AtomicBool,
}

impl Default for InMemoryTodoService {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryTodoService {
    /// Creates an empty service
    #[must_use]
    pub fn new() -> Self {
        Self {
            todos: RwLock::new(BTreeMap::new()),
            next_id: AtomicI64::new(1),
            online: AtomicBool::new(true),
        }
    }

    /// Creates a service holding the given todos
    ///
    /// New ids continue after the largest seeded id.
    #[must_use]
    pub fn with_todos(todos: impl IntoIterator<Item = Todo>) -> Self {
        let todos: BTreeMap<TodoId, Todo> = todos
            .into_iter()
            .map(|todo| (todo.id, normalized(todo)))
            .collect();
        let next_id = todos.keys().next_back().map_or(1, |id| id.get() + 1);

        Self {
            todos: RwLock::new(todos),
            next_id: AtomicI64::new(next_id),
            online: AtomicBool::new(true),
        }
    }

    /// Switches the service on or off; while off every call fails with
    /// [`ServiceError::Unavailable`]
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    fn ensure_online(&self) -> Result<(), ServiceError> {
        if self.online.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(ServiceError::Unavailable("in-memory service is offline".to_string()))
        }
    }

    async fn filtered(&self, keep: fn(&Todo) -> bool) -> Result<Vec<Todo>, ServiceError> {
        self.ensure_online()?;
        let todos = self.todos.read().await;
        Ok(todos.values().filter(|todo| keep(todo)).cloned().collect())
    }
}

/// Restores the completion pairing: an open todo never carries a completion
/// date and a completed one always does
fn normalized(mut todo: Todo) -> Todo {
    if !todo.completed {
        todo.completed_date = None;
    } else if todo.completed_date.is_none() {
        todo.completed_date = Some(Utc::now());
    }
    todo
}

impl TodoService for InMemoryTodoService {
    fn find_all_todos(&self) -> ServiceFuture<'_, Vec<Todo>> {
        Box::pin(self.filtered(|_| true))
    }

    fn find_complete_todos(&self) -> ServiceFuture<'_, Vec<Todo>> {
        Box::pin(self.filtered(|todo| todo.completed))
    }

    fn find_incomplete_todos(&self) -> ServiceFuture<'_, Vec<Todo>> {
        Box::pin(self.filtered(|todo| !todo.completed))
    }

    fn find_by_id(&self, id: TodoId) -> ServiceFuture<'_, Todo> {
        Box::pin(async move {
            self.ensure_online()?;
            self.todos
                .read()
                .await
                .get(&id)
                .cloned()
                .ok_or(ServiceError::NotFound(id))
        })
    }

    fn create_new_todo(&self, todo: NewTodo) -> ServiceFuture<'_, Todo> {
        Box::pin(async move {
            self.ensure_online()?;
            if todo.title.trim().is_empty() {
                return Err(ServiceError::Invalid("todo title cannot be empty".to_string()));
            }

            let id = TodoId::new(self.next_id.fetch_add(1, Ordering::SeqCst));
            let created = Todo::new(id, todo.title, todo.description);
            self.todos.write().await.insert(id, created.clone());

            tracing::debug!(todo_id = %id, "Todo created");
            Ok(created)
        })
    }

    fn update_todo(&self, todo: Todo) -> ServiceFuture<'_, Todo> {
        Box::pin(async move {
            self.ensure_online()?;
            let mut todos = self.todos.write().await;
            let Some(stored) = todos.get_mut(&todo.id) else {
                return Err(ServiceError::NotFound(todo.id));
            };

            *stored = normalized(todo);
            tracing::debug!(todo_id = %stored.id, completed = stored.completed, "Todo updated");
            Ok(stored.clone())
        })
    }

    fn delete_by_id(&self, id: TodoId) -> ServiceFuture<'_, ()> {
        Box::pin(async move {
            self.ensure_online()?;
            if self.todos.write().await.remove(&id).is_none() {
                return Err(ServiceError::NotFound(id));
            }

            tracing::debug!(todo_id = %id, "Todo deleted");
            Ok(())
        })
    }
}
