//! Headless todo-list view.
//!
//! The view keeps its own small store next to the application store.
//! [`TodoListView`] is the reducer for that store: it owns the two local
//! timers (the static alert and the success-message debounce) and nothing
//! else. [`TodoListBinding`] connects both stores. It turns gestures into
//! application actions, exposes the selector streams a renderer would draw
//! from, and forwards info messages from the application state into the
//! view's success message.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tokio::task::JoinHandle;
use todoflow_core::{
    debounce, delay,
    effect::{Effect, EffectId},
    reducer::Reducer,
    smallvec, SmallVec,
};
use todoflow_macros::Action;
use todoflow_runtime::{EffectHandle, Selection, Store, StoreError};

use crate::reducer::AppStore;
use crate::selectors::{select_all_todos, select_info_message, select_is_loading, TodoSelectors};
use crate::types::{AppAction, AppState, InfoMessage, Todo, TodoId};

/// Timer that closes the static alert after mounting
pub const ALERT_TIMER: EffectId = EffectId::from_static("static-alert");

/// Timer that clears the success message after a quiet period
pub const SUCCESS_MESSAGE_TIMER: EffectId = EffectId::from_static("success-message");

/// Durations of the view's timers
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ViewTimings {
    /// Delay before the static alert closes
    pub alert_dismiss: Duration,
    /// Quiet period before the success message is cleared
    pub success_message: Duration,
}

impl Default for ViewTimings {
    fn default() -> Self {
        Self {
            alert_dismiss: Duration::from_secs(20),
            success_message: Duration::from_secs(3),
        }
    }
}

/// Local state of the list view
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ViewState {
    /// True between mount and destroy
    pub mounted: bool,
    /// Set once the alert timer has fired
    pub static_alert_closed: bool,
    /// Message currently shown to the user
    pub success_message: Option<String>,
}

/// Actions of the list view
#[derive(Action, Clone, Debug, PartialEq, Eq)]
pub enum ViewAction {
    /// Command: The view was attached
    #[command]
    Mounted,

    /// Command: Show a message from the application state
    #[command]
    InfoMessageShown {
        /// Text to show
        message: String,
    },

    /// Command: The view is being torn down
    #[command]
    Destroyed,

    /// Event: The alert timer fired
    #[event]
    StaticAlertClosed,

    /// Event: The success message went quiet long enough to be cleared
    #[event]
    SuccessMessageCleared,
}

/// Reducer for the list view's local state
#[derive(Clone, Debug, Default)]
pub struct TodoListView {
    timings: ViewTimings,
}

impl TodoListView {
    /// Creates a view reducer with the given timer durations
    #[must_use]
    pub const fn new(timings: ViewTimings) -> Self {
        Self { timings }
    }

    /// Timer durations in use
    #[must_use]
    pub const fn timings(&self) -> ViewTimings {
        self.timings
    }
}

impl Reducer for TodoListView {
    type State = ViewState;
    type Action = ViewAction;
    type Environment = ();

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        _env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            ViewAction::Mounted => {
                if state.mounted {
                    return SmallVec::new();
                }
                state.mounted = true;

                // Fire-once. Keyed only so teardown can abort it.
                let alert = delay! {
                    duration: self.timings.alert_dismiss,
                    action: ViewAction::StaticAlertClosed
                };
                smallvec![alert.cancellable(ALERT_TIMER)]
            },

            ViewAction::InfoMessageShown { message } => {
                state.success_message = Some(message);
                smallvec![debounce! {
                    id: SUCCESS_MESSAGE_TIMER,
                    duration: self.timings.success_message,
                    action: ViewAction::SuccessMessageCleared
                }]
            },

            ViewAction::Destroyed => {
                state.mounted = false;
                smallvec![
                    Effect::Cancel { id: ALERT_TIMER },
                    Effect::Cancel {
                        id: SUCCESS_MESSAGE_TIMER
                    },
                ]
            },

            ViewAction::StaticAlertClosed => {
                state.static_alert_closed = true;
                SmallVec::new()
            },

            ViewAction::SuccessMessageCleared => {
                state.success_message = None;
                SmallVec::new()
            },
        }
    }
}

/// Store running the list view reducer
pub type ViewStore = Store<ViewState, ViewAction, (), TodoListView>;

/// Connects the list view to the application store
///
/// Call [`mount`](Self::mount) once the view is shown and
/// [`destroy`](Self::destroy) when it goes away. Dropping a mounted binding
/// stops the info-message forwarding but does not wait for it.
pub struct TodoListBinding {
    app: AppStore,
    view: ViewStore,
    selectors: Arc<TodoSelectors>,
    info_forwarder: Option<JoinHandle<()>>,
}

impl TodoListBinding {
    /// Creates an unmounted binding over the application store
    #[must_use]
    pub fn new(app: AppStore, timings: ViewTimings) -> Self {
        Self {
            app,
            view: Store::new(ViewState::default(), TodoListView::new(timings), ()),
            selectors: Arc::new(TodoSelectors::new()),
            info_forwarder: None,
        }
    }

    /// The application store this view is bound to
    #[must_use]
    pub const fn app(&self) -> &AppStore {
        &self.app
    }

    /// The view's own store
    #[must_use]
    pub const fn view(&self) -> &ViewStore {
        &self.view
    }

    /// Returns true between [`mount`](Self::mount) and [`destroy`](Self::destroy)
    #[must_use]
    pub const fn is_mounted(&self) -> bool {
        self.info_forwarder.is_some()
    }

    /// Attaches the view
    ///
    /// Starts the alert timer, starts forwarding info messages, activates the
    /// todo controls and requests every todo. Mounting twice is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] if either store is shutting
    /// down.
    #[tracing::instrument(skip(self), name = "todo_list_mount")]
    pub async fn mount(&mut self) -> Result<(), StoreError> {
        if self.is_mounted() {
            tracing::debug!("View already mounted");
            return Ok(());
        }

        self.view.send(ViewAction::Mounted).await?;

        let messages = self.app.select(select_info_message).await;
        self.info_forwarder = Some(tokio::spawn(forward_info_messages(
            messages,
            self.app.clone(),
            self.view.clone(),
        )));

        if let Err(error) = self.activate().await {
            tracing::warn!(error = %error, "Mount failed, detaching view");
            if let Some(forwarder) = self.info_forwarder.take() {
                forwarder.abort();
                let _ = forwarder.await;
            }
            if let Err(view_error) = self.view.send(ViewAction::Destroyed).await {
                tracing::debug!(error = %view_error, "View timers not cancelled");
            }
            return Err(error);
        }

        tracing::info!("Todo list mounted");
        Ok(())
    }

    async fn activate(&self) -> Result<(), StoreError> {
        self.app.send(AppAction::ActivateTodoControls).await?;
        self.app.send(AppAction::AllTodosRequested).await?;
        Ok(())
    }

    /// Detaches the view
    ///
    /// Stops the info-message forwarding and waits for it to release its
    /// subscription, then cancels both timers and shuts the view store down.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the view store was already shut down or
    /// does not drain within its configured timeout.
    #[tracing::instrument(skip(self), name = "todo_list_destroy")]
    pub async fn destroy(mut self) -> Result<(), StoreError> {
        if let Some(forwarder) = self.info_forwarder.take() {
            forwarder.abort();
            // Cancellation is the expected outcome here.
            let _ = forwarder.await;
        }

        self.view.send(ViewAction::Destroyed).await?;
        self.view.shutdown_default().await?;

        tracing::info!("Todo list destroyed");
        Ok(())
    }

    // ========== Streams ==========

    /// Every todo, in store order
    pub async fn all_todos(&self) -> Selection<AppState, Arc<Vec<Todo>>> {
        self.app.select(select_all_todos).await
    }

    /// Open todos
    pub async fn open_todos(&self) -> Selection<AppState, Arc<Vec<Todo>>> {
        let selectors = Arc::clone(&self.selectors);
        self.app.select(move |state| selectors.open(state)).await
    }

    /// Completed todos
    pub async fn completed_todos(&self) -> Selection<AppState, Arc<Vec<Todo>>> {
        let selectors = Arc::clone(&self.selectors);
        self.app.select(move |state| selectors.completed(state)).await
    }

    /// Loading flag
    pub async fn is_loading(&self) -> Selection<AppState, bool> {
        self.app.select(select_is_loading).await
    }

    /// Success message shown by the view
    pub async fn success_message(&self) -> Selection<ViewState, Option<String>> {
        self.view
            .select(|state: &ViewState| state.success_message.clone())
            .await
    }

    /// Whether the static alert has closed
    pub async fn static_alert_closed(&self) -> Selection<ViewState, bool> {
        self.view.select(|state: &ViewState| state.static_alert_closed).await
    }

    // ========== Gestures ==========

    /// Deletes a todo
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] if the application store is
    /// shutting down.
    pub async fn delete(&self, id: TodoId) -> Result<EffectHandle, StoreError> {
        self.app.send(AppAction::TodoDeleteRequested { id }).await
    }

    /// Marks a todo completed now
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] if the application store is
    /// shutting down.
    pub async fn complete(&self, todo: Todo) -> Result<EffectHandle, StoreError> {
        let now = self.app.environment().clock.now();
        self.app
            .send(AppAction::TodoUpdateStatusRequested {
                todo,
                new_status: true,
                completed_date: Some(now),
            })
            .await
    }

    /// Reopens a completed todo
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] if the application store is
    /// shutting down.
    pub async fn reopen(&self, todo: Todo) -> Result<EffectHandle, StoreError> {
        self.app
            .send(AppAction::TodoUpdateStatusRequested {
                todo,
                new_status: false,
                completed_date: None,
            })
            .await
    }

    /// Opens the modify dialog for a todo
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] if the application store is
    /// shutting down.
    pub async fn modify(&self, todo: Todo) -> Result<EffectHandle, StoreError> {
        self.app.send(AppAction::OpenModifyTodoModal { todo }).await
    }
}

impl Drop for TodoListBinding {
    fn drop(&mut self) {
        if let Some(forwarder) = self.info_forwarder.take() {
            forwarder.abort();
        }
    }
}

impl std::fmt::Debug for TodoListBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TodoListBinding")
            .field("mounted", &self.is_mounted())
            .finish_non_exhaustive()
    }
}

/// Shows every non-empty info message in the view, then clears it in the
/// application state
async fn forward_info_messages(
    mut messages: Selection<AppState, InfoMessage>,
    app: AppStore,
    view: ViewStore,
) {
    while let Some(info) = messages.next().await {
        let Some(message) = info.message.filter(|message| !message.is_empty()) else {
            continue;
        };

        tracing::debug!(%message, "Showing info message");
        metrics::counter!("todo.view.messages_shown").increment(1);
        if let Err(error) = view.send(ViewAction::InfoMessageShown { message }).await {
            tracing::debug!(error = %error, "View store closed, stopping info forwarding");
            break;
        }
        if let Err(error) = app.send(AppAction::ResetInfoMessage).await {
            tracing::debug!(error = %error, "App store closed, stopping info forwarding");
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use todoflow_testing::{assertions, ReducerTest};

    fn view() -> TodoListView {
        TodoListView::new(ViewTimings::default())
    }

    #[test]
    fn mounting_starts_alert_timer_once() {
        ReducerTest::new(view())
            .with_env(())
            .given_state(ViewState::default())
            .when_action(ViewAction::Mounted)
            .then_state(|state| assert!(state.mounted))
            .then_effects(|effects| {
                assertions::assert_effects_count(effects, 1);
                assertions::assert_has_cancellable_effect(effects, &ALERT_TIMER);
            })
            .run();

        ReducerTest::new(view())
            .with_env(())
            .given_state(ViewState {
                mounted: true,
                ..ViewState::default()
            })
            .when_action(ViewAction::Mounted)
            .then_unchanged()
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    #[allow(clippy::panic)] // Tests are allowed to panic on failures
    fn info_message_restarts_debounce() {
        ReducerTest::new(view())
            .with_env(())
            .given_state(ViewState::default())
            .when_action(ViewAction::InfoMessageShown {
                message: "Todo deleted".to_string(),
            })
            .then_state(|state| {
                assert_eq!(state.success_message.as_deref(), Some("Todo deleted"));
            })
            .then_effects(|effects| {
                assertions::assert_has_cancellable_effect(effects, &SUCCESS_MESSAGE_TIMER);
                match &effects[0] {
                    Effect::Cancellable { effect, .. } => match effect.as_ref() {
                        Effect::Delay { duration, action } => {
                            assert_eq!(*duration, Duration::from_secs(3));
                            assert_eq!(**action, ViewAction::SuccessMessageCleared);
                        },
                        other => panic!("expected a delay, got {other:?}"),
                    },
                    other => panic!("expected a cancellable effect, got {other:?}"),
                }
            })
            .run();
    }

    #[test]
    fn latest_message_wins() {
        ReducerTest::new(view())
            .with_env(())
            .given_state(ViewState::default())
            .when_action(ViewAction::InfoMessageShown {
                message: "Todo completed".to_string(),
            })
            .when_action(ViewAction::InfoMessageShown {
                message: "Todo reopened".to_string(),
            })
            .then_state(|state| {
                assert_eq!(state.success_message.as_deref(), Some("Todo reopened"));
            })
            .run();
    }

    #[test]
    fn timers_update_flags() {
        ReducerTest::new(view())
            .with_env(())
            .given_state(ViewState {
                mounted: true,
                success_message: Some("Todo deleted".to_string()),
                ..ViewState::default()
            })
            .when_action(ViewAction::StaticAlertClosed)
            .when_action(ViewAction::SuccessMessageCleared)
            .then_state(|state| {
                assert!(state.static_alert_closed);
                assert_eq!(state.success_message, None);
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn destroy_cancels_both_timers() {
        ReducerTest::new(view())
            .with_env(())
            .given_state(ViewState {
                mounted: true,
                ..ViewState::default()
            })
            .when_action(ViewAction::Destroyed)
            .then_state(|state| assert!(!state.mounted))
            .then_effects(|effects| {
                let ids: Vec<_> = effects.iter().filter_map(Effect::id).collect();
                assert_eq!(ids, vec![&ALERT_TIMER, &SUCCESS_MESSAGE_TIMER]);
            })
            .run();
    }

    #[test]
    fn custom_timings() {
        let timings = ViewTimings {
            alert_dismiss: Duration::from_secs(5),
            success_message: Duration::from_millis(500),
        };
        assert_eq!(TodoListView::new(timings).timings(), timings);
    }
}
