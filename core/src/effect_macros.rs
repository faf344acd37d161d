//! Declarative macros for ergonomic effect construction
//!
//! These macros reduce boilerplate when creating `Effect` variants inside
//! reducers, particularly for async service calls and timers.

/// Create an `Effect::Future` from an async block
///
/// # Example
///
/// ```rust,ignore
/// use todoflow_core::async_effect;
///
/// async_effect! {
///     match service.find_all_todos().await {
///         Ok(todos) => Some(AppAction::AllTodosLoaded { todos }),
///         Err(error) => Some(AppAction::AllTodosLoadFailed { message: error.to_string() }),
///     }
/// }
/// ```
#[macro_export]
macro_rules! async_effect {
    ($($body:tt)*) => {
        $crate::effect::Effect::Future(
            ::std::boxed::Box::pin(async move { $($body)* })
        )
    };
}

/// Create an `Effect::Delay` for scheduling a fire-once delayed action
///
/// # Example
///
/// ```rust,ignore
/// use todoflow_core::delay;
/// use std::time::Duration;
///
/// delay! {
///     duration: Duration::from_secs(20),
///     action: ViewAction::StaticAlertClosed
/// }
/// ```
#[macro_export]
macro_rules! delay {
    (
        duration: $duration:expr,
        action: $action:expr
    ) => {
        $crate::effect::Effect::Delay {
            duration: $duration,
            action: ::std::boxed::Box::new($action),
        }
    };
}

/// Create a debounced delayed action keyed by an [`EffectId`](crate::effect::EffectId)
///
/// Every time the reducer returns this effect the pending timer with the same
/// id is cancelled and restarted, so the action fires once after `duration`
/// of quiet following the most recent trigger.
///
/// # Example
///
/// ```rust,ignore
/// use todoflow_core::debounce;
/// use std::time::Duration;
///
/// debounce! {
///     id: SUCCESS_MESSAGE_TIMER,
///     duration: Duration::from_secs(3),
///     action: ViewAction::SuccessMessageCleared
/// }
/// ```
#[macro_export]
macro_rules! debounce {
    (
        id: $id:expr,
        duration: $duration:expr,
        action: $action:expr
    ) => {
        $crate::effect::Effect::Cancellable {
            id: $id,
            effect: ::std::boxed::Box::new($crate::delay! {
                duration: $duration,
                action: $action
            }),
        }
    };
}
