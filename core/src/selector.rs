//! Memoized selectors
//!
//! A selector is a pure function deriving a view from state. Plain selectors
//! are ordinary functions `fn(&State) -> T`. When the derivation walks a
//! collection, [`create_selector`] wraps it so the projection is recomputed
//! only when the input slice changes identity.
//!
//! Slices are compared by `Arc` pointer, not by value: reducers that leave a
//! slice untouched keep the same `Arc`, so an unrelated state transition is a
//! cache hit.
//!
//! ```
//! use std::sync::Arc;
//! use todoflow_core::selector::create_selector;
//!
//! struct State {
//!     numbers: Arc<Vec<i32>>,
//! }
//!
//! let evens = create_selector(
//!     |s: &State| &s.numbers,
//!     |numbers: &Vec<i32>| Arc::new(numbers.iter().copied().filter(|n| n % 2 == 0).collect::<Vec<_>>()),
//! );
//!
//! let state = State { numbers: Arc::new(vec![1, 2, 3, 4]) };
//! let first = evens.select(&state);
//! let second = evens.select(&state);
//! assert_eq!(*first, vec![2, 4]);
//! assert!(Arc::ptr_eq(&first, &second));
//! ```

use std::sync::{Arc, Mutex, PoisonError};

/// Selector that caches its last projection keyed on input identity
///
/// Created by [`create_selector`].
pub struct MemoizedSelector<S, I, T> {
    input: fn(&S) -> &Arc<I>,
    projector: fn(&I) -> T,
    last: Mutex<Option<(Arc<I>, T)>>,
}

/// Builds a memoized selector from an input slice accessor and a projector
#[must_use]
pub fn create_selector<S, I, T>(input: fn(&S) -> &Arc<I>, projector: fn(&I) -> T) -> MemoizedSelector<S, I, T> {
    MemoizedSelector {
        input,
        projector,
        last: Mutex::new(None),
    }
}

impl<S, I, T: Clone> MemoizedSelector<S, I, T> {
    /// Evaluates the selector against a state value
    pub fn select(&self, state: &S) -> T {
        let input = (self.input)(state);
        let mut last = self.last.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some((cached_input, cached_output)) = last.as_ref() {
            if Arc::ptr_eq(cached_input, input) {
                return cached_output.clone();
            }
        }

        let output = (self.projector)(input);
        *last = Some((Arc::clone(input), output.clone()));
        output
    }

    /// Drops the cached projection
    pub fn reset(&self) {
        *self.last.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

impl<S, I, T> std::fmt::Debug for MemoizedSelector<S, I, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let cached = self
            .last
            .lock()
            .map(|last| last.is_some())
            .unwrap_or(false);
        f.debug_struct("MemoizedSelector")
            .field("cached", &cached)
            .finish_non_exhaustive()
    }
}
