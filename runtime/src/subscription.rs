//! State subscriptions
//!
//! Every committed state is pushed, as an `Arc` snapshot, to each live
//! subscriber through its own unbounded channel. Publishing happens while the
//! store still holds its write lock, so every subscriber observes transitions
//! in exactly the order the reducer committed them, with nothing dropped or
//! merged.
//!
//! A subscription is released by [`Subscription::unsubscribe`] or by dropping
//! it. The stream ends on its own only when the store itself is gone.

use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::task::{ready, Context, Poll};

use futures::Stream;
use tokio::sync::mpsc;

/// Registry of live state subscribers
pub(crate) struct SubscriberRegistry<S> {
    next_id: AtomicU64,
    senders: Mutex<Vec<(u64, mpsc::UnboundedSender<Arc<S>>)>>,
}

impl<S> SubscriberRegistry<S> {
    pub(crate) const fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            senders: Mutex::new(Vec::new()),
        }
    }

    /// Registers a subscriber whose stream starts with `current`
    pub(crate) fn subscribe(self: &Arc<Self>, current: Arc<S>) -> Subscription<S> {
        let (sender, receiver) = mpsc::unbounded_channel();
        // The receiver is alive, so this cannot fail
        let _ = sender.send(current);

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.lock().push((id, sender));
        tracing::trace!(subscription_id = id, "State subscription registered");

        Subscription {
            id,
            receiver,
            registry: Arc::downgrade(self),
        }
    }

    /// Pushes a committed snapshot to every subscriber, pruning closed ones
    pub(crate) fn publish(&self, snapshot: &Arc<S>) {
        self.lock()
            .retain(|(_, sender)| sender.send(Arc::clone(snapshot)).is_ok());
    }

    pub(crate) fn len(&self) -> usize {
        self.lock().len()
    }

    fn contains(&self, id: u64) -> bool {
        self.lock().iter().any(|(existing, _)| *existing == id)
    }

    fn remove(&self, id: u64) -> bool {
        let mut senders = self.lock();
        let before = senders.len();
        senders.retain(|(existing, _)| *existing != id);
        before != senders.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<(u64, mpsc::UnboundedSender<Arc<S>>)>> {
        self.senders.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A live stream of state snapshots
///
/// Yields the state current at subscription time first, then one snapshot per
/// committed transition. Obtained from [`Store::subscribe`](crate::Store::subscribe).
///
/// # Example
///
/// ```ignore
/// use futures::StreamExt;
///
/// let mut states = store.subscribe().await;
/// while let Some(state) = states.next().await {
///     render(&state);
/// }
/// ```
#[must_use = "a subscription does nothing unless polled"]
pub struct Subscription<S> {
    id: u64,
    receiver: mpsc::UnboundedReceiver<Arc<S>>,
    registry: Weak<SubscriberRegistry<S>>,
}

impl<S> Subscription<S> {
    /// Identifier of this subscription within its store
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }

    /// Returns true while the store still delivers to this subscription
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.registry
            .upgrade()
            .is_some_and(|registry| registry.contains(self.id))
    }

    /// Takes an already delivered snapshot without waiting
    pub fn try_next(&mut self) -> Option<Arc<S>> {
        self.receiver.try_recv().ok()
    }

    /// Releases the subscription
    ///
    /// The store stops delivering to it immediately. Dropping the
    /// subscription has the same effect.
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl<S> Stream for Subscription<S> {
    type Item = Arc<S>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().receiver.poll_recv(cx)
    }
}

impl<S> Drop for Subscription<S> {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            if registry.remove(self.id) {
                tracing::trace!(subscription_id = self.id, "State subscription released");
            }
        }
    }
}

impl<S> std::fmt::Debug for Subscription<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish_non_exhaustive()
    }
}

type SelectorFn<S, T> = Box<dyn Fn(&S) -> T + Send + Sync>;

/// A live stream of one derived slice of state
///
/// Applies a selector to every snapshot and yields the result only when it
/// differs from the previously yielded value. Obtained from
/// [`Store::select`](crate::Store::select).
#[must_use = "a selection does nothing unless polled"]
pub struct Selection<S, T> {
    subscription: Subscription<S>,
    selector: SelectorFn<S, T>,
    last: Option<T>,
}

impl<S, T> Selection<S, T> {
    pub(crate) fn new<F>(subscription: Subscription<S>, selector: F) -> Self
    where
        F: Fn(&S) -> T + Send + Sync + 'static,
    {
        Self {
            subscription,
            selector: Box::new(selector),
            last: None,
        }
    }

    /// The most recently yielded value, if any
    #[must_use]
    pub const fn current(&self) -> Option<&T> {
        self.last.as_ref()
    }

    /// Returns true while the store still delivers to this selection
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.subscription.is_active()
    }

    /// Releases the underlying subscription
    pub fn unsubscribe(self) {
        self.subscription.unsubscribe();
    }
}

impl<S, T> Stream for Selection<S, T>
where
    T: PartialEq + Clone + Unpin,
{
    type Item = T;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        loop {
            let Some(state) = ready!(Pin::new(&mut this.subscription).poll_next(cx)) else {
                return Poll::Ready(None);
            };

            let value = (this.selector)(&state);
            if this.last.as_ref() == Some(&value) {
                continue;
            }
            this.last = Some(value.clone());
            return Poll::Ready(Some(value));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn delivers_current_then_published_in_order() {
        let registry = Arc::new(SubscriberRegistry::new());
        let mut subscription = registry.subscribe(Arc::new(0));

        for n in 1..=3 {
            registry.publish(&Arc::new(n));
        }

        let mut seen = Vec::new();
        for _ in 0..4 {
            seen.push(*subscription.next().await.unwrap_or_default());
        }
        assert_eq!(seen, vec![0, 1, 2, 3]);
    }

    #[tokio::test]
    async fn dropping_releases_the_subscriber() {
        let registry = Arc::new(SubscriberRegistry::new());
        let first = registry.subscribe(Arc::new("a"));
        let second = registry.subscribe(Arc::new("a"));
        assert_eq!(registry.len(), 2);
        assert!(first.is_active());

        first.unsubscribe();
        assert_eq!(registry.len(), 1);
        assert!(second.is_active());

        drop(second);
        assert_eq!(registry.len(), 0);
    }

    #[tokio::test]
    async fn stream_ends_when_registry_is_gone() {
        let registry = Arc::new(SubscriberRegistry::new());
        let mut subscription = registry.subscribe(Arc::new(1));
        drop(registry);

        assert_eq!(subscription.next().await.as_deref(), Some(&1));
        assert!(subscription.next().await.is_none());
        assert!(!subscription.is_active());
    }

    #[tokio::test]
    async fn selection_skips_unchanged_values() {
        let registry = Arc::new(SubscriberRegistry::new());
        let subscription = registry.subscribe(Arc::new(1_u32));
        let mut parity = Selection::new(subscription, |n: &u32| n % 2 == 0);

        for n in [3, 5, 6, 8, 9] {
            registry.publish(&Arc::new(n));
        }
        drop(registry);

        let values: Vec<bool> = parity.by_ref().collect().await;
        assert_eq!(values, vec![false, true, false]);
        assert_eq!(parity.current(), Some(&false));
    }
}
