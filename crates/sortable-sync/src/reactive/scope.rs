//! Subscription lifetime management.
//!
//! Every listener registration returns a [`Subscription`]. Dropping it removes
//! the listener. A [`SubscriptionScope`] owns a group of subscriptions and
//! cancels all of them when it is cleared or dropped.

/// Handle that keeps a listener registered.
///
/// When dropped, the listener is removed from its source.
#[must_use = "dropping a Subscription cancels it immediately"]
pub struct Subscription {
    unsubscribe: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    pub(crate) fn new(unsubscribe: impl FnOnce() + 'static) -> Self {
        Self {
            unsubscribe: Some(Box::new(unsubscribe)),
        }
    }

    /// A subscription with nothing to cancel (static sources).
    pub fn empty() -> Self {
        Self { unsubscribe: None }
    }

    /// Cancel now instead of at drop.
    pub fn cancel(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(unsubscribe) = self.unsubscribe.take() {
            unsubscribe();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.unsubscribe.is_some())
            .finish()
    }
}

/// A scope that owns subscriptions.
///
/// # Example
/// ```
/// use sortable_sync::reactive::{Observable, SubscriptionScope};
///
/// let flag = Observable::new(false);
/// let mut scope = SubscriptionScope::new();
/// scope.add(flag.subscribe(|value| println!("flag: {value}")));
/// flag.set(true); // listener runs
/// drop(scope);
/// flag.set(false); // listener is gone
/// ```
#[derive(Default)]
pub struct SubscriptionScope {
    subscriptions: Vec<Subscription>,
}

impl SubscriptionScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep the subscription alive until the scope is cleared or dropped.
    pub fn add(&mut self, subscription: Subscription) {
        self.subscriptions.push(subscription);
    }

    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }

    /// Cancel every owned subscription.
    pub fn clear(&mut self) {
        self.subscriptions.clear();
    }
}

impl std::fmt::Debug for SubscriptionScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionScope")
            .field("subscriptions", &self.subscriptions.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn drop_runs_unsubscribe_once() {
        let calls = Rc::new(Cell::new(0));
        let counter = calls.clone();
        let subscription = Subscription::new(move || counter.set(counter.get() + 1));
        drop(subscription);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn scope_clear_cancels_all() {
        let calls = Rc::new(Cell::new(0));
        let mut scope = SubscriptionScope::new();
        for _ in 0..3 {
            let counter = calls.clone();
            scope.add(Subscription::new(move || counter.set(counter.get() + 1)));
        }
        assert_eq!(scope.len(), 3);

        scope.clear();
        assert!(scope.is_empty());
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn empty_subscription_is_inert() {
        let subscription = Subscription::empty();
        subscription.cancel();
    }
}
