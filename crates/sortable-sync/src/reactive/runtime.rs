//! Listener registry, dependency tracking and notification batching.
//!
//! Everything here is thread-local: the engine is single-threaded and all
//! work runs on one event loop.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::{Rc, Weak};

use smallvec::SmallVec;

use super::scope::Subscription;

type Listener<E> = Rc<dyn Fn(&E)>;
type Job = Box<dyn FnOnce()>;

struct EmitterInner<E> {
    next_id: u64,
    listeners: SmallVec<[(u64, Listener<E>); 4]>,
}

/// Synchronous event emitter.
///
/// Listeners registered while an emission is in progress are not called for
/// that emission. Listeners removed mid-emission are skipped.
pub struct Emitter<E> {
    inner: Rc<RefCell<EmitterInner<E>>>,
}

impl<E> Clone for Emitter<E> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<E: 'static> Emitter<E> {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(EmitterInner {
                next_id: 0,
                listeners: SmallVec::new(),
            })),
        }
    }

    pub fn subscribe(&self, listener: impl Fn(&E) + 'static) -> Subscription {
        let id = {
            let mut inner = self.inner.borrow_mut();
            let id = inner.next_id;
            inner.next_id += 1;
            inner.listeners.push((id, Rc::new(listener)));
            id
        };
        let weak: Weak<RefCell<EmitterInner<E>>> = Rc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner
                    .borrow_mut()
                    .listeners
                    .retain(|(listener_id, _)| *listener_id != id);
            }
        })
    }

    pub fn emit(&self, event: &E) {
        let snapshot: SmallVec<[(u64, Listener<E>); 4]> = self
            .inner
            .borrow()
            .listeners
            .iter()
            .map(|(id, listener)| (*id, listener.clone()))
            .collect();
        for (id, listener) in snapshot {
            let still_registered = self
                .inner
                .borrow()
                .listeners
                .iter()
                .any(|(listener_id, _)| *listener_id == id);
            if still_registered {
                listener(event);
            }
        }
    }

    pub fn listener_count(&self) -> usize {
        self.inner.borrow().listeners.len()
    }

    fn same_as(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<E: 'static> Default for Emitter<E> {
    fn default() -> Self {
        Self::new()
    }
}

/// Change notifier carried by every reactive source.
///
/// Reading a source calls [`Notifier::track`], which records the notifier in
/// the innermost tracking frame (if any). Writing calls [`Notifier::notify`].
#[derive(Clone, Default)]
pub struct Notifier {
    emitter: Emitter<()>,
}

impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, listener: impl Fn() + 'static) -> Subscription {
        self.emitter.subscribe(move |_| listener())
    }

    /// Record this notifier as a dependency of the running derivation.
    pub fn track(&self) {
        TRACKING.with(|frames| {
            if let Some(frame) = frames.borrow_mut().last_mut() {
                if !frame.iter().any(|tracked| tracked.emitter.same_as(&self.emitter)) {
                    frame.push(self.clone());
                }
            }
        });
    }

    /// Notify listeners now, or when the enclosing [`batch`] closes.
    pub fn notify(&self) {
        let emitter = self.emitter.clone();
        schedule(move || emitter.emit(&()));
    }

    pub fn listener_count(&self) -> usize {
        self.emitter.listener_count()
    }
}

struct BatchState {
    depth: u32,
    queue: VecDeque<Job>,
}

thread_local! {
    static TRACKING: RefCell<Vec<Vec<Notifier>>> = const { RefCell::new(Vec::new()) };
    static BATCH: RefCell<BatchState> = const {
        RefCell::new(BatchState {
            depth: 0,
            queue: VecDeque::new(),
        })
    };
}

/// Run `job` immediately, or queue it when a batch is open.
pub(crate) fn schedule(job: impl FnOnce() + 'static) {
    let mut job = Some(job);
    BATCH.with(|state| {
        let mut state = state.borrow_mut();
        if state.depth > 0 {
            if let Some(job) = job.take() {
                state.queue.push_back(Box::new(job));
            }
        }
    });
    if let Some(job) = job {
        job();
    }
}

struct BatchGuard;

impl BatchGuard {
    fn enter() -> Self {
        BATCH.with(|state| state.borrow_mut().depth += 1);
        Self
    }
}

impl Drop for BatchGuard {
    fn drop(&mut self) {
        BATCH.with(|state| state.borrow_mut().depth -= 1);
    }
}

/// Run `f` with all notifications deferred until it returns.
///
/// Queued notifications are delivered in the order they were raised, once the
/// outermost batch closes. Observers never see the intermediate states that
/// `f` passes through.
pub fn batch<R>(f: impl FnOnce() -> R) -> R {
    let result = {
        let _guard = BatchGuard::enter();
        f()
    };
    if BATCH.with(|state| state.borrow().depth == 0) {
        flush();
    }
    result
}

fn flush() {
    loop {
        let job = BATCH.with(|state| state.borrow_mut().queue.pop_front());
        match job {
            Some(job) => job(),
            None => break,
        }
    }
}

/// Run `f` and collect the notifiers it read.
pub(crate) fn track_dependencies<R>(f: impl FnOnce() -> R) -> (R, Vec<Notifier>) {
    TRACKING.with(|frames| frames.borrow_mut().push(Vec::new()));
    let result = f();
    let dependencies = TRACKING
        .with(|frames| frames.borrow_mut().pop())
        .unwrap_or_default();
    (result, dependencies)
}

/// Read reactive sources without registering them as dependencies.
pub fn untracked<R>(f: impl FnOnce() -> R) -> R {
    track_dependencies(f).0
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn emitter_delivers_to_all_listeners() {
        let emitter = Emitter::<u32>::new();
        let seen = Rc::new(RefCell::new(Vec::new()));

        let first = seen.clone();
        let _a = emitter.subscribe(move |value| first.borrow_mut().push(("a", *value)));
        let second = seen.clone();
        let _b = emitter.subscribe(move |value| second.borrow_mut().push(("b", *value)));

        emitter.emit(&7);
        assert_eq!(*seen.borrow(), vec![("a", 7), ("b", 7)]);
    }

    #[test]
    fn dropped_subscription_stops_delivery() {
        let emitter = Emitter::<()>::new();
        let calls = Rc::new(Cell::new(0));
        let counter = calls.clone();
        let subscription = emitter.subscribe(move |_| counter.set(counter.get() + 1));

        emitter.emit(&());
        drop(subscription);
        emitter.emit(&());

        assert_eq!(calls.get(), 1);
        assert_eq!(emitter.listener_count(), 0);
    }

    #[test]
    fn listener_removed_mid_emission_is_skipped() {
        let emitter = Emitter::<()>::new();
        let calls = Rc::new(Cell::new(0));
        let victim: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(None));

        let slot = victim.clone();
        let _killer = emitter.subscribe(move |_| {
            slot.borrow_mut().take();
        });
        let counter = calls.clone();
        *victim.borrow_mut() = Some(emitter.subscribe(move |_| counter.set(counter.get() + 1)));

        emitter.emit(&());
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn batch_defers_notifications_until_close() {
        let notifier = Notifier::new();
        let calls = Rc::new(Cell::new(0));
        let counter = calls.clone();
        let _subscription = notifier.subscribe(move || counter.set(counter.get() + 1));

        batch(|| {
            notifier.notify();
            notifier.notify();
            assert_eq!(calls.get(), 0);
        });
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn nested_batches_flush_once_at_outermost() {
        let notifier = Notifier::new();
        let calls = Rc::new(Cell::new(0));
        let counter = calls.clone();
        let _subscription = notifier.subscribe(move || counter.set(counter.get() + 1));

        batch(|| {
            batch(|| notifier.notify());
            assert_eq!(calls.get(), 0);
        });
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn tracking_collects_distinct_notifiers() {
        let a = Notifier::new();
        let b = Notifier::new();
        let ((), dependencies) = track_dependencies(|| {
            a.track();
            b.track();
            a.track();
        });
        assert_eq!(dependencies.len(), 2);
    }

    #[test]
    fn untracked_reads_do_not_leak_into_outer_frame() {
        let a = Notifier::new();
        let ((), dependencies) = track_dependencies(|| untracked(|| a.track()));
        assert!(dependencies.is_empty());
    }
}
