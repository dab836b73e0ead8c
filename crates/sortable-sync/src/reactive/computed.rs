use std::cell::{Cell, RefCell};
use std::rc::Rc;

use super::runtime::{Notifier, track_dependencies};
use super::scope::Subscription;

struct ComputedInner<T> {
    compute: Box<dyn Fn() -> T>,
    value: RefCell<T>,
    dependencies: RefCell<Vec<Subscription>>,
    notifier: Notifier,
    evaluations: Cell<u64>,
}

/// A derived value that re-runs when any source it read notifies.
///
/// The dependency set is rebuilt on every evaluation, so sources read
/// conditionally are picked up or dropped as the branch taken changes.
/// Subscribers are only notified when the recomputed value differs.
pub struct Computed<T> {
    inner: Rc<ComputedInner<T>>,
}

impl<T> Clone for Computed<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Clone + PartialEq + 'static> Computed<T> {
    pub fn new(compute: impl Fn() -> T + 'static) -> Self {
        let (value, dependencies) = track_dependencies(&compute);
        let inner = Rc::new(ComputedInner {
            compute: Box::new(compute),
            value: RefCell::new(value),
            dependencies: RefCell::new(Vec::new()),
            notifier: Notifier::new(),
            evaluations: Cell::new(1),
        });
        Self::watch(&inner, dependencies);
        Self { inner }
    }

    pub fn get(&self) -> T {
        self.inner.notifier.track();
        self.get_untracked()
    }

    pub fn get_untracked(&self) -> T {
        self.inner.value.borrow().clone()
    }

    pub fn subscribe(&self, listener: impl Fn(&T) + 'static) -> Subscription {
        let weak = Rc::downgrade(&self.inner);
        self.inner.notifier.subscribe(move || {
            if let Some(inner) = weak.upgrade() {
                let value = inner.value.borrow().clone();
                listener(&value);
            }
        })
    }

    pub fn dependency_count(&self) -> usize {
        self.inner.dependencies.borrow().len()
    }

    /// How many times the derivation has run, including the initial run.
    pub fn evaluations(&self) -> u64 {
        self.inner.evaluations.get()
    }

    fn watch(inner: &Rc<ComputedInner<T>>, dependencies: Vec<Notifier>) {
        let subscriptions = dependencies
            .iter()
            .map(|dependency| {
                let weak = Rc::downgrade(inner);
                dependency.subscribe(move || {
                    if let Some(inner) = weak.upgrade() {
                        Self::reevaluate(&inner);
                    }
                })
            })
            .collect();
        let previous = inner.dependencies.replace(subscriptions);
        drop(previous);
    }

    fn reevaluate(inner: &Rc<ComputedInner<T>>) {
        let (value, dependencies) = track_dependencies(|| (inner.compute)());
        inner.evaluations.set(inner.evaluations.get() + 1);
        Self::watch(inner, dependencies);

        let changed = {
            let mut current = inner.value.borrow_mut();
            if *current == value {
                false
            } else {
                *current = value;
                true
            }
        };
        if changed {
            inner.notifier.notify();
        }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Computed<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Computed")
            .field("value", &*self.inner.value.borrow())
            .field("dependencies", &self.inner.dependencies.borrow().len())
            .finish()
    }
}
