//! Drop-permission policies.
//!
//! A [`Policy`] is a static flag, a reactive flag, or a predicate over the
//! region's collection. [`Policy::watch`] turns any of them into a
//! [`Computed`] that re-evaluates whenever a reactive source it read changes.

use std::rc::Rc;

use crate::collection::ObservableList;
use crate::error::PolicyError;
use crate::reactive::{Computed, Observable};

pub type PolicyResult = Result<bool, PolicyError>;

type PredicateFn<T> = Rc<dyn Fn(&ObservableList<T>) -> PolicyResult>;

pub enum Policy<T> {
    Static(bool),
    Reactive(Observable<bool>),
    Predicate(PredicateFn<T>),
}

impl<T> Clone for Policy<T> {
    fn clone(&self) -> Self {
        match self {
            Policy::Static(value) => Policy::Static(*value),
            Policy::Reactive(cell) => Policy::Reactive(cell.clone()),
            Policy::Predicate(predicate) => Policy::Predicate(predicate.clone()),
        }
    }
}

impl<T: Clone + PartialEq + 'static> Policy<T> {
    /// Predicate over the candidate collection. Reactive state it reads
    /// (including the collection's length or contents) is tracked.
    pub fn predicate(predicate: impl Fn(&ObservableList<T>) -> bool + 'static) -> Self {
        Policy::Predicate(Rc::new(move |list| Ok(predicate(list))))
    }

    pub fn try_predicate(predicate: impl Fn(&ObservableList<T>) -> PolicyResult + 'static) -> Self {
        Policy::Predicate(Rc::new(predicate))
    }

    /// Current value, tracking whatever reactive state the policy reads.
    pub fn evaluate(&self, list: &ObservableList<T>) -> PolicyResult {
        match self {
            Policy::Static(value) => Ok(*value),
            Policy::Reactive(cell) => Ok(cell.get()),
            Policy::Predicate(predicate) => predicate(list),
        }
    }

    /// Derivation that follows the policy for `list`.
    pub fn watch(&self, list: &ObservableList<T>) -> Computed<PolicyResult> {
        let policy = self.clone();
        let list = list.clone();
        Computed::new(move || policy.evaluate(&list))
    }
}

/// A failing policy never permits.
pub fn permits(result: &PolicyResult) -> bool {
    matches!(result, Ok(true))
}

impl<T> From<bool> for Policy<T> {
    fn from(value: bool) -> Self {
        Policy::Static(value)
    }
}

impl<T> From<Observable<bool>> for Policy<T> {
    fn from(cell: Observable<bool>) -> Self {
        Policy::Reactive(cell)
    }
}

impl<T> std::fmt::Debug for Policy<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Policy::Static(value) => f.debug_tuple("Static").field(value).finish(),
            Policy::Reactive(cell) => f.debug_tuple("Reactive").field(cell).finish(),
            Policy::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}
