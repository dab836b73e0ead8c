//! Observable ordered collections.
//!
//! An [`ObservableList`] is the single source of truth for item order. Every
//! mutation emits a [`ListDelta`] to delta subscribers, then notifies reactive
//! readers. Inside a [`batch`](crate::reactive::batch) both are deferred, so a
//! remove followed by an insert is only observed once both halves are done.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::error::ListError;
use crate::reactive::{Emitter, Notifier, Subscription, schedule};

static NEXT_COLLECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a collection, stable for its lifetime.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CollectionId(pub u64);

impl CollectionId {
    fn next() -> Self {
        Self(NEXT_COLLECTION_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl std::fmt::Display for CollectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "list{}", self.0)
    }
}

/// Incremental change to a list.
#[derive(Clone, Debug, PartialEq)]
pub enum ListDelta<T> {
    Insert { index: usize, value: T },
    Remove { index: usize, value: T },
    Move { from: usize, to: usize, value: T },
    Replace { values: Vec<T> },
}

struct ListInner<T> {
    id: CollectionId,
    items: RefCell<Vec<T>>,
    notifier: Notifier,
    deltas: Emitter<ListDelta<T>>,
}

/// Shared, observable, ordered sequence.
///
/// Clones refer to the same list.
pub struct ObservableList<T> {
    inner: Rc<ListInner<T>>,
}

impl<T> Clone for ObservableList<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Clone + PartialEq + 'static> ObservableList<T> {
    pub fn new() -> Self {
        Self::from_vec(Vec::new())
    }

    pub fn from_vec(items: Vec<T>) -> Self {
        Self {
            inner: Rc::new(ListInner {
                id: CollectionId::next(),
                items: RefCell::new(items),
                notifier: Notifier::new(),
                deltas: Emitter::new(),
            }),
        }
    }

    pub fn id(&self) -> CollectionId {
        self.inner.id
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    // --- tracked reads ---

    pub fn len(&self) -> usize {
        self.inner.notifier.track();
        self.len_untracked()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, index: usize) -> Option<T> {
        self.inner.notifier.track();
        self.get_untracked(index)
    }

    pub fn to_vec(&self) -> Vec<T> {
        self.inner.notifier.track();
        self.snapshot()
    }

    // --- untracked reads ---

    pub fn snapshot(&self) -> Vec<T> {
        self.inner.items.borrow().clone()
    }

    pub fn len_untracked(&self) -> usize {
        self.inner.items.borrow().len()
    }

    pub fn get_untracked(&self, index: usize) -> Option<T> {
        self.inner.items.borrow().get(index).cloned()
    }

    /// Index of the first item equal to `item`.
    pub fn position(&self, item: &T) -> Option<usize> {
        self.inner.items.borrow().iter().position(|x| x == item)
    }

    // --- mutation ---

    pub fn push(&self, value: T) {
        let index = {
            let mut items = self.inner.items.borrow_mut();
            items.push(value.clone());
            items.len() - 1
        };
        self.publish(ListDelta::Insert { index, value });
    }

    pub fn insert(&self, index: usize, value: T) -> Result<(), ListError> {
        {
            let mut items = self.inner.items.borrow_mut();
            if index > items.len() {
                return Err(ListError::IndexOutOfBounds {
                    index,
                    len: items.len(),
                });
            }
            items.insert(index, value.clone());
        }
        self.publish(ListDelta::Insert { index, value });
        Ok(())
    }

    pub fn remove(&self, index: usize) -> Result<T, ListError> {
        let value = {
            let mut items = self.inner.items.borrow_mut();
            if index >= items.len() {
                return Err(ListError::IndexOutOfBounds {
                    index,
                    len: items.len(),
                });
            }
            items.remove(index)
        };
        self.publish(ListDelta::Remove {
            index,
            value: value.clone(),
        });
        Ok(value)
    }

    /// Move the item at `from` so that it ends up at `to`.
    ///
    /// A no-op move (`from == to`) publishes nothing.
    pub fn move_item(&self, from: usize, to: usize) -> Result<(), ListError> {
        let value = {
            let mut items = self.inner.items.borrow_mut();
            let len = items.len();
            for index in [from, to] {
                if index >= len {
                    return Err(ListError::IndexOutOfBounds { index, len });
                }
            }
            if from == to {
                return Ok(());
            }
            let value = items.remove(from);
            items.insert(to, value.clone());
            value
        };
        self.publish(ListDelta::Move { from, to, value });
        Ok(())
    }

    pub fn replace(&self, values: Vec<T>) {
        *self.inner.items.borrow_mut() = values.clone();
        self.publish(ListDelta::Replace { values });
    }

    pub fn clear(&self) {
        self.replace(Vec::new());
    }

    // --- observation ---

    /// Call `listener` with the full contents after every change.
    pub fn subscribe(&self, listener: impl Fn(&[T]) + 'static) -> Subscription {
        let weak = Rc::downgrade(&self.inner);
        self.inner.notifier.subscribe(move || {
            if let Some(inner) = weak.upgrade() {
                let items = inner.items.borrow().clone();
                listener(&items);
            }
        })
    }

    /// Call `listener` with every delta, in mutation order.
    pub fn subscribe_deltas(&self, listener: impl Fn(&ListDelta<T>) + 'static) -> Subscription {
        self.inner.deltas.subscribe(listener)
    }

    fn publish(&self, delta: ListDelta<T>) {
        let deltas = self.inner.deltas.clone();
        schedule(move || deltas.emit(&delta));
        self.inner.notifier.notify();
    }
}

impl<T: Clone + PartialEq + 'static> Default for ObservableList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + PartialEq + 'static> From<Vec<T>> for ObservableList<T> {
    fn from(items: Vec<T>) -> Self {
        Self::from_vec(items)
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for ObservableList<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObservableList")
            .field("id", &self.inner.id)
            .field("items", &*self.inner.items.borrow())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::{Computed, batch};
    use std::cell::Cell;

    fn record_deltas(list: &ObservableList<i32>) -> (Rc<RefCell<Vec<ListDelta<i32>>>>, Subscription) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let subscription = list.subscribe_deltas(move |delta| sink.borrow_mut().push(delta.clone()));
        (seen, subscription)
    }

    #[test]
    fn mutations_emit_deltas_in_order() {
        let list = ObservableList::from_vec(vec![1, 2, 3]);
        let (seen, _subscription) = record_deltas(&list);

        list.push(4);
        list.remove(0).unwrap();
        list.move_item(0, 2).unwrap();

        assert_eq!(list.snapshot(), vec![3, 4, 2]);
        assert_eq!(
            *seen.borrow(),
            vec![
                ListDelta::Insert { index: 3, value: 4 },
                ListDelta::Remove { index: 0, value: 1 },
                ListDelta::Move { from: 0, to: 2, value: 2 },
            ]
        );
    }

    #[test]
    fn out_of_bounds_mutations_leave_list_untouched() {
        let list = ObservableList::from_vec(vec![1, 2]);
        let (seen, _subscription) = record_deltas(&list);

        assert_eq!(list.insert(3, 9), Err(ListError::IndexOutOfBounds { index: 3, len: 2 }));
        assert_eq!(list.remove(2), Err(ListError::IndexOutOfBounds { index: 2, len: 2 }));
        assert_eq!(list.move_item(0, 5), Err(ListError::IndexOutOfBounds { index: 5, len: 2 }));

        assert_eq!(list.snapshot(), vec![1, 2]);
        assert!(seen.borrow().is_empty());
    }

    #[test]
    fn noop_move_publishes_nothing() {
        let list = ObservableList::from_vec(vec![1, 2]);
        let (seen, _subscription) = record_deltas(&list);
        list.move_item(1, 1).unwrap();
        assert!(seen.borrow().is_empty());
    }

    #[test]
    fn batch_hides_intermediate_state() {
        let a = ObservableList::from_vec(vec![1, 2, 3]);
        let b = ObservableList::from_vec(vec![]);
        let observed = Rc::new(RefCell::new(Vec::new()));

        let (sink, a_view, b_view) = (observed.clone(), a.clone(), b.clone());
        let _sa = a.subscribe(move |_| {
            sink.borrow_mut().push((a_view.len_untracked(), b_view.len_untracked()))
        });

        batch(|| {
            let value = a.remove(1).unwrap();
            b.insert(0, value).unwrap();
        });

        assert_eq!(*observed.borrow(), vec![(2, 1)]);
    }

    #[test]
    fn computed_tracks_length() {
        let list = ObservableList::from_vec(vec![1, 2, 3]);
        let view = list.clone();
        let long = Computed::new(move || view.len() > 3);
        let flips = Rc::new(Cell::new(0));
        let counter = flips.clone();
        let _subscription = long.subscribe(move |_| counter.set(counter.get() + 1));

        assert!(!long.get_untracked());
        list.push(4);
        assert!(long.get_untracked());
        list.push(5);
        assert_eq!(flips.get(), 1);
    }

    #[test]
    fn ids_are_distinct() {
        let a = ObservableList::<i32>::new();
        let b = ObservableList::<i32>::new();
        assert_ne!(a.id(), b.id());
        assert_eq!(a.clone().id(), a.id());
        assert!(a.ptr_eq(&a.clone()));
    }
}
