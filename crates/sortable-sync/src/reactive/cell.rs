use std::cell::RefCell;
use std::rc::Rc;

use super::runtime::Notifier;
use super::scope::Subscription;

struct CellInner<T> {
    value: RefCell<T>,
    notifier: Notifier,
}

/// A mutable reactive value.
///
/// Clones share the same value. Reads through [`Observable::get`] register
/// the cell as a dependency of the enclosing [`Computed`](super::Computed).
/// Writes only notify when the new value differs from the current one.
pub struct Observable<T> {
    inner: Rc<CellInner<T>>,
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Clone + PartialEq + 'static> Observable<T> {
    pub fn new(value: T) -> Self {
        Self {
            inner: Rc::new(CellInner {
                value: RefCell::new(value),
                notifier: Notifier::new(),
            }),
        }
    }

    pub fn get(&self) -> T {
        self.inner.notifier.track();
        self.get_untracked()
    }

    pub fn get_untracked(&self) -> T {
        self.inner.value.borrow().clone()
    }

    /// Returns `true` if the value changed.
    pub fn set(&self, value: T) -> bool {
        {
            let mut current = self.inner.value.borrow_mut();
            if *current == value {
                return false;
            }
            *current = value;
        }
        self.inner.notifier.notify();
        true
    }

    pub fn update(&self, f: impl FnOnce(&T) -> T) -> bool {
        let next = f(&self.inner.value.borrow());
        self.set(next)
    }

    /// Call `listener` with the new value after every change.
    pub fn subscribe(&self, listener: impl Fn(&T) + 'static) -> Subscription {
        let weak = Rc::downgrade(&self.inner);
        self.inner.notifier.subscribe(move || {
            if let Some(inner) = weak.upgrade() {
                let value = inner.value.borrow().clone();
                listener(&value);
            }
        })
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<T: Clone + PartialEq + Default + 'static> Default for Observable<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Observable")
            .field(&*self.inner.value.borrow())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn set_notifies_only_on_change() {
        let flag = Observable::new(false);
        let calls = Rc::new(Cell::new(0));
        let counter = calls.clone();
        let _subscription = flag.subscribe(move |_| counter.set(counter.get() + 1));

        assert!(!flag.set(false));
        assert!(flag.set(true));
        assert!(!flag.set(true));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn subscriber_sees_new_value() {
        let count = Observable::new(1);
        let seen = Rc::new(Cell::new(0));
        let sink = seen.clone();
        let _subscription = count.subscribe(move |value| sink.set(*value));

        count.update(|value| value + 4);
        assert_eq!(seen.get(), 5);
    }

    #[test]
    fn clones_share_state() {
        let a = Observable::new(String::from("x"));
        let b = a.clone();
        b.set(String::from("y"));
        assert_eq!(a.get_untracked(), "y");
        assert!(a.ptr_eq(&b));
    }
}
