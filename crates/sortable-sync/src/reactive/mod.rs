//! Minimal single-threaded reactive core.
//!
//! [`Observable`] holds a value, [`Computed`] derives one and re-runs when the
//! sources it read change. Listener registrations return a [`Subscription`]
//! that unregisters on drop. [`batch`] defers notifications so observers only
//! see the state after a group of writes.

mod cell;
mod computed;
mod runtime;
mod scope;

pub use cell::Observable;
pub use computed::Computed;
pub use runtime::{Emitter, Notifier, batch, untracked};
pub(crate) use runtime::schedule;
pub use scope::{Subscription, SubscriptionScope};
