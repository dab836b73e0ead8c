//! Lifecycle hooks fired around moves and renders.

use std::rc::Rc;

use crate::collection::ObservableList;
use crate::document::NodeId;

/// A move about to happen, or one that just happened.
///
/// Both hooks of one drop receive the same descriptor.
pub struct MoveDescriptor<T> {
    pub item: T,
    pub source: ObservableList<T>,
    pub source_index: usize,
    pub target: ObservableList<T>,
    pub target_index: usize,
}

impl<T: Clone + PartialEq + 'static> MoveDescriptor<T> {
    /// Reorder within one collection, as opposed to a cross-collection move.
    pub fn is_reorder(&self) -> bool {
        self.source.ptr_eq(&self.target)
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for MoveDescriptor<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MoveDescriptor")
            .field("item", &self.item)
            .field("source_index", &self.source_index)
            .field("target_index", &self.target_index)
            .finish_non_exhaustive()
    }
}

/// Returns `false` to veto the move.
pub type BeforeMove<T> = Rc<dyn Fn(&MoveDescriptor<T>) -> bool>;
pub type AfterMove<T> = Rc<dyn Fn(&MoveDescriptor<T>)>;
/// Called with the nodes rendered for one item.
pub type AfterRender<T> = Rc<dyn Fn(&[NodeId], &T)>;

/// Hooks resolved for one region: region setting first, shared default second.
pub struct HookDispatcher<T> {
    before_move: Option<BeforeMove<T>>,
    after_move: Option<AfterMove<T>>,
}

impl<T> Clone for HookDispatcher<T> {
    fn clone(&self) -> Self {
        Self {
            before_move: self.before_move.clone(),
            after_move: self.after_move.clone(),
        }
    }
}

impl<T> HookDispatcher<T> {
    pub fn resolve(
        region_before: Option<&BeforeMove<T>>,
        default_before: Option<&BeforeMove<T>>,
        region_after: Option<&AfterMove<T>>,
        default_after: Option<&AfterMove<T>>,
    ) -> Self {
        Self {
            before_move: region_before.or(default_before).cloned(),
            after_move: region_after.or(default_after).cloned(),
        }
    }

    /// Without a hook the move is allowed.
    pub fn before_move(&self, descriptor: &MoveDescriptor<T>) -> bool {
        match &self.before_move {
            Some(hook) => hook(descriptor),
            None => true,
        }
    }

    pub fn after_move(&self, descriptor: &MoveDescriptor<T>) {
        if let Some(hook) = &self.after_move {
            hook(descriptor);
        }
    }
}

impl<T> Default for HookDispatcher<T> {
    fn default() -> Self {
        Self {
            before_move: None,
            after_move: None,
        }
    }
}
