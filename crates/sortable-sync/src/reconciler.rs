//! Turns a drop completion into collection mutations.
//!
//! Everything the move needs (item, collections, both indices) is captured
//! from the document and the association store before the before-move hook
//! runs. After that the document is not read again: the collections are
//! mutated and the renderers bring the document back in line.

use std::cell::RefCell;
use std::rc::Rc;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::association::AssociationStore;
use crate::collection::ObservableList;
use crate::document::{Document, NodeId};
use crate::error::{ListError, ReconcileError};
use crate::hooks::MoveDescriptor;
use crate::journal::{MoveJournal, MoveOutcome};
use crate::reactive::batch;
use crate::region::RegionController;
use crate::widget::{DropCompletion, SortableWidget};

/// Non-error result of handling a drop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropOutcome {
    Moved,
    /// Dropped at its own position; nothing to do.
    Unchanged,
    /// The before-move hook refused; the node was put back.
    Vetoed,
    /// The node or target no longer maps to data; the node was put back.
    Stale,
}

pub struct Reconciler<'a, T> {
    pub doc: &'a Rc<RefCell<Document>>,
    pub widget: &'a RefCell<dyn SortableWidget>,
    pub associations: &'a Rc<RefCell<AssociationStore<T>>>,
    pub regions: &'a FxHashMap<NodeId, RegionController<T>>,
    pub journal: &'a RefCell<MoveJournal<T>>,
}

impl<T: Clone + PartialEq + 'static> Reconciler<'_, T> {
    pub fn reconcile(&self, completion: &DropCompletion) -> Result<DropOutcome, ReconcileError> {
        let Some(descriptor) = self.capture(completion) else {
            log::debug!("drop of {} does not map to data, reverting", completion.node);
            self.revert(completion);
            return Ok(DropOutcome::Stale);
        };
        let hooks = match self.regions.get(&completion.target) {
            Some(region) => region.hooks().clone(),
            None => {
                self.revert(completion);
                return Ok(DropOutcome::Stale);
            }
        };

        if !hooks.before_move(&descriptor) {
            log::debug!("move of {} vetoed", completion.node);
            self.revert(completion);
            self.journal.borrow_mut().record(&descriptor, MoveOutcome::Vetoed);
            return Ok(DropOutcome::Vetoed);
        }

        if descriptor.is_reorder() && descriptor.source_index == descriptor.target_index {
            self.journal.borrow_mut().record(&descriptor, MoveOutcome::Unchanged);
            return Ok(DropOutcome::Unchanged);
        }

        if let Err(error) = self.apply(&descriptor, completion.node) {
            log::warn!("move of {} aborted: {error}", completion.node);
            self.revert(completion);
            self.journal.borrow_mut().record(&descriptor, MoveOutcome::Failed);
            return Err(error);
        }

        log::debug!(
            "moved item from {}[{}] to {}[{}]",
            descriptor.source.id(),
            descriptor.source_index,
            descriptor.target.id(),
            descriptor.target_index
        );
        self.journal.borrow_mut().record(&descriptor, MoveOutcome::Moved);
        hooks.after_move(&descriptor);
        Ok(DropOutcome::Moved)
    }

    /// Resolve the moved node and both indices, or `None` if anything no
    /// longer maps to data. Indices count items, not nodes: every node of a
    /// multi-node item maps to the same rendered group.
    fn capture(&self, completion: &DropCompletion) -> Option<MoveDescriptor<T>> {
        let target_region = self.regions.get(&completion.target)?;
        let target = target_region.data().clone();
        let target_groups = target_region.group_positions();
        let doc = self.doc.borrow();
        let associations = self.associations.borrow();
        if !doc.is_alive(completion.node) {
            return None;
        }
        let association = associations.lookup(completion.node)?;
        let item = association.item.clone();
        let source = association.collection.clone();
        let moved_group = self
            .regions
            .get(&completion.source)
            .filter(|region| region.data().ptr_eq(&source))
            .and_then(|region| region.group_positions().get(&completion.node).copied());

        // Items of the target rendered before the moved node. Siblings of
        // the moved node in its own group do not count.
        let own_group = moved_group.filter(|_| source.ptr_eq(&target));
        let mut before = FxHashSet::default();
        let mut target_index = None;
        for node in doc.children(completion.target) {
            if *node == completion.node {
                target_index = Some(before.len());
                break;
            }
            if let Some(group) = target_groups.get(node) {
                if Some(*group) != own_group {
                    before.insert(*group);
                }
            }
        }
        let target_index = target_index?;

        let origin_index = moved_group.unwrap_or_else(|| {
            completion
                .source_order
                .iter()
                .take(completion.origin_position)
                .filter(|node| {
                    associations
                        .lookup(**node)
                        .is_some_and(|a| a.collection.ptr_eq(&source))
                })
                .count()
        });
        let source_index = if source.get_untracked(origin_index).as_ref() == Some(&item) {
            origin_index
        } else {
            source.position(&item)?
        };

        Some(MoveDescriptor {
            item,
            source,
            source_index,
            target,
            target_index,
        })
    }

    /// Check the captured indices against the collections as they are now
    /// (a hook may have changed them), then mutate.
    fn apply(&self, descriptor: &MoveDescriptor<T>, node: NodeId) -> Result<(), ReconcileError> {
        let MoveDescriptor {
            item,
            source,
            source_index,
            target,
            target_index,
        } = descriptor;

        let source_len = source.len_untracked();
        if *source_index >= source_len {
            return Err(ReconcileError::IndexOutOfBounds {
                collection: source.id(),
                index: *source_index,
                len: source_len,
            });
        }
        if source.get_untracked(*source_index).as_ref() != Some(item) {
            return Err(ReconcileError::ItemMismatch {
                collection: source.id(),
                index: *source_index,
            });
        }

        if descriptor.is_reorder() {
            return source
                .move_item(*source_index, *target_index)
                .map_err(|error| out_of_bounds(target, error));
        }

        let target_len = target.len_untracked();
        if *target_index > target_len {
            return Err(ReconcileError::IndexOutOfBounds {
                collection: target.id(),
                index: *target_index,
                len: target_len,
            });
        }

        // The target renders its own node for the item.
        let destroyed = self.doc.borrow_mut().remove(node)?;
        self.associations.borrow_mut().release_all(destroyed);

        batch(|| -> Result<(), ListError> {
            let value = source.remove(*source_index)?;
            target.insert(*target_index, value)
        })
        .map_err(|error| out_of_bounds(target, error))
    }

    /// Let the widget put the node back, then restore the source region's
    /// item order, which a hook may have changed since the drag started.
    fn revert(&self, completion: &DropCompletion) {
        {
            let mut doc = self.doc.borrow_mut();
            self.widget.borrow_mut().revert(&mut doc, completion);
        }
        if let Some(region) = self.regions.get(&completion.source) {
            region.resync();
        }
    }
}

fn out_of_bounds<T: Clone + PartialEq + 'static>(
    collection: &ObservableList<T>,
    error: ListError,
) -> ReconcileError {
    match error {
        ListError::IndexOutOfBounds { index, len } => ReconcileError::IndexOutOfBounds {
            collection: collection.id(),
            index,
            len,
        },
    }
}
