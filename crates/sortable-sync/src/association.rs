//! Side table from rendered nodes to the data they represent.
//!
//! The store never owns nodes. Entries are keyed by generational [`NodeId`],
//! so an entry for a destroyed node can never be mistaken for a live one; it
//! is only dead weight until released or pruned.

use rustc_hash::FxHashMap;

use crate::collection::{CollectionId, ObservableList};
use crate::document::NodeId;

/// What a node stands for: the item and the collection that owns it.
pub struct Association<T> {
    pub item: T,
    pub collection: ObservableList<T>,
}

impl<T: Clone> Clone for Association<T> {
    fn clone(&self) -> Self {
        Self {
            item: self.item.clone(),
            collection: self.collection.clone(),
        }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Association<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Association")
            .field("item", &self.item)
            .field("collection", &self.collection)
            .finish()
    }
}

pub struct AssociationStore<T> {
    entries: FxHashMap<NodeId, Association<T>>,
}

impl<T: Clone + PartialEq + 'static> AssociationStore<T> {
    pub fn new() -> Self {
        Self {
            entries: FxHashMap::default(),
        }
    }

    /// Record or overwrite the entry for `node`.
    pub fn associate(&mut self, node: NodeId, item: T, collection: ObservableList<T>) {
        self.entries.insert(node, Association { item, collection });
    }

    pub fn lookup(&self, node: NodeId) -> Option<&Association<T>> {
        self.entries.get(&node)
    }

    pub fn release(&mut self, node: NodeId) -> Option<Association<T>> {
        self.entries.remove(&node)
    }

    pub fn release_all(&mut self, nodes: impl IntoIterator<Item = NodeId>) -> usize {
        nodes
            .into_iter()
            .filter(|node| self.entries.remove(node).is_some())
            .count()
    }

    /// Evict every entry whose node fails `alive`. Returns the number evicted.
    pub fn prune(&mut self, alive: impl Fn(NodeId) -> bool) -> usize {
        let before = self.entries.len();
        self.entries.retain(|node, _| alive(*node));
        before - self.entries.len()
    }

    /// Nodes currently associated with `collection`, in no particular order.
    pub fn nodes_for(&self, collection: CollectionId) -> Vec<NodeId> {
        self.entries
            .iter()
            .filter(|(_, association)| association.collection.id() == collection)
            .map(|(node, _)| *node)
            .collect()
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.entries.contains_key(&node)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T: Clone + PartialEq + 'static> Default for AssociationStore<T> {
    fn default() -> Self {
        Self::new()
    }
}
