//! Drag-and-drop widget interface and a deterministic implementation.
//!
//! The engine only talks to the widget through [`SortableWidget`]. The
//! [`SimulatedSortable`] performs gestures directly on the [`Document`]:
//! a drag lifts the node, drops it into the target and reports a
//! [`DropCompletion`], exactly as a pointer-driven widget would on release.

use rustc_hash::FxHashMap;

use crate::config::WidgetOptions;
use crate::document::{Document, NodeId};

/// Settings passed to [`SortableWidget::init`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WidgetSettings {
    /// Class a region must carry to accept drops from this one.
    pub connect_with: Option<String>,
    pub options: WidgetOptions,
}

/// Emitted when a dragged node is released over a valid target.
///
/// The node is already at its new DOM position.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DropCompletion {
    pub node: NodeId,
    /// Region element the node was dragged out of.
    pub source: NodeId,
    /// Region element the node was released into.
    pub target: NodeId,
    /// Child position of the node in `source` before the drag.
    pub origin_position: usize,
    /// Children of `source` before the drag, in order.
    pub source_order: Vec<NodeId>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DragResult {
    Dropped(DropCompletion),
    /// Released outside any valid target; nothing moved.
    Reverted,
    /// The gesture never started (unknown node, no widget, disabled).
    Ignored,
}

pub trait SortableWidget {
    fn init(&mut self, element: NodeId, settings: WidgetSettings);
    fn destroy(&mut self, element: NodeId);
    fn is_initialized(&self, element: NodeId) -> bool;
    fn option(&self, element: NodeId, key: &str) -> Option<serde_json::Value>;
    fn set_option(&mut self, element: NodeId, key: &str, value: serde_json::Value);
    /// Register or unregister `element` as a drop target.
    fn set_accepts_drops(&mut self, element: NodeId, accepts: bool);
    fn accepts_drops(&self, element: NodeId) -> bool;
    /// Drag `node` into `target` so that it lands before the element child
    /// currently at `index` (or last).
    fn drag(&mut self, doc: &mut Document, node: NodeId, target: NodeId, index: usize) -> DragResult;
    /// Put the node of `completion` back where it was picked up.
    fn revert(&mut self, doc: &mut Document, completion: &DropCompletion);
}

#[derive(Debug)]
struct Instance {
    connect_with: Option<String>,
    options: WidgetOptions,
    accepts_drops: bool,
}

impl Instance {
    fn disabled(&self) -> bool {
        self.options
            .get("disabled")
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(false)
    }
}

#[derive(Debug, Default)]
pub struct SimulatedSortable {
    instances: FxHashMap<NodeId, Instance>,
    reverts: usize,
}

impl SimulatedSortable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }

    /// Number of visual reverts performed.
    pub fn reverts(&self) -> usize {
        self.reverts
    }

    fn accepts_from(&self, doc: &Document, source: NodeId, target: NodeId) -> bool {
        if source == target {
            return true;
        }
        let (Some(from), Some(to)) = (self.instances.get(&source), self.instances.get(&target))
        else {
            return false;
        };
        let Some(class) = &from.connect_with else {
            return false;
        };
        to.accepts_drops && !to.disabled() && doc.has_class(target, class)
    }
}

impl SortableWidget for SimulatedSortable {
    fn init(&mut self, element: NodeId, settings: WidgetSettings) {
        log::debug!("sortable init on {element} connect_with={:?}", settings.connect_with);
        self.instances.insert(
            element,
            Instance {
                connect_with: settings.connect_with,
                options: settings.options,
                accepts_drops: false,
            },
        );
    }

    fn destroy(&mut self, element: NodeId) {
        if self.instances.remove(&element).is_some() {
            log::debug!("sortable destroyed on {element}");
        }
    }

    fn is_initialized(&self, element: NodeId) -> bool {
        self.instances.contains_key(&element)
    }

    fn option(&self, element: NodeId, key: &str) -> Option<serde_json::Value> {
        self.instances.get(&element)?.options.get(key).cloned()
    }

    fn set_option(&mut self, element: NodeId, key: &str, value: serde_json::Value) {
        if let Some(instance) = self.instances.get_mut(&element) {
            instance.options.insert(key.to_string(), value);
        }
    }

    fn set_accepts_drops(&mut self, element: NodeId, accepts: bool) {
        if let Some(instance) = self.instances.get_mut(&element) {
            instance.accepts_drops = accepts;
        }
    }

    fn accepts_drops(&self, element: NodeId) -> bool {
        self.instances
            .get(&element)
            .is_some_and(|instance| instance.accepts_drops)
    }

    fn drag(&mut self, doc: &mut Document, node: NodeId, target: NodeId, index: usize) -> DragResult {
        if !doc.is_element(node) {
            return DragResult::Ignored;
        }
        let Some(source) = doc.parent(node) else {
            return DragResult::Ignored;
        };
        match self.instances.get(&source) {
            Some(instance) if !instance.disabled() => {}
            _ => return DragResult::Ignored,
        }
        if !self.accepts_from(doc, source, target) {
            log::debug!("drag of {node} released outside a valid target");
            return DragResult::Reverted;
        }

        let source_order = doc.children(source).to_vec();
        let Some(origin_position) = doc.child_position(node) else {
            return DragResult::Ignored;
        };
        if doc.detach(node).is_err() {
            return DragResult::Ignored;
        }
        let reference = doc.element_children(target).get(index).copied();
        if doc.insert_before(target, node, reference).is_err() {
            // Target vanished mid-gesture: put the node back.
            if let Err(error) = doc.insert_child(source, origin_position, node) {
                log::warn!("put-back of {node} failed: {error}");
            }
            return DragResult::Reverted;
        }
        DragResult::Dropped(DropCompletion {
            node,
            source,
            target,
            origin_position,
            source_order,
        })
    }

    fn revert(&mut self, doc: &mut Document, completion: &DropCompletion) {
        self.reverts += 1;
        if !doc.is_alive(completion.node) || !doc.is_alive(completion.source) {
            return;
        }
        if let Err(error) = doc.insert_child(completion.source, completion.origin_position, completion.node)
        {
            log::warn!("revert of {} failed: {error}", completion.node);
        }
    }
}
