//! Per-item rendering of a collection into a container element.
//!
//! A [`ListRenderer`] keeps one group of nodes per collection item, in
//! collection order, and applies [`ListDelta`]s incrementally. Every element
//! node it renders is associated with its item and collection; nodes it
//! destroys are released again.

use std::cell::RefCell;
use std::rc::Rc;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::association::AssociationStore;
use crate::collection::{ListDelta, ObservableList};
use crate::document::{Document, NodeId, NodeKind};
use crate::error::DocumentError;
use crate::hooks::AfterRender;
use crate::reactive::Subscription;

/// Text content replaced by the item label in anonymous templates.
pub const DATA_PLACEHOLDER: &str = "$data";

/// Builds the detached nodes for one item.
pub type NamedTemplate<T> = Rc<dyn Fn(&mut Document, &T) -> Vec<NodeId>>;
pub type ItemLabel<T> = Rc<dyn Fn(&T) -> String>;

pub struct TemplateRegistry<T> {
    templates: FxHashMap<String, NamedTemplate<T>>,
    label: Option<ItemLabel<T>>,
}

impl<T> TemplateRegistry<T> {
    pub fn new() -> Self {
        Self {
            templates: FxHashMap::default(),
            label: None,
        }
    }

    pub fn register(
        &mut self,
        name: impl Into<String>,
        template: impl Fn(&mut Document, &T) -> Vec<NodeId> + 'static,
    ) {
        self.templates.insert(name.into(), Rc::new(template));
    }

    pub fn get(&self, name: &str) -> Option<NamedTemplate<T>> {
        self.templates.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.templates.contains_key(name)
    }

    /// Text used for [`DATA_PLACEHOLDER`] in anonymous templates.
    pub fn set_label(&mut self, label: impl Fn(&T) -> String + 'static) {
        self.label = Some(Rc::new(label));
    }

    pub fn label(&self) -> Option<ItemLabel<T>> {
        self.label.clone()
    }
}

impl<T> Default for TemplateRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

pub enum ItemTemplate<T> {
    /// Detached prototype nodes, deep-copied for every item.
    Anonymous(Vec<NodeId>),
    Named(NamedTemplate<T>),
}

/// Where and how a collection is rendered.
pub struct RenderTarget<T> {
    pub container: NodeId,
    pub list: ObservableList<T>,
    pub template: ItemTemplate<T>,
    pub label: Option<ItemLabel<T>>,
    pub after_render: Option<AfterRender<T>>,
}

type Rendered<T> = Vec<(Vec<NodeId>, T)>;

struct RenderState<T> {
    doc: Rc<RefCell<Document>>,
    associations: Rc<RefCell<AssociationStore<T>>>,
    target: RenderTarget<T>,
    groups: Vec<Vec<NodeId>>,
}

impl<T: Clone + PartialEq + 'static> RenderState<T> {
    fn apply(&mut self, delta: &ListDelta<T>) -> Result<Rendered<T>, DocumentError> {
        let doc_cell = self.doc.clone();
        let associations_cell = self.associations.clone();
        let mut doc = doc_cell.borrow_mut();
        let mut associations = associations_cell.borrow_mut();
        let doc = &mut *doc;
        let associations = &mut *associations;
        let mut rendered = Vec::new();

        match delta {
            ListDelta::Insert { index, value } => {
                self.insert_group(doc, associations, *index, value, &mut rendered)?;
            }
            ListDelta::Remove { index, .. } => {
                if *index < self.groups.len() {
                    let group = self.groups.remove(*index);
                    destroy_group(doc, associations, group);
                } else {
                    log::warn!("remove delta at {index} beyond {} rendered groups", self.groups.len());
                }
            }
            ListDelta::Move { from, to, value } => {
                if *from >= self.groups.len() {
                    log::warn!("move delta from {from} beyond {} rendered groups", self.groups.len());
                    return Ok(rendered);
                }
                let group = self.groups.remove(*from);
                if group.iter().all(|node| doc.is_alive(*node)) {
                    for node in &group {
                        doc.detach(*node)?;
                    }
                    let reference = self.anchor(doc, *to);
                    for node in &group {
                        doc.insert_before(self.target.container, *node, reference)?;
                    }
                    let at = (*to).min(self.groups.len());
                    self.groups.insert(at, group);
                } else {
                    destroy_group(doc, associations, group);
                    self.insert_group(doc, associations, *to, value, &mut rendered)?;
                }
            }
            ListDelta::Replace { values } => {
                for group in std::mem::take(&mut self.groups) {
                    destroy_group(doc, associations, group);
                }
                for (index, value) in values.iter().enumerate() {
                    self.insert_group(doc, associations, index, value, &mut rendered)?;
                }
            }
        }
        if !rendered.is_empty() {
            log::debug!("rendered {} item(s) into {}", rendered.len(), self.target.container);
        }
        Ok(rendered)
    }

    fn insert_group(
        &mut self,
        doc: &mut Document,
        associations: &mut AssociationStore<T>,
        index: usize,
        item: &T,
        rendered: &mut Rendered<T>,
    ) -> Result<(), DocumentError> {
        let nodes = self.render_item(doc, item)?;
        let index = index.min(self.groups.len());
        let reference = self.anchor(doc, index);
        for node in &nodes {
            doc.insert_before(self.target.container, *node, reference)?;
        }
        for node in &nodes {
            if doc.is_element(*node) {
                associations.associate(*node, item.clone(), self.target.list.clone());
            }
        }
        self.groups.insert(index, nodes.clone());
        rendered.push((nodes, item.clone()));
        Ok(())
    }

    fn render_item(&self, doc: &mut Document, item: &T) -> Result<Vec<NodeId>, DocumentError> {
        match &self.target.template {
            ItemTemplate::Anonymous(prototypes) => {
                let text = self.target.label.as_ref().map(|label| label(item));
                let mut nodes = Vec::with_capacity(prototypes.len());
                for prototype in prototypes {
                    let copy = doc.clone_subtree(*prototype)?;
                    if let Some(text) = &text {
                        fill_placeholders(doc, copy, text)?;
                    }
                    nodes.push(copy);
                }
                Ok(nodes)
            }
            ItemTemplate::Named(template) => Ok(template(doc, item)),
        }
    }

    /// Node to insert before so a group lands at slot `at`: the first live
    /// node of a later group, else the sibling after the last live node of
    /// an earlier group, else the end of the container.
    fn anchor(&self, doc: &Document, at: usize) -> Option<NodeId> {
        let container = self.target.container;
        let in_container = |node: &&NodeId| doc.parent(**node) == Some(container);
        if let Some(next) = self.groups.iter().skip(at).flatten().find(in_container) {
            return Some(*next);
        }
        let last = self.groups.iter().take(at).flatten().rev().find(in_container)?;
        let siblings = doc.children(container);
        let position = siblings.iter().position(|node| node == last)?;
        siblings.get(position + 1).copied()
    }

    /// Put every live group node back into the container in collection
    /// order. Nodes that are not part of any group keep their place
    /// relative to the tail of the rendered items.
    fn resync(&self) -> Result<(), DocumentError> {
        let container = self.target.container;
        let mut doc = self.doc.borrow_mut();
        let rendered: FxHashSet<NodeId> = self.groups.iter().flatten().copied().collect();
        let children = doc.children(container).to_vec();
        let mut reference = children
            .iter()
            .rposition(|node| rendered.contains(node))
            .and_then(|last| children.get(last + 1).copied());
        for node in self.groups.iter().rev().flat_map(|group| group.iter().rev()) {
            if doc.is_alive(*node) {
                doc.insert_before(container, *node, reference)?;
                reference = Some(*node);
            }
        }
        Ok(())
    }

    fn teardown(&mut self) {
        let mut doc = self.doc.borrow_mut();
        let mut associations = self.associations.borrow_mut();
        for node in self.groups.drain(..).flatten() {
            associations.release(node);
        }
        if let ItemTemplate::Anonymous(prototypes) = &self.target.template {
            for prototype in prototypes {
                if let Err(error) = doc.remove(*prototype) {
                    log::warn!("cannot destroy template prototype {prototype}: {error}");
                }
            }
        }
    }
}

fn destroy_group<T: Clone + PartialEq + 'static>(
    doc: &mut Document,
    associations: &mut AssociationStore<T>,
    group: Vec<NodeId>,
) {
    for node in group {
        associations.release(node);
        if let Ok(destroyed) = doc.remove(node) {
            associations.release_all(destroyed);
        }
    }
}

fn fill_placeholders(doc: &mut Document, root: NodeId, text: &str) -> Result<(), DocumentError> {
    let mut nodes = vec![root];
    nodes.extend(doc.descendants(root));
    for node in nodes {
        let filled = match doc.kind(node) {
            Some(NodeKind::Text(content)) if content.contains(DATA_PLACEHOLDER) => {
                Some(content.replace(DATA_PLACEHOLDER, text))
            }
            _ => None,
        };
        if let Some(filled) = filled {
            doc.set_text(node, &filled)?;
        }
    }
    Ok(())
}

/// Renders a collection into a container and keeps it in sync.
pub struct ListRenderer<T> {
    state: Rc<RefCell<RenderState<T>>>,
    _deltas: Subscription,
}

impl<T: Clone + PartialEq + 'static> ListRenderer<T> {
    /// Render the current contents of `target.list` and follow its deltas.
    pub fn attach(
        doc: Rc<RefCell<Document>>,
        associations: Rc<RefCell<AssociationStore<T>>>,
        target: RenderTarget<T>,
    ) -> Result<Self, DocumentError> {
        let values = target.list.snapshot();
        let list = target.list.clone();
        let state = Rc::new(RefCell::new(RenderState {
            doc,
            associations,
            target,
            groups: Vec::new(),
        }));

        let rendered = state.borrow_mut().apply(&ListDelta::Replace { values })?;
        run_after_render(&state, rendered);

        let weak = Rc::downgrade(&state);
        let deltas = list.subscribe_deltas(move |delta| {
            let Some(state) = weak.upgrade() else {
                return;
            };
            let result = state.borrow_mut().apply(delta);
            match result {
                Ok(rendered) => run_after_render(&state, rendered),
                Err(error) => log::warn!("failed to render list delta: {error}"),
            }
        });

        Ok(Self {
            state,
            _deltas: deltas,
        })
    }

    pub fn container(&self) -> NodeId {
        self.state.borrow().target.container
    }

    /// Rendered node groups, one per item, in collection order.
    pub fn groups(&self) -> Vec<Vec<NodeId>> {
        self.state.borrow().groups.clone()
    }

    /// Group index of every rendered node.
    pub fn group_positions(&self) -> FxHashMap<NodeId, usize> {
        self.state
            .borrow()
            .groups
            .iter()
            .enumerate()
            .flat_map(|(index, group)| group.iter().map(move |node| (*node, index)))
            .collect()
    }

    /// Restore the document order of the rendered nodes after something
    /// other than this renderer moved them.
    pub fn resync(&self) -> Result<(), DocumentError> {
        self.state.borrow().resync()
    }

    /// Stop following the collection, release the rendered nodes'
    /// associations and destroy template prototypes. Rendered nodes stay in
    /// the document.
    pub fn teardown(self) {
        let ListRenderer {
            state,
            _deltas: deltas,
        } = self;
        drop(deltas);
        state.borrow_mut().teardown();
    }
}

fn run_after_render<T: Clone + PartialEq + 'static>(
    state: &Rc<RefCell<RenderState<T>>>,
    rendered: Rendered<T>,
) {
    let hook = state.borrow().target.after_render.clone();
    if let Some(hook) = hook {
        for (nodes, item) in &rendered {
            hook(nodes, item);
        }
    }
}
