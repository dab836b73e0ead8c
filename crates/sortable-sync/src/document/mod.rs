//! In-memory document tree.
//!
//! Nodes live in a generational [`Arena`]; handles to destroyed nodes stay
//! detectably dead. Elements carry a tag and an ordered class set. The tree
//! always has a `body` element that cannot be detached.

mod arena;

pub use arena::{Arena, NodeId};

use indexmap::IndexSet;

use crate::error::DocumentError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Element {
        tag: String,
        classes: IndexSet<String>,
    },
    Text(String),
    Comment(String),
}

#[derive(Debug, Clone)]
struct Node {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl Node {
    fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            parent: None,
            children: Vec::new(),
        }
    }
}

pub struct Document {
    nodes: Arena<Node>,
    body: NodeId,
}

impl Document {
    pub fn new() -> Self {
        let mut nodes = Arena::new();
        let body = nodes.alloc(Node::new(NodeKind::Element {
            tag: "body".to_string(),
            classes: IndexSet::new(),
        }));
        Self { nodes, body }
    }

    pub fn body(&self) -> NodeId {
        self.body
    }

    // --- creation ---

    /// Create a detached element.
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.nodes.alloc(Node::new(NodeKind::Element {
            tag: tag.to_string(),
            classes: IndexSet::new(),
        }))
    }

    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.nodes.alloc(Node::new(NodeKind::Text(text.to_string())))
    }

    pub fn create_comment(&mut self, text: &str) -> NodeId {
        self.nodes.alloc(Node::new(NodeKind::Comment(text.to_string())))
    }

    /// Deep copy of `node` and its descendants, detached.
    pub fn clone_subtree(&mut self, node: NodeId) -> Result<NodeId, DocumentError> {
        let kind = self.live(node)?.kind.clone();
        let children = self.live(node)?.children.clone();
        let copy = self.nodes.alloc(Node::new(kind));
        for child in children {
            let child_copy = self.clone_subtree(child)?;
            self.append_child(copy, child_copy)?;
        }
        Ok(copy)
    }

    // --- queries ---

    pub fn is_alive(&self, node: NodeId) -> bool {
        self.nodes.is_valid(node)
    }

    pub fn kind(&self, node: NodeId) -> Option<&NodeKind> {
        self.nodes.get(node).map(|n| &n.kind)
    }

    pub fn is_element(&self, node: NodeId) -> bool {
        matches!(self.kind(node), Some(NodeKind::Element { .. }))
    }

    pub fn tag(&self, node: NodeId) -> Option<&str> {
        match self.kind(node)? {
            NodeKind::Element { tag, .. } => Some(tag),
            _ => None,
        }
    }

    /// Text of a text or comment node.
    pub fn text(&self, node: NodeId) -> Option<&str> {
        match self.kind(node)? {
            NodeKind::Text(text) | NodeKind::Comment(text) => Some(text),
            NodeKind::Element { .. } => None,
        }
    }

    /// Concatenated text of all text nodes under `node`, comments excluded.
    pub fn text_content(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(node, &mut out);
        out
    }

    fn collect_text(&self, node: NodeId, out: &mut String) {
        let Some(n) = self.nodes.get(node) else {
            return;
        };
        match &n.kind {
            NodeKind::Text(text) => out.push_str(text),
            NodeKind::Comment(_) => {}
            NodeKind::Element { .. } => {
                for child in &n.children {
                    self.collect_text(*child, out);
                }
            }
        }
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(node).and_then(|n| n.parent)
    }

    /// Children in order. Empty for dead nodes.
    pub fn children(&self, node: NodeId) -> &[NodeId] {
        self.nodes
            .get(node)
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn element_children(&self, node: NodeId) -> Vec<NodeId> {
        self.children(node)
            .iter()
            .copied()
            .filter(|child| self.is_element(*child))
            .collect()
    }

    /// Position of `node` among its parent's children.
    pub fn child_position(&self, node: NodeId) -> Option<usize> {
        let parent = self.parent(node)?;
        self.children(parent).iter().position(|child| *child == node)
    }

    /// All nodes below `node` in document order, `node` excluded.
    pub fn descendants(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(node).iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children(next).iter().rev().copied());
        }
        out
    }

    /// Whether `node` is `ancestor` or lies below it.
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    // --- structure ---

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DocumentError> {
        let len = self.live(parent)?.children.len();
        self.insert_child(parent, len, child)
    }

    /// Insert `child` at `index` among `parent`'s children, detaching it from
    /// its current position first. `index` is clamped to the child count.
    pub fn insert_child(
        &mut self,
        parent: NodeId,
        index: usize,
        child: NodeId,
    ) -> Result<(), DocumentError> {
        self.element(parent)?;
        self.live(child)?;
        if child == self.body {
            return Err(DocumentError::RootNode);
        }
        if self.contains(child, parent) {
            return Err(DocumentError::WouldCycle {
                node: child,
                parent,
            });
        }
        self.unlink(child);
        let siblings = &mut self.live_mut(parent)?.children;
        let index = index.min(siblings.len());
        siblings.insert(index, child);
        self.live_mut(child)?.parent = Some(parent);
        Ok(())
    }

    /// Insert `child` before `reference`, or at the end when `reference` is
    /// `None` or not a child of `parent`.
    pub fn insert_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        reference: Option<NodeId>,
    ) -> Result<(), DocumentError> {
        // Detach first so the reference position is measured without `child`.
        if self.parent(child).is_some() {
            self.detach(child)?;
        }
        let index = reference
            .filter(|reference| self.parent(*reference) == Some(parent))
            .and_then(|reference| self.child_position(reference))
            .unwrap_or_else(|| self.children(parent).len());
        self.insert_child(parent, index, child)
    }

    /// Remove `node` from its parent without destroying it.
    pub fn detach(&mut self, node: NodeId) -> Result<(), DocumentError> {
        self.live(node)?;
        if node == self.body {
            return Err(DocumentError::RootNode);
        }
        self.unlink(node);
        Ok(())
    }

    /// Destroy `node` and its whole subtree. Returns the destroyed handles.
    pub fn remove(&mut self, node: NodeId) -> Result<Vec<NodeId>, DocumentError> {
        self.detach(node)?;
        let mut destroyed = vec![node];
        destroyed.extend(self.descendants(node));
        for id in &destroyed {
            self.nodes.free(*id);
        }
        Ok(destroyed)
    }

    fn unlink(&mut self, node: NodeId) {
        let Some(parent) = self.parent(node) else {
            return;
        };
        if let Some(p) = self.nodes.get_mut(parent) {
            p.children.retain(|child| *child != node);
        }
        if let Some(n) = self.nodes.get_mut(node) {
            n.parent = None;
        }
    }

    // --- content ---

    pub fn set_text(&mut self, node: NodeId, text: &str) -> Result<(), DocumentError> {
        match &mut self.live_mut(node)?.kind {
            NodeKind::Text(current) | NodeKind::Comment(current) => {
                *current = text.to_string();
                Ok(())
            }
            NodeKind::Element { .. } => Err(DocumentError::NotAnElement(node)),
        }
    }

    pub fn has_class(&self, node: NodeId, class: &str) -> bool {
        match self.kind(node) {
            Some(NodeKind::Element { classes, .. }) => classes.contains(class),
            _ => false,
        }
    }

    /// Returns `true` if the class was not present before.
    pub fn add_class(&mut self, node: NodeId, class: &str) -> Result<bool, DocumentError> {
        Ok(self.classes_mut(node)?.insert(class.to_string()))
    }

    /// Returns `true` if the class was present.
    pub fn remove_class(&mut self, node: NodeId, class: &str) -> Result<bool, DocumentError> {
        Ok(self.classes_mut(node)?.shift_remove(class))
    }

    pub fn classes(&self, node: NodeId) -> Vec<&str> {
        match self.kind(node) {
            Some(NodeKind::Element { classes, .. }) => classes.iter().map(String::as_str).collect(),
            _ => Vec::new(),
        }
    }

    /// Compact markup for diagnostics, e.g. `<ul class="a"><li>1</li></ul>`.
    pub fn outline(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.write_outline(node, &mut out);
        out
    }

    fn write_outline(&self, node: NodeId, out: &mut String) {
        let Some(n) = self.nodes.get(node) else {
            return;
        };
        match &n.kind {
            NodeKind::Text(text) => out.push_str(text),
            NodeKind::Comment(text) => {
                out.push_str("<!--");
                out.push_str(text);
                out.push_str("-->");
            }
            NodeKind::Element { tag, classes } => {
                out.push('<');
                out.push_str(tag);
                if !classes.is_empty() {
                    let joined: Vec<&str> = classes.iter().map(String::as_str).collect();
                    out.push_str(&format!(" class=\"{}\"", joined.join(" ")));
                }
                out.push('>');
                for child in &n.children {
                    self.write_outline(*child, out);
                }
                out.push_str(&format!("</{tag}>"));
            }
        }
    }

    // --- helpers ---

    fn live(&self, node: NodeId) -> Result<&Node, DocumentError> {
        self.nodes.get(node).ok_or(DocumentError::DeadNode(node))
    }

    fn live_mut(&mut self, node: NodeId) -> Result<&mut Node, DocumentError> {
        self.nodes.get_mut(node).ok_or(DocumentError::DeadNode(node))
    }

    fn element(&self, node: NodeId) -> Result<&Node, DocumentError> {
        let n = self.live(node)?;
        match n.kind {
            NodeKind::Element { .. } => Ok(n),
            _ => Err(DocumentError::NotAnElement(node)),
        }
    }

    fn classes_mut(&mut self, node: NodeId) -> Result<&mut IndexSet<String>, DocumentError> {
        match &mut self.live_mut(node)?.kind {
            NodeKind::Element { classes, .. } => Ok(classes),
            _ => Err(DocumentError::NotAnElement(node)),
        }
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}
