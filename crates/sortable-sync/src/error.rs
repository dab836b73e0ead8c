use crate::collection::CollectionId;
use crate::document::NodeId;

/// Failure of a structural operation on the [`Document`](crate::document::Document).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentError {
    /// The handle refers to a destroyed node.
    DeadNode(NodeId),
    /// The operation needs an element, the node is text or a comment.
    NotAnElement(NodeId),
    /// Inserting `node` under `parent` would make it its own ancestor.
    WouldCycle { node: NodeId, parent: NodeId },
    /// The body element cannot be detached or removed.
    RootNode,
}

impl std::fmt::Display for DocumentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DocumentError::DeadNode(node) => write!(f, "node {node} no longer exists"),
            DocumentError::NotAnElement(node) => write!(f, "node {node} is not an element"),
            DocumentError::WouldCycle { node, parent } => {
                write!(f, "cannot insert {node} under its own descendant {parent}")
            }
            DocumentError::RootNode => write!(f, "the body element cannot be moved or removed"),
        }
    }
}

impl std::error::Error for DocumentError {}

/// Index mutation outside the current bounds of an
/// [`ObservableList`](crate::collection::ObservableList).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListError {
    IndexOutOfBounds { index: usize, len: usize },
}

impl std::fmt::Display for ListError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ListError::IndexOutOfBounds { index, len } => {
                write!(f, "index {index} out of bounds for list of length {len}")
            }
        }
    }
}

impl std::error::Error for ListError {}

/// Why a region could not be bound.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindError {
    DeadElement(NodeId),
    NotAnElement(NodeId),
    AlreadyBound(NodeId),
    UnknownTemplate(String),
    Document(DocumentError),
}

impl std::fmt::Display for BindError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BindError::DeadElement(node) => write!(f, "cannot bind destroyed node {node}"),
            BindError::NotAnElement(node) => write!(f, "cannot bind non-element node {node}"),
            BindError::AlreadyBound(node) => write!(f, "element {node} is already bound"),
            BindError::UnknownTemplate(name) => write!(f, "no template named '{name}'"),
            BindError::Document(error) => write!(f, "document error during bind: {error}"),
        }
    }
}

impl std::error::Error for BindError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BindError::Document(error) => Some(error),
            _ => None,
        }
    }
}

impl From<DocumentError> for BindError {
    fn from(error: DocumentError) -> Self {
        BindError::Document(error)
    }
}

/// A drop that could not be applied to the collections.
///
/// The move is aborted as a whole; neither collection is touched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileError {
    IndexOutOfBounds {
        collection: CollectionId,
        index: usize,
        len: usize,
    },
    /// The item expected at `index` is no longer there.
    ItemMismatch {
        collection: CollectionId,
        index: usize,
    },
    Document(DocumentError),
}

impl std::fmt::Display for ReconcileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReconcileError::IndexOutOfBounds {
                collection,
                index,
                len,
            } => write!(
                f,
                "index {index} out of bounds for collection {collection} of length {len}"
            ),
            ReconcileError::ItemMismatch { collection, index } => {
                write!(f, "item at {collection}[{index}] changed before the move")
            }
            ReconcileError::Document(error) => write!(f, "document error during move: {error}"),
        }
    }
}

impl std::error::Error for ReconcileError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ReconcileError::Document(error) => Some(error),
            _ => None,
        }
    }
}

impl From<DocumentError> for ReconcileError {
    fn from(error: DocumentError) -> Self {
        ReconcileError::Document(error)
    }
}

/// Raised by a fallible drop-permission predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyError {
    pub message: String,
}

impl PolicyError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl std::fmt::Display for PolicyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "policy evaluation failed: {}", self.message)
    }
}

impl std::error::Error for PolicyError {}
