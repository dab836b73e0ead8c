//! Keeps observable collections in sync with drag-and-drop sortable regions
//! of a rendered document.
//!
//! Bind a region element to an [`ObservableList`] with
//! [`SortableEngine::bind`]; the list is rendered into the element, and every
//! drag gesture that ends over a valid target is turned into the matching
//! reorder or cross-list move on the collections.

pub mod association;
pub mod collection;
pub mod config;
pub mod document;
pub mod engine;
pub mod error;
pub mod hooks;
pub mod journal;
pub mod policy;
pub mod reactive;
pub mod reconciler;
pub mod region;
pub mod scenario;
pub mod template;
pub mod widget;

pub use collection::{CollectionId, ListDelta, ObservableList};
pub use config::{DEFAULT_CONNECT_CLASS, RegionConfig, SortableDefaults, WidgetOptions};
pub use document::{Document, NodeId};
pub use engine::{DragOutcome, SortableEngine};
pub use error::{BindError, DocumentError, ListError, PolicyError, ReconcileError};
pub use hooks::MoveDescriptor;
pub use policy::Policy;
pub use reconciler::DropOutcome;
pub use region::{PolicyFailure, PolicySetting};
pub use widget::{DropCompletion, SimulatedSortable, SortableWidget};
