//! Engine facade.
//!
//! [`SortableEngine`] owns the document, the widget, the association store
//! and every bound region. Hosts bind regions, perform gestures and read back
//! metadata through it.
//!
//! All shared state lives behind `RefCell`s. Hooks and subscribers run while
//! the engine is handling a drop, so they must not hold borrows obtained from
//! [`SortableEngine::document`] or [`SortableEngine::widget`] across a
//! collection mutation.

use std::cell::{Ref, RefCell, RefMut};
use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::association::AssociationStore;
use crate::collection::ObservableList;
use crate::config::{RegionConfig, SortableDefaults};
use crate::document::{Document, NodeId};
use crate::error::{BindError, DocumentError, ReconcileError};
use crate::journal::MoveJournal;
use crate::reconciler::{DropOutcome, Reconciler};
use crate::region::{BindContext, PolicyErrorSink, PolicyFailure, RegionController};
use crate::template::TemplateRegistry;
use crate::widget::{DragResult, DropCompletion, SimulatedSortable, SortableWidget};

type FailureHandler = Rc<dyn Fn(&ReconcileError)>;
type PolicyHandler = Rc<dyn Fn(&PolicyFailure)>;

/// Result of a drag gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragOutcome {
    /// The gesture never started.
    Ignored,
    /// Released outside any valid target.
    Reverted,
    Dropped(DropOutcome),
}

pub struct SortableEngine<T, W = SimulatedSortable> {
    doc: Rc<RefCell<Document>>,
    widget: Rc<RefCell<W>>,
    associations: Rc<RefCell<AssociationStore<T>>>,
    defaults: SortableDefaults<T>,
    templates: TemplateRegistry<T>,
    regions: FxHashMap<NodeId, RegionController<T>>,
    journal: RefCell<MoveJournal<T>>,
    failure_handlers: RefCell<Vec<FailureHandler>>,
    policy_handlers: Rc<RefCell<Vec<PolicyHandler>>>,
}

impl<T: Clone + PartialEq + 'static> SortableEngine<T, SimulatedSortable> {
    pub fn new(defaults: SortableDefaults<T>) -> Self {
        Self::with_widget(defaults, SimulatedSortable::new())
    }
}

impl<T: Clone + PartialEq + 'static> Default for SortableEngine<T, SimulatedSortable> {
    fn default() -> Self {
        Self::new(SortableDefaults::default())
    }
}

impl<T, W> SortableEngine<T, W>
where
    T: Clone + PartialEq + 'static,
    W: SortableWidget + 'static,
{
    pub fn with_widget(defaults: SortableDefaults<T>, widget: W) -> Self {
        Self {
            doc: Rc::new(RefCell::new(Document::new())),
            widget: Rc::new(RefCell::new(widget)),
            associations: Rc::new(RefCell::new(AssociationStore::new())),
            defaults,
            templates: TemplateRegistry::new(),
            regions: FxHashMap::default(),
            journal: RefCell::new(MoveJournal::new()),
            failure_handlers: RefCell::new(Vec::new()),
            policy_handlers: Rc::new(RefCell::new(Vec::new())),
        }
    }

    // --- collaborators ---

    pub fn document(&self) -> Ref<'_, Document> {
        self.doc.borrow()
    }

    pub fn document_mut(&self) -> RefMut<'_, Document> {
        self.doc.borrow_mut()
    }

    pub fn widget(&self) -> Ref<'_, W> {
        self.widget.borrow()
    }

    pub fn defaults(&self) -> &SortableDefaults<T> {
        &self.defaults
    }

    pub fn templates_mut(&mut self) -> &mut TemplateRegistry<T> {
        &mut self.templates
    }

    pub fn add_template(
        &mut self,
        name: impl Into<String>,
        template: impl Fn(&mut Document, &T) -> Vec<NodeId> + 'static,
    ) {
        self.templates.register(name, template);
    }

    /// Text that replaces `$data` in anonymous templates.
    pub fn set_label(&mut self, label: impl Fn(&T) -> String + 'static) {
        self.templates.set_label(label);
    }

    pub fn enable_journal(&self) {
        self.journal.borrow_mut().enable();
    }

    pub fn journal(&self) -> Ref<'_, MoveJournal<T>> {
        self.journal.borrow()
    }

    // --- binding ---

    pub fn bind(&mut self, element: NodeId, config: RegionConfig<T>) -> Result<(), BindError> {
        if self.regions.contains_key(&element) {
            return Err(BindError::AlreadyBound(element));
        }
        let resolved = config.resolve(&self.defaults);
        let widget: Rc<RefCell<dyn SortableWidget>> = self.widget.clone();
        let ctx = BindContext {
            doc: &self.doc,
            widget,
            associations: &self.associations,
            templates: &self.templates,
            policy_errors: self.policy_sink(),
        };
        let region = RegionController::bind(ctx, element, resolved)?;
        self.regions.insert(element, region);
        Ok(())
    }

    /// Tear down the region bound to `element`. Rendered nodes stay in the
    /// document but no longer represent data.
    pub fn unbind(&mut self, element: NodeId) -> bool {
        let Some(region) = self.regions.remove(&element) else {
            return false;
        };
        region.teardown();
        true
    }

    /// Destroy `node` and its subtree, tearing down every region inside it.
    pub fn remove_node(&mut self, node: NodeId) -> Result<(), DocumentError> {
        let doomed: Vec<NodeId> = {
            let doc = self.doc.borrow();
            if !doc.is_alive(node) {
                return Err(DocumentError::DeadNode(node));
            }
            self.regions
                .keys()
                .copied()
                .filter(|element| doc.contains(node, *element))
                .collect()
        };
        for element in doomed {
            self.unbind(element);
        }
        let destroyed = self.doc.borrow_mut().remove(node)?;
        self.associations.borrow_mut().release_all(destroyed);
        Ok(())
    }

    // --- gestures ---

    /// Drag `node` into `target` before the element child at `index`, then
    /// reconcile the drop.
    pub fn drag(&self, node: NodeId, target: NodeId, index: usize) -> Result<DragOutcome, ReconcileError> {
        let result = {
            let mut doc = self.doc.borrow_mut();
            self.widget.borrow_mut().drag(&mut doc, node, target, index)
        };
        match result {
            DragResult::Ignored => Ok(DragOutcome::Ignored),
            DragResult::Reverted => Ok(DragOutcome::Reverted),
            DragResult::Dropped(completion) => self.handle_drop(&completion).map(DragOutcome::Dropped),
        }
    }

    /// Reconcile a completed drop. Failures are also sent to every
    /// [`on_reconcile_failure`](Self::on_reconcile_failure) handler.
    pub fn handle_drop(&self, completion: &DropCompletion) -> Result<DropOutcome, ReconcileError> {
        let reconciler = Reconciler {
            doc: &self.doc,
            widget: &*self.widget,
            associations: &self.associations,
            regions: &self.regions,
            journal: &self.journal,
        };
        let result = reconciler.reconcile(completion);
        if let Err(error) = &result {
            let handlers = self.failure_handlers.borrow().clone();
            for handler in handlers {
                handler(error);
            }
        }
        result
    }

    // --- failure channels ---

    pub fn on_reconcile_failure(&self, handler: impl Fn(&ReconcileError) + 'static) {
        self.failure_handlers.borrow_mut().push(Rc::new(handler));
    }

    pub fn on_policy_error(&self, handler: impl Fn(&PolicyFailure) + 'static) {
        self.policy_handlers.borrow_mut().push(Rc::new(handler));
    }

    fn policy_sink(&self) -> PolicyErrorSink {
        let handlers = self.policy_handlers.clone();
        Rc::new(move |failure: &PolicyFailure| {
            let handlers = handlers.borrow().clone();
            for handler in handlers {
                handler(failure);
            }
        })
    }

    // --- introspection ---

    pub fn region(&self, element: NodeId) -> Option<&RegionController<T>> {
        self.regions.get(&element)
    }

    pub fn bound_elements(&self) -> Vec<NodeId> {
        let mut elements: Vec<NodeId> = self.regions.keys().copied().collect();
        elements.sort();
        elements
    }

    /// Collection bound to a region element.
    pub fn bound_collection(&self, element: NodeId) -> Option<ObservableList<T>> {
        self.regions.get(&element).map(|region| region.data().clone())
    }

    /// Item a rendered node represents.
    pub fn item_for(&self, node: NodeId) -> Option<T> {
        self.associations.borrow().lookup(node).map(|a| a.item.clone())
    }

    /// Collection owning the item a rendered node represents.
    pub fn parent_collection(&self, node: NodeId) -> Option<ObservableList<T>> {
        self.associations
            .borrow()
            .lookup(node)
            .map(|a| a.collection.clone())
    }

    pub fn is_drop_target(&self, element: NodeId) -> bool {
        self.regions
            .get(&element)
            .is_some_and(|region| region.is_drop_target())
    }

    pub fn drop_target_transitions(&self, element: NodeId) -> Option<usize> {
        self.regions
            .get(&element)
            .map(|region| region.drop_target_transitions())
    }

    pub fn widget_option(&self, element: NodeId, key: &str) -> Option<serde_json::Value> {
        self.widget.borrow().option(element, key)
    }

    pub fn association_count(&self) -> usize {
        self.associations.borrow().len()
    }
}
