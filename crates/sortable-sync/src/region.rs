//! One bound sortable region.
//!
//! A [`RegionController`] renders its collection into the element, sets up
//! the widget and keeps drop-target registration in step with the region's
//! `allow_drop` policy. It never mutates its collection.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::association::AssociationStore;
use crate::collection::ObservableList;
use crate::config::{ResolvedConfig, TemplateSpec};
use crate::document::{Document, NodeId};
use crate::error::{BindError, PolicyError};
use crate::hooks::HookDispatcher;
use crate::policy::{PolicyResult, permits};
use crate::reactive::{Computed, SubscriptionScope};
use crate::template::{ItemTemplate, ListRenderer, RenderTarget, TemplateRegistry};
use crate::widget::{SortableWidget, WidgetSettings};

/// Which region setting a policy failure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicySetting {
    AllowDrop,
    IsEnabled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyFailure {
    pub element: NodeId,
    pub setting: PolicySetting,
    pub error: PolicyError,
}

pub type PolicyErrorSink = Rc<dyn Fn(&PolicyFailure)>;

/// Shared state a region needs at bind time.
pub struct BindContext<'a, T> {
    pub doc: &'a Rc<RefCell<Document>>,
    pub widget: Rc<RefCell<dyn SortableWidget>>,
    pub associations: &'a Rc<RefCell<AssociationStore<T>>>,
    pub templates: &'a TemplateRegistry<T>,
    pub policy_errors: PolicyErrorSink,
}

#[derive(Default)]
struct DropTargetState {
    current: Cell<Option<bool>>,
    transitions: Cell<usize>,
}

pub struct RegionController<T> {
    element: NodeId,
    data: ObservableList<T>,
    connect_class: String,
    hooks: HookDispatcher<T>,
    renderer: ListRenderer<T>,
    policies: Vec<Computed<PolicyResult>>,
    subscriptions: SubscriptionScope,
    drop_target: Rc<DropTargetState>,
    doc: Rc<RefCell<Document>>,
    widget: Rc<RefCell<dyn SortableWidget>>,
    associations: Rc<RefCell<AssociationStore<T>>>,
}

impl<T: Clone + PartialEq + 'static> RegionController<T> {
    pub fn bind(
        ctx: BindContext<'_, T>,
        element: NodeId,
        config: ResolvedConfig<T>,
    ) -> Result<Self, BindError> {
        {
            let doc = ctx.doc.borrow();
            if !doc.is_alive(element) {
                return Err(BindError::DeadElement(element));
            }
            if !doc.is_element(element) {
                return Err(BindError::NotAnElement(element));
            }
        }
        let template = resolve_template(ctx.doc, ctx.templates, element, &config.template)?;

        let connect_with = (!config.connect_class.is_empty()).then(|| config.connect_class.clone());
        ctx.widget.borrow_mut().init(
            element,
            WidgetSettings {
                connect_with,
                options: config.options,
            },
        );

        let attached = ListRenderer::attach(
            ctx.doc.clone(),
            ctx.associations.clone(),
            RenderTarget {
                container: element,
                list: config.data.clone(),
                template,
                label: ctx.templates.label(),
                after_render: config.after_render,
            },
        );
        let renderer = match attached {
            Ok(renderer) => renderer,
            Err(error) => {
                ctx.widget.borrow_mut().destroy(element);
                return Err(error.into());
            }
        };

        let mut region = Self {
            element,
            data: config.data,
            connect_class: config.connect_class,
            hooks: config.hooks,
            renderer,
            policies: Vec::new(),
            subscriptions: SubscriptionScope::new(),
            drop_target: Rc::new(DropTargetState::default()),
            doc: ctx.doc.clone(),
            widget: ctx.widget,
            associations: ctx.associations.clone(),
        };
        region.watch_allow_drop(config.allow_drop.watch(&region.data), ctx.policy_errors.clone());
        if let Some(policy) = config.is_enabled {
            region.watch_is_enabled(policy.watch(&region.data), ctx.policy_errors);
        }
        log::debug!(
            "bound region {element} to {} ({} item(s))",
            region.data.id(),
            region.data.len_untracked()
        );
        Ok(region)
    }

    fn watch_allow_drop(&mut self, policy: Computed<PolicyResult>, report: PolicyErrorSink) {
        let effect = {
            let doc = self.doc.clone();
            let widget = self.widget.clone();
            let state = self.drop_target.clone();
            let class = self.connect_class.clone();
            let element = self.element;
            move |result: &PolicyResult| {
                if let Err(error) = result {
                    report_failure(&report, element, PolicySetting::AllowDrop, error);
                }
                let permit = permits(result);
                if state.current.get() == Some(permit) {
                    return;
                }
                state.current.set(Some(permit));
                state.transitions.set(state.transitions.get() + 1);
                if !class.is_empty() {
                    let mut doc = doc.borrow_mut();
                    let toggled = if permit {
                        doc.add_class(element, &class)
                    } else {
                        doc.remove_class(element, &class)
                    };
                    if let Err(error) = toggled {
                        log::warn!("cannot toggle '{class}' on {element}: {error}");
                    }
                }
                widget.borrow_mut().set_accepts_drops(element, permit);
                log::trace!("region {element} drop target = {permit}");
            }
        };
        effect(&policy.get_untracked());
        self.subscriptions.add(policy.subscribe(effect));
        self.policies.push(policy);
    }

    fn watch_is_enabled(&mut self, policy: Computed<PolicyResult>, report: PolicyErrorSink) {
        let effect = {
            let widget = self.widget.clone();
            let element = self.element;
            move |result: &PolicyResult| {
                if let Err(error) = result {
                    report_failure(&report, element, PolicySetting::IsEnabled, error);
                }
                let disabled = !permits(result);
                widget
                    .borrow_mut()
                    .set_option(element, "disabled", serde_json::Value::Bool(disabled));
                log::trace!("region {element} disabled = {disabled}");
            }
        };
        effect(&policy.get_untracked());
        self.subscriptions.add(policy.subscribe(effect));
        self.policies.push(policy);
    }

    pub fn element(&self) -> NodeId {
        self.element
    }

    pub fn data(&self) -> &ObservableList<T> {
        &self.data
    }

    pub fn connect_class(&self) -> &str {
        &self.connect_class
    }

    pub fn hooks(&self) -> &HookDispatcher<T> {
        &self.hooks
    }

    pub fn is_drop_target(&self) -> bool {
        self.drop_target.current.get().unwrap_or(false)
    }

    /// How many times drop-target registration actually changed.
    pub fn drop_target_transitions(&self) -> usize {
        self.drop_target.transitions.get()
    }

    pub fn rendered_groups(&self) -> Vec<Vec<NodeId>> {
        self.renderer.groups()
    }

    /// Item index of every rendered node of this region.
    pub fn group_positions(&self) -> FxHashMap<NodeId, usize> {
        self.renderer.group_positions()
    }

    /// Bring the region's rendered nodes back into collection order.
    pub fn resync(&self) {
        if let Err(error) = self.renderer.resync() {
            log::warn!("cannot restore item order of region {}: {error}", self.element);
        }
    }

    /// Dispose policy watches, the renderer and the widget instance, and
    /// release every association below the element.
    pub fn teardown(self) {
        let RegionController {
            element,
            connect_class,
            renderer,
            policies,
            subscriptions,
            doc,
            widget,
            associations,
            ..
        } = self;
        drop(subscriptions);
        drop(policies);
        renderer.teardown();

        let descendants = doc.borrow().descendants(element);
        let released = associations.borrow_mut().release_all(descendants);
        widget.borrow_mut().destroy(element);
        let mut doc = doc.borrow_mut();
        if doc.is_alive(element) && !connect_class.is_empty() {
            if let Err(error) = doc.remove_class(element, &connect_class) {
                log::warn!("cannot remove '{connect_class}' from {element}: {error}");
            }
        }
        log::debug!("unbound region {element}, released {released} extra association(s)");
    }
}

fn report_failure(report: &PolicyErrorSink, element: NodeId, setting: PolicySetting, error: &PolicyError) {
    log::warn!("{setting:?} policy of region {element} failed: {error}");
    report(&PolicyFailure {
        element,
        setting,
        error: error.clone(),
    });
}

/// Look up or capture the per-item template. A named template replaces the
/// element's contents; an anonymous one takes them as prototypes.
fn resolve_template<T>(
    doc: &Rc<RefCell<Document>>,
    templates: &TemplateRegistry<T>,
    element: NodeId,
    spec: &TemplateSpec,
) -> Result<ItemTemplate<T>, BindError> {
    let mut doc = doc.borrow_mut();
    let children = doc.children(element).to_vec();
    match spec {
        TemplateSpec::Named(name) => {
            let template = templates
                .get(name)
                .ok_or_else(|| BindError::UnknownTemplate(name.clone()))?;
            for child in children {
                doc.remove(child)?;
            }
            Ok(ItemTemplate::Named(template))
        }
        TemplateSpec::Anonymous => {
            for child in &children {
                doc.detach(*child)?;
            }
            Ok(ItemTemplate::Anonymous(children))
        }
    }
}
