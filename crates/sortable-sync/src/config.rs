//! Region configuration and shared defaults.
//!
//! [`SortableDefaults`] is an immutable value handed to the engine once.
//! Each [`RegionConfig`] is merged with it at bind time into a
//! [`ResolvedConfig`]; later changes to either do not affect bound regions.

use std::rc::Rc;

use indexmap::IndexMap;

use crate::collection::ObservableList;
use crate::document::NodeId;
use crate::hooks::{AfterMove, AfterRender, BeforeMove, HookDispatcher, MoveDescriptor};
use crate::policy::Policy;

pub const DEFAULT_CONNECT_CLASS: &str = "ko_container";

/// Passthrough options forwarded verbatim to the widget.
pub type WidgetOptions = IndexMap<String, serde_json::Value>;

pub struct SortableDefaults<T> {
    pub connect_class: String,
    pub allow_drop: Policy<T>,
    pub before_move: Option<BeforeMove<T>>,
    pub after_move: Option<AfterMove<T>>,
    pub options: WidgetOptions,
}

impl<T> Default for SortableDefaults<T> {
    fn default() -> Self {
        Self {
            connect_class: DEFAULT_CONNECT_CLASS.to_string(),
            allow_drop: Policy::Static(true),
            before_move: None,
            after_move: None,
            options: WidgetOptions::new(),
        }
    }
}

impl<T: Clone + PartialEq + 'static> SortableDefaults<T> {
    pub fn with_connect_class(mut self, class: impl Into<String>) -> Self {
        self.connect_class = class.into();
        self
    }

    pub fn with_allow_drop(mut self, policy: impl Into<Policy<T>>) -> Self {
        self.allow_drop = policy.into();
        self
    }

    pub fn with_before_move(mut self, hook: impl Fn(&MoveDescriptor<T>) -> bool + 'static) -> Self {
        self.before_move = Some(Rc::new(hook));
        self
    }

    pub fn with_after_move(mut self, hook: impl Fn(&MoveDescriptor<T>) + 'static) -> Self {
        self.after_move = Some(Rc::new(hook));
        self
    }

    pub fn with_option(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.options.insert(key.into(), value);
        self
    }
}

/// Per-item rendering template.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TemplateSpec {
    /// Use the region element's own children as the per-item template.
    Anonymous,
    /// A template registered under this name.
    Named(String),
}

/// Binding settings for one region. Unset fields fall back to the defaults.
pub struct RegionConfig<T> {
    pub data: ObservableList<T>,
    pub template: TemplateSpec,
    pub connect_class: Option<String>,
    pub allow_drop: Option<Policy<T>>,
    pub is_enabled: Option<Policy<T>>,
    pub before_move: Option<BeforeMove<T>>,
    pub after_move: Option<AfterMove<T>>,
    pub after_render: Option<AfterRender<T>>,
    pub options: WidgetOptions,
}

impl<T: Clone + PartialEq + 'static> RegionConfig<T> {
    pub fn new(data: ObservableList<T>) -> Self {
        Self {
            data,
            template: TemplateSpec::Anonymous,
            connect_class: None,
            allow_drop: None,
            is_enabled: None,
            before_move: None,
            after_move: None,
            after_render: None,
            options: WidgetOptions::new(),
        }
    }

    pub fn template(mut self, name: impl Into<String>) -> Self {
        self.template = TemplateSpec::Named(name.into());
        self
    }

    pub fn connect_class(mut self, class: impl Into<String>) -> Self {
        self.connect_class = Some(class.into());
        self
    }

    pub fn allow_drop(mut self, policy: impl Into<Policy<T>>) -> Self {
        self.allow_drop = Some(policy.into());
        self
    }

    pub fn is_enabled(mut self, policy: impl Into<Policy<T>>) -> Self {
        self.is_enabled = Some(policy.into());
        self
    }

    pub fn before_move(mut self, hook: impl Fn(&MoveDescriptor<T>) -> bool + 'static) -> Self {
        self.before_move = Some(Rc::new(hook));
        self
    }

    pub fn after_move(mut self, hook: impl Fn(&MoveDescriptor<T>) + 'static) -> Self {
        self.after_move = Some(Rc::new(hook));
        self
    }

    pub fn after_render(mut self, hook: impl Fn(&[NodeId], &T) + 'static) -> Self {
        self.after_render = Some(Rc::new(hook));
        self
    }

    pub fn option(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.options.insert(key.into(), value);
        self
    }

    /// Merge with `defaults`. Region settings win; option maps merge key-wise.
    pub fn resolve(self, defaults: &SortableDefaults<T>) -> ResolvedConfig<T> {
        ResolvedConfig {
            hooks: HookDispatcher::resolve(
                self.before_move.as_ref(),
                defaults.before_move.as_ref(),
                self.after_move.as_ref(),
                defaults.after_move.as_ref(),
            ),
            data: self.data,
            template: self.template,
            connect_class: self
                .connect_class
                .unwrap_or_else(|| defaults.connect_class.clone()),
            allow_drop: self
                .allow_drop
                .unwrap_or_else(|| defaults.allow_drop.clone()),
            is_enabled: self.is_enabled,
            after_render: self.after_render,
            options: merge_options(&defaults.options, &self.options),
        }
    }
}

/// Effective settings of a bound region.
pub struct ResolvedConfig<T> {
    pub data: ObservableList<T>,
    pub template: TemplateSpec,
    pub connect_class: String,
    pub allow_drop: Policy<T>,
    pub is_enabled: Option<Policy<T>>,
    pub hooks: HookDispatcher<T>,
    pub after_render: Option<AfterRender<T>>,
    pub options: WidgetOptions,
}

pub fn merge_options(defaults: &WidgetOptions, region: &WidgetOptions) -> WidgetOptions {
    let mut merged = defaults.clone();
    for (key, value) in region {
        merged.insert(key.clone(), value.clone());
    }
    merged
}
