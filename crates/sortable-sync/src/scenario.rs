//! JSON scenarios: a set of regions and a script of gestures and host
//! mutations, replayed against a [`SortableEngine`] over JSON items.
//!
//! ```json
//! {
//!   "regions": [
//!     { "name": "a", "items": [1, 2, 3] },
//!     { "name": "b", "items": [], "allow_drop": { "flag": "open" } }
//!   ],
//!   "flags": { "open": true },
//!   "steps": [ { "drag": { "from": "a", "index": 1, "to": "b", "at": 0 } } ]
//! }
//! ```

use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::collection::{CollectionId, ObservableList};
use crate::config::{DEFAULT_CONNECT_CLASS, RegionConfig, SortableDefaults, WidgetOptions};
use crate::document::{Document, NodeId};
use crate::engine::{DragOutcome, SortableEngine};
use crate::error::{BindError, DocumentError};
use crate::journal::MoveOutcome;
use crate::policy::Policy;
use crate::reactive::Observable;
use crate::reconciler::DropOutcome;
use crate::template::DATA_PLACEHOLDER;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    #[serde(default)]
    pub defaults: ScenarioDefaults,
    /// Named templates: name to the tag of the per-item element.
    #[serde(default)]
    pub templates: IndexMap<String, String>,
    pub regions: Vec<RegionSpec>,
    #[serde(default)]
    pub flags: IndexMap<String, bool>,
    #[serde(default)]
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioDefaults {
    pub connect_class: Option<String>,
    pub allow_drop: Option<PolicySpec>,
    #[serde(default)]
    pub options: WidgetOptions,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegionSpec {
    pub name: String,
    #[serde(default)]
    pub items: Vec<Value>,
    pub template: Option<String>,
    pub connect_class: Option<String>,
    pub allow_drop: Option<PolicySpec>,
    pub is_enabled: Option<PolicySpec>,
    #[serde(default)]
    pub options: WidgetOptions,
}

/// `true`/`false`, `{"flag": name}` or `{"longer_than": n}`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum PolicySpec {
    Static(bool),
    Flag { flag: String },
    LongerThan { longer_than: usize },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    /// Drag the item at data index `index` of `from` into `to`, before the
    /// element currently at `at`.
    Drag {
        from: String,
        index: usize,
        to: String,
        at: usize,
    },
    Push {
        region: String,
        item: Value,
    },
    Remove {
        region: String,
        index: usize,
    },
    SetFlag {
        flag: String,
        value: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenarioReport {
    pub collections: IndexMap<String, Vec<Value>>,
    pub drop_targets: IndexMap<String, bool>,
    pub markup: IndexMap<String, String>,
    pub steps: Vec<StepReport>,
    pub journal: Vec<JournalEntry>,
    pub policy_errors: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepReport {
    pub step: usize,
    pub outcome: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JournalEntry {
    pub sequence: u64,
    pub item: Value,
    pub from: String,
    pub from_index: usize,
    pub to: String,
    pub to_index: usize,
    pub outcome: MoveOutcome,
}

#[derive(Debug)]
pub enum ScenarioError {
    Parse(serde_json::Error),
    DuplicateRegion(String),
    UnknownRegion { step: usize, name: String },
    UnknownFlag(String),
    UnknownTemplate(String),
    Bind { region: String, error: BindError },
    Document { region: String, error: DocumentError },
}

impl std::fmt::Display for ScenarioError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScenarioError::Parse(error) => write!(f, "invalid scenario: {error}"),
            ScenarioError::DuplicateRegion(name) => write!(f, "region '{name}' is declared twice"),
            ScenarioError::UnknownRegion { step, name } => {
                write!(f, "step {step} refers to unknown region '{name}'")
            }
            ScenarioError::UnknownFlag(name) => write!(f, "flag '{name}' is not declared"),
            ScenarioError::UnknownTemplate(name) => write!(f, "template '{name}' is not declared"),
            ScenarioError::Bind { region, error } => write!(f, "cannot bind region '{region}': {error}"),
            ScenarioError::Document { region, error } => {
                write!(f, "cannot build region '{region}': {error}")
            }
        }
    }
}

impl std::error::Error for ScenarioError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ScenarioError::Parse(error) => Some(error),
            ScenarioError::Bind { error, .. } => Some(error),
            ScenarioError::Document { error, .. } => Some(error),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for ScenarioError {
    fn from(error: serde_json::Error) -> Self {
        ScenarioError::Parse(error)
    }
}

impl Scenario {
    pub fn from_json(source: &str) -> Result<Self, ScenarioError> {
        Ok(serde_json::from_str(source)?)
    }

    /// Check every name the scenario refers to.
    pub fn validate(&self) -> Result<(), ScenarioError> {
        let mut names: Vec<&str> = Vec::with_capacity(self.regions.len());
        for region in &self.regions {
            if names.contains(&region.name.as_str()) {
                return Err(ScenarioError::DuplicateRegion(region.name.clone()));
            }
            names.push(&region.name);
            if let Some(template) = &region.template {
                if !self.templates.contains_key(template) {
                    return Err(ScenarioError::UnknownTemplate(template.clone()));
                }
            }
            for policy in [&region.allow_drop, &region.is_enabled].into_iter().flatten() {
                self.check_policy(policy)?;
            }
        }
        if let Some(policy) = &self.defaults.allow_drop {
            self.check_policy(policy)?;
        }

        let known_region = |step: usize, name: &String| {
            if names.contains(&name.as_str()) {
                Ok(())
            } else {
                Err(ScenarioError::UnknownRegion {
                    step,
                    name: name.clone(),
                })
            }
        };
        for (step, action) in self.steps.iter().enumerate() {
            match action {
                Step::Drag { from, to, .. } => {
                    known_region(step, from)?;
                    known_region(step, to)?;
                }
                Step::Push { region, .. } | Step::Remove { region, .. } => known_region(step, region)?,
                Step::SetFlag { flag, .. } => {
                    if !self.flags.contains_key(flag) {
                        return Err(ScenarioError::UnknownFlag(flag.clone()));
                    }
                }
            }
        }
        Ok(())
    }

    fn check_policy(&self, policy: &PolicySpec) -> Result<(), ScenarioError> {
        match policy {
            PolicySpec::Flag { flag } if !self.flags.contains_key(flag) => {
                Err(ScenarioError::UnknownFlag(flag.clone()))
            }
            _ => Ok(()),
        }
    }
}

/// Text shown for an item: strings as-is, anything else as JSON.
pub fn label(item: &Value) -> String {
    match item {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

struct Replay {
    engine: SortableEngine<Value>,
    regions: IndexMap<String, (NodeId, ObservableList<Value>)>,
    flags: IndexMap<String, Observable<bool>>,
    policy_errors: Rc<RefCell<Vec<String>>>,
}

/// Validate and replay `scenario`, returning the final state.
pub fn run(scenario: &Scenario) -> Result<ScenarioReport, ScenarioError> {
    scenario.validate()?;
    let mut replay = Replay::new(scenario);
    for spec in &scenario.regions {
        replay.bind(spec)?;
    }
    let steps = scenario
        .steps
        .iter()
        .enumerate()
        .map(|(step, action)| StepReport {
            step,
            outcome: replay.step(action),
        })
        .collect();
    Ok(replay.report(steps))
}

impl Replay {
    fn new(scenario: &Scenario) -> Self {
        let flags: IndexMap<String, Observable<bool>> = scenario
            .flags
            .iter()
            .map(|(name, value)| (name.clone(), Observable::new(*value)))
            .collect();

        let mut defaults = SortableDefaults::default();
        defaults.connect_class = scenario
            .defaults
            .connect_class
            .clone()
            .unwrap_or_else(|| DEFAULT_CONNECT_CLASS.to_string());
        if let Some(policy) = &scenario.defaults.allow_drop {
            defaults.allow_drop = to_policy(policy, &flags);
        }
        defaults.options = scenario.defaults.options.clone();

        let mut engine = SortableEngine::new(defaults);
        engine.enable_journal();
        engine.set_label(label);
        for (name, tag) in &scenario.templates {
            let tag = tag.clone();
            engine.add_template(name.clone(), move |doc: &mut Document, item: &Value| {
                let element = doc.create_element(&tag);
                let text = doc.create_text(&label(item));
                if let Err(error) = doc.append_child(element, text) {
                    log::warn!("template '{tag}' could not label {element}: {error}");
                }
                vec![element]
            });
        }

        let policy_errors = Rc::new(RefCell::new(Vec::new()));
        let sink = policy_errors.clone();
        engine.on_policy_error(move |failure| sink.borrow_mut().push(failure.error.to_string()));

        Self {
            engine,
            regions: IndexMap::new(),
            flags,
            policy_errors,
        }
    }

    fn bind(&mut self, spec: &RegionSpec) -> Result<(), ScenarioError> {
        let element = self
            .build_region_element(spec)
            .map_err(|error| ScenarioError::Document {
                region: spec.name.clone(),
                error,
            })?;

        let list = ObservableList::from_vec(spec.items.clone());
        let mut config = RegionConfig::new(list.clone());
        config.options = spec.options.clone();
        if let Some(template) = &spec.template {
            config = config.template(template.clone());
        }
        if let Some(class) = &spec.connect_class {
            config = config.connect_class(class.clone());
        }
        if let Some(policy) = &spec.allow_drop {
            config = config.allow_drop(to_policy(policy, &self.flags));
        }
        if let Some(policy) = &spec.is_enabled {
            config = config.is_enabled(to_policy(policy, &self.flags));
        }
        self.engine
            .bind(element, config)
            .map_err(|error| ScenarioError::Bind {
                region: spec.name.clone(),
                error,
            })?;
        self.regions.insert(spec.name.clone(), (element, list));
        Ok(())
    }

    /// `<ul>` under the body; regions without a named template get a
    /// `<li>$data</li>` prototype.
    fn build_region_element(&self, spec: &RegionSpec) -> Result<NodeId, DocumentError> {
        let mut doc = self.engine.document_mut();
        let element = doc.create_element("ul");
        let body = doc.body();
        doc.append_child(body, element)?;
        if spec.template.is_none() {
            let prototype = doc.create_element("li");
            let text = doc.create_text(DATA_PLACEHOLDER);
            doc.append_child(prototype, text)?;
            doc.append_child(element, prototype)?;
        }
        Ok(element)
    }

    fn step(&self, action: &Step) -> String {
        match action {
            Step::Drag { from, index, to, at } => {
                let (Some((source, _)), Some((target, _))) = (self.regions.get(from), self.regions.get(to))
                else {
                    return "unknown region".to_string();
                };
                let node = self
                    .engine
                    .region(*source)
                    .and_then(|region| region.rendered_groups().get(*index).cloned())
                    .and_then(|group| group.into_iter().find(|node| self.engine.document().is_element(*node)));
                let Some(node) = node else {
                    return format!("no item at {from}[{index}]");
                };
                match self.engine.drag(node, *target, *at) {
                    Ok(DragOutcome::Ignored) => "ignored".to_string(),
                    Ok(DragOutcome::Reverted) => "reverted".to_string(),
                    Ok(DragOutcome::Dropped(outcome)) => drop_outcome(outcome).to_string(),
                    Err(error) => format!("failed: {error}"),
                }
            }
            Step::Push { region, item } => match self.regions.get(region) {
                Some((_, list)) => {
                    list.push(item.clone());
                    "pushed".to_string()
                }
                None => "unknown region".to_string(),
            },
            Step::Remove { region, index } => match self.regions.get(region) {
                Some((_, list)) => match list.remove(*index) {
                    Ok(_) => "removed".to_string(),
                    Err(error) => format!("failed: {error}"),
                },
                None => "unknown region".to_string(),
            },
            Step::SetFlag { flag, value } => match self.flags.get(flag) {
                Some(cell) => {
                    cell.set(*value);
                    format!("{flag} = {value}")
                }
                None => "unknown flag".to_string(),
            },
        }
    }

    fn report(&self, steps: Vec<StepReport>) -> ScenarioReport {
        let names: IndexMap<CollectionId, String> = self
            .regions
            .iter()
            .map(|(name, (_, list))| (list.id(), name.clone()))
            .collect();
        let name_of = |id: CollectionId| names.get(&id).cloned().unwrap_or_else(|| id.to_string());
        let doc = self.engine.document();

        ScenarioReport {
            collections: self
                .regions
                .iter()
                .map(|(name, (_, list))| (name.clone(), list.snapshot()))
                .collect(),
            drop_targets: self
                .regions
                .iter()
                .map(|(name, (element, _))| (name.clone(), self.engine.is_drop_target(*element)))
                .collect(),
            markup: self
                .regions
                .iter()
                .map(|(name, (element, _))| (name.clone(), doc.outline(*element)))
                .collect(),
            steps,
            journal: self
                .engine
                .journal()
                .entries()
                .iter()
                .map(|record| JournalEntry {
                    sequence: record.sequence,
                    item: record.item.clone(),
                    from: name_of(record.source),
                    from_index: record.source_index,
                    to: name_of(record.target),
                    to_index: record.target_index,
                    outcome: record.outcome,
                })
                .collect(),
            policy_errors: self.policy_errors.borrow().clone(),
        }
    }
}

fn drop_outcome(outcome: DropOutcome) -> &'static str {
    match outcome {
        DropOutcome::Moved => "moved",
        DropOutcome::Unchanged => "unchanged",
        DropOutcome::Vetoed => "vetoed",
        DropOutcome::Stale => "stale",
    }
}

fn to_policy(spec: &PolicySpec, flags: &IndexMap<String, Observable<bool>>) -> Policy<Value> {
    match spec {
        PolicySpec::Static(value) => Policy::Static(*value),
        // Undeclared flags are rejected by `validate`.
        PolicySpec::Flag { flag } => flags
            .get(flag)
            .map(|cell| Policy::Reactive(cell.clone()))
            .unwrap_or(Policy::Static(false)),
        PolicySpec::LongerThan { longer_than } => {
            let threshold = *longer_than;
            Policy::predicate(move |list: &ObservableList<Value>| list.len() > threshold)
        }
    }
}
