//! Binding tests: rendering, connect class, drop permission, widget options
//! and node metadata.

use std::cell::RefCell;
use std::rc::Rc;

use serde_json::json;
use sortable_sync::reactive::Observable;
use sortable_sync::template::DATA_PLACEHOLDER;
use sortable_sync::{
    BindError, DEFAULT_CONNECT_CLASS, Document, DragOutcome, NodeId, ObservableList, Policy,
    PolicyError, PolicySetting, RegionConfig, SortableDefaults, SortableEngine, SortableWidget,
};

fn engine(defaults: SortableDefaults<i32>) -> SortableEngine<i32> {
    let mut engine = SortableEngine::new(defaults);
    engine.set_label(|item: &i32| item.to_string());
    engine
}

/// `<ul><li>$data</li></ul>` attached to the body.
fn anonymous_region(engine: &SortableEngine<i32>) -> NodeId {
    let mut doc = engine.document_mut();
    let ul = doc.create_element("ul");
    let body = doc.body();
    doc.append_child(body, ul).unwrap();
    let li = doc.create_element("li");
    let text = doc.create_text(DATA_PLACEHOLDER);
    doc.append_child(li, text).unwrap();
    doc.append_child(ul, li).unwrap();
    ul
}

fn empty_region(engine: &SortableEngine<i32>) -> NodeId {
    let mut doc = engine.document_mut();
    let ul = doc.create_element("ul");
    let body = doc.body();
    doc.append_child(body, ul).unwrap();
    ul
}

fn items() -> ObservableList<i32> {
    ObservableList::from_vec(vec![1, 2, 3])
}

fn has_class(engine: &SortableEngine<i32>, element: NodeId, class: &str) -> bool {
    engine.document().has_class(element, class)
}

// --- templates ---

#[test]
fn anonymous_template_renders_all_items() {
    let mut engine = engine(SortableDefaults::default());
    let ul = anonymous_region(&engine);

    engine.bind(ul, RegionConfig::new(items())).unwrap();

    assert_eq!(engine.document().element_children(ul).len(), 3);
    assert_eq!(engine.document().text_content(ul), "123");
}

#[test]
fn named_template_renders_all_items() {
    let mut engine = engine(SortableDefaults::default());
    engine.add_template("itemTmpl", |doc: &mut Document, _item: &i32| {
        vec![doc.create_element("li")]
    });
    let ul = empty_region(&engine);

    engine
        .bind(ul, RegionConfig::new(items()).template("itemTmpl"))
        .unwrap();

    let doc = engine.document();
    let children = doc.element_children(ul);
    assert_eq!(children.len(), 3);
    assert!(children.iter().all(|child| doc.tag(*child) == Some("li")));
}

#[test]
fn unknown_template_fails_to_bind() {
    let mut engine = engine(SortableDefaults::default());
    let ul = empty_region(&engine);

    let result = engine.bind(ul, RegionConfig::new(items()).template("missing"));

    assert_eq!(result, Err(BindError::UnknownTemplate("missing".into())));
    assert!(!engine.widget().is_initialized(ul));
    assert!(engine.bound_collection(ul).is_none());
}

#[test]
fn binding_rejects_bad_elements() {
    let mut engine = engine(SortableDefaults::default());
    let ul = anonymous_region(&engine);
    engine.bind(ul, RegionConfig::new(items())).unwrap();

    assert_eq!(
        engine.bind(ul, RegionConfig::new(items())),
        Err(BindError::AlreadyBound(ul))
    );

    let text = engine.document_mut().create_text("x");
    assert_eq!(
        engine.bind(text, RegionConfig::new(items())),
        Err(BindError::NotAnElement(text))
    );

    let dead = engine.document_mut().create_element("ul");
    engine.document_mut().remove(dead).unwrap();
    assert_eq!(
        engine.bind(dead, RegionConfig::new(items())),
        Err(BindError::DeadElement(dead))
    );
}

#[test]
fn after_render_runs_for_each_item() {
    let mut engine = engine(SortableDefaults::default());
    let ul = anonymous_region(&engine);
    let list = items();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = seen.clone();

    engine
        .bind(
            ul,
            RegionConfig::new(list.clone())
                .after_render(move |nodes: &[NodeId], item: &i32| {
                    sink.borrow_mut().push((nodes.len(), *item))
                }),
        )
        .unwrap();
    list.push(4);

    assert_eq!(*seen.borrow(), vec![(1, 1), (1, 2), (1, 3), (1, 4)]);
}

// --- default options ---

#[test]
fn default_connect_class_is_added() {
    let mut engine = engine(SortableDefaults::default());
    let ul = anonymous_region(&engine);
    engine.bind(ul, RegionConfig::new(items())).unwrap();

    assert!(has_class(&engine, ul, DEFAULT_CONNECT_CLASS));
    assert!(engine.is_drop_target(ul));
}

#[test]
fn widget_is_initialized_on_the_root_element() {
    let mut engine = engine(SortableDefaults::default());
    let ul = anonymous_region(&engine);
    engine.bind(ul, RegionConfig::new(items())).unwrap();

    assert!(engine.widget().is_initialized(ul));
}

#[test]
fn root_element_knows_its_collection() {
    let mut engine = engine(SortableDefaults::default());
    let ul = anonymous_region(&engine);
    let list = items();
    engine.bind(ul, RegionConfig::new(list.clone())).unwrap();

    assert!(engine.bound_collection(ul).unwrap().ptr_eq(&list));
}

#[test]
fn children_know_their_item_and_parent_collection() {
    let mut engine = engine(SortableDefaults::default());
    let ul = anonymous_region(&engine);
    let list = items();
    engine.bind(ul, RegionConfig::new(list.clone())).unwrap();

    let first = engine.document().children(ul)[0];
    assert_eq!(engine.item_for(first), Some(1));
    assert!(engine.parent_collection(first).unwrap().ptr_eq(&list));
    assert_eq!(engine.association_count(), 3);
}

// --- allowDrop set globally ---

#[test]
fn global_allow_drop_false_skips_connect_class() {
    let mut engine = engine(SortableDefaults::default().with_allow_drop(false));
    let ul = anonymous_region(&engine);
    engine.bind(ul, RegionConfig::new(items())).unwrap();

    assert!(!has_class(&engine, ul, DEFAULT_CONNECT_CLASS));
    assert!(!engine.is_drop_target(ul));
}

#[test]
fn global_allow_drop_observable_follows_its_value() {
    let allow = Observable::new(false);
    let mut engine = engine(SortableDefaults::default().with_allow_drop(allow.clone()));
    let ul = anonymous_region(&engine);
    engine.bind(ul, RegionConfig::new(items())).unwrap();

    assert!(!has_class(&engine, ul, DEFAULT_CONNECT_CLASS));
    allow.set(true);
    assert!(has_class(&engine, ul, DEFAULT_CONNECT_CLASS));
    assert!(engine.is_drop_target(ul));
}

#[test]
fn global_allow_drop_predicate_reevaluates_on_push() {
    let defaults = SortableDefaults::default()
        .with_allow_drop(Policy::predicate(|list: &ObservableList<i32>| list.len() > 3));
    let mut engine = engine(defaults);
    let ul = anonymous_region(&engine);
    let list = items();
    engine.bind(ul, RegionConfig::new(list.clone())).unwrap();

    assert!(!has_class(&engine, ul, DEFAULT_CONNECT_CLASS));
    list.push(4);
    assert!(has_class(&engine, ul, DEFAULT_CONNECT_CLASS));
}

// --- allowDrop in the binding ---

#[test]
fn binding_allow_drop_false_skips_connect_class() {
    let mut engine = engine(SortableDefaults::default());
    let ul = anonymous_region(&engine);
    engine
        .bind(ul, RegionConfig::new(items()).allow_drop(false))
        .unwrap();

    assert!(!has_class(&engine, ul, DEFAULT_CONNECT_CLASS));
}

#[test]
fn binding_allow_drop_observable_follows_its_value() {
    let enabled = Observable::new(false);
    let mut engine = engine(SortableDefaults::default());
    let ul = anonymous_region(&engine);
    engine
        .bind(ul, RegionConfig::new(items()).allow_drop(enabled.clone()))
        .unwrap();

    assert!(!has_class(&engine, ul, DEFAULT_CONNECT_CLASS));
    enabled.set(true);
    assert!(has_class(&engine, ul, DEFAULT_CONNECT_CLASS));
    enabled.set(false);
    assert!(!has_class(&engine, ul, DEFAULT_CONNECT_CLASS));
    assert!(!engine.widget().accepts_drops(ul));
}

#[test]
fn binding_allow_drop_predicate_reevaluates_on_push() {
    let mut engine = engine(SortableDefaults::default());
    let ul = anonymous_region(&engine);
    let list = items();
    engine
        .bind(
            ul,
            RegionConfig::new(list.clone())
                .allow_drop(Policy::predicate(|list: &ObservableList<i32>| list.len() > 3)),
        )
        .unwrap();

    assert!(!has_class(&engine, ul, DEFAULT_CONNECT_CLASS));
    list.push(4);
    assert!(has_class(&engine, ul, DEFAULT_CONNECT_CLASS));
}

#[test]
fn binding_setting_wins_over_global_default() {
    let mut engine = engine(SortableDefaults::default().with_allow_drop(false));
    let ul = anonymous_region(&engine);
    engine
        .bind(ul, RegionConfig::new(items()).allow_drop(true))
        .unwrap();

    assert!(has_class(&engine, ul, DEFAULT_CONNECT_CLASS));
}

#[test]
fn registration_changes_only_on_transitions() {
    let mut engine = engine(SortableDefaults::default());
    let ul = anonymous_region(&engine);
    let list = items();
    engine
        .bind(
            ul,
            RegionConfig::new(list.clone())
                .allow_drop(Policy::predicate(|list: &ObservableList<i32>| list.len() > 3)),
        )
        .unwrap();
    assert_eq!(engine.drop_target_transitions(ul), Some(1));

    list.push(4);
    list.push(5);
    list.push(6);
    assert_eq!(engine.drop_target_transitions(ul), Some(2));

    list.replace(vec![1]);
    assert_eq!(engine.drop_target_transitions(ul), Some(3));
    assert!(!engine.is_drop_target(ul));
}

#[test]
fn failing_predicate_disables_drops_and_reports() {
    let mut engine = engine(SortableDefaults::default());
    let failures = Rc::new(RefCell::new(Vec::new()));
    let sink = failures.clone();
    engine.on_policy_error(move |failure| sink.borrow_mut().push(failure.clone()));
    let ul = anonymous_region(&engine);
    let list = items();
    engine
        .bind(
            ul,
            RegionConfig::new(list.clone()).allow_drop(Policy::try_predicate(
                |list: &ObservableList<i32>| {
                    if list.len() > 3 {
                        Err(PolicyError::new("list too long"))
                    } else {
                        Ok(true)
                    }
                },
            )),
        )
        .unwrap();
    assert!(engine.is_drop_target(ul));

    list.push(4);
    assert!(!engine.is_drop_target(ul));
    assert!(!has_class(&engine, ul, DEFAULT_CONNECT_CLASS));

    list.remove(3).unwrap();
    assert!(engine.is_drop_target(ul));

    let failures = failures.borrow();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].element, ul);
    assert_eq!(failures[0].setting, PolicySetting::AllowDrop);
    assert_eq!(failures[0].error, PolicyError::new("list too long"));
}

// --- connect class ---

#[test]
fn global_connect_class_override() {
    let mut engine = engine(SortableDefaults::default().with_connect_class("mycontainer"));
    let ul = anonymous_region(&engine);
    engine.bind(ul, RegionConfig::new(items())).unwrap();

    assert!(!has_class(&engine, ul, DEFAULT_CONNECT_CLASS));
    assert!(has_class(&engine, ul, "mycontainer"));
}

#[test]
fn binding_connect_class_override() {
    let mut engine = engine(SortableDefaults::default());
    let ul = anonymous_region(&engine);
    engine
        .bind(ul, RegionConfig::new(items()).connect_class("mycontainer"))
        .unwrap();

    assert!(!has_class(&engine, ul, DEFAULT_CONNECT_CLASS));
    assert!(has_class(&engine, ul, "mycontainer"));
}

// --- widget options ---

#[test]
fn binding_options_reach_the_widget() {
    let mut engine = engine(SortableDefaults::default());
    let ul = anonymous_region(&engine);
    engine
        .bind(ul, RegionConfig::new(items()).option("disabled", json!(true)))
        .unwrap();

    assert_eq!(engine.widget_option(ul, "disabled"), Some(json!(true)));
}

#[test]
fn global_options_reach_the_widget() {
    let mut engine = engine(SortableDefaults::default().with_option("disabled", json!(true)));
    let ul = anonymous_region(&engine);
    engine.bind(ul, RegionConfig::new(items())).unwrap();

    assert_eq!(engine.widget_option(ul, "disabled"), Some(json!(true)));
}

#[test]
fn option_maps_merge_key_wise() {
    let defaults = SortableDefaults::default()
        .with_option("axis", json!("y"))
        .with_option("delay", json!(150));
    let mut engine = engine(defaults);
    let ul = anonymous_region(&engine);
    engine
        .bind(ul, RegionConfig::new(items()).option("axis", json!("x")))
        .unwrap();

    assert_eq!(engine.widget_option(ul, "axis"), Some(json!("x")));
    assert_eq!(engine.widget_option(ul, "delay"), Some(json!(150)));
}

#[test]
fn is_enabled_toggles_disabled_option() {
    let enabled = Observable::new(true);
    let mut engine = engine(SortableDefaults::default());
    let ul = anonymous_region(&engine);
    engine
        .bind(ul, RegionConfig::new(items()).is_enabled(enabled.clone()))
        .unwrap();

    assert_eq!(engine.widget_option(ul, "disabled"), Some(json!(false)));
    enabled.set(false);
    assert_eq!(engine.widget_option(ul, "disabled"), Some(json!(true)));

    let first = engine.document().children(ul)[0];
    assert_eq!(engine.drag(first, ul, 2), Ok(DragOutcome::Ignored));
}
