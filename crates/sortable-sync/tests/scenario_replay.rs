//! Replaying JSON scenarios end to end.

use serde_json::json;
use sortable_sync::journal::MoveOutcome;
use sortable_sync::scenario::{self, Scenario, ScenarioError};

const CONNECTED_LISTS: &str = include_str!("../../../scenarios/connected_lists.json");

fn replay(source: &str) -> scenario::ScenarioReport {
    let scenario = Scenario::from_json(source).unwrap();
    scenario::run(&scenario).unwrap()
}

fn outcomes(report: &scenario::ScenarioReport) -> Vec<&str> {
    report.steps.iter().map(|step| step.outcome.as_str()).collect()
}

#[test]
fn connected_lists_final_state() {
    let report = replay(CONNECTED_LISTS);

    assert_eq!(report.collections["todo"], vec![json!("write"), json!("deploy")]);
    assert_eq!(report.collections["done"], vec![json!("ship")]);
    assert_eq!(report.collections["archive"], vec![json!("review")]);
    assert_eq!(report.collections["frozen"], vec![json!("x")]);
}

#[test]
fn connected_lists_step_outcomes() {
    let report = replay(CONNECTED_LISTS);

    assert_eq!(
        outcomes(&report),
        [
            "moved",
            "moved",
            "reverted",
            "archive_open = true",
            "moved",
            "ignored",
            "pushed",
        ]
    );
}

#[test]
fn connected_lists_markup_follows_collections() {
    let report = replay(CONNECTED_LISTS);

    assert_eq!(
        report.markup["todo"],
        r#"<ul class="ko_container"><li>write</li><li>deploy</li></ul>"#
    );
    assert_eq!(report.markup["done"], r#"<ul class="ko_container"><div>ship</div></ul>"#);
    assert_eq!(report.markup["archive"], r#"<ul class="ko_container"><li>review</li></ul>"#);
    assert!(report.drop_targets.values().all(|target| *target));
}

#[test]
fn connected_lists_journal() {
    let report = replay(CONNECTED_LISTS);

    let moves: Vec<_> = report
        .journal
        .iter()
        .map(|entry| {
            (
                entry.item.clone(),
                entry.from.as_str(),
                entry.from_index,
                entry.to.as_str(),
                entry.to_index,
            )
        })
        .collect();
    assert_eq!(
        moves,
        vec![
            (json!("write"), "todo", 0, "todo", 2),
            (json!("ship"), "todo", 1, "done", 0),
            (json!("review"), "todo", 0, "archive", 0),
        ]
    );
    assert!(report
        .journal
        .iter()
        .all(|entry| entry.outcome == MoveOutcome::Moved));
}

#[test]
fn report_serializes_outcomes_in_snake_case() {
    let report = replay(CONNECTED_LISTS);

    let value = serde_json::to_value(&report).unwrap();
    assert_eq!(value["journal"][0]["outcome"], json!("moved"));
    assert_eq!(value["steps"][2]["outcome"], json!("reverted"));
    assert_eq!(value["collections"]["done"], json!(["ship"]));
}

#[test]
fn longer_than_policy_opens_region_after_push() {
    let report = replay(
        r#"{
            "regions": [
                { "name": "source", "items": [1, 2] },
                { "name": "bin", "items": [7], "allow_drop": { "longer_than": 1 } }
            ],
            "steps": [
                { "drag": { "from": "source", "index": 0, "to": "bin", "at": 0 } },
                { "push": { "region": "bin", "item": 8 } },
                { "drag": { "from": "source", "index": 0, "to": "bin", "at": 0 } }
            ]
        }"#,
    );

    assert_eq!(outcomes(&report), ["reverted", "pushed", "moved"]);
    assert_eq!(report.collections["bin"], vec![json!(1), json!(7), json!(8)]);
    assert_eq!(report.collections["source"], vec![json!(2)]);
}

#[test]
fn custom_connect_class_and_reorder_in_place() {
    let report = replay(
        r#"{
            "defaults": { "connect_class": "lane" },
            "regions": [{ "name": "a", "items": ["p", "q"] }],
            "steps": [
                { "drag": { "from": "a", "index": 1, "to": "a", "at": 1 } },
                { "remove": { "region": "a", "index": 5 } }
            ]
        }"#,
    );

    assert_eq!(outcomes(&report)[0], "unchanged");
    assert!(outcomes(&report)[1].starts_with("failed: "));
    assert_eq!(report.markup["a"], r#"<ul class="lane"><li>p</li><li>q</li></ul>"#);
}

#[test]
fn unknown_region_in_step_is_rejected_before_replay() {
    let scenario = Scenario::from_json(
        r#"{
            "regions": [{ "name": "a", "items": [1] }],
            "steps": [{ "drag": { "from": "a", "index": 0, "to": "b", "at": 0 } }]
        }"#,
    )
    .unwrap();

    let error = scenario::run(&scenario).unwrap_err();
    assert!(matches!(
        error,
        ScenarioError::UnknownRegion { step: 0, ref name } if name == "b"
    ));
    assert_eq!(error.to_string(), "step 0 refers to unknown region 'b'");
}
