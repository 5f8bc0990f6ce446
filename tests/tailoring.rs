// tests/tailoring.rs

use std::sync::Arc;

use arbor::definition::{tailor_children, ActivityChange, ActivityDefinition, TailoringRule, WorkDefinition};
use arbor::engine::{ActivityOutcome, TaskBeans};
use arbor::errors::EngineError;
use arbor::repo::InMemoryRepository;
use arbor::types::{Criticality, ExecutionMode};
use arbor_test_utils::builders::{composite, fake_leaf, mode, test_registry};
use arbor_test_utils::fake_activity::ExecutionLog;
use arbor_test_utils::{init_tracing, run_root, with_timeout};

fn beans() -> TaskBeans {
    TaskBeans::new(Arc::new(InMemoryRepository::new()))
}

fn ids(children: &[ActivityDefinition]) -> Vec<&str> {
    children.iter().map(|c| c.identifier()).collect()
}

#[test]
fn insert_rules_place_activities_around_their_target() {
    let children = vec![
        fake_leaf("a", ActivityOutcome::Success),
        fake_leaf("b", ActivityOutcome::Success),
    ];
    let rules = vec![
        TailoringRule::InsertBefore {
            target: "a".to_string(),
            activity: fake_leaf("first", ActivityOutcome::Success),
        },
        TailoringRule::InsertAfter {
            target: "a".to_string(),
            activity: fake_leaf("middle", ActivityOutcome::Success),
        },
        TailoringRule::InsertAfter {
            target: "b".to_string(),
            activity: fake_leaf("last", ActivityOutcome::Success),
        },
    ];

    let tailored = tailor_children("root", children, &rules).unwrap();
    assert_eq!(ids(&tailored), vec!["first", "a", "middle", "b", "last"]);
}

#[test]
fn unmatched_rule_is_ignored() {
    let children = vec![fake_leaf("a", ActivityOutcome::Success)];
    let rules = vec![TailoringRule::Modify {
        target: "missing".to_string(),
        change: ActivityChange {
            mode: Some(ExecutionMode::DryRun),
            ..ActivityChange::default()
        },
    }];

    let tailored = tailor_children("root", children.clone(), &rules).unwrap();
    assert_eq!(tailored, children);
}

#[test]
fn inserting_a_taken_identifier_is_a_configuration_error() {
    let children = vec![fake_leaf("a", ActivityOutcome::Success)];
    let rules = vec![TailoringRule::InsertAfter {
        target: "a".to_string(),
        activity: fake_leaf("a", ActivityOutcome::PartialError),
    }];

    match tailor_children("root", children, &rules) {
        Err(EngineError::Configuration(msg)) => assert!(msg.contains("'a'")),
        other => panic!("expected configuration error, got {other:?}"),
    }
}

#[test]
fn modify_overrides_mode_and_criticality_and_flows_to_inheriting_children() {
    let group_mode = mode(ExecutionMode::Full);
    let group = composite("group", vec![])
        .with_mode(group_mode.clone())
        .with_child(fake_leaf("inner", ActivityOutcome::Success).with_inherited_mode(&group_mode))
        .with_child(
            fake_leaf("pinned", ActivityOutcome::Success).with_mode(mode(ExecutionMode::Full)),
        );

    let rules = vec![TailoringRule::Modify {
        target: "group".to_string(),
        change: ActivityChange {
            mode: Some(ExecutionMode::Preview),
            criticality: Some(Criticality::Fatal),
            ..ActivityChange::default()
        },
    }];

    let tailored = tailor_children("root", vec![group], &rules).unwrap();
    let group = &tailored[0];
    assert_eq!(group.mode().mode(), ExecutionMode::Preview);
    assert_eq!(group.criticality(), Some(Criticality::Fatal));
    assert_eq!(group.children()[0].mode().mode(), ExecutionMode::Preview);
    assert_eq!(group.children()[1].mode().mode(), ExecutionMode::Full);
}

#[test]
fn modify_reparses_merged_parameters() {
    let children = vec![ActivityDefinition::new("p", WorkDefinition::propagation("ldap"))];

    let mut ok = toml::Table::new();
    ok.insert("resource".to_string(), toml::Value::String("ad".to_string()));
    let tailored = tailor_children(
        "root",
        children.clone(),
        &[TailoringRule::Modify {
            target: "p".to_string(),
            change: ActivityChange {
                parameters: ok,
                ..ActivityChange::default()
            },
        }],
    )
    .unwrap();
    assert_eq!(tailored[0].work(), &WorkDefinition::propagation("ad"));
    // The original list is untouched.
    assert_eq!(children[0].work(), &WorkDefinition::propagation("ldap"));

    let mut bad = toml::Table::new();
    bad.insert("resource".to_string(), toml::Value::Integer(3));
    let err = tailor_children(
        "root",
        children,
        &[TailoringRule::Modify {
            target: "p".to_string(),
            change: ActivityChange {
                parameters: bad,
                ..ActivityChange::default()
            },
        }],
    )
    .unwrap_err();
    assert!(matches!(err, EngineError::Configuration(_)), "got {err:?}");
}

#[tokio::test]
async fn tailoring_is_applied_when_children_are_built() {
    init_tracing();
    let log = ExecutionLog::new();

    let root = composite(
        "root",
        vec![
            fake_leaf("a", ActivityOutcome::Success),
            fake_leaf("b", ActivityOutcome::Success),
        ],
    )
    .with_tailoring(TailoringRule::InsertBefore {
        target: "b".to_string(),
        activity: fake_leaf("x", ActivityOutcome::PartialError),
    })
    .with_tailoring(TailoringRule::Modify {
        target: "b".to_string(),
        change: ActivityChange {
            mode: Some(ExecutionMode::DryRun),
            ..ActivityChange::default()
        },
    });

    let result = with_timeout(run_root(test_registry(&log), beans(), root))
        .await
        .unwrap();

    assert_eq!(log.executed(), vec!["a", "x", "b"]);
    assert_eq!(log.mode_of("b"), Some(ExecutionMode::DryRun));
    assert_eq!(result.outcome, ActivityOutcome::Success);
}
