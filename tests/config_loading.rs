// tests/config_loading.rs

use std::io::Write;
use std::sync::Arc;

use arbor::config::{load_and_validate, load_task, resolve_task, TailoringConfig};
use arbor::definition::{TailoringRule, WorkSpec};
use arbor::engine::{ActivityOutcome, TaskBeans};
use arbor::errors::EngineError;
use arbor::handlers::builtin_registry;
use arbor::repo::InMemoryRepository;
use arbor::types::{Criticality, ExecutionMode, PredefinedConfiguration};
use arbor_test_utils::builders::{activity_config, composite_config, TaskFileBuilder};
use arbor_test_utils::{init_tracing, run_root, with_timeout};
use tempfile::NamedTempFile;

fn task_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{contents}").unwrap();
    file
}

const NIGHTLY: &str = r#"
[task]
id = "nightly-maintenance"
root = "main"

[activity.main]
kind = "composite"
mode = "preview"
children = ["scan", "propagate"]

[[activity.main.tailoring]]
type = "insert-after"
target = "scan"
activity = "extra"

[[activity.main.tailoring]]
type = "modify"
target = "propagate"
criticality = "fatal"

[activity.main.tailoring.parameters]
resources = ["ad"]

[activity.scan]
kind = "trigger-scan"
criticality = "partial"

[activity.extra]
kind = "propagation"
resource = "mail"

[activity.propagate]
kind = "multi-propagation"
mode = "dry-run"
configuration = "development"
resources = ["ldap", "ad"]

[activity.propagate.simulation]
result = "sim-1"
"#;

#[test]
fn task_file_resolves_into_an_activity_tree() {
    let file = task_file(NIGHTLY);
    let task = load_task(file.path()).expect("task file is valid");

    assert_eq!(task.task_id, "nightly-maintenance");
    let root = &task.root;
    assert_eq!(root.identifier(), "main");
    assert_eq!(root.mode().mode(), ExecutionMode::Preview);
    assert!(!root.is_mode_inherited());

    let children: Vec<&str> = root.children().iter().map(|c| c.identifier()).collect();
    assert_eq!(children, vec!["scan", "propagate"]);

    let scan = &root.children()[0];
    assert!(scan.is_mode_inherited());
    assert_eq!(scan.mode().mode(), ExecutionMode::Preview);
    assert_eq!(scan.criticality(), Some(Criticality::Partial));
    assert_eq!(scan.work().spec(), &WorkSpec::TriggerScan);

    let propagate = &root.children()[1];
    assert!(!propagate.is_mode_inherited());
    assert_eq!(propagate.mode().mode(), ExecutionMode::DryRun);
    assert!(!propagate.mode().is_production_configuration());
    assert_eq!(
        propagate.mode().configuration().map(|c| c.predefined),
        Some(PredefinedConfiguration::Development)
    );
    assert_eq!(
        propagate.mode().simulation().and_then(|s| s.result.as_deref()),
        Some("sim-1")
    );
    assert_eq!(
        propagate.work().spec(),
        &WorkSpec::MultiPropagation {
            resources: Some(vec!["ldap".to_string(), "ad".to_string()])
        }
    );

    assert_eq!(root.tailoring().len(), 2);
    match &root.tailoring()[0] {
        TailoringRule::InsertAfter { target, activity } => {
            assert_eq!(target, "scan");
            assert_eq!(activity.identifier(), "extra");
            assert!(activity.is_mode_inherited());
            assert_eq!(activity.mode().mode(), ExecutionMode::Preview);
        }
        other => panic!("unexpected rule {other:?}"),
    }
    match &root.tailoring()[1] {
        TailoringRule::Modify { target, change } => {
            assert_eq!(target, "propagate");
            assert_eq!(change.criticality, Some(Criticality::Fatal));
            assert!(change.parameters.contains_key("resources"));
        }
        other => panic!("unexpected rule {other:?}"),
    }
}

#[tokio::test]
async fn resolved_task_file_runs() {
    init_tracing();
    let file = task_file(NIGHTLY);
    let task = load_task(file.path()).unwrap();

    let repo = InMemoryRepository::new();
    let result = with_timeout(run_root(
        Arc::new(builtin_registry().unwrap()),
        TaskBeans::new(Arc::new(repo)),
        task.root,
    ))
    .await
    .unwrap();

    assert_eq!(result.outcome, ActivityOutcome::Success);
    assert!(result.simulated);
    let ids: Vec<&str> = result
        .report
        .children
        .iter()
        .map(|c| c.identifier.as_str())
        .collect();
    assert_eq!(ids, vec!["scan", "extra", "propagate"]);
    let propagate = result.report.find("propagate").unwrap();
    assert_eq!(propagate.children.len(), 1, "tailoring narrowed resources to [ad]");
    assert_eq!(propagate.children[0].identifier, "propagation:ad");
}

const PARTIAL_MODE_KEYS: &str = r#"
[task]
root = "main"

[activity.main]
kind = "composite"
mode = "preview"
children = ["scan", "push"]

[activity.scan]
kind = "trigger-scan"
configuration = "development"

[activity.push]
kind = "propagation"
resource = "ldap"

[activity.push.simulation]
result = "sim-2"
"#;

#[test]
fn mode_keys_without_a_mode_layer_over_the_parent_mode() {
    let file = task_file(PARTIAL_MODE_KEYS);
    let task = load_task(file.path()).unwrap();

    let scan = &task.root.children()[0];
    assert!(!scan.is_mode_inherited());
    assert_eq!(scan.mode().mode(), ExecutionMode::Preview);
    assert_eq!(
        scan.mode().configuration().map(|c| c.predefined),
        Some(PredefinedConfiguration::Development)
    );
    assert!(scan.mode().task_execution_mode().is_ok());

    let push = &task.root.children()[1];
    assert_eq!(push.mode().mode(), ExecutionMode::Preview);
    assert_eq!(
        push.mode().simulation().and_then(|s| s.result.as_deref()),
        Some("sim-2")
    );
}

#[tokio::test]
async fn development_configuration_under_a_preview_parent_runs() {
    init_tracing();
    let file = task_file(PARTIAL_MODE_KEYS);
    let task = load_task(file.path()).unwrap();

    let result = with_timeout(run_root(
        Arc::new(builtin_registry().unwrap()),
        TaskBeans::new(Arc::new(InMemoryRepository::new())),
        task.root,
    ))
    .await
    .expect("development configuration is allowed in preview");

    assert_eq!(result.outcome, ActivityOutcome::Success);
    assert!(result.simulated);
    assert_eq!(
        result.report.find("scan").map(|r| r.mode),
        Some(ExecutionMode::Preview)
    );
}

#[test]
fn cycle_is_a_schema_error() {
    let file = task_file(
        r#"
[task]
root = "a"

[activity.a]
kind = "composite"
children = ["b"]

[activity.b]
kind = "composite"
children = ["a"]
"#,
    );

    match load_and_validate(file.path()) {
        Err(EngineError::Schema(msg)) => {
            assert!(msg.contains("cycle detected"));
            assert!(msg.contains("'a'") || msg.contains("'b'"));
        }
        Err(e) => panic!("expected schema error, got: {e:?}"),
        Ok(_) => panic!("expected error, got Ok"),
    }
}

#[test]
fn cycle_through_tailoring_is_detected() {
    let file = task_file(
        r#"
[task]
root = "a"

[activity.a]
kind = "composite"
children = ["b"]

[activity.b]
kind = "composite"

[[activity.b.tailoring]]
type = "insert-before"
target = "x"
activity = "a"
"#,
    );

    assert!(matches!(load_and_validate(file.path()), Err(EngineError::Schema(_))));
}

#[test]
fn unknown_child_is_a_configuration_error() {
    let file = task_file(
        r#"
[task]
root = "a"

[activity.a]
kind = "composite"
children = ["missing"]
"#,
    );

    match load_and_validate(file.path()) {
        Err(EngineError::Configuration(msg)) => {
            assert!(msg.contains("unknown activity"));
            assert!(msg.contains("missing"));
        }
        Err(e) => panic!("expected configuration error, got: {e:?}"),
        Ok(_) => panic!("expected error, got Ok"),
    }
}

#[test]
fn unknown_root_and_self_reference_are_rejected() {
    let unknown_root = TaskFileBuilder::new("nope")
        .with_activity("a", composite_config(&[]))
        .raw();
    assert!(matches!(
        arbor::config::TaskFile::try_from(unknown_root),
        Err(EngineError::Configuration(_))
    ));

    let self_ref = TaskFileBuilder::new("a")
        .with_activity("a", composite_config(&["a"]))
        .raw();
    match arbor::config::TaskFile::try_from(self_ref) {
        Err(EngineError::Configuration(msg)) => assert!(msg.contains("itself")),
        other => panic!("expected configuration error, got {other:?}"),
    }
}

#[test]
fn missing_required_parameter_fails_at_resolution() {
    let file = TaskFileBuilder::new("root")
        .with_activity("root", composite_config(&["push"]))
        .with_activity("push", activity_config("propagation"))
        .build();

    match resolve_task(&file) {
        Err(EngineError::Configuration(msg)) => {
            assert!(msg.contains("'push'"), "{msg}");
            assert!(msg.contains("resource"), "{msg}");
        }
        other => panic!("expected configuration error, got {other:?}"),
    }
}

#[test]
fn unknown_parameter_of_a_builtin_kind_is_rejected() {
    let mut scan = activity_config("trigger-scan");
    scan.parameters
        .insert("interval".to_string(), toml::Value::Integer(5));
    let file = TaskFileBuilder::new("scan").with_activity("scan", scan).build();

    assert!(matches!(resolve_task(&file), Err(EngineError::Configuration(_))));
}

#[test]
fn malformed_toml_is_a_schema_error() {
    let file = task_file("[task\nroot = ");
    assert!(matches!(load_task(file.path()), Err(EngineError::Schema(_))));

    let bad_mode = task_file(
        r#"
[task]
root = "a"

[activity.a]
kind = "composite"
mode = "sometimes"
"#,
    );
    assert!(matches!(load_task(bad_mode.path()), Err(EngineError::Schema(_))));
}

#[test]
fn tailoring_entries_deserialize_by_type() {
    let file = task_file(NIGHTLY);
    let validated = load_and_validate(file.path()).unwrap();
    let main = &validated.activity["main"];

    assert_eq!(main.tailoring.len(), 2);
    assert!(matches!(&main.tailoring[0], TailoringConfig::InsertAfter { activity, .. } if activity == "extra"));
    assert_eq!(main.tailoring[1].target(), "propagate");
    assert!(main.tailoring[1].inserted().is_none());
    // Engine keys never leak into work parameters.
    assert!(main.parameters.is_empty());
    assert!(validated.activity["extra"].parameters.contains_key("resource"));
}
