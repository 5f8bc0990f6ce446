#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Arc;

use arbor::config::{ActivityConfig, RawTaskFile, TaskFile, TaskSection};
use arbor::definition::{ActivityDefinition, ExecutionModeDefinition, WorkDefinition};
use arbor::engine::{ActivityHandlerRegistry, ActivityOutcome, TaskBeans};
use arbor::handlers::{register_builtin_handlers, TriggerHandler, TriggerHandlerRegistry};
use arbor::repo::Repository;
use arbor::services::Clock;
use arbor::types::ExecutionMode;

use crate::fake_activity::{fake_work, ExecutionLog, FakeActivityHandler, FAKE_KIND};

/// Builder for `TaskFile` to simplify test setup.
pub struct TaskFileBuilder {
    file: RawTaskFile,
}

impl TaskFileBuilder {
    pub fn new(root: &str) -> Self {
        Self {
            file: RawTaskFile {
                task: TaskSection {
                    id: "test-task".to_string(),
                    root: root.to_string(),
                },
                activity: BTreeMap::new(),
            },
        }
    }

    pub fn with_activity(mut self, id: &str, activity: ActivityConfig) -> Self {
        self.file.activity.insert(id.to_string(), activity);
        self
    }

    pub fn raw(self) -> RawTaskFile {
        self.file
    }

    pub fn build(self) -> TaskFile {
        TaskFile::try_from(self.file).expect("Failed to build valid task file from builder")
    }
}

/// Activity config of `kind` with every optional key unset.
pub fn activity_config(kind: &str) -> ActivityConfig {
    ActivityConfig {
        kind: kind.to_string(),
        mode: None,
        configuration: None,
        simulation: None,
        children: Vec::new(),
        criticality: None,
        tailoring: Vec::new(),
        parameters: toml::Table::new(),
    }
}

/// Composite config with the given children.
pub fn composite_config(children: &[&str]) -> ActivityConfig {
    let mut config = activity_config("composite");
    config.children = children.iter().map(|c| c.to_string()).collect();
    config
}

/// Composite definition with declared children.
pub fn composite(id: &str, children: Vec<ActivityDefinition>) -> ActivityDefinition {
    ActivityDefinition::new(id, WorkDefinition::composite()).with_children(children)
}

/// Fake leaf ending with `outcome`, in the default mode.
pub fn fake_leaf(id: &str, outcome: ActivityOutcome) -> ActivityDefinition {
    ActivityDefinition::new(id, fake_work(outcome))
}

pub fn fake_leaf_inheriting(
    id: &str,
    outcome: ActivityOutcome,
    parent: &ExecutionModeDefinition,
) -> ActivityDefinition {
    fake_leaf(id, outcome).with_inherited_mode(parent)
}

pub fn mode(mode: ExecutionMode) -> ExecutionModeDefinition {
    ExecutionModeDefinition::new(mode)
}

/// Registry with the built-in kinds plus the fake kind recording into `log`.
pub fn test_registry(log: &ExecutionLog) -> Arc<ActivityHandlerRegistry> {
    let mut registry = ActivityHandlerRegistry::new();
    register_builtin_handlers(&mut registry).expect("builtin kinds register once");
    registry
        .register(FAKE_KIND, Arc::new(FakeActivityHandler::new(log.clone())))
        .expect("fake kind registers once");
    Arc::new(registry)
}

/// Trigger handler registry from `(uri, handler)` pairs.
pub fn trigger_registry(
    handlers: Vec<(&str, Arc<dyn TriggerHandler>)>,
) -> Arc<TriggerHandlerRegistry> {
    let mut registry = TriggerHandlerRegistry::new();
    for (uri, handler) in handlers {
        registry
            .register(uri, handler)
            .expect("trigger handler URIs are unique");
    }
    Arc::new(registry)
}

/// Beans over `repository` with a fixed clock and the given trigger
/// handlers.
pub fn beans(
    repository: Arc<dyn Repository>,
    clock: Arc<dyn Clock>,
    trigger_handlers: Arc<TriggerHandlerRegistry>,
) -> TaskBeans {
    TaskBeans::new(repository)
        .with_clock(clock)
        .with_trigger_handlers(trigger_handlers)
}
