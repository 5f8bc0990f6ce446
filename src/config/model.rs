// src/config/model.rs

use std::collections::BTreeMap;

use serde::Deserialize;
use toml::Table;

use crate::types::{Criticality, ExecutionMode, PredefinedConfiguration};

/// Task file exactly as deserialized, before any semantic checks.
///
/// ```toml
/// [task]
/// id = "nightly"
/// root = "main"
///
/// [activity.main]
/// kind = "composite"
/// children = ["scan"]
///
/// [activity.scan]
/// kind = "trigger-scan"
/// ```
///
/// Convert into a [`TaskFile`] with `TaskFile::try_from`, which validates
/// references and acyclicity.
#[derive(Debug, Clone, Deserialize)]
pub struct RawTaskFile {
    pub task: TaskSection,

    /// All activities from `[activity.<id>]`, keyed by identifier.
    #[serde(default)]
    pub activity: BTreeMap<String, ActivityConfig>,
}

/// Validated task file. Only obtainable through `TryFrom<RawTaskFile>`.
#[derive(Debug, Clone)]
pub struct TaskFile {
    pub task: TaskSection,
    pub activity: BTreeMap<String, ActivityConfig>,
}

impl TaskFile {
    pub(crate) fn new_unchecked(
        task: TaskSection,
        activity: BTreeMap<String, ActivityConfig>,
    ) -> Self {
        Self { task, activity }
    }
}

/// `[task]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskSection {
    #[serde(default = "default_task_id")]
    pub id: String,

    /// Identifier of the root activity.
    pub root: String,
}

fn default_task_id() -> String {
    "task".to_string()
}

/// `[activity.<id>]` section.
///
/// Keys the engine does not consume are collected into `parameters` and
/// handed to the work definition of `kind`.
#[derive(Debug, Clone, Deserialize)]
pub struct ActivityConfig {
    pub kind: String,

    /// Inherited from the parent when absent.
    #[serde(default)]
    pub mode: Option<ExecutionMode>,

    #[serde(default)]
    pub configuration: Option<PredefinedConfiguration>,

    #[serde(default)]
    pub simulation: Option<SimulationConfig>,

    /// Identifiers of the declared children, in execution order.
    #[serde(default)]
    pub children: Vec<String>,

    #[serde(default)]
    pub criticality: Option<Criticality>,

    /// Rules applied to this activity's children.
    #[serde(default)]
    pub tailoring: Vec<TailoringConfig>,

    #[serde(flatten)]
    pub parameters: Table,
}

impl ActivityConfig {
    /// Identifiers this activity refers to (children and inserted
    /// activities).
    pub fn references(&self) -> impl Iterator<Item = &str> {
        self.children
            .iter()
            .map(String::as_str)
            .chain(self.tailoring.iter().filter_map(TailoringConfig::inserted))
    }

    /// Whether any execution-mode key is set on this activity.
    pub fn declares_mode(&self) -> bool {
        self.mode.is_some() || self.configuration.is_some() || self.simulation.is_some()
    }
}

/// `[activity.<id>.simulation]`.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct SimulationConfig {
    #[serde(default)]
    pub result: Option<String>,
}

/// `[[activity.<id>.tailoring]]` entry.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum TailoringConfig {
    InsertBefore {
        target: String,
        /// Identifier of another `[activity.*]` entry.
        activity: String,
    },
    InsertAfter {
        target: String,
        activity: String,
    },
    Modify {
        target: String,
        #[serde(default)]
        mode: Option<ExecutionMode>,
        #[serde(default)]
        criticality: Option<Criticality>,
        #[serde(default)]
        parameters: Table,
    },
}

impl TailoringConfig {
    pub fn target(&self) -> &str {
        match self {
            TailoringConfig::InsertBefore { target, .. }
            | TailoringConfig::InsertAfter { target, .. }
            | TailoringConfig::Modify { target, .. } => target,
        }
    }

    pub fn inserted(&self) -> Option<&str> {
        match self {
            TailoringConfig::InsertBefore { activity, .. }
            | TailoringConfig::InsertAfter { activity, .. } => Some(activity),
            TailoringConfig::Modify { .. } => None,
        }
    }
}
