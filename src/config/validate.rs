// src/config/validate.rs

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::config::model::{RawTaskFile, TaskFile};
use crate::errors::{EngineError, Result};

impl TryFrom<RawTaskFile> for TaskFile {
    type Error = EngineError;

    fn try_from(raw: RawTaskFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_task_file(&raw)?;
        Ok(TaskFile::new_unchecked(raw.task, raw.activity))
    }
}

fn validate_raw_task_file(file: &RawTaskFile) -> Result<()> {
    ensure_has_activities(file)?;
    validate_root(file)?;
    validate_references(file)?;
    validate_acyclic(file)?;
    Ok(())
}

fn ensure_has_activities(file: &RawTaskFile) -> Result<()> {
    if file.activity.is_empty() {
        return Err(EngineError::schema(
            "task file must contain at least one [activity.<id>] section",
        ));
    }
    Ok(())
}

fn validate_root(file: &RawTaskFile) -> Result<()> {
    if !file.activity.contains_key(&file.task.root) {
        return Err(EngineError::configuration(format!(
            "[task].root refers to unknown activity '{}'",
            file.task.root
        )));
    }
    Ok(())
}

fn validate_references(file: &RawTaskFile) -> Result<()> {
    for (id, activity) in file.activity.iter() {
        for reference in activity.references() {
            if !file.activity.contains_key(reference) {
                return Err(EngineError::configuration(format!(
                    "activity '{id}' refers to unknown activity '{reference}'"
                )));
            }
            if reference == id {
                return Err(EngineError::configuration(format!(
                    "activity '{id}' cannot refer to itself"
                )));
            }
        }

        let mut seen = std::collections::BTreeSet::new();
        for child in activity.children.iter() {
            if !seen.insert(child.as_str()) {
                return Err(EngineError::configuration(format!(
                    "activity '{id}' lists child '{child}' more than once"
                )));
            }
        }
    }
    Ok(())
}

fn validate_acyclic(file: &RawTaskFile) -> Result<()> {
    // Edge direction: parent -> referenced activity.
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for id in file.activity.keys() {
        graph.add_node(id.as_str());
    }
    for (id, activity) in file.activity.iter() {
        for reference in activity.references() {
            graph.add_edge(id.as_str(), reference, ());
        }
    }

    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => Err(EngineError::schema(format!(
            "cycle detected in activity tree involving activity '{}'",
            cycle.node_id()
        ))),
    }
}
