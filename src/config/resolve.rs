// src/config/resolve.rs

//! Turn a validated [`TaskFile`] into an [`ActivityDefinition`] tree.
//!
//! Activities referenced from several parents are resolved once per
//! reference, so every parent owns an independent copy.

use crate::config::model::{ActivityConfig, TailoringConfig, TaskFile};
use crate::definition::{
    ActivityChange, ActivityDefinition, ExecutionModeDefinition, SimulationDefinition,
    TailoringRule, TaskDefinition, WorkDefinition,
};
use crate::errors::{EngineError, Result};

/// Resolve the whole tree below `[task].root`.
pub fn resolve_task(file: &TaskFile) -> Result<TaskDefinition> {
    let root = resolve_activity(file, &file.task.root, None)?;
    Ok(TaskDefinition {
        task_id: file.task.id.clone(),
        root,
    })
}

fn resolve_activity(
    file: &TaskFile,
    id: &str,
    parent_mode: Option<&ExecutionModeDefinition>,
) -> Result<ActivityDefinition> {
    let config = lookup(file, id)?;

    let work = WorkDefinition::parse(&config.kind, config.parameters.clone())
        .map_err(|e| e.in_activity(id))?;

    let mut definition = ActivityDefinition::new(id, work);
    definition = match (config.declares_mode(), parent_mode) {
        (false, Some(parent)) => definition.with_inherited_mode(parent),
        _ => definition.with_mode(mode_definition(config, parent_mode)),
    };
    if let Some(criticality) = config.criticality {
        definition = definition.with_criticality(criticality);
    }

    let mode = definition.mode().clone();
    for child in config.children.iter() {
        definition = definition.with_child(resolve_activity(file, child, Some(&mode))?);
    }
    for rule in config.tailoring.iter() {
        definition = definition.with_tailoring(resolve_rule(file, rule, &mode)?);
    }

    Ok(definition)
}

fn lookup<'a>(file: &'a TaskFile, id: &str) -> Result<&'a ActivityConfig> {
    file.activity
        .get(id)
        .ok_or_else(|| EngineError::configuration(format!("unknown activity '{id}'")))
}

/// Mode keys the activity declares, layered over the parent's definition.
/// Without a parent the base is a plain FULL run.
fn mode_definition(
    config: &ActivityConfig,
    parent_mode: Option<&ExecutionModeDefinition>,
) -> ExecutionModeDefinition {
    let mut mode = match (config.mode, parent_mode) {
        (Some(declared), _) => ExecutionModeDefinition::new(declared),
        (None, Some(parent)) => parent.clone(),
        (None, None) => ExecutionModeDefinition::default(),
    };
    if let Some(predefined) = config.configuration {
        mode = mode.with_configuration(predefined);
    }
    if let Some(simulation) = &config.simulation {
        mode = mode.with_simulation(SimulationDefinition {
            result: simulation.result.clone(),
        });
    }
    mode
}

fn resolve_rule(
    file: &TaskFile,
    rule: &TailoringConfig,
    parent_mode: &ExecutionModeDefinition,
) -> Result<TailoringRule> {
    Ok(match rule {
        TailoringConfig::InsertBefore { target, activity } => TailoringRule::InsertBefore {
            target: target.clone(),
            activity: resolve_activity(file, activity, Some(parent_mode))?,
        },
        TailoringConfig::InsertAfter { target, activity } => TailoringRule::InsertAfter {
            target: target.clone(),
            activity: resolve_activity(file, activity, Some(parent_mode))?,
        },
        TailoringConfig::Modify {
            target,
            mode,
            criticality,
            parameters,
        } => TailoringRule::Modify {
            target: target.clone(),
            change: ActivityChange {
                mode: *mode,
                criticality: *criticality,
                parameters: parameters.clone(),
            },
        },
    })
}
