// src/definition/tailoring.rs

//! Run-time tailoring of child activities.
//!
//! A parent carries rules that are resolved against the identifiers of its
//! *children*. Rules are best-effort: a rule whose target is not among the
//! children is logged and skipped, because the same rule set is shared by
//! configuration variants that do not all contain every activity.

use toml::Table;
use tracing::{debug, info};

use crate::definition::activity::{ActivityDefinition, ActivityId};
use crate::errors::{EngineError, Result};
use crate::types::{Criticality, ExecutionMode};

/// Changes a `Modify` rule applies to its target.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ActivityChange {
    pub mode: Option<ExecutionMode>,
    pub criticality: Option<Criticality>,
    /// Merged over the target's work parameters; the merged set is validated
    /// again.
    pub parameters: Table,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TailoringRule {
    InsertBefore {
        target: ActivityId,
        activity: ActivityDefinition,
    },
    InsertAfter {
        target: ActivityId,
        activity: ActivityDefinition,
    },
    Modify {
        target: ActivityId,
        change: ActivityChange,
    },
}

impl TailoringRule {
    pub fn target(&self) -> &str {
        match self {
            TailoringRule::InsertBefore { target, .. }
            | TailoringRule::InsertAfter { target, .. }
            | TailoringRule::Modify { target, .. } => target,
        }
    }

    pub(crate) fn inserted_activity_mut(&mut self) -> Option<&mut ActivityDefinition> {
        match self {
            TailoringRule::InsertBefore { activity, .. }
            | TailoringRule::InsertAfter { activity, .. } => Some(activity),
            TailoringRule::Modify { .. } => None,
        }
    }
}

/// Apply `rules` in order to a freshly built child list.
///
/// Inserting an activity whose identifier is already taken among the
/// children is a configuration error.
pub fn tailor_children(
    parent: &str,
    mut children: Vec<ActivityDefinition>,
    rules: &[TailoringRule],
) -> Result<Vec<ActivityDefinition>> {
    for rule in rules {
        let target = rule.target();
        let Some(idx) = children.iter().position(|c| c.identifier() == target) else {
            info!(
                activity = %parent,
                target = %target,
                "tailoring rule target not among children; ignoring"
            );
            continue;
        };

        match rule {
            TailoringRule::InsertBefore { activity, .. } => {
                ensure_free_identifier(parent, &children, activity)?;
                debug!(activity = %parent, target = %target, inserted = %activity.identifier(), "tailoring: insert before");
                children.insert(idx, activity.clone());
            }
            TailoringRule::InsertAfter { activity, .. } => {
                ensure_free_identifier(parent, &children, activity)?;
                debug!(activity = %parent, target = %target, inserted = %activity.identifier(), "tailoring: insert after");
                children.insert(idx + 1, activity.clone());
            }
            TailoringRule::Modify { change, .. } => {
                debug!(activity = %parent, target = %target, ?change, "tailoring: modify");
                apply_change(&mut children[idx], change)?;
            }
        }
    }

    Ok(children)
}

fn ensure_free_identifier(
    parent: &str,
    children: &[ActivityDefinition],
    inserted: &ActivityDefinition,
) -> Result<()> {
    if children.iter().any(|c| c.identifier() == inserted.identifier()) {
        return Err(EngineError::configuration(format!(
            "tailoring of '{}' inserts activity '{}' whose identifier is already used by a sibling",
            parent,
            inserted.identifier()
        )));
    }
    Ok(())
}

fn apply_change(child: &mut ActivityDefinition, change: &ActivityChange) -> Result<()> {
    if !change.parameters.is_empty() {
        let work = child
            .work()
            .with_parameters(&change.parameters)
            .map_err(|e| e.in_activity(child.identifier()))?;
        child.replace_work(work);
    }
    if let Some(mode) = change.mode {
        child.override_mode(mode);
    }
    if let Some(criticality) = change.criticality {
        child.replace_criticality(criticality);
    }
    Ok(())
}
