// src/handlers/propagation.rs

//! Propagation activities.
//!
//! `propagation` pushes pending changes of one resource; `multi-propagation`
//! is a semi-composite that derives one `propagation` child per resource.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::definition::{ActivityDefinition, WorkDefinition, WorkSpec};
use crate::engine::{
    ActivityExecution, ActivityHandler, ActivityRunResult, CompositeActivityExecution,
    DeriveChildren, LeafExecution, LeafWork, Progress, TaskContext,
};
use crate::errors::{EngineError, Result};
use crate::handlers::reject_children;
use crate::repo::{ItemDelta, ObjectQuery, RepoError};
use crate::types::BoxFuture;

/// Factory registered under the `propagation` kind.
#[derive(Debug, Clone, Copy, Default)]
pub struct PropagationHandler;

impl ActivityHandler for PropagationHandler {
    fn create_execution(
        &self,
        definition: ActivityDefinition,
    ) -> Result<Box<dyn ActivityExecution>> {
        let WorkSpec::Propagation { resource } = definition.work().spec() else {
            return Err(EngineError::configuration(format!(
                "activity '{}' of kind '{}' cannot run as a propagation",
                definition.identifier(),
                definition.work().kind()
            )));
        };
        reject_children(&definition)?;
        let work = Propagation {
            resource: resource.clone(),
        };
        Ok(Box::new(LeafExecution::new(definition, work)))
    }
}

/// Leaf work: clear the pending marker of one resource on every object.
#[derive(Debug, Clone)]
pub struct Propagation {
    resource: String,
}

impl Propagation {
    pub fn new(resource: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
        }
    }
}

impl LeafWork for Propagation {
    fn run<'a>(
        &'a mut self,
        definition: &'a ActivityDefinition,
        ctx: &'a TaskContext,
        progress: &'a mut Progress,
    ) -> BoxFuture<'a, Result<ActivityRunResult>> {
        Box::pin(async move {
            let mode = definition.mode().mode();
            let query = ObjectQuery::PendingFor(self.resource.clone());
            let objects = match ctx
                .repository()
                .search_objects(&query, ctx.cancellation())
                .await
            {
                Ok(objects) => objects,
                Err(RepoError::Cancelled) => return Ok(ActivityRunResult::interrupted()),
                Err(err) => {
                    return Ok(ActivityRunResult::fatal_error(format!(
                        "query for pending '{}' changes failed: {err}",
                        self.resource
                    )));
                }
            };

            if !mode.processes_items() {
                progress.skipped += objects.len() as u64;
                return Ok(ActivityRunResult::success());
            }

            for object in &objects {
                if ctx.is_cancelled() {
                    info!(resource = %self.resource, "cancellation requested; stopping propagation");
                    return Ok(ActivityRunResult::interrupted());
                }

                if !mode.persists() {
                    debug!(oid = %object.oid, resource = %self.resource, %mode, "would propagate");
                    progress.succeeded += 1;
                    continue;
                }

                let deltas = vec![ItemDelta::ClearPending(self.resource.clone())];
                match ctx
                    .repository()
                    .modify_object(&object.oid, deltas, ctx.cancellation())
                    .await
                {
                    Ok(()) => {
                        debug!(oid = %object.oid, resource = %self.resource, "propagated");
                        progress.succeeded += 1;
                    }
                    Err(RepoError::NotFound(_)) => {
                        debug!(oid = %object.oid, resource = %self.resource, "object gone before propagation");
                        progress.skipped += 1;
                    }
                    Err(RepoError::Cancelled) => return Ok(ActivityRunResult::interrupted()),
                    Err(err) => {
                        warn!(oid = %object.oid, resource = %self.resource, error = %err, "propagation failed");
                        progress.failed += 1;
                    }
                }
            }

            if progress.failed > 0 {
                Ok(ActivityRunResult::partial_error(format!(
                    "{} object(s) could not be propagated to '{}'",
                    progress.failed, self.resource
                )))
            } else {
                Ok(ActivityRunResult::success())
            }
        })
    }
}

/// Factory registered under the `multi-propagation` kind.
#[derive(Debug, Clone, Copy, Default)]
pub struct MultiPropagationHandler;

impl ActivityHandler for MultiPropagationHandler {
    fn create_execution(
        &self,
        definition: ActivityDefinition,
    ) -> Result<Box<dyn ActivityExecution>> {
        if !matches!(definition.work().spec(), WorkSpec::MultiPropagation { .. }) {
            return Err(EngineError::configuration(format!(
                "activity '{}' of kind '{}' cannot run as a multi-propagation",
                definition.identifier(),
                definition.work().kind()
            )));
        }
        reject_children(&definition)?;
        Ok(Box::new(CompositeActivityExecution::derived(
            definition,
            Arc::new(ResourceFanOut),
        )))
    }
}

/// Derives one `propagation:<resource>` child per resource.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResourceFanOut;

impl DeriveChildren for ResourceFanOut {
    fn derive<'a>(
        &'a self,
        parent: &'a ActivityDefinition,
        ctx: &'a TaskContext,
    ) -> BoxFuture<'a, Result<Vec<ActivityDefinition>>> {
        Box::pin(async move {
            let resources = match parent.work().spec() {
                WorkSpec::MultiPropagation {
                    resources: Some(list),
                } => list.clone(),
                WorkSpec::MultiPropagation { resources: None } => {
                    discover_resources(ctx).await?
                }
                _ => {
                    return Err(EngineError::configuration(format!(
                        "activity '{}' has no resources to fan out over",
                        parent.identifier()
                    )));
                }
            };

            debug!(activity = %parent.identifier(), ?resources, "deriving propagation children");
            Ok(resources
                .into_iter()
                .map(|resource| {
                    ActivityDefinition::new(
                        format!("propagation:{resource}"),
                        WorkDefinition::propagation(resource),
                    )
                    .with_inherited_mode(parent.mode())
                })
                .collect())
        })
    }
}

/// Resources with pending changes on any object, sorted.
///
/// A cancelled query yields no resources; the composite then reports the
/// interruption itself. Other repository errors are returned and turn the
/// multi-propagation into a fatal error.
async fn discover_resources(ctx: &TaskContext) -> Result<Vec<String>> {
    let objects = match ctx
        .repository()
        .search_objects(&ObjectQuery::AnyPending, ctx.cancellation())
        .await
    {
        Ok(objects) => objects,
        Err(RepoError::Cancelled) => return Ok(Vec::new()),
        Err(err) => return Err(err.into()),
    };
    let resources: BTreeSet<String> = objects
        .into_iter()
        .flat_map(|o| o.pending.into_iter())
        .collect();
    Ok(resources.into_iter().collect())
}
