// src/engine/composite.rs

//! Composite activity executions.
//!
//! A composite builds its child list once (declared or derived), tailors it,
//! turns every child definition into an execution through the registry and
//! then runs the children strictly in order.

use std::fmt;
use std::sync::Arc;

use anyhow::anyhow;
use tracing::{debug, info, warn};

use crate::definition::{tailor_children, ActivityDefinition};
use crate::engine::context::TaskContext;
use crate::engine::execution::ActivityExecution;
use crate::engine::report::{ActivityReport, Progress};
use crate::engine::{ActivityRunResult, ExecutionState};
use crate::errors::{EngineError, Result};
use crate::types::BoxFuture;

/// Computes child definitions from the parent's work definition.
///
/// Implementations may consult the repository through `ctx`. Returned
/// definitions should inherit the parent's mode unless they have a reason not
/// to.
pub trait DeriveChildren: Send + Sync {
    fn derive<'a>(
        &'a self,
        parent: &'a ActivityDefinition,
        ctx: &'a TaskContext,
    ) -> BoxFuture<'a, Result<Vec<ActivityDefinition>>>;
}

/// Where a composite's children come from.
#[derive(Clone)]
pub enum ChildrenProvider {
    /// The definition's declared children.
    Declared,
    /// Computed at run time.
    Derived(Arc<dyn DeriveChildren>),
}

impl ChildrenProvider {
    pub async fn child_definitions(
        &self,
        parent: &ActivityDefinition,
        ctx: &TaskContext,
    ) -> Result<Vec<ActivityDefinition>> {
        match self {
            ChildrenProvider::Declared => Ok(parent.children().to_vec()),
            ChildrenProvider::Derived(derive) => derive.derive(parent, ctx).await,
        }
    }
}

impl fmt::Debug for ChildrenProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChildrenProvider::Declared => f.write_str("Declared"),
            ChildrenProvider::Derived(_) => f.write_str("Derived(..)"),
        }
    }
}

pub struct CompositeActivityExecution {
    definition: ActivityDefinition,
    provider: ChildrenProvider,
    state: ExecutionState,
    children: Vec<Box<dyn ActivityExecution>>,
    last_result: Option<ActivityRunResult>,
    result: Option<ActivityRunResult>,
}

impl CompositeActivityExecution {
    pub fn new(definition: ActivityDefinition, provider: ChildrenProvider) -> Self {
        Self {
            definition,
            provider,
            state: ExecutionState::Created,
            children: Vec::new(),
            last_result: None,
            result: None,
        }
    }

    /// Composite whose children are the declared ones.
    pub fn declared(definition: ActivityDefinition) -> Self {
        Self::new(definition, ChildrenProvider::Declared)
    }

    /// Composite whose children are computed by `derive`.
    pub fn derived(definition: ActivityDefinition, derive: Arc<dyn DeriveChildren>) -> Self {
        Self::new(definition, ChildrenProvider::Derived(derive))
    }

    /// Result of the child executed most recently.
    pub fn last_result(&self) -> Option<&ActivityRunResult> {
        self.last_result.as_ref()
    }

    pub fn children(&self) -> &[Box<dyn ActivityExecution>] {
        &self.children
    }

    /// Build, tailor, validate and instantiate the child executions.
    ///
    /// Every child's mode is validated before any execution is created, so
    /// a bad mode anywhere in the list leaves no child half-built.
    pub async fn create_children(&mut self, ctx: &TaskContext) -> Result<()> {
        if self.state != ExecutionState::Created {
            return Err(EngineError::Other(anyhow!(
                "children of '{}' were already built",
                self.definition.identifier()
            )));
        }

        let definitions = self
            .provider
            .child_definitions(&self.definition, ctx)
            .await?;
        let definitions = tailor_children(
            self.definition.identifier(),
            definitions,
            self.definition.tailoring(),
        )?;

        for child in &definitions {
            child
                .mode()
                .task_execution_mode()
                .map_err(|e| e.in_activity(child.identifier()))?;
        }

        let mut children = Vec::with_capacity(definitions.len());
        for child in definitions {
            debug!(
                task = %ctx.task_id(),
                activity = %self.definition.identifier(),
                child = %child.identifier(),
                kind = %child.work().kind(),
                "creating child execution"
            );
            children.push(ctx.create_execution(child)?);
        }

        info!(
            task = %ctx.task_id(),
            activity = %self.definition.identifier(),
            provider = ?self.provider,
            children = children.len(),
            "children built"
        );
        self.children = children;
        self.state = ExecutionState::ChildrenBuilt;
        Ok(())
    }

    /// Run the built children in order and return the aggregate result.
    pub async fn execute_children(&mut self, ctx: &TaskContext) -> Result<ActivityRunResult> {
        self.state = ExecutionState::Running;

        if self.children.is_empty() {
            debug!(activity = %self.definition.identifier(), "no children; nothing to do");
            return Ok(ActivityRunResult::success());
        }

        let total = self.children.len();
        for (idx, child) in self.children.iter_mut().enumerate() {
            if ctx.is_cancelled() {
                info!(
                    task = %ctx.task_id(),
                    activity = %self.definition.identifier(),
                    executed = idx,
                    total,
                    "cancellation requested; not starting remaining children"
                );
                let interrupted = ActivityRunResult::interrupted();
                self.last_result = Some(interrupted.clone());
                return Ok(interrupted);
            }

            let result = child.execute(ctx).await?;
            self.last_result = Some(result.clone());

            if result.is_interrupted() {
                info!(
                    task = %ctx.task_id(),
                    activity = %self.definition.identifier(),
                    child = %child.definition().identifier(),
                    "child interrupted; stopping"
                );
                break;
            }

            if ctx.criticality().should_stop(child.definition(), &result) {
                warn!(
                    task = %ctx.task_id(),
                    activity = %self.definition.identifier(),
                    child = %child.definition().identifier(),
                    outcome = %result.outcome,
                    skipped = total - idx - 1,
                    "critical child failed; stopping"
                );
                break;
            }
        }

        Ok(self
            .last_result
            .clone()
            .unwrap_or_else(ActivityRunResult::success))
    }
}

impl ActivityExecution for CompositeActivityExecution {
    fn definition(&self) -> &ActivityDefinition {
        &self.definition
    }

    fn state(&self) -> ExecutionState {
        self.state
    }

    fn execute<'a>(&'a mut self, ctx: &'a TaskContext) -> BoxFuture<'a, Result<ActivityRunResult>> {
        Box::pin(async move {
            if ctx.is_cancelled() {
                info!(
                    task = %ctx.task_id(),
                    activity = %self.definition.identifier(),
                    "cancellation requested before composite start"
                );
                self.state = ExecutionState::Finished;
                let result = ActivityRunResult::interrupted();
                self.result = Some(result.clone());
                return Ok(result);
            }

            if let Err(err) = self.create_children(ctx).await {
                if err.is_structural() {
                    return Err(err);
                }
                warn!(
                    task = %ctx.task_id(),
                    activity = %self.definition.identifier(),
                    error = %err,
                    "children could not be built"
                );
                self.state = ExecutionState::Finished;
                let result = ActivityRunResult::fatal_error(format!(
                    "children of '{}' could not be built: {err}",
                    self.definition.identifier()
                ));
                self.result = Some(result.clone());
                return Ok(result);
            }

            let result = if ctx.is_cancelled() {
                ActivityRunResult::interrupted()
            } else {
                self.execute_children(ctx).await?
            };

            self.state = ExecutionState::Finished;
            info!(
                task = %ctx.task_id(),
                activity = %self.definition.identifier(),
                outcome = %result.outcome,
                "composite finished"
            );
            self.result = Some(result.clone());
            Ok(result)
        })
    }

    fn report(&self) -> ActivityReport {
        ActivityReport {
            identifier: self.definition.identifier().to_string(),
            kind: self.definition.work().kind().to_string(),
            mode: self.definition.mode().mode(),
            state: self.state,
            result: self.result.clone(),
            progress: Progress::default(),
            children: self.children.iter().map(|c| c.report()).collect(),
        }
    }
}
