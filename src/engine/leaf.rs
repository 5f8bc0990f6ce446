// src/engine/leaf.rs

//! Leaf activity executions.
//!
//! [`LeafExecution`] owns the bookkeeping every leaf shares (state, result,
//! progress, logging); a [`LeafWork`] implementation supplies the domain
//! work itself.

use anyhow::anyhow;
use tracing::{debug, info, warn};

use crate::definition::ActivityDefinition;
use crate::engine::context::TaskContext;
use crate::engine::execution::ActivityExecution;
use crate::engine::report::{ActivityReport, Progress};
use crate::engine::{ActivityOutcome, ActivityRunResult, ExecutionState};
use crate::errors::{EngineError, Result};
use crate::types::BoxFuture;

/// Domain work of a leaf activity.
///
/// Implementations translate item-level failures into the returned result
/// and update `progress`; `Err` is reserved for structural errors.
pub trait LeafWork: Send {
    fn run<'a>(
        &'a mut self,
        definition: &'a ActivityDefinition,
        ctx: &'a TaskContext,
        progress: &'a mut Progress,
    ) -> BoxFuture<'a, Result<ActivityRunResult>>;
}

pub struct LeafExecution<W: LeafWork> {
    definition: ActivityDefinition,
    work: W,
    state: ExecutionState,
    result: Option<ActivityRunResult>,
    progress: Progress,
}

impl<W: LeafWork> LeafExecution<W> {
    pub fn new(definition: ActivityDefinition, work: W) -> Self {
        Self {
            definition,
            work,
            state: ExecutionState::Created,
            result: None,
            progress: Progress::default(),
        }
    }

    pub fn result(&self) -> Option<&ActivityRunResult> {
        self.result.as_ref()
    }

    pub fn progress(&self) -> Progress {
        self.progress
    }
}

impl<W: LeafWork> ActivityExecution for LeafExecution<W> {
    fn definition(&self) -> &ActivityDefinition {
        &self.definition
    }

    fn state(&self) -> ExecutionState {
        self.state
    }

    fn execute<'a>(&'a mut self, ctx: &'a TaskContext) -> BoxFuture<'a, Result<ActivityRunResult>> {
        Box::pin(async move {
            if self.state != ExecutionState::Created {
                return Err(EngineError::Other(anyhow!(
                    "activity '{}' was already executed",
                    self.definition.identifier()
                )));
            }

            if ctx.is_cancelled() {
                info!(
                    task = %ctx.task_id(),
                    activity = %self.definition.identifier(),
                    "cancellation requested before activity start"
                );
                self.state = ExecutionState::Finished;
                let result = ActivityRunResult::interrupted();
                self.result = Some(result.clone());
                return Ok(result);
            }

            self.state = ExecutionState::Running;
            info!(
                task = %ctx.task_id(),
                activity = %self.definition.identifier(),
                work = %self.definition.work(),
                mode = %self.definition.mode().mode(),
                "activity started"
            );

            let result = self
                .work
                .run(&self.definition, ctx, &mut self.progress)
                .await?;

            self.state = ExecutionState::Finished;
            match result.outcome {
                ActivityOutcome::Success | ActivityOutcome::Interrupted => info!(
                    task = %ctx.task_id(),
                    activity = %self.definition.identifier(),
                    outcome = %result.outcome,
                    succeeded = self.progress.succeeded,
                    skipped = self.progress.skipped,
                    "activity finished"
                ),
                ActivityOutcome::PartialError | ActivityOutcome::FatalError => warn!(
                    task = %ctx.task_id(),
                    activity = %self.definition.identifier(),
                    outcome = %result.outcome,
                    succeeded = self.progress.succeeded,
                    failed = self.progress.failed,
                    message = result.message.as_deref().unwrap_or(""),
                    "activity finished with errors"
                ),
            }
            debug!(activity = %self.definition.identifier(), ?result, "leaf result recorded");

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
            progress: self.progress,
            children: Vec::new(),
        }
    }
}
