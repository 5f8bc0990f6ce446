// src/engine/execution.rs

use crate::definition::ActivityDefinition;
use crate::engine::context::TaskContext;
use crate::engine::report::ActivityReport;
use crate::engine::{ActivityRunResult, ExecutionState};
use crate::errors::Result;
use crate::types::BoxFuture;

/// One node of a task's runtime tree.
///
/// Leaf executions do concrete work; composite executions build and run
/// child executions. Callers never need to know which one they hold.
///
/// `execute` returns `Err` only for structural problems (bad configuration,
/// unknown kinds) that must abort the whole task. Everything else, including
/// handler failures, is reported through the returned [`ActivityRunResult`].
pub trait ActivityExecution: Send {
    fn definition(&self) -> &ActivityDefinition;

    fn state(&self) -> ExecutionState;

    /// Run the activity. An execution runs at most once.
    fn execute<'a>(&'a mut self, ctx: &'a TaskContext) -> BoxFuture<'a, Result<ActivityRunResult>>;

    /// Snapshot of this node (and its children) for reporting.
    fn report(&self) -> ActivityReport;
}
