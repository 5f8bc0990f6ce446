// src/engine/mod.rs

//! Activity execution engine.
//!
//! This module ties together:
//! - the handler registry that turns definitions into executions
//! - leaf and composite activity executions
//! - the criticality policy consulted between composite children
//! - the task execution that owns the root of the tree
//!
//! Execution within one task is strictly sequential; different tasks share
//! only the registry (read-only) and the repository.

use std::fmt;

pub mod composite;
pub mod context;
pub mod criticality;
pub mod execution;
pub mod leaf;
pub mod registry;
pub mod report;
pub mod task;

pub use composite::{ChildrenProvider, CompositeActivityExecution, DeriveChildren};
pub use context::{TaskBeans, TaskContext};
pub use criticality::{CriticalityPolicy, DefaultCriticalityPolicy};
pub use execution::ActivityExecution;
pub use leaf::{LeafExecution, LeafWork};
pub use registry::{ActivityHandler, ActivityHandlerRegistry};
pub use report::{ActivityReport, Progress};
pub use task::{TaskExecution, TerminalResult};

/// Terminal outcome of an activity (and of a whole task).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActivityOutcome {
    Success,
    /// Some items failed; they are left in a retryable state.
    PartialError,
    FatalError,
    /// Stopped by cancellation; the run can be resumed.
    Interrupted,
}

impl fmt::Display for ActivityOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ActivityOutcome::Success => "SUCCESS",
            ActivityOutcome::PartialError => "PARTIAL_ERROR",
            ActivityOutcome::FatalError => "FATAL_ERROR",
            ActivityOutcome::Interrupted => "INTERRUPTED",
        };
        f.write_str(s)
    }
}

/// Result of running one activity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityRunResult {
    pub outcome: ActivityOutcome,
    /// Free-form diagnostic.
    pub message: Option<String>,
}

impl ActivityRunResult {
    pub fn new(outcome: ActivityOutcome) -> Self {
        Self {
            outcome,
            message: None,
        }
    }

    pub fn success() -> Self {
        Self::new(ActivityOutcome::Success)
    }

    pub fn partial_error(message: impl Into<String>) -> Self {
        Self::new(ActivityOutcome::PartialError).with_message(message)
    }

    pub fn fatal_error(message: impl Into<String>) -> Self {
        Self::new(ActivityOutcome::FatalError).with_message(message)
    }

    pub fn interrupted() -> Self {
        Self::new(ActivityOutcome::Interrupted)
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn is_interrupted(&self) -> bool {
        self.outcome == ActivityOutcome::Interrupted
    }
}

/// Lifecycle of one activity execution.
///
/// Leaves go straight from `Created` to `Running`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionState {
    Created,
    ChildrenBuilt,
    Running,
    Finished,
}
