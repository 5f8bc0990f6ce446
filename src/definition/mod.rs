// src/definition/mod.rs

//! Declarative model of a task's activity tree.
//!
//! - [`work`]: what an activity does ([`WorkDefinition`]).
//! - [`mode`]: how it runs ([`ExecutionModeDefinition`]).
//! - [`activity`]: both combined, plus children and tailoring.
//! - [`tailoring`]: rules that insert or modify children at run time.

pub mod activity;
pub mod mode;
pub mod tailoring;
pub mod work;

pub use activity::{ActivityDefinition, ActivityId};
pub use mode::{
    ConfigurationSelection, ExecutionModeDefinition, SimulationDefinition, TaskExecutionMode,
};
pub use tailoring::{tailor_children, ActivityChange, TailoringRule};
pub use work::{WorkDefinition, WorkSpec};

/// A resolved task: its identifier and the root of its activity tree.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskDefinition {
    pub task_id: String,
    pub root: ActivityDefinition,
}
