// src/engine/task.rs

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::definition::ActivityDefinition;
use crate::engine::context::{TaskBeans, TaskContext};
use crate::engine::criticality::{CriticalityPolicy, DefaultCriticalityPolicy};
use crate::engine::registry::ActivityHandlerRegistry;
use crate::engine::report::ActivityReport;
use crate::engine::{ActivityOutcome, ActivityRunResult};
use crate::errors::Result;

/// What a finished task run hands back to task management.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminalResult {
    pub task_id: String,
    pub outcome: ActivityOutcome,
    pub message: Option<String>,
    /// `true` when the root ran in a simulated task execution mode.
    pub simulated: bool,
    pub report: ActivityReport,
}

impl TerminalResult {
    pub fn run_result(&self) -> ActivityRunResult {
        ActivityRunResult {
            outcome: self.outcome,
            message: self.message.clone(),
        }
    }
}

/// One run of a task: owns the root activity execution for its duration.
#[derive(Debug)]
pub struct TaskExecution {
    task_id: String,
    registry: Arc<ActivityHandlerRegistry>,
    beans: TaskBeans,
    criticality: Arc<dyn CriticalityPolicy>,
}

impl TaskExecution {
    pub fn new(
        task_id: impl Into<String>,
        registry: Arc<ActivityHandlerRegistry>,
        beans: TaskBeans,
    ) -> Self {
        Self {
            task_id: task_id.into(),
            registry,
            beans,
            criticality: Arc::new(DefaultCriticalityPolicy),
        }
    }

    pub fn with_criticality_policy(mut self, policy: Arc<dyn CriticalityPolicy>) -> Self {
        self.criticality = policy;
        self
    }

    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    /// Run `root` to completion.
    ///
    /// Structural problems (invalid modes, unknown kinds, bad tailoring) come
    /// back as `Err`; everything else is folded into the terminal result.
    pub async fn start(
        self,
        root: ActivityDefinition,
        cancel: CancellationToken,
    ) -> Result<TerminalResult> {
        let task_mode = root.mode().task_execution_mode()?;
        info!(
            task = %self.task_id,
            root = %root.identifier(),
            mode = %root.mode().mode(),
            task_mode = %task_mode,
            "task run starting"
        );

        let ctx = TaskContext::new(
            self.task_id.clone(),
            self.beans,
            self.registry,
            self.criticality,
            cancel,
        );

        let mut execution = ctx.create_execution(root)?;
        let result = match execution.execute(&ctx).await {
            Ok(result) => result,
            Err(err) => {
                error!(task = %self.task_id, error = %err, "task run aborted");
                return Err(err);
            }
        };

        match result.outcome {
            ActivityOutcome::Success => info!(task = %self.task_id, "task run succeeded"),
            ActivityOutcome::Interrupted => info!(task = %self.task_id, "task run interrupted"),
            ActivityOutcome::PartialError | ActivityOutcome::FatalError => warn!(
                task = %self.task_id,
                outcome = %result.outcome,
                message = result.message.as_deref().unwrap_or(""),
                "task run finished with errors"
            ),
        }

        Ok(TerminalResult {
            task_id: self.task_id,
            outcome: result.outcome,
            message: result.message,
            simulated: task_mode.is_simulated(),
            report: execution.report(),
        })
    }
}
