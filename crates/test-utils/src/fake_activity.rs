use std::sync::{Arc, Mutex};

use arbor::definition::{ActivityDefinition, WorkDefinition};
use arbor::engine::{
    ActivityExecution, ActivityHandler, ActivityOutcome, ActivityRunResult, LeafExecution,
    LeafWork, Progress, TaskContext,
};
use arbor::errors::Result;
use arbor::types::{BoxFuture, ExecutionMode};
use toml::{Table, Value};

/// Kind the fake handler is registered under.
pub const FAKE_KIND: &str = "fake";

/// One recorded fake activity run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutedActivity {
    pub identifier: String,
    pub mode: ExecutionMode,
}

/// Shared record of what the fake handler created and ran.
#[derive(Debug, Clone, Default)]
pub struct ExecutionLog {
    created: Arc<Mutex<Vec<String>>>,
    executed: Arc<Mutex<Vec<ExecutedActivity>>>,
}

impl ExecutionLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Identifiers of executions created, in creation order.
    pub fn created(&self) -> Vec<String> {
        self.created.lock().unwrap().clone()
    }

    /// Identifiers of executions run, in execution order.
    pub fn executed(&self) -> Vec<String> {
        self.executed
            .lock()
            .unwrap()
            .iter()
            .map(|e| e.identifier.clone())
            .collect()
    }

    pub fn runs(&self) -> Vec<ExecutedActivity> {
        self.executed.lock().unwrap().clone()
    }

    pub fn mode_of(&self, identifier: &str) -> Option<ExecutionMode> {
        self.executed
            .lock()
            .unwrap()
            .iter()
            .find(|e| e.identifier == identifier)
            .map(|e| e.mode)
    }
}

/// Handler for `fake` activities.
///
/// Work parameters:
/// - `outcome`: `"success"` (default), `"partial-error"`, `"fatal-error"`,
///   `"interrupted"`
/// - `cancel`: when `true`, cancels the task's token while running
#[derive(Debug, Clone)]
pub struct FakeActivityHandler {
    log: ExecutionLog,
}

impl FakeActivityHandler {
    pub fn new(log: ExecutionLog) -> Self {
        Self { log }
    }
}

impl ActivityHandler for FakeActivityHandler {
    fn create_execution(
        &self,
        definition: ActivityDefinition,
    ) -> Result<Box<dyn ActivityExecution>> {
        self.log
            .created
            .lock()
            .unwrap()
            .push(definition.identifier().to_string());
        let work = FakeWork {
            log: self.log.clone(),
        };
        Ok(Box::new(LeafExecution::new(definition, work)))
    }
}

struct FakeWork {
    log: ExecutionLog,
}

impl LeafWork for FakeWork {
    fn run<'a>(
        &'a mut self,
        definition: &'a ActivityDefinition,
        ctx: &'a TaskContext,
        progress: &'a mut Progress,
    ) -> BoxFuture<'a, Result<ActivityRunResult>> {
        Box::pin(async move {
            self.log.executed.lock().unwrap().push(ExecutedActivity {
                identifier: definition.identifier().to_string(),
                mode: definition.mode().mode(),
            });

            let params = definition.work().parameters();
            if let Some(Value::Boolean(true)) = params.get("cancel") {
                ctx.cancellation().cancel();
            }

            let outcome = params
                .get("outcome")
                .and_then(Value::as_str)
                .map(parse_outcome)
                .unwrap_or(ActivityOutcome::Success);

            match outcome {
                ActivityOutcome::Success => progress.succeeded += 1,
                ActivityOutcome::PartialError | ActivityOutcome::FatalError => {
                    progress.failed += 1
                }
                ActivityOutcome::Interrupted => {}
            }

            Ok(ActivityRunResult::new(outcome)
                .with_message(format!("{} finished", definition.identifier())))
        })
    }
}

pub fn parse_outcome(s: &str) -> ActivityOutcome {
    match s {
        "partial-error" => ActivityOutcome::PartialError,
        "fatal-error" => ActivityOutcome::FatalError,
        "interrupted" => ActivityOutcome::Interrupted,
        _ => ActivityOutcome::Success,
    }
}

pub fn outcome_str(outcome: ActivityOutcome) -> &'static str {
    match outcome {
        ActivityOutcome::Success => "success",
        ActivityOutcome::PartialError => "partial-error",
        ActivityOutcome::FatalError => "fatal-error",
        ActivityOutcome::Interrupted => "interrupted",
    }
}

/// Work definition of a fake activity ending with `outcome`.
pub fn fake_work(outcome: ActivityOutcome) -> WorkDefinition {
    let mut params = Table::new();
    params.insert(
        "outcome".to_string(),
        Value::String(outcome_str(outcome).to_string()),
    );
    WorkDefinition::custom(FAKE_KIND, params).unwrap()
}

/// Work definition of a fake activity that cancels the task while running.
pub fn cancelling_work() -> WorkDefinition {
    let mut params = Table::new();
    params.insert("cancel".to_string(), Value::Boolean(true));
    WorkDefinition::custom(FAKE_KIND, params).unwrap()
}
