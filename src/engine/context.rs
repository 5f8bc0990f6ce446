// src/engine/context.rs

//! Per-task runtime context threaded through the activity tree.

use std::fmt;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::definition::ActivityDefinition;
use crate::engine::criticality::CriticalityPolicy;
use crate::engine::execution::ActivityExecution;
use crate::engine::registry::ActivityHandlerRegistry;
use crate::errors::Result;
use crate::handlers::trigger::TriggerHandlerRegistry;
use crate::repo::Repository;
use crate::services::{Clock, IdGenerator, SystemClock, UuidGenerator};

/// Shared services available to every activity of a task.
#[derive(Clone)]
pub struct TaskBeans {
    pub repository: Arc<dyn Repository>,
    pub clock: Arc<dyn Clock>,
    pub id_generator: Arc<dyn IdGenerator>,
    pub trigger_handlers: Arc<TriggerHandlerRegistry>,
}

impl TaskBeans {
    /// Beans with the system clock, UUID identifiers and no trigger handlers.
    pub fn new(repository: Arc<dyn Repository>) -> Self {
        Self {
            repository,
            clock: Arc::new(SystemClock),
            id_generator: Arc::new(UuidGenerator),
            trigger_handlers: Arc::new(TriggerHandlerRegistry::new()),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_id_generator(mut self, id_generator: Arc<dyn IdGenerator>) -> Self {
        self.id_generator = id_generator;
        self
    }

    pub fn with_trigger_handlers(mut self, handlers: Arc<TriggerHandlerRegistry>) -> Self {
        self.trigger_handlers = handlers;
        self
    }
}

impl fmt::Debug for TaskBeans {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskBeans")
            .field("clock", &self.clock)
            .field("id_generator", &self.id_generator)
            .field("trigger_handlers", &self.trigger_handlers)
            .finish_non_exhaustive()
    }
}

/// Runtime context of one task run.
///
/// Owned by the [`crate::engine::TaskExecution`] for the duration of the run
/// and lent to every activity execution.
pub struct TaskContext {
    task_id: String,
    beans: TaskBeans,
    registry: Arc<ActivityHandlerRegistry>,
    criticality: Arc<dyn CriticalityPolicy>,
    cancel: CancellationToken,
}

impl TaskContext {
    pub fn new(
        task_id: impl Into<String>,
        beans: TaskBeans,
        registry: Arc<ActivityHandlerRegistry>,
        criticality: Arc<dyn CriticalityPolicy>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            task_id: task_id.into(),
            beans,
            registry,
            criticality,
            cancel,
        }
    }

    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    pub fn beans(&self) -> &TaskBeans {
        &self.beans
    }

    pub fn repository(&self) -> &dyn Repository {
        self.beans.repository.as_ref()
    }

    pub fn criticality(&self) -> &dyn CriticalityPolicy {
        self.criticality.as_ref()
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Validate the definition's execution mode and build its execution
    /// through the registered handler.
    pub fn create_execution(
        &self,
        definition: ActivityDefinition,
    ) -> Result<Box<dyn ActivityExecution>> {
        definition.mode().task_execution_mode()?;
        let handler = self.registry.resolve(definition.work().kind())?;
        handler.create_execution(definition)
    }
}

impl fmt::Debug for TaskContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskContext")
            .field("task_id", &self.task_id)
            .field("registry", &self.registry)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}
