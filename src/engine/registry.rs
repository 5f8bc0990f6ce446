// src/engine/registry.rs

//! Activity handler registry: work-definition kind -> execution factory.
//!
//! The registry is an owned value populated at process start and then shared
//! as `Arc<ActivityHandlerRegistry>`. Once shared it is read-only, so any
//! number of task executions can resolve handlers concurrently.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::definition::ActivityDefinition;
use crate::engine::execution::ActivityExecution;
use crate::errors::{EngineError, Result};

/// Factory producing an [`ActivityExecution`] for a definition of the kind it
/// was registered under.
pub trait ActivityHandler: Send + Sync {
    fn create_execution(&self, definition: ActivityDefinition)
    -> Result<Box<dyn ActivityExecution>>;
}

impl<F> ActivityHandler for F
where
    F: Fn(ActivityDefinition) -> Result<Box<dyn ActivityExecution>> + Send + Sync,
{
    fn create_execution(
        &self,
        definition: ActivityDefinition,
    ) -> Result<Box<dyn ActivityExecution>> {
        self(definition)
    }
}

#[derive(Default)]
pub struct ActivityHandlerRegistry {
    handlers: HashMap<String, Arc<dyn ActivityHandler>>,
}

impl ActivityHandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `kind`.
    ///
    /// Registering the same kind twice is a configuration bug and fails.
    pub fn register(
        &mut self,
        kind: impl Into<String>,
        handler: Arc<dyn ActivityHandler>,
    ) -> Result<()> {
        let kind = kind.into();
        if self.handlers.contains_key(&kind) {
            return Err(EngineError::DuplicateRegistration(format!(
                "activity kind '{kind}' is already registered"
            )));
        }
        debug!(kind = %kind, "registered activity handler");
        self.handlers.insert(kind, handler);
        Ok(())
    }

    pub fn unregister(&mut self, kind: &str) -> Option<Arc<dyn ActivityHandler>> {
        let removed = self.handlers.remove(kind);
        if removed.is_some() {
            debug!(kind = %kind, "unregistered activity handler");
        }
        removed
    }

    pub fn resolve(&self, kind: &str) -> Result<Arc<dyn ActivityHandler>> {
        self.handlers
            .get(kind)
            .cloned()
            .ok_or_else(|| EngineError::UnknownActivityKind(kind.to_string()))
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.handlers.contains_key(kind)
    }

    /// Registered kinds, sorted.
    pub fn kinds(&self) -> Vec<&str> {
        let mut kinds: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        kinds.sort_unstable();
        kinds
    }
}

impl fmt::Debug for ActivityHandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActivityHandlerRegistry")
            .field("kinds", &self.kinds())
            .finish()
    }
}
