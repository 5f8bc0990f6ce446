// src/handlers/trigger.rs

//! Trigger handlers and their registry.
//!
//! The trigger scanner looks handlers up by the exact URI stored on each
//! trigger. A missing handler is not an error: the trigger is kept and a
//! later scan (after the handler was registered) fires it.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::errors::{EngineError, HandlerError, Result};
use crate::repo::{RepoObject, Repository, Trigger};
use crate::types::BoxFuture;

/// URI of the built-in handler that only logs the fired trigger.
pub const LOG_HANDLER_URI: &str = "urn:arbor:trigger:log";

/// What a trigger handler gets to see besides the object and trigger.
#[derive(Clone)]
pub struct TriggerContext {
    pub task_id: String,
    /// Set in preview modes: the handler must not make persistent changes.
    pub simulated: bool,
    /// Cutoff of the scan that fired the trigger.
    pub cutoff: DateTime<Utc>,
    pub repository: Arc<dyn Repository>,
    pub cancel: CancellationToken,
}

impl fmt::Debug for TriggerContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TriggerContext")
            .field("task_id", &self.task_id)
            .field("simulated", &self.simulated)
            .field("cutoff", &self.cutoff)
            .finish_non_exhaustive()
    }
}

/// Action fired for a due trigger.
///
/// Returning `Err` keeps the trigger for the next scan. Handlers must be
/// idempotent: a trigger can fire again if its removal fails.
pub trait TriggerHandler: Send + Sync {
    fn handle<'a>(
        &'a self,
        object: &'a RepoObject,
        trigger: &'a Trigger,
        ctx: &'a TriggerContext,
    ) -> BoxFuture<'a, std::result::Result<(), HandlerError>>;
}

#[derive(Default)]
pub struct TriggerHandlerRegistry {
    handlers: HashMap<String, Arc<dyn TriggerHandler>>,
}

impl TriggerHandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        uri: impl Into<String>,
        handler: Arc<dyn TriggerHandler>,
    ) -> Result<()> {
        let uri = uri.into();
        if self.handlers.contains_key(&uri) {
            return Err(EngineError::DuplicateRegistration(format!(
                "trigger handler '{uri}' is already registered"
            )));
        }
        debug!(handler = %uri, "registered trigger handler");
        self.handlers.insert(uri, handler);
        Ok(())
    }

    pub fn unregister(&mut self, uri: &str) -> Option<Arc<dyn TriggerHandler>> {
        self.handlers.remove(uri)
    }

    pub fn get(&self, uri: &str) -> Option<Arc<dyn TriggerHandler>> {
        self.handlers.get(uri).cloned()
    }

    pub fn uris(&self) -> Vec<&str> {
        let mut uris: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        uris.sort_unstable();
        uris
    }
}

impl fmt::Debug for TriggerHandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TriggerHandlerRegistry")
            .field("uris", &self.uris())
            .finish()
    }
}

/// Logs the trigger and succeeds.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingTriggerHandler;

impl TriggerHandler for LoggingTriggerHandler {
    fn handle<'a>(
        &'a self,
        object: &'a RepoObject,
        trigger: &'a Trigger,
        ctx: &'a TriggerContext,
    ) -> BoxFuture<'a, std::result::Result<(), HandlerError>> {
        Box::pin(async move {
            info!(
                task = %ctx.task_id,
                oid = %object.oid,
                name = %object.name,
                trigger = trigger.id,
                timestamp = %trigger.timestamp,
                simulated = ctx.simulated,
                parameters = ?trigger.parameters,
                "trigger fired"
            );
            Ok(())
        })
    }
}
