use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use arbor::errors::HandlerError;
use arbor::handlers::{TriggerContext, TriggerHandler};
use arbor::repo::{InMemoryRepository, RepoObject, Trigger, TriggerId};
use arbor::types::BoxFuture;

pub const RECORDING_URI: &str = "urn:test:trigger:recording";
pub const FAILING_URI: &str = "urn:test:trigger:failing";
pub const DELETING_URI: &str = "urn:test:trigger:deleting";

/// One handler invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FiredTrigger {
    pub oid: String,
    pub trigger: TriggerId,
    pub simulated: bool,
}

/// Records every invocation and succeeds.
#[derive(Debug, Clone, Default)]
pub struct RecordingTriggerHandler {
    calls: Arc<Mutex<Vec<FiredTrigger>>>,
}

impl RecordingTriggerHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<FiredTrigger> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn count_for(&self, oid: &str, trigger: TriggerId) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.oid == oid && c.trigger == trigger)
            .count()
    }

    fn record(&self, object: &RepoObject, trigger: &Trigger, ctx: &TriggerContext) {
        self.calls.lock().unwrap().push(FiredTrigger {
            oid: object.oid.clone(),
            trigger: trigger.id,
            simulated: ctx.simulated,
        });
    }
}

impl TriggerHandler for RecordingTriggerHandler {
    fn handle<'a>(
        &'a self,
        object: &'a RepoObject,
        trigger: &'a Trigger,
        ctx: &'a TriggerContext,
    ) -> BoxFuture<'a, Result<(), HandlerError>> {
        Box::pin(async move {
            self.record(object, trigger, ctx);
            Ok(())
        })
    }
}

/// Fails a configurable number of times, then succeeds.
#[derive(Debug, Clone)]
pub struct FailingTriggerHandler {
    failures_left: Arc<AtomicUsize>,
    calls: Arc<AtomicUsize>,
}

impl FailingTriggerHandler {
    /// Never succeeds.
    pub fn always() -> Self {
        Self::failing_times(usize::MAX)
    }

    /// Fails the first `n` invocations.
    pub fn failing_times(n: usize) -> Self {
        Self {
            failures_left: Arc::new(AtomicUsize::new(n)),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl TriggerHandler for FailingTriggerHandler {
    fn handle<'a>(
        &'a self,
        object: &'a RepoObject,
        trigger: &'a Trigger,
        _ctx: &'a TriggerContext,
    ) -> BoxFuture<'a, Result<(), HandlerError>> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let failing = self
                .failures_left
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| {
                    if left == 0 {
                        None
                    } else if left == usize::MAX {
                        Some(left)
                    } else {
                        Some(left - 1)
                    }
                })
                .is_ok();
            if failing {
                anyhow::bail!("handler failed for {} trigger {}", object.oid, trigger.id);
            }
            Ok(())
        })
    }
}

/// Deletes the owning object from the repository, then succeeds.
#[derive(Debug, Clone)]
pub struct DeletingTriggerHandler {
    repo: InMemoryRepository,
    inner: RecordingTriggerHandler,
}

impl DeletingTriggerHandler {
    pub fn new(repo: InMemoryRepository) -> Self {
        Self {
            repo,
            inner: RecordingTriggerHandler::new(),
        }
    }

    pub fn count(&self) -> usize {
        self.inner.count()
    }
}

impl TriggerHandler for DeletingTriggerHandler {
    fn handle<'a>(
        &'a self,
        object: &'a RepoObject,
        trigger: &'a Trigger,
        ctx: &'a TriggerContext,
    ) -> BoxFuture<'a, Result<(), HandlerError>> {
        Box::pin(async move {
            self.inner.record(object, trigger, ctx);
            self.repo.remove(&object.oid);
            Ok(())
        })
    }
}
