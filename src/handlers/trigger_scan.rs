// src/handlers/trigger_scan.rs

//! Trigger scanner leaf activity.
//!
//! One scan fixes its cutoff from the clock, queries the objects that have a
//! trigger due by then and fires the due triggers object by object. Within a
//! scan a given (object, trigger) pair fires at most once even if the
//! repository hands the same object back twice. A trigger is only removed
//! after its handler succeeded, so failures are retried by the next scan.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::definition::{ActivityDefinition, WorkSpec};
use crate::engine::{
    ActivityExecution, ActivityHandler, ActivityRunResult, LeafExecution, LeafWork, Progress,
    TaskContext,
};
use crate::errors::{EngineError, Result};
use crate::handlers::reject_children;
use crate::handlers::trigger::TriggerContext;
use crate::repo::{ItemDelta, ObjectQuery, Oid, RepoError, RepoObject, Trigger, TriggerId};
use crate::types::{BoxFuture, ExecutionMode};

/// Factory registered under the `trigger-scan` kind.
#[derive(Debug, Clone, Copy, Default)]
pub struct TriggerScanHandler;

impl ActivityHandler for TriggerScanHandler {
    fn create_execution(
        &self,
        definition: ActivityDefinition,
    ) -> Result<Box<dyn ActivityExecution>> {
        if !matches!(definition.work().spec(), WorkSpec::TriggerScan) {
            return Err(EngineError::configuration(format!(
                "activity '{}' of kind '{}' cannot run as a trigger scan",
                definition.identifier(),
                definition.work().kind()
            )));
        }
        reject_children(&definition)?;
        Ok(Box::new(LeafExecution::new(definition, TriggerScan)))
    }
}

/// Counters of one scan pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScanStats {
    pub objects: u64,
    pub fired: u64,
    /// Triggers that would have fired (dry run).
    pub would_fire: u64,
    pub failed: u64,
    /// Due triggers without a registered handler.
    pub unhandled: u64,
    /// Not yet due, or already processed in this pass.
    pub skipped: u64,
}

impl ScanStats {
    fn progress(&self) -> Progress {
        Progress {
            succeeded: self.fired + self.would_fire,
            failed: self.failed,
            skipped: self.unhandled + self.skipped,
        }
    }
}

/// Leaf work of the trigger scanner.
#[derive(Debug, Clone, Copy, Default)]
pub struct TriggerScan;

impl LeafWork for TriggerScan {
    fn run<'a>(
        &'a mut self,
        definition: &'a ActivityDefinition,
        ctx: &'a TaskContext,
        progress: &'a mut Progress,
    ) -> BoxFuture<'a, Result<ActivityRunResult>> {
        Box::pin(async move {
            let mut stats = ScanStats::default();
            let result = scan(definition, ctx, &mut stats).await;
            *progress = stats.progress();
            result
        })
    }
}

enum Flow {
    Continue,
    Interrupted,
}

/// Run one scan pass.
///
/// The processed set lives on this call's stack and is gone when it returns.
pub async fn scan(
    definition: &ActivityDefinition,
    ctx: &TaskContext,
    stats: &mut ScanStats,
) -> Result<ActivityRunResult> {
    let mode = definition.mode().mode();
    let simulated = definition.mode().task_execution_mode()?.is_simulated();
    let scan_id = ctx.beans().id_generator.next_id();
    let cutoff = ctx.beans().clock.now();
    let mut processed: HashSet<(Oid, TriggerId)> = HashSet::new();

    info!(
        task = %ctx.task_id(),
        activity = %definition.identifier(),
        scan = %scan_id,
        %cutoff,
        %mode,
        "trigger scan started"
    );

    let query = ObjectQuery::TriggersDueBy(cutoff);
    let objects = match ctx
        .repository()
        .search_objects(&query, ctx.cancellation())
        .await
    {
        Ok(objects) => objects,
        Err(RepoError::Cancelled) => {
            info!(scan = %scan_id, "trigger query cancelled");
            return Ok(ActivityRunResult::interrupted());
        }
        Err(err) => {
            warn!(scan = %scan_id, error = %err, "trigger query failed");
            return Ok(ActivityRunResult::fatal_error(format!(
                "trigger query failed: {err}"
            )));
        }
    };

    if !mode.processes_items() {
        stats.objects = objects.len() as u64;
        info!(
            scan = %scan_id,
            objects = stats.objects,
            %mode,
            "count-only scan; no triggers evaluated"
        );
        return Ok(ActivityRunResult::success()
            .with_message(format!("{} object(s) with due triggers", stats.objects)));
    }

    let trigger_ctx = TriggerContext {
        task_id: ctx.task_id().to_string(),
        simulated,
        cutoff,
        repository: ctx.beans().repository.clone(),
        cancel: ctx.cancellation().clone(),
    };

    for object in &objects {
        if ctx.is_cancelled() {
            info!(
                scan = %scan_id,
                processed_objects = stats.objects,
                "cancellation requested; stopping scan"
            );
            return Ok(interrupted(stats));
        }
        stats.objects += 1;

        let flow = process_object(
            object,
            mode,
            cutoff,
            ctx,
            &trigger_ctx,
            &mut processed,
            stats,
        )
        .await;
        if let Flow::Interrupted = flow {
            return Ok(interrupted(stats));
        }
    }

    info!(
        task = %ctx.task_id(),
        activity = %definition.identifier(),
        scan = %scan_id,
        objects = stats.objects,
        fired = stats.fired,
        would_fire = stats.would_fire,
        failed = stats.failed,
        unhandled = stats.unhandled,
        skipped = stats.skipped,
        "trigger scan finished"
    );

    if stats.failed > 0 {
        Ok(ActivityRunResult::partial_error(format!(
            "{} trigger(s) failed and were kept for the next scan",
            stats.failed
        )))
    } else {
        Ok(ActivityRunResult::success())
    }
}

async fn process_object(
    object: &RepoObject,
    mode: ExecutionMode,
    cutoff: DateTime<Utc>,
    ctx: &TaskContext,
    trigger_ctx: &TriggerContext,
    processed: &mut HashSet<(Oid, TriggerId)>,
    stats: &mut ScanStats,
) -> Flow {
    let mut triggers: Vec<&Trigger> = object.triggers.iter().collect();
    triggers.sort_by_key(|t| (t.timestamp, t.id));

    for trigger in triggers {
        if !trigger.is_due(cutoff) {
            debug!(oid = %object.oid, trigger = trigger.id, timestamp = %trigger.timestamp, "trigger not due yet");
            stats.skipped += 1;
            continue;
        }

        if !processed.insert((object.oid.clone(), trigger.id)) {
            debug!(oid = %object.oid, trigger = trigger.id, "trigger already processed in this scan");
            stats.skipped += 1;
            continue;
        }

        let Some(handler) = ctx.beans().trigger_handlers.get(&trigger.handler_uri) else {
            warn!(
                oid = %object.oid,
                trigger = trigger.id,
                handler = %trigger.handler_uri,
                "no handler registered for trigger; keeping it"
            );
            stats.unhandled += 1;
            continue;
        };

        if !mode.invokes_handlers() {
            debug!(oid = %object.oid, trigger = trigger.id, handler = %trigger.handler_uri, "trigger would fire");
            stats.would_fire += 1;
            continue;
        }

        if let Err(err) = handler.handle(object, trigger, trigger_ctx).await {
            warn!(
                oid = %object.oid,
                trigger = trigger.id,
                handler = %trigger.handler_uri,
                error = %err,
                "trigger handler failed; keeping trigger"
            );
            stats.failed += 1;
            continue;
        }

        if !mode.persists() {
            debug!(oid = %object.oid, trigger = trigger.id, "simulated fire; trigger kept");
            stats.fired += 1;
            continue;
        }

        match ctx
            .repository()
            .modify_object(
                &object.oid,
                vec![ItemDelta::DeleteTrigger(trigger.id)],
                ctx.cancellation(),
            )
            .await
        {
            Ok(()) => {
                debug!(oid = %object.oid, trigger = trigger.id, "trigger fired and removed");
                stats.fired += 1;
            }
            Err(RepoError::NotFound(_)) => {
                debug!(oid = %object.oid, trigger = trigger.id, "object gone; trigger needs no removal");
                stats.fired += 1;
            }
            Err(RepoError::Cancelled) => {
                info!(oid = %object.oid, trigger = trigger.id, "trigger removal cancelled; it will fire again");
                stats.fired += 1;
                return Flow::Interrupted;
            }
            Err(err) => {
                warn!(
                    oid = %object.oid,
                    trigger = trigger.id,
                    error = %err,
                    "could not remove fired trigger; it will fire again"
                );
                stats.failed += 1;
            }
        }
    }

    Flow::Continue
}

fn interrupted(stats: &ScanStats) -> ActivityRunResult {
    ActivityRunResult::interrupted().with_message(format!(
        "interrupted after {} object(s); {} trigger(s) fired",
        stats.objects, stats.fired
    ))
}
