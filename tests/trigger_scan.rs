// tests/trigger_scan.rs

use std::sync::Arc;

use arbor::definition::{ActivityDefinition, WorkDefinition};
use arbor::engine::{ActivityOutcome, TerminalResult};
use arbor::errors::HandlerError;
use arbor::handlers::{TriggerContext, TriggerHandler};
use arbor::repo::{InMemoryRepository, RepoObject, Repository, Trigger};
use arbor::types::{BoxFuture, ExecutionMode};
use arbor_test_utils::builders::{beans, mode, test_registry, trigger_registry};
use arbor_test_utils::clock::{time, FixedClock};
use arbor_test_utils::fake_activity::ExecutionLog;
use arbor_test_utils::repo::QuirkyRepository;
use arbor_test_utils::trigger_handlers::{
    DeletingTriggerHandler, FailingTriggerHandler, RecordingTriggerHandler, DELETING_URI,
    FAILING_URI, RECORDING_URI,
};
use arbor_test_utils::{init_tracing, run_root, with_timeout};

/// Shared fixture: a repository, a settable clock and the test handlers.
struct Scan {
    repo: InMemoryRepository,
    clock: Arc<FixedClock>,
    recording: RecordingTriggerHandler,
    failing: FailingTriggerHandler,
    mode: ExecutionMode,
}

impl Scan {
    fn new(objects: Vec<RepoObject>) -> Self {
        init_tracing();
        Self {
            repo: InMemoryRepository::with_objects(objects),
            clock: Arc::new(FixedClock::at(10, 10)),
            recording: RecordingTriggerHandler::new(),
            failing: FailingTriggerHandler::always(),
            mode: ExecutionMode::Full,
        }
    }

    fn with_failing(mut self, failing: FailingTriggerHandler) -> Self {
        self.failing = failing;
        self
    }

    fn with_mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = mode;
        self
    }

    async fn run(&self) -> TerminalResult {
        self.run_against(Arc::new(self.repo.clone())).await
    }

    async fn run_against(&self, repository: Arc<dyn Repository>) -> TerminalResult {
        let handlers = trigger_registry(vec![
            (RECORDING_URI, Arc::new(self.recording.clone()) as Arc<dyn TriggerHandler>),
            (FAILING_URI, Arc::new(self.failing.clone()) as Arc<dyn TriggerHandler>),
        ]);
        self.run_with(repository, handlers).await
    }

    async fn run_with(
        &self,
        repository: Arc<dyn Repository>,
        handlers: Arc<arbor::handlers::TriggerHandlerRegistry>,
    ) -> TerminalResult {
        let root = ActivityDefinition::new("scan", WorkDefinition::trigger_scan())
            .with_mode(mode(self.mode));
        let beans = beans(repository, self.clock.clone(), handlers);
        with_timeout(run_root(test_registry(&ExecutionLog::new()), beans, root))
            .await
            .expect("scan should not abort")
    }

    fn trigger_ids(&self, oid: &str) -> Vec<u64> {
        let mut ids: Vec<u64> = self
            .repo
            .get(oid)
            .map(|o| o.triggers.iter().map(|t| t.id).collect())
            .unwrap_or_default();
        ids.sort_unstable();
        ids
    }
}

fn object(oid: &str, triggers: Vec<Trigger>) -> RepoObject {
    triggers
        .into_iter()
        .fold(RepoObject::new(oid, oid), RepoObject::with_trigger)
}

fn trigger(id: u64, hour: u32, minute: u32, uri: &str) -> Trigger {
    Trigger::new(id, time(hour, minute), uri)
}

#[tokio::test]
async fn failing_trigger_is_kept_and_retried_on_the_next_scan() {
    let scan = Scan::new(vec![object(
        "o",
        vec![
            trigger(1, 10, 0, RECORDING_URI),
            trigger(2, 10, 5, FAILING_URI),
        ],
    )]);

    let first = scan.run().await;
    assert_eq!(first.outcome, ActivityOutcome::PartialError);
    assert_eq!(scan.recording.count_for("o", 1), 1);
    assert_eq!(scan.failing.calls(), 1);
    assert_eq!(scan.trigger_ids("o"), vec![2]);
    assert_eq!(first.report.progress.succeeded, 1);
    assert_eq!(first.report.progress.failed, 1);

    scan.clock.set(time(10, 20));
    let second = scan.run().await;
    assert_eq!(second.outcome, ActivityOutcome::PartialError);
    assert_eq!(scan.recording.count(), 1, "T1 is gone and must not fire again");
    assert_eq!(scan.failing.calls(), 2);
    assert_eq!(scan.trigger_ids("o"), vec![2]);
}

#[tokio::test]
async fn trigger_fires_once_per_pass_even_when_the_object_is_visited_twice() {
    let scan = Scan::new(vec![object("o", vec![trigger(1, 10, 0, RECORDING_URI)])]);

    let result = scan
        .run_against(Arc::new(QuirkyRepository::duplicating(scan.repo.clone())))
        .await;

    assert_eq!(result.outcome, ActivityOutcome::Success);
    assert_eq!(scan.recording.count_for("o", 1), 1);
    assert_eq!(result.report.progress.succeeded, 1);
    assert_eq!(result.report.progress.skipped, 1);
    assert!(scan.trigger_ids("o").is_empty());
}

#[tokio::test]
async fn duplicate_visits_of_a_failing_trigger_do_not_fire_it_twice() {
    let scan = Scan::new(vec![object("o", vec![trigger(1, 10, 0, FAILING_URI)])]);

    let result = scan
        .run_against(Arc::new(QuirkyRepository::duplicating(scan.repo.clone())))
        .await;

    assert_eq!(result.outcome, ActivityOutcome::PartialError);
    assert_eq!(scan.failing.calls(), 1);
    assert_eq!(scan.trigger_ids("o"), vec![1]);
}

#[tokio::test]
async fn retry_until_success_then_the_trigger_is_gone() {
    let scan = Scan::new(vec![object("o", vec![trigger(1, 10, 0, FAILING_URI)])])
        .with_failing(FailingTriggerHandler::failing_times(1));

    let first = scan.run().await;
    assert_eq!(first.outcome, ActivityOutcome::PartialError);
    assert_eq!(scan.trigger_ids("o"), vec![1]);

    let second = scan.run().await;
    assert_eq!(second.outcome, ActivityOutcome::Success);
    assert!(scan.trigger_ids("o").is_empty());
    assert_eq!(scan.failing.calls(), 2);

    let third = scan.run().await;
    assert_eq!(third.outcome, ActivityOutcome::Success);
    assert_eq!(scan.failing.calls(), 2);
}

#[tokio::test]
async fn triggers_after_the_cutoff_are_neither_fired_nor_removed() {
    let scan = Scan::new(vec![
        object("future-only", vec![trigger(1, 10, 30, RECORDING_URI)]),
        object(
            "mixed",
            vec![
                trigger(1, 10, 0, RECORDING_URI),
                trigger(2, 11, 0, RECORDING_URI),
            ],
        ),
    ]);

    let result = scan.run().await;

    assert_eq!(result.outcome, ActivityOutcome::Success);
    assert_eq!(scan.recording.count(), 1);
    assert_eq!(scan.recording.count_for("mixed", 1), 1);
    assert_eq!(scan.trigger_ids("future-only"), vec![1]);
    assert_eq!(scan.trigger_ids("mixed"), vec![2]);
}

#[tokio::test]
async fn trigger_due_exactly_at_the_cutoff_fires() {
    let scan = Scan::new(vec![object("o", vec![trigger(7, 10, 10, RECORDING_URI)])]);

    scan.run().await;

    assert_eq!(scan.recording.count_for("o", 7), 1);
    assert!(scan.trigger_ids("o").is_empty());
}

#[tokio::test]
async fn object_deleted_between_query_and_removal_is_not_an_error() {
    let scan = Scan::new(vec![object("o", vec![trigger(1, 10, 0, RECORDING_URI)])]);

    let result = scan
        .run_against(Arc::new(QuirkyRepository::vanishing(scan.repo.clone())))
        .await;

    assert_eq!(result.outcome, ActivityOutcome::Success);
    assert_eq!(scan.recording.count(), 1);
    assert!(scan.repo.get("o").is_none());
}

#[tokio::test]
async fn handler_deleting_its_object_is_not_an_error() {
    let scan = Scan::new(vec![object("o", vec![trigger(1, 10, 0, DELETING_URI)])]);
    let deleting = DeletingTriggerHandler::new(scan.repo.clone());
    let handlers = trigger_registry(vec![(DELETING_URI, Arc::new(deleting.clone()) as Arc<dyn TriggerHandler>)]);

    let result = scan.run_with(Arc::new(scan.repo.clone()), handlers).await;

    assert_eq!(result.outcome, ActivityOutcome::Success);
    assert_eq!(deleting.count(), 1);
    assert!(scan.repo.get("o").is_none());
}

#[tokio::test]
async fn failed_removal_keeps_the_trigger_and_reports_a_partial_error() {
    let scan = Scan::new(vec![object("o", vec![trigger(1, 10, 0, RECORDING_URI)])]);
    let quirky = Arc::new(QuirkyRepository::failing_modify(scan.repo.clone()));

    let result = scan.run_against(quirky.clone()).await;

    assert_eq!(result.outcome, ActivityOutcome::PartialError);
    assert_eq!(scan.recording.count(), 1);
    assert_eq!(quirky.modify_calls(), 1);
    assert_eq!(scan.trigger_ids("o"), vec![1]);
}

#[tokio::test]
async fn failed_trigger_query_is_a_fatal_error() {
    let scan = Scan::new(vec![object("o", vec![trigger(1, 10, 0, RECORDING_URI)])]);
    let quirky = Arc::new(QuirkyRepository::failing_search(scan.repo.clone()));

    let result = scan.run_against(quirky.clone()).await;

    assert_eq!(result.outcome, ActivityOutcome::FatalError);
    assert!(result.message.as_deref().unwrap_or("").contains("trigger query failed"));
    assert_eq!(scan.recording.count(), 0);
    assert_eq!(quirky.modify_calls(), 0);
    assert_eq!(scan.trigger_ids("o"), vec![1]);
}

#[tokio::test]
async fn trigger_without_a_registered_handler_is_kept() {
    let scan = Scan::new(vec![object("o", vec![trigger(1, 10, 0, "urn:test:trigger:unknown")])]);

    let result = scan.run().await;

    assert_eq!(result.outcome, ActivityOutcome::Success);
    assert_eq!(scan.trigger_ids("o"), vec![1]);
    assert_eq!(result.report.progress.skipped, 1);
}

#[tokio::test]
async fn triggers_fire_in_ascending_timestamp_order() {
    let scan = Scan::new(vec![object(
        "o",
        vec![
            trigger(3, 10, 5, RECORDING_URI),
            trigger(2, 9, 0, RECORDING_URI),
            trigger(9, 9, 30, RECORDING_URI),
            trigger(1, 9, 30, RECORDING_URI),
        ],
    )]);

    scan.run().await;

    let fired: Vec<u64> = scan.recording.calls().iter().map(|c| c.trigger).collect();
    assert_eq!(fired, vec![2, 1, 9, 3]);
}

#[tokio::test]
async fn preview_invokes_handlers_as_simulated_and_keeps_triggers() {
    let scan = Scan::new(vec![object("o", vec![trigger(1, 10, 0, RECORDING_URI)])])
        .with_mode(ExecutionMode::Preview);

    let result = scan.run().await;

    assert!(result.simulated);
    assert_eq!(result.outcome, ActivityOutcome::Success);
    let calls = scan.recording.calls();
    assert_eq!(calls.len(), 1);
    assert!(calls[0].simulated);
    assert_eq!(scan.trigger_ids("o"), vec![1]);
}

#[tokio::test]
async fn dry_run_evaluates_without_invoking_handlers() {
    let scan = Scan::new(vec![object(
        "o",
        vec![
            trigger(1, 10, 0, RECORDING_URI),
            trigger(2, 10, 1, FAILING_URI),
        ],
    )])
    .with_mode(ExecutionMode::DryRun);

    let result = scan.run().await;

    assert_eq!(result.outcome, ActivityOutcome::Success);
    assert_eq!(scan.recording.count(), 0);
    assert_eq!(scan.failing.calls(), 0);
    assert_eq!(result.report.progress.succeeded, 2);
    assert_eq!(scan.trigger_ids("o"), vec![1, 2]);
}

#[tokio::test]
async fn count_only_modes_touch_nothing() {
    for count_mode in [ExecutionMode::None, ExecutionMode::BucketAnalysis] {
        let scan = Scan::new(vec![
            object("a", vec![trigger(1, 10, 0, RECORDING_URI)]),
            object("b", vec![trigger(1, 10, 0, RECORDING_URI)]),
        ])
        .with_mode(count_mode);

        let result = scan.run().await;

        assert_eq!(result.outcome, ActivityOutcome::Success);
        assert_eq!(scan.recording.count(), 0);
        assert_eq!(result.message.as_deref(), Some("2 object(s) with due triggers"));
        assert_eq!(scan.trigger_ids("a"), vec![1]);
    }
}

/// Cancels the task while handling, as an operator stop would.
#[derive(Clone, Default)]
struct CancellingHandler {
    inner: RecordingTriggerHandler,
}

impl TriggerHandler for CancellingHandler {
    fn handle<'a>(
        &'a self,
        object: &'a RepoObject,
        trigger: &'a Trigger,
        ctx: &'a TriggerContext,
    ) -> BoxFuture<'a, Result<(), HandlerError>> {
        Box::pin(async move {
            self.inner.handle(object, trigger, ctx).await?;
            ctx.cancel.cancel();
            Ok(())
        })
    }
}

#[tokio::test]
async fn cancellation_stops_the_scan_between_objects() {
    const CANCELLING_URI: &str = "urn:test:trigger:cancelling";
    let scan = Scan::new(vec![
        object("o1", vec![trigger(1, 10, 0, CANCELLING_URI)]),
        object("o2", vec![trigger(1, 10, 0, CANCELLING_URI)]),
    ]);
    let handler = CancellingHandler::default();
    let handlers = trigger_registry(vec![(CANCELLING_URI, Arc::new(handler.clone()) as Arc<dyn TriggerHandler>)]);

    let result = scan.run_with(Arc::new(scan.repo.clone()), handlers).await;

    assert_eq!(result.outcome, ActivityOutcome::Interrupted);
    assert_eq!(handler.inner.count(), 1);
    assert_eq!(handler.inner.count_for("o1", 1), 1);
    // Removal was cancelled, so the fired trigger fires again next time.
    assert_eq!(scan.trigger_ids("o1"), vec![1]);
    assert_eq!(scan.trigger_ids("o2"), vec![1]);
}
