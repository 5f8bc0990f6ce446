// tests/property/ordering.rs

use std::sync::Arc;

use arbor::engine::{ActivityOutcome, TaskBeans};
use arbor::repo::InMemoryRepository;
use arbor_test_utils::builders::{composite, fake_leaf, test_registry};
use arbor_test_utils::fake_activity::ExecutionLog;
use arbor_test_utils::run_root;
use proptest::prelude::*;

fn outcome_strategy() -> impl Strategy<Value = ActivityOutcome> {
    prop_oneof![
        Just(ActivityOutcome::Success),
        Just(ActivityOutcome::PartialError),
        Just(ActivityOutcome::FatalError),
    ]
}

fn run_once(outcomes: &[ActivityOutcome]) -> (Vec<String>, ActivityOutcome) {
    let log = ExecutionLog::new();
    let children = outcomes
        .iter()
        .enumerate()
        .map(|(i, outcome)| fake_leaf(&format!("c{i}"), *outcome))
        .collect();
    let root = composite("root", children);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();
    let result = runtime
        .block_on(run_root(
            test_registry(&log),
            TaskBeans::new(Arc::new(InMemoryRepository::new())),
            root,
        ))
        .unwrap();

    (log.executed(), result.outcome)
}

proptest! {
    #[test]
    fn children_run_in_order_and_the_last_result_wins(
        outcomes in proptest::collection::vec(outcome_strategy(), 0..12)
    ) {
        let (executed, outcome) = run_once(&outcomes);

        let expected: Vec<String> = (0..outcomes.len()).map(|i| format!("c{i}")).collect();
        prop_assert_eq!(&executed, &expected);

        let expected_outcome = outcomes.last().copied().unwrap_or(ActivityOutcome::Success);
        prop_assert_eq!(outcome, expected_outcome);

        // Same input, same order.
        let (again, _) = run_once(&outcomes);
        prop_assert_eq!(again, executed);
    }
}
