pub mod builders;
pub mod clock;
pub mod fake_activity;
pub mod repo;
pub mod trigger_handlers;

use std::sync::{Arc, Once};

use arbor::definition::ActivityDefinition;
use arbor::engine::{ActivityHandlerRegistry, TaskBeans, TaskExecution, TerminalResult};
use arbor::errors::Result;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{fmt, EnvFilter};

static INIT: Once = Once::new();

/// Initialise tracing for tests.
///
/// - Uses `with_test_writer()`, so logs are captured per-test.
/// - The Rust test harness only prints captured output for **failing** tests
///   (unless you run with `-- --nocapture`).
///
/// Enable levels with e.g.:
/// `RUST_LOG=debug cargo test`
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer() // print only for failing tests unless --nocapture
            .with_target(true)
            .init();
    });
}

/// Run a future with a 5-second timeout.
#[allow(dead_code)]
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: std::future::Future<Output = T>,
{
    tokio::time::timeout(std::time::Duration::from_secs(5), f)
        .await
        .expect("Test timed out after 5 seconds")
}

/// Start a task run of `root` with a fresh cancellation token.
pub async fn run_root(
    registry: Arc<ActivityHandlerRegistry>,
    beans: TaskBeans,
    root: ActivityDefinition,
) -> Result<TerminalResult> {
    run_root_with_token(registry, beans, root, CancellationToken::new()).await
}

pub async fn run_root_with_token(
    registry: Arc<ActivityHandlerRegistry>,
    beans: TaskBeans,
    root: ActivityDefinition,
    cancel: CancellationToken,
) -> Result<TerminalResult> {
    TaskExecution::new("test-task", registry, beans)
        .start(root, cancel)
        .await
}
