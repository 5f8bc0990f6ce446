// src/lib.rs

pub mod cli;
pub mod config;
pub mod definition;
pub mod engine;
pub mod errors;
pub mod handlers;
pub mod logging;
pub mod repo;
pub mod services;
pub mod types;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::load_task;
use crate::definition::{ActivityDefinition, TailoringRule, TaskDefinition};
use crate::engine::{ActivityOutcome, TaskBeans, TaskExecution};
use crate::handlers::{
    builtin_registry, LoggingTriggerHandler, TriggerHandlerRegistry, LOG_HANDLER_URI,
};
use crate::repo::InMemoryRepository;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - task file loading and resolution
/// - the in-memory repository (optionally seeded from a fixture)
/// - built-in activity and trigger handlers
/// - Ctrl-C handling
///
/// Returns the terminal outcome of the run.
pub async fn run(args: CliArgs) -> Result<ActivityOutcome> {
    let task_path = PathBuf::from(&args.task);
    let task = load_task(&task_path)?;

    if args.dry_run {
        print_dry_run(&task);
        return Ok(ActivityOutcome::Success);
    }

    let repository = match &args.objects {
        Some(path) => InMemoryRepository::load_fixture(path)?,
        None => InMemoryRepository::new(),
    };
    info!(objects = repository.snapshot().len(), "repository ready");

    let registry = Arc::new(builtin_registry()?);
    let mut trigger_handlers = TriggerHandlerRegistry::new();
    trigger_handlers.register(LOG_HANDLER_URI, Arc::new(LoggingTriggerHandler))?;

    let beans = TaskBeans::new(Arc::new(repository.clone()))
        .with_trigger_handlers(Arc::new(trigger_handlers));

    // Ctrl-C → cancel the run at the next activity or object boundary.
    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            info!("Ctrl+C received; cancelling task run");
            cancel.cancel();
        });
    }

    let execution = TaskExecution::new(task.task_id.clone(), registry, beans);
    let result = execution.start(task.root, cancel).await?;

    print!("{}", result.report.render());
    match &result.message {
        Some(msg) => println!("{}: {} ({msg})", result.task_id, result.outcome),
        None => println!("{}: {}", result.task_id, result.outcome),
    }
    if result.simulated {
        println!("(simulated run; no changes were committed)");
    }

    if args.write_back {
        if let Some(path) = &args.objects {
            repository.save_fixture(path)?;
            info!(path = %path, "repository written back");
        }
    }

    Ok(result.outcome)
}

/// Dry-run output: the resolved activity tree with modes and tailoring.
fn print_dry_run(task: &TaskDefinition) {
    println!("arbor dry-run");
    println!("  task: {}", task.task_id);
    println!();
    print_activity(&task.root, 1);
    debug!("dry-run complete (no execution)");
}

fn print_activity(activity: &ActivityDefinition, depth: usize) {
    let indent = "  ".repeat(depth);
    let inherited = if activity.is_mode_inherited() {
        " (inherited)"
    } else {
        ""
    };
    println!(
        "{indent}- {} [{}] mode={}{inherited}",
        activity.identifier(),
        activity.work(),
        activity.mode().mode()
    );
    if let Some(criticality) = activity.criticality() {
        println!("{indent}    criticality: {criticality:?}");
    }
    for rule in activity.tailoring() {
        match rule {
            TailoringRule::InsertBefore {
                target,
                activity: inserted,
            } => println!(
                "{indent}    tailoring: insert '{}' before '{target}'",
                inserted.identifier()
            ),
            TailoringRule::InsertAfter {
                target,
                activity: inserted,
            } => println!(
                "{indent}    tailoring: insert '{}' after '{target}'",
                inserted.identifier()
            ),
            TailoringRule::Modify { target, change } => {
                println!("{indent}    tailoring: modify '{target}' {change:?}")
            }
        }
    }
    for child in activity.children() {
        print_activity(child, depth + 1);
    }
}
