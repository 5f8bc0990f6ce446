// src/types.rs

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Boxed future returned across the engine's trait seams (activities,
/// handlers, repository).
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// How an activity treats the objects it processes.
///
/// - `Full`: production run; changes are committed.
/// - `Preview`: handlers run, but flagged as simulated; nothing is written by
///   the engine.
/// - `ShadowManagementPreview`: like `Preview`, restricted to shadow
///   management simulation.
/// - `DryRun`: items are evaluated, handlers are not invoked.
/// - `None`: items are only counted.
/// - `BucketAnalysis`: items are only counted (bucket sizing on one worker).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExecutionMode {
    #[default]
    Full,
    Preview,
    ShadowManagementPreview,
    DryRun,
    None,
    BucketAnalysis,
}

impl ExecutionMode {
    /// Whether individual items are visited at all.
    pub fn processes_items(self) -> bool {
        !matches!(self, ExecutionMode::None | ExecutionMode::BucketAnalysis)
    }

    /// Whether item handlers are invoked.
    pub fn invokes_handlers(self) -> bool {
        matches!(
            self,
            ExecutionMode::Full | ExecutionMode::Preview | ExecutionMode::ShadowManagementPreview
        )
    }

    /// Whether the engine itself writes to the repository.
    pub fn persists(self) -> bool {
        matches!(self, ExecutionMode::Full)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ExecutionMode::Full => "full",
            ExecutionMode::Preview => "preview",
            ExecutionMode::ShadowManagementPreview => "shadow-management-preview",
            ExecutionMode::DryRun => "dry-run",
            ExecutionMode::None => "none",
            ExecutionMode::BucketAnalysis => "bucket-analysis",
        }
    }
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExecutionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "full" => Ok(ExecutionMode::Full),
            "preview" => Ok(ExecutionMode::Preview),
            "shadow-management-preview" => Ok(ExecutionMode::ShadowManagementPreview),
            "dry-run" => Ok(ExecutionMode::DryRun),
            "none" => Ok(ExecutionMode::None),
            "bucket-analysis" => Ok(ExecutionMode::BucketAnalysis),
            other => Err(format!(
                "invalid execution mode: {other} (expected one of full, preview, \
                 shadow-management-preview, dry-run, none, bucket-analysis)"
            )),
        }
    }
}

/// Predefined configuration an activity runs with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PredefinedConfiguration {
    #[default]
    Production,
    Development,
}

/// How severe a child's failure is for its parent composite.
///
/// Unset criticality behaves like `Partial`: the parent continues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Criticality {
    Fatal,
    Partial,
}

impl FromStr for Criticality {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "fatal" => Ok(Criticality::Fatal),
            "partial" => Ok(Criticality::Partial),
            other => Err(format!(
                "invalid criticality: {other} (expected \"fatal\" or \"partial\")"
            )),
        }
    }
}
