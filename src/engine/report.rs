// src/engine/report.rs

//! Reporting view of an executed activity tree.
//!
//! A task that ends with a partial error still tells operators which
//! activities succeeded and how many items each of them handled.

use std::fmt::Write as _;
use std::ops::AddAssign;

use crate::engine::{ActivityRunResult, ExecutionState};
use crate::types::ExecutionMode;

/// Item counters of one activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Progress {
    pub succeeded: u64,
    pub failed: u64,
    pub skipped: u64,
}

impl Progress {
    pub fn total(&self) -> u64 {
        self.succeeded + self.failed + self.skipped
    }
}

impl AddAssign for Progress {
    fn add_assign(&mut self, rhs: Self) {
        self.succeeded += rhs.succeeded;
        self.failed += rhs.failed;
        self.skipped += rhs.skipped;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityReport {
    pub identifier: String,
    pub kind: String,
    pub mode: ExecutionMode,
    pub state: ExecutionState,
    /// `None` when the activity never ran (e.g. a later sibling after a
    /// fatal stop).
    pub result: Option<ActivityRunResult>,
    pub progress: Progress,
    pub children: Vec<ActivityReport>,
}

impl ActivityReport {
    /// Depth-first search by identifier.
    pub fn find(&self, identifier: &str) -> Option<&ActivityReport> {
        if self.identifier == identifier {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(identifier))
    }

    /// Counters summed over this node and all descendants.
    pub fn total_progress(&self) -> Progress {
        let mut total = self.progress;
        for child in &self.children {
            total += child.total_progress();
        }
        total
    }

    /// Indented, human-readable tree.
    pub fn render(&self) -> String {
        let mut out = String::new();
        self.render_into(&mut out, 0);
        out
    }

    fn render_into(&self, out: &mut String, depth: usize) {
        let outcome = match &self.result {
            Some(r) => r.outcome.to_string(),
            None => "NOT_RUN".to_string(),
        };
        let _ = write!(
            out,
            "{:indent$}- {} [{}] mode={} {}",
            "",
            self.identifier,
            self.kind,
            self.mode,
            outcome,
            indent = depth * 2
        );
        if self.progress.total() > 0 {
            let _ = write!(
                out,
                " (ok={}, failed={}, skipped={})",
                self.progress.succeeded, self.progress.failed, self.progress.skipped
            );
        }
        if let Some(msg) = self.result.as_ref().and_then(|r| r.message.as_deref()) {
            let _ = write!(out, ": {msg}");
        }
        out.push('\n');
        for child in &self.children {
            child.render_into(out, depth + 1);
        }
    }
}
