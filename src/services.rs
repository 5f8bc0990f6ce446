// src/services.rs

//! Shared services a task run needs besides the repository.

use std::fmt::Debug;

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Source of "now". Read once per scan to fix the cutoff.
pub trait Clock: Send + Sync + Debug {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Generates identifiers for individual activity runs (log correlation).
pub trait IdGenerator: Send + Sync + Debug {
    fn next_id(&self) -> String;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn next_id(&self) -> String {
        Uuid::new_v4().to_string()
    }
}
