// src/engine/criticality.rs

use std::fmt::Debug;

use crate::definition::ActivityDefinition;
use crate::engine::{ActivityOutcome, ActivityRunResult};
use crate::types::Criticality;

/// Decides whether a composite stops after a child finished.
///
/// Interrupted children always stop the composite; the policy is consulted
/// for every other result.
pub trait CriticalityPolicy: Send + Sync + Debug {
    fn should_stop(&self, child: &ActivityDefinition, result: &ActivityRunResult) -> bool;
}

/// Continue past errors unless a child with `criticality = "fatal"` ends
/// with a fatal error.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultCriticalityPolicy;

impl CriticalityPolicy for DefaultCriticalityPolicy {
    fn should_stop(&self, child: &ActivityDefinition, result: &ActivityRunResult) -> bool {
        result.outcome == ActivityOutcome::FatalError
            && child.criticality() == Some(Criticality::Fatal)
    }
}
