// src/handlers/composite.rs

use crate::definition::{ActivityDefinition, WorkSpec};
use crate::engine::{ActivityExecution, ActivityHandler, CompositeActivityExecution};
use crate::errors::{EngineError, Result};

/// Factory registered under the `composite` kind: runs the declared
/// children.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompositeHandler;

impl ActivityHandler for CompositeHandler {
    fn create_execution(
        &self,
        definition: ActivityDefinition,
    ) -> Result<Box<dyn ActivityExecution>> {
        if !matches!(definition.work().spec(), WorkSpec::Composite) {
            return Err(EngineError::configuration(format!(
                "activity '{}' of kind '{}' cannot run as a composite",
                definition.identifier(),
                definition.work().kind()
            )));
        }
        Ok(Box::new(CompositeActivityExecution::declared(definition)))
    }
}
