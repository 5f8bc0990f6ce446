// src/handlers/mod.rs

//! Built-in activity handlers and the trigger handler seam.

use std::sync::Arc;

use crate::definition::work::{COMPOSITE, MULTI_PROPAGATION, PROPAGATION, TRIGGER_SCAN};
use crate::definition::ActivityDefinition;
use crate::engine::ActivityHandlerRegistry;
use crate::errors::{EngineError, Result};

pub mod composite;
pub mod propagation;
pub mod trigger;
pub mod trigger_scan;

pub use composite::CompositeHandler;
pub use propagation::{MultiPropagationHandler, PropagationHandler};
pub use trigger::{
    LoggingTriggerHandler, TriggerContext, TriggerHandler, TriggerHandlerRegistry,
    LOG_HANDLER_URI,
};
pub use trigger_scan::{ScanStats, TriggerScanHandler};

/// Register the four built-in activity kinds.
pub fn register_builtin_handlers(registry: &mut ActivityHandlerRegistry) -> Result<()> {
    registry.register(COMPOSITE, Arc::new(CompositeHandler))?;
    registry.register(TRIGGER_SCAN, Arc::new(TriggerScanHandler))?;
    registry.register(PROPAGATION, Arc::new(PropagationHandler))?;
    registry.register(MULTI_PROPAGATION, Arc::new(MultiPropagationHandler))?;
    Ok(())
}

/// Registry holding the built-in kinds only.
pub fn builtin_registry() -> Result<ActivityHandlerRegistry> {
    let mut registry = ActivityHandlerRegistry::new();
    register_builtin_handlers(&mut registry)?;
    Ok(registry)
}

/// Leaf kinds and derived composites ignore declared children, so declaring
/// any is a configuration mistake.
pub(crate) fn reject_children(definition: &ActivityDefinition) -> Result<()> {
    if definition.children().is_empty() {
        return Ok(());
    }
    Err(EngineError::configuration(format!(
        "activity '{}' of kind '{}' cannot declare children",
        definition.identifier(),
        definition.work().kind()
    )))
}
