// src/definition/mode.rs

//! Execution mode definitions and the derived task execution mode.

use std::fmt;

use crate::errors::{EngineError, Result};
use crate::types::{ExecutionMode, PredefinedConfiguration};

/// Optional simulation result settings for simulated runs.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SimulationDefinition {
    /// Reference to the simulation result the run should report into.
    pub result: Option<String>,
}

/// Which configuration an activity runs with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigurationSelection {
    pub predefined: PredefinedConfiguration,
}

/// Task-level view of an execution mode: does the run commit, and against
/// which configuration is it evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskExecutionMode {
    Production,
    SimulatedProduction,
    SimulatedDevelopment,
    SimulatedShadowsProduction,
    SimulatedShadowsDevelopment,
}

impl TaskExecutionMode {
    pub fn is_simulated(self) -> bool {
        !matches!(self, TaskExecutionMode::Production)
    }

    pub fn is_production_configuration(self) -> bool {
        matches!(
            self,
            TaskExecutionMode::Production
                | TaskExecutionMode::SimulatedProduction
                | TaskExecutionMode::SimulatedShadowsProduction
        )
    }
}

impl fmt::Display for TaskExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskExecutionMode::Production => "production",
            TaskExecutionMode::SimulatedProduction => "simulated-production",
            TaskExecutionMode::SimulatedDevelopment => "simulated-development",
            TaskExecutionMode::SimulatedShadowsProduction => "simulated-shadows-production",
            TaskExecutionMode::SimulatedShadowsDevelopment => "simulated-shadows-development",
        };
        f.write_str(s)
    }
}

/// Execution mode of one activity.
///
/// Cloned by value whenever its activity definition is cloned, so tailored
/// copies never share it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExecutionModeDefinition {
    mode: ExecutionMode,
    configuration: Option<ConfigurationSelection>,
    simulation: Option<SimulationDefinition>,
}

impl ExecutionModeDefinition {
    pub fn new(mode: ExecutionMode) -> Self {
        Self {
            mode,
            configuration: None,
            simulation: None,
        }
    }

    pub fn with_configuration(mut self, predefined: PredefinedConfiguration) -> Self {
        self.configuration = Some(ConfigurationSelection { predefined });
        self
    }

    pub fn with_simulation(mut self, simulation: SimulationDefinition) -> Self {
        self.simulation = Some(simulation);
        self
    }

    pub(crate) fn set_mode(&mut self, mode: ExecutionMode) {
        self.mode = mode;
    }

    pub fn mode(&self) -> ExecutionMode {
        self.mode
    }

    pub fn configuration(&self) -> Option<ConfigurationSelection> {
        self.configuration
    }

    pub fn simulation(&self) -> Option<&SimulationDefinition> {
        self.simulation.as_ref()
    }

    /// Production configuration unless development is explicitly selected.
    pub fn is_production_configuration(&self) -> bool {
        self.configuration
            .map(|c| c.predefined == PredefinedConfiguration::Production)
            .unwrap_or(true)
    }

    /// Derive the task execution mode.
    ///
    /// A full run against development configuration is rejected instead of
    /// being silently downgraded to a simulation.
    pub fn task_execution_mode(&self) -> Result<TaskExecutionMode> {
        let production = self.is_production_configuration();
        match self.mode {
            ExecutionMode::Full => {
                if production {
                    Ok(TaskExecutionMode::Production)
                } else {
                    Err(EngineError::configuration(
                        "full execution mode requires production configuration",
                    ))
                }
            }
            ExecutionMode::Preview => Ok(if production {
                TaskExecutionMode::SimulatedProduction
            } else {
                TaskExecutionMode::SimulatedDevelopment
            }),
            ExecutionMode::ShadowManagementPreview => Ok(if production {
                TaskExecutionMode::SimulatedShadowsProduction
            } else {
                TaskExecutionMode::SimulatedShadowsDevelopment
            }),
            // Nothing is written in these modes; the task mode only selects
            // the configuration.
            ExecutionMode::DryRun | ExecutionMode::None | ExecutionMode::BucketAnalysis => {
                Ok(if production {
                    TaskExecutionMode::Production
                } else {
                    TaskExecutionMode::SimulatedDevelopment
                })
            }
        }
    }
}
