// src/errors.rs

//! Crate-wide error aliases and helpers.

use thiserror::Error;

use crate::repo::RepoError;

/// Structural errors of the engine.
///
/// Anything that reaches the caller as an `EngineError` aborts the task run.
/// Failures of individual handlers are *not* represented here; they are
/// absorbed into the activity result (see [`crate::engine::ActivityOutcome`]).
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Unknown activity kind: {0}")]
    UnknownActivityKind(String),

    #[error("Duplicate registration: {0}")]
    DuplicateRegistration(String),

    #[error("Repository error: {0}")]
    Repository(#[from] RepoError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl EngineError {
    pub fn configuration(msg: impl Into<String>) -> Self {
        EngineError::Configuration(msg.into())
    }

    pub fn schema(msg: impl Into<String>) -> Self {
        EngineError::Schema(msg.into())
    }

    /// Prefix a configuration or schema message with the activity it
    /// concerns. Other variants pass through.
    pub fn in_activity(self, activity: &str) -> Self {
        match self {
            EngineError::Configuration(msg) => {
                EngineError::Configuration(format!("activity '{activity}': {msg}"))
            }
            EngineError::Schema(msg) => EngineError::Schema(format!("activity '{activity}': {msg}")),
            other => other,
        }
    }

    /// Errors in the shape of the task itself. These abort the whole run;
    /// everything else is a runtime failure of one activity.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            EngineError::Configuration(_)
                | EngineError::Schema(_)
                | EngineError::UnknownActivityKind(_)
                | EngineError::DuplicateRegistration(_)
        )
    }
}

/// Error raised by a trigger or activity handler. Always caught by the engine.
pub type HandlerError = anyhow::Error;

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, EngineError>;
