// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::model::{RawTaskFile, TaskFile};
use crate::config::resolve::resolve_task;
use crate::definition::TaskDefinition;
use crate::errors::{EngineError, Result};

/// Read and deserialize a task file without semantic validation.
///
/// Malformed TOML, or TOML that does not match the task file shape, is a
/// [`EngineError::Schema`] error.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawTaskFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;
    parse_task_file(&contents)
        .map_err(|e| EngineError::schema(format!("{}: {e}", path.display())))
}

/// Deserialize a task file from a string.
pub fn parse_task_file(contents: &str) -> std::result::Result<RawTaskFile, toml::de::Error> {
    toml::from_str(contents)
}

/// Load a task file and validate references and acyclicity.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<TaskFile> {
    let raw = load_from_path(&path)?;
    TaskFile::try_from(raw)
}

/// Load, validate and resolve a task file into a [`TaskDefinition`].
///
/// This is the entry point the binary uses: every configuration problem
/// surfaces here, before anything runs.
pub fn load_task(path: impl AsRef<Path>) -> Result<TaskDefinition> {
    let file = load_and_validate(path)?;
    resolve_task(&file)
}

/// `Task.toml` in the current working directory.
pub fn default_task_path() -> PathBuf {
    PathBuf::from("Task.toml")
}
