// src/config/mod.rs

//! Task file loading, validation and resolution.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a task file from disk (`loader.rs`).
//! - Validate references and acyclicity (`validate.rs`).
//! - Resolve the file into an activity definition tree (`resolve.rs`).

pub mod loader;
pub mod model;
pub mod resolve;
pub mod validate;

pub use loader::{default_task_path, load_and_validate, load_from_path, load_task, parse_task_file};
pub use model::{ActivityConfig, RawTaskFile, SimulationConfig, TailoringConfig, TaskFile, TaskSection};
pub use resolve::resolve_task;
