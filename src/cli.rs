// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `arbor`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "arbor",
    version,
    about = "Run a hierarchical activity tree against an object repository.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the task file (TOML).
    #[arg(long, value_name = "PATH", default_value = "Task.toml")]
    pub task: String,

    /// Objects fixture to load into the in-memory repository.
    ///
    /// Without it the run starts from an empty repository.
    #[arg(long, value_name = "PATH")]
    pub objects: Option<String>,

    /// Parse, validate and resolve the task; print the activity tree; run
    /// nothing.
    #[arg(long)]
    pub dry_run: bool,

    /// Save the repository back to the `--objects` file after the run.
    #[arg(long, requires = "objects")]
    pub write_back: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `ARBOR_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
