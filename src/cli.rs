// src/cli.rs

//! CLI argument parsing using `clap`.
//!
//! NOTE: this expects `clap` to be built with the `derive` feature, e.g.:
//! `clap = { version = "4.5.53", features = ["derive"] }` in `Cargo.toml`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `multirun`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "multirun",
    version,
    about = "Run a declared set of commands serially or concurrently.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the instructions file (JSON).
    #[arg(value_name = "INSTRUCTIONS")]
    pub instructions: String,

    /// Extra arguments appended, in order, to every command's argument list.
    #[arg(
        value_name = "EXTRA_ARGS",
        trailing_var_arg = true,
        allow_hyphen_values = true
    )]
    pub extra_args: Vec<String>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `MULTIRUN_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse the instructions and print the prepared commands, but don't
    /// execute anything.
    #[arg(long)]
    pub dry_run: bool,
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
