// src/exec/mod.rs

//! Process execution layer.
//!
//! This module is the engine: it turns prepared commands into OS processes
//! with `tokio::process::Command`, schedules them serially or concurrently,
//! and folds their exit statuses into one run result.
//!
//! - [`executor`] owns the scheduling policy, output ordering, and the
//!   aggregate result.
//! - [`process`] owns command preparation (path resolution glue, host-shell
//!   fallback) and single-command dispatch.
//! - [`stdin`] owns the stdin fan-out pump used by concurrent runs.

pub mod executor;
pub mod process;
pub mod stdin;

pub use executor::{Executor, RunConfig, RunResult};
pub use process::{dispatch, prepare_commands, DispatchOutcome, PreparedCommand};
pub use stdin::{spawn_stdin_fanout, StdinFanout};
