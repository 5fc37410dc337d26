// src/instructions/mod.rs

//! Instruction-set loading and validation for multirun.
//!
//! Responsibilities:
//! - Define the JSON-backed data model (`model.rs`).
//! - Load an instructions file from disk (`loader.rs`).
//! - Validate basic shape invariants (`validate.rs`).
//!
//! The instructions file is produced by an external generator; this layer
//! consumes it verbatim and hands an ordered command list to the executor.

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path};
pub use model::{CommandSpec, Instructions};
pub use validate::validate_instructions;
