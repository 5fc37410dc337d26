// src/instructions/loader.rs

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use crate::instructions::model::Instructions;
use crate::instructions::validate::validate_instructions;

/// Load an instructions file from a given path and return the raw
/// [`Instructions`].
///
/// This only performs JSON deserialization; it does **not** perform semantic
/// validation. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<Instructions> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)
        .with_context(|| format!("reading instructions file at {:?}", path))?;

    let instructions: Instructions = serde_json::from_str(&contents)
        .with_context(|| format!("parsing JSON instructions from {:?}", path))?;

    Ok(instructions)
}

/// Load an instructions file from path and run basic validation.
///
/// This is the recommended entry point for the rest of the application.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<Instructions> {
    let instructions = load_from_path(&path)?;
    validate_instructions(&instructions)?;
    Ok(instructions)
}
