// src/instructions/validate.rs

use anyhow::{anyhow, Result};

use crate::instructions::model::Instructions;

/// Run basic shape validation against loaded instructions.
///
/// This checks:
/// - every command has a non-empty `path`
/// - environment override keys are non-empty
///
/// It does **not** check that paths exist or are executable; a command that
/// cannot be launched is an ordinary per-command failure at run time, not a
/// configuration error.
pub fn validate_instructions(instructions: &Instructions) -> Result<()> {
    for (idx, cmd) in instructions.commands.iter().enumerate() {
        if cmd.path.is_empty() {
            return Err(anyhow!(
                "command #{} (tag '{}') has an empty `path`",
                idx,
                cmd.tag
            ));
        }
        if cmd.env.keys().any(|k| k.is_empty()) {
            return Err(anyhow!(
                "command #{} (tag '{}') has an empty environment variable name",
                idx,
                cmd.tag
            ));
        }
    }
    Ok(())
}
