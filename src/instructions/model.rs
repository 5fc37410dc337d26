// src/instructions/model.rs

use std::collections::BTreeMap;

use serde::Deserialize;

/// Top-level instructions as read from a JSON file.
///
/// This is a direct mapping of the descriptor an instruction-set generator
/// writes next to the orchestrator:
///
/// ```json
/// {
///   "workspace_name": "my_workspace",
///   "commands": [
///     {"path": "tools/lint", "tag": "lint", "args": ["--fix"], "env": {}}
///   ],
///   "jobs": 0,
///   "print_command": true,
///   "buffer_output": true,
///   "keep_going": false,
///   "forward_stdin": false
/// }
/// ```
///
/// All run-level scalars default so that older descriptors still load.
#[derive(Debug, Clone, Deserialize)]
pub struct Instructions {
    /// Workspace the declared command paths are relative to.
    ///
    /// Consumed by the path resolver, never by the executor.
    #[serde(default)]
    pub workspace_name: String,

    /// Ordered list of commands to run. Order is dispatch order.
    #[serde(default)]
    pub commands: Vec<CommandSpec>,

    /// 0 = run all commands concurrently with unbounded width;
    /// 1 = serial; N > 1 = concurrent with at most N children in flight.
    #[serde(default)]
    pub jobs: usize,

    /// Print each command's tag as/when it runs.
    #[serde(default)]
    pub print_command: bool,

    /// Capture each child's combined stdout+stderr and print it as one
    /// block instead of streaming it live.
    #[serde(default)]
    pub buffer_output: bool,

    /// Serial mode only: continue past a failing command.
    #[serde(default)]
    pub keep_going: bool,

    /// Concurrent mode only: broadcast the orchestrator's stdin to every
    /// running child, line by line.
    #[serde(default)]
    pub forward_stdin: bool,
}

/// One declared unit of work.
#[derive(Debug, Clone, Deserialize)]
pub struct CommandSpec {
    /// Declared executable location; resolved to an invocable path before
    /// dispatch.
    pub path: String,

    /// Human-readable label. Not necessarily unique.
    pub tag: String,

    /// Arguments appended after the path.
    #[serde(default)]
    pub args: Vec<String>,

    /// Extra/overriding environment variables; keys win over the parent
    /// environment on conflict.
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}
