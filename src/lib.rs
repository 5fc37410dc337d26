// src/lib.rs

pub mod cli;
pub mod errors;
pub mod exec;
pub mod instructions;
pub mod logging;
pub mod resolve;

use anyhow::Result;
use tokio::sync::watch;
use tracing::debug;

use crate::cli::CliArgs;
use crate::exec::{prepare_commands, Executor, PreparedCommand, RunConfig, RunResult};
use crate::instructions::loader::load_and_validate;
use crate::instructions::Instructions;
use crate::resolve::WorkspaceResolver;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - instructions loading
/// - path resolution + command preparation
/// - Ctrl-C handling
/// - the executor
///
/// Per-command failures are folded into the returned [`RunResult`]; an `Err`
/// here is a configuration error that aborted the run before any command
/// was dispatched.
pub async fn run(args: CliArgs) -> Result<RunResult> {
    let instructions = load_and_validate(&args.instructions)?;

    let resolver = WorkspaceResolver::from_env(instructions.workspace_name.as_str());
    let commands = prepare_commands(&instructions.commands, &args.extra_args, &resolver)?;

    if args.dry_run {
        print_dry_run(&instructions, &commands);
        return Ok(RunResult { success: true });
    }

    // Ctrl-C → cancel signal for the executor.
    let (cancel_tx, cancel_rx) = watch::channel(false);
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            eprintln!("failed to listen for Ctrl+C: {e}");
            return;
        }
        let _ = cancel_tx.send(true);
    });

    let config = RunConfig::from(&instructions);
    let executor = Executor::new(commands, config, cancel_rx);
    Ok(executor.run().await)
}

/// Simple dry-run output: print the run policy and the prepared commands.
fn print_dry_run(instructions: &Instructions, commands: &[PreparedCommand]) {
    println!("multirun dry-run");
    println!("  jobs = {}", instructions.jobs);
    println!("  print_command = {}", instructions.print_command);
    println!("  buffer_output = {}", instructions.buffer_output);
    println!("  keep_going = {}", instructions.keep_going);
    println!("  forward_stdin = {}", instructions.forward_stdin);
    println!();

    println!("commands ({}):", commands.len());
    for cmd in commands {
        println!("  - {}", cmd.tag);
        println!("      path: {}", cmd.program.display());
        if !cmd.args.is_empty() {
            println!("      args: {:?}", cmd.args);
        }
        if !cmd.env.is_empty() {
            println!("      env: {:?}", cmd.env);
        }
    }

    debug!("dry-run complete (no execution)");
}
