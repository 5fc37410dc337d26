// src/exec/process.rs

use std::collections::BTreeMap;
use std::io::Read;
use std::path::PathBuf;
use std::process::Stdio;

use anyhow::Result;
use tokio::process::{ChildStdin, Command};
use tokio::sync::{mpsc, watch};
use tracing::{error, info, warn};

use crate::exec::executor::cancelled;
use crate::instructions::CommandSpec;
use crate::resolve::PathResolver;

/// A command ready for dispatch: path resolved, trailing arguments appended,
/// and any host-shell wrapper already folded into the argument vector.
#[derive(Debug, Clone)]
pub struct PreparedCommand {
    pub tag: String,
    pub program: PathBuf,
    pub args: Vec<String>,
    pub env: BTreeMap<String, String>,
}

/// Result of dispatching one command.
///
/// Launch failures and interrupts are ordinary values, not errors: the
/// caller folds them into the aggregate result, and process cleanup is
/// guaranteed by ownership (`kill_on_drop`) on every path.
#[derive(Debug)]
pub enum DispatchOutcome {
    Exited {
        success: bool,
        code: i32,
        /// Combined stdout+stderr, decoded and trimmed of trailing
        /// whitespace. `None` when the child inherited our streams.
        output: Option<String>,
    },
    LaunchFailed,
    Interrupted,
}

/// Turn the declared command list into dispatch-ready commands.
///
/// Each command's argument vector becomes `declared args + extra_args`. On
/// hosts that cannot execute the target directly (Windows), every command is
/// routed through a located `bash`, with the original arguments passed after
/// the script path so argument boundaries survive untouched. A missing shell
/// is a configuration error and aborts before anything is dispatched.
pub fn prepare_commands(
    specs: &[CommandSpec],
    extra_args: &[String],
    resolver: &dyn PathResolver,
) -> Result<Vec<PreparedCommand>> {
    let shell = locate_shell()?;

    let mut prepared = Vec::with_capacity(specs.len());
    for spec in specs {
        let program = resolver.resolve(&spec.path);
        let mut args = spec.args.clone();
        args.extend(extra_args.iter().cloned());

        let (program, args) = match &shell {
            Some(shell) => wrap_in_shell(shell, &program, args),
            None => (program, args),
        };

        prepared.push(PreparedCommand {
            tag: spec.tag.clone(),
            program,
            args,
            env: spec.env.clone(),
        });
    }
    Ok(prepared)
}

/// `bash -c '<path> "$@"' -- <args...>`: the script path is baked into the
/// `-c` string while the user arguments travel as positional parameters, so
/// nothing is re-split on whitespace.
fn wrap_in_shell(
    shell: &PathBuf,
    program: &PathBuf,
    args: Vec<String>,
) -> (PathBuf, Vec<String>) {
    let unix_path = program.display().to_string().replace('\\', "/");
    let mut wrapped = vec![
        "-c".to_string(),
        format!("{unix_path} \"$@\""),
        "--".to_string(),
    ];
    wrapped.extend(args);
    (shell.clone(), wrapped)
}

#[cfg(windows)]
fn locate_shell() -> Result<Option<PathBuf>> {
    use anyhow::anyhow;

    let path = std::env::var_os("PATH")
        .ok_or_else(|| anyhow!("error: PATH is not set; cannot locate bash.exe"))?;
    for dir in std::env::split_paths(&path) {
        let candidate = dir.join("bash.exe");
        if candidate.is_file() {
            return Ok(Some(candidate));
        }
    }
    Err(anyhow!("error: bash.exe not found in PATH"))
}

#[cfg(not(windows))]
fn locate_shell() -> Result<Option<PathBuf>> {
    Ok(None)
}

/// Launch one command and wait for it to finish.
///
/// The parent environment is inherited with the command's `env` overlaid on
/// top (command keys win). When `buffer_output` is set, the child's stdout
/// and stderr share a single pipe so their interleaving is preserved, and
/// the combined bytes are drained off-loop while we wait. When `stdin_reg`
/// is set, the child's stdin pipe is handed to the fan-out pump immediately
/// after spawn.
///
/// Cancellation kills the child and waits for it to actually terminate
/// before returning `Interrupted`.
pub async fn dispatch(
    cmd: &PreparedCommand,
    buffer_output: bool,
    stdin_reg: Option<&mpsc::Sender<ChildStdin>>,
    cancel: &mut watch::Receiver<bool>,
) -> DispatchOutcome {
    info!(tag = %cmd.tag, program = %cmd.program.display(), "starting command");

    let mut command = Command::new(&cmd.program);
    command.args(&cmd.args).envs(&cmd.env).kill_on_drop(true);

    if stdin_reg.is_some() {
        command.stdin(Stdio::piped());
    }

    let reader = if buffer_output {
        match combined_output_pipe(&mut command) {
            Ok(reader) => Some(reader),
            Err(err) => {
                error!(tag = %cmd.tag, error = %err, "failed to set up output pipe");
                return DispatchOutcome::LaunchFailed;
            }
        }
    } else {
        None
    };

    let mut child = match command.spawn() {
        Ok(child) => child,
        Err(err) => {
            error!(
                tag = %cmd.tag,
                program = %cmd.program.display(),
                args = ?cmd.args,
                error = %err,
                "failed to launch command"
            );
            return DispatchOutcome::LaunchFailed;
        }
    };
    // The Command keeps its copies of the pipe writers alive; drop it now so
    // the reader sees EOF once the child exits.
    drop(command);

    let reader_task = reader.map(|mut reader| {
        tokio::task::spawn_blocking(move || {
            let mut buf = Vec::new();
            let _ = reader.read_to_end(&mut buf);
            buf
        })
    });

    if let Some(reg) = stdin_reg {
        if let Some(stdin) = child.stdin.take() {
            let _ = reg.send(stdin).await;
        }
    }

    let status = tokio::select! {
        res = child.wait() => match res {
            Ok(status) => status,
            Err(err) => {
                error!(tag = %cmd.tag, error = %err, "failed to wait for command");
                return DispatchOutcome::LaunchFailed;
            }
        },
        _ = cancelled(cancel) => {
            if let Err(err) = child.start_kill() {
                warn!(tag = %cmd.tag, error = %err, "failed to kill command on interrupt");
            }
            let _ = child.wait().await;
            info!(tag = %cmd.tag, "command terminated on interrupt");
            return DispatchOutcome::Interrupted;
        }
    };

    let output = match reader_task {
        Some(task) => {
            let bytes = task.await.unwrap_or_default();
            Some(String::from_utf8_lossy(&bytes).trim_end().to_string())
        }
        None => None,
    };

    let code = status.code().unwrap_or(-1);
    info!(
        tag = %cmd.tag,
        exit_code = code,
        success = status.success(),
        "command exited"
    );

    DispatchOutcome::Exited {
        success: status.success(),
        code,
        output,
    }
}

/// Route the child's stdout and stderr into one anonymous pipe and return
/// the read end. A single pipe keeps the child's own interleaving intact.
fn combined_output_pipe(command: &mut Command) -> std::io::Result<std::io::PipeReader> {
    let (reader, writer) = std::io::pipe()?;
    let writer_clone = writer.try_clone()?;
    command.stdout(writer);
    command.stderr(writer_clone);
    Ok(reader)
}
