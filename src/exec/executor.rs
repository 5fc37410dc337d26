// src/exec/executor.rs

use std::sync::Arc;

use tokio::sync::{watch, Semaphore};
use tracing::{error, info};

use crate::exec::process::{dispatch, DispatchOutcome, PreparedCommand};
use crate::exec::stdin::spawn_stdin_fanout;
use crate::instructions::Instructions;

/// Execution policy for one run.
#[derive(Debug, Clone, Copy)]
pub struct RunConfig {
    /// 0 = all commands concurrently, unbounded width;
    /// 1 = serial; N > 1 = concurrent with at most N children in flight.
    pub jobs: usize,
    pub print_command: bool,
    pub buffer_output: bool,
    /// Serial mode only: continue past a failing command.
    pub keep_going: bool,
    /// Concurrent mode only: broadcast our stdin to every child.
    pub forward_stdin: bool,
}

impl From<&Instructions> for RunConfig {
    fn from(instructions: &Instructions) -> Self {
        Self {
            jobs: instructions.jobs,
            print_command: instructions.print_command,
            buffer_output: instructions.buffer_output,
            keep_going: instructions.keep_going,
            forward_stdin: instructions.forward_stdin,
        }
    }
}

/// Aggregate outcome of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunResult {
    /// True iff every command that was started exited zero and the run was
    /// not interrupted.
    pub success: bool,
}

impl RunResult {
    pub fn exit_code(self) -> i32 {
        if self.success { 0 } else { 1 }
    }
}

/// Resolves when the cancel signal fires.
///
/// If the sender side is gone without ever signalling, there is no
/// interrupt to wait for; never resolve.
pub(crate) async fn cancelled(cancel: &mut watch::Receiver<bool>) {
    if cancel.wait_for(|interrupted| *interrupted).await.is_err() {
        std::future::pending::<()>().await;
    }
}

/// The execution engine.
///
/// Owns the prepared command list, the run policy, and the cancel signal.
/// Commands are dispatched either strictly in order (serial) or as one
/// supervised task per command gated by a width-bounding semaphore
/// (concurrent); either way every started child is waited on and drained
/// before the run reports.
pub struct Executor {
    commands: Vec<PreparedCommand>,
    config: RunConfig,
    cancel: watch::Receiver<bool>,
}

impl Executor {
    pub fn new(
        commands: Vec<PreparedCommand>,
        config: RunConfig,
        cancel: watch::Receiver<bool>,
    ) -> Self {
        Self {
            commands,
            config,
            cancel,
        }
    }

    /// Run every command to completion and fold the outcomes into one flag.
    pub async fn run(mut self) -> RunResult {
        if self.commands.is_empty() {
            return RunResult { success: true };
        }

        let width = self.effective_width();
        info!(
            commands = self.commands.len(),
            width,
            serial = width == 1,
            "executor starting"
        );

        let success = if width == 1 {
            self.run_serially().await
        } else {
            self.run_concurrently(width).await
        };

        info!(success, "executor finished");
        RunResult { success }
    }

    /// Number of children allowed in flight at once. An unbounded request
    /// still never exceeds the declared command count.
    fn effective_width(&self) -> usize {
        if self.config.jobs == 0 {
            self.commands.len()
        } else {
            self.config.jobs
        }
    }

    /// Strict-order execution, one child at a time.
    ///
    /// A failure stops the run unless `keep_going` is set; an interrupt
    /// stops it unconditionally, leaving later commands unstarted.
    async fn run_serially(&mut self) -> bool {
        let mut success = true;

        for cmd in &self.commands {
            if *self.cancel.borrow() {
                info!("interrupt received; leaving remaining commands unstarted");
                return false;
            }

            if self.config.print_command {
                println!("{}", cmd.tag);
            }

            let failed = match dispatch(cmd, false, None, &mut self.cancel).await {
                DispatchOutcome::Exited { success: ok, .. } => !ok,
                DispatchOutcome::LaunchFailed => true,
                DispatchOutcome::Interrupted => return false,
            };

            if failed {
                if self.config.keep_going {
                    success = false;
                } else {
                    return false;
                }
            }
        }

        success
    }

    /// Dispatch every command as its own supervised task, then consume the
    /// results in dispatch order.
    ///
    /// The semaphore permit is held from before spawn until the child has
    /// been reaped and its output drained, so the number of live children
    /// never exceeds `width`. All commands are waited on even after a
    /// failure; there is no short-circuit.
    async fn run_concurrently(&mut self, width: usize) -> bool {
        let semaphore = Arc::new(Semaphore::new(width));
        let fanout = if self.config.forward_stdin {
            Some(spawn_stdin_fanout(self.cancel.clone()))
        } else {
            None
        };

        let mut handles = Vec::with_capacity(self.commands.len());
        for cmd in self.commands.iter().cloned() {
            let semaphore = Arc::clone(&semaphore);
            let mut cancel = self.cancel.clone();
            let stdin_reg = fanout.as_ref().map(|f| f.register_sender());
            let buffer_output = self.config.buffer_output;

            handles.push(tokio::spawn(async move {
                let _permit = tokio::select! {
                    permit = semaphore.acquire_owned() => match permit {
                        Ok(permit) => permit,
                        Err(_) => return DispatchOutcome::Interrupted,
                    },
                    _ = cancelled(&mut cancel) => return DispatchOutcome::Interrupted,
                };

                dispatch(&cmd, buffer_output, stdin_reg.as_ref(), &mut cancel).await
            }));
        }

        let mut success = true;
        let mut interrupted = false;

        // Results are consumed in dispatch order: each command's buffered
        // block is printed before the next command's result is even looked
        // at, regardless of completion order.
        for (cmd, handle) in self.commands.iter().zip(handles) {
            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(err) => {
                    error!(tag = %cmd.tag, error = %err, "command task failed");
                    success = false;
                    continue;
                }
            };

            match outcome {
                DispatchOutcome::Exited {
                    success: ok,
                    output,
                    ..
                } => {
                    if !interrupted {
                        if self.config.print_command && self.config.buffer_output {
                            println!("{}", cmd.tag);
                        }
                        if let Some(output) = output {
                            if !output.is_empty() {
                                println!("{output}");
                            }
                        }
                    }
                    if !ok {
                        success = false;
                    }
                }
                DispatchOutcome::LaunchFailed => success = false,
                DispatchOutcome::Interrupted => {
                    success = false;
                    interrupted = true;
                }
            }
        }

        if let Some(fanout) = fanout {
            fanout.shutdown().await;
        }

        success
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::path::PathBuf;

    fn cmd(tag: &str) -> PreparedCommand {
        PreparedCommand {
            tag: tag.to_string(),
            program: PathBuf::from("/bin/true"),
            args: vec![],
            env: BTreeMap::new(),
        }
    }

    fn config(jobs: usize) -> RunConfig {
        RunConfig {
            jobs,
            print_command: false,
            buffer_output: false,
            keep_going: false,
            forward_stdin: false,
        }
    }

    fn executor(jobs: usize, count: usize) -> Executor {
        let (_tx, rx) = watch::channel(false);
        let commands = (0..count).map(|i| cmd(&format!("c{i}"))).collect();
        Executor::new(commands, config(jobs), rx)
    }

    #[test]
    fn zero_jobs_means_width_equals_command_count() {
        assert_eq!(executor(0, 4).effective_width(), 4);
    }

    #[test]
    fn positive_jobs_bound_the_width() {
        assert_eq!(executor(2, 4).effective_width(), 2);
    }

    #[test]
    fn single_command_with_unbounded_jobs_is_serial() {
        assert_eq!(executor(0, 1).effective_width(), 1);
    }

    #[test]
    fn exit_code_follows_success() {
        assert_eq!(RunResult { success: true }.exit_code(), 0);
        assert_eq!(RunResult { success: false }.exit_code(), 1);
    }
}
