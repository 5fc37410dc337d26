// src/exec/stdin.rs

//! Standard-input fan-out for concurrent runs.
//!
//! One pump task owns the orchestrator's stdin. Workers hand it the stdin
//! pipe of each child they spawn; every line read from the parent is then
//! broadcast (written + flushed) to all currently-launched children. When
//! the parent's input is exhausted the pump drops every pipe, signalling
//! end-of-input to each child. The pump never blocks the wait loop, and the
//! executor joins it before the run reports its result.

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::ChildStdin;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::exec::executor::cancelled;

/// Handle to a running fan-out pump.
pub struct StdinFanout {
    reg_tx: mpsc::Sender<ChildStdin>,
    done_tx: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

impl StdinFanout {
    /// A sender workers use to register a freshly-spawned child's stdin.
    pub fn register_sender(&self) -> mpsc::Sender<ChildStdin> {
        self.reg_tx.clone()
    }

    /// Tell the pump the run is over and wait for it to wind down.
    ///
    /// Any child stdin pipes still held are dropped (closed) on exit.
    pub async fn shutdown(self) {
        drop(self.reg_tx);
        let _ = self.done_tx.send(());
        let _ = self.handle.await;
    }
}

/// Spawn the fan-out pump.
pub fn spawn_stdin_fanout(cancel: watch::Receiver<bool>) -> StdinFanout {
    let (reg_tx, reg_rx) = mpsc::channel::<ChildStdin>(32);
    let (done_tx, done_rx) = oneshot::channel::<()>();

    let handle = tokio::spawn(pump(reg_rx, done_rx, cancel));

    StdinFanout {
        reg_tx,
        done_tx,
        handle,
    }
}

async fn pump(
    mut reg_rx: mpsc::Receiver<ChildStdin>,
    mut done_rx: oneshot::Receiver<()>,
    mut cancel: watch::Receiver<bool>,
) {
    let mut write_cancel = cancel.clone();
    let mut sinks: Vec<ChildStdin> = Vec::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut reg_open = true;

    debug!("stdin fan-out started");

    loop {
        tokio::select! {
            registration = reg_rx.recv(), if reg_open => match registration {
                Some(sink) => sinks.push(sink),
                None => reg_open = false,
            },
            line = lines.next_line() => match line {
                Ok(Some(line)) => {
                    tokio::select! {
                        _ = broadcast_line(&mut sinks, &line) => {}
                        _ = cancelled(&mut write_cancel) => break,
                    }
                }
                Ok(None) | Err(_) => {
                    debug!("parent stdin exhausted; closing child stdin pipes");
                    break;
                }
            },
            _ = &mut done_rx => break,
            _ = cancelled(&mut cancel) => break,
        }
    }

    // Dropping the sinks closes every child's stdin pipe.
    debug!(children = sinks.len(), "stdin fan-out finished");
}

/// Write one line (plus newline) to every registered child and flush.
///
/// Children whose pipe has closed are dropped from the broadcast set.
async fn broadcast_line(sinks: &mut Vec<ChildStdin>, line: &str) {
    let mut idx = 0;
    while idx < sinks.len() {
        let sink = &mut sinks[idx];
        let ok = sink.write_all(line.as_bytes()).await.is_ok()
            && sink.write_all(b"\n").await.is_ok()
            && sink.flush().await.is_ok();

        if ok {
            idx += 1;
        } else {
            debug!("child stdin closed; dropping it from the broadcast set");
            sinks.remove(idx);
        }
    }
}
