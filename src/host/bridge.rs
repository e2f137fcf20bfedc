//! Line-protocol bridge to one worker process.
//!
//! `submit` writes one JSON job line to the worker's stdin and blocks for
//! the matching result line. Results come back in submission order because
//! the worker is strictly sequential, so no request correlation is needed;
//! a mutex serializes submitters into the same FIFO order.
//!
//! Reading happens on a dedicated thread (pipe reads block) that feeds a
//! channel; that is what makes a submission timeout enforceable. A timeout
//! kills and restarts the worker, losing the warm state. That is the price
//! of bounding latency from outside.

use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{ChildStdin, ChildStdout};
use std::sync::Mutex;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError};
use serde::Serialize;
use thiserror::Error;

use crate::host::process::WorkerProcess;
use crate::worker::outcome::ERROR_SENTINEL;
use crate::{log_info, log_warn};

#[derive(Debug, Error)]
pub enum HostError {
    #[error("failed to spawn worker: {0}")]
    Spawn(std::io::Error),

    #[error("worker i/o failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("job failed: {0}")]
    Job(String),

    #[error("job timed out after {0:?}; worker restarted")]
    Timeout(Duration),

    #[error("worker process exited unexpectedly")]
    WorkerExited,

    #[error("could not serialize job: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Handle to one worker process.
pub struct WorkerBridge {
    process: WorkerProcess,
    pipes: Mutex<Pipes>,
    timeout: Option<Duration>,
}

struct Pipes {
    stdin: ChildStdin,
    results: Receiver<String>,
}

impl WorkerBridge {
    /// Wrap a freshly spawned worker process.
    pub fn new(process: WorkerProcess, timeout: Option<Duration>) -> Result<Self, HostError> {
        let pipes = connect(&process)?;
        Ok(WorkerBridge {
            process,
            pipes: Mutex::new(pipes),
            timeout,
        })
    }

    /// Submit one job and block for its result path.
    pub fn submit<J: Serialize>(&self, job: &J) -> Result<PathBuf, HostError> {
        let line = serde_json::to_string(job)?;

        let mut pipes = self.pipes.lock().unwrap_or_else(|e| e.into_inner());

        if writeln!(pipes.stdin, "{line}").and_then(|()| pipes.stdin.flush()).is_err() {
            return Err(HostError::WorkerExited);
        }

        let result = match self.timeout {
            Some(timeout) => match pipes.results.recv_timeout(timeout) {
                Ok(line) => line,
                Err(RecvTimeoutError::Timeout) => {
                    log_warn!("[HOST] job exceeded {timeout:?}, recycling worker");
                    *pipes = self.recycle()?;
                    return Err(HostError::Timeout(timeout));
                }
                Err(RecvTimeoutError::Disconnected) => return Err(HostError::WorkerExited),
            },
            None => pipes.results.recv().map_err(|_| HostError::WorkerExited)?,
        };

        match result.strip_prefix(ERROR_SENTINEL) {
            Some(message) => Err(HostError::Job(message.to_string())),
            None => Ok(PathBuf::from(result)),
        }
    }

    /// Restart the worker and reconnect the pipes. Pending warm state is
    /// rebuilt by the new process.
    pub fn restart(&self) -> Result<(), HostError> {
        let mut pipes = self.pipes.lock().unwrap_or_else(|e| e.into_inner());
        *pipes = self.recycle()?;
        Ok(())
    }

    pub fn is_alive(&self) -> bool {
        self.process.is_alive()
    }

    pub fn restart_count(&self) -> u32 {
        self.process.restart_count()
    }

    fn recycle(&self) -> Result<Pipes, HostError> {
        self.process.restart()?;
        connect(&self.process)
    }
}

fn connect(process: &WorkerProcess) -> Result<Pipes, HostError> {
    let stdin = process.take_stdin().ok_or(HostError::WorkerExited)?;
    let stdout = process.take_stdout().ok_or(HostError::WorkerExited)?;

    Ok(Pipes {
        stdin,
        results: spawn_reader(stdout),
    })
}

/// Feed result lines from the worker's stdout into a channel. The thread
/// ends when the pipe closes; a dropped receiver just ends it early.
fn spawn_reader(stdout: ChildStdout) -> Receiver<String> {
    let (tx, rx) = crossbeam_channel::unbounded();

    std::thread::spawn(move || {
        let reader = BufReader::new(stdout);
        for line in reader.lines() {
            match line {
                Ok(l) if !l.trim().is_empty() => {
                    if tx.send(l).is_err() {
                        break;
                    }
                }
                Ok(_) => {}
                Err(_) => break,
            }
        }
        log_info!("[HOST] worker stdout closed");
    });

    rx
}

// End-to-end behavior (submit, sentinel mapping, timeout recycling) is
// covered in tests/worker_protocol.rs against the real binaries.
