//! Worker process lifecycle management.
//!
//! Spawns a worker binary with piped stdin/stdout and inherited stderr (the
//! worker's diagnostic channel flows straight into the parent's), monitors
//! liveness, and restarts after a kill or crash. Killing the process is the
//! only way to reclaim a worker's memory or to bound a job's latency; the
//! warm state is rebuilt by the replacement.

use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use crate::host::bridge::HostError;
use crate::log_info;

/// Manages one worker child process.
#[derive(Debug)]
pub struct WorkerProcess {
    child: Mutex<Option<Child>>,
    program: PathBuf,
    args: Vec<String>,
    restart_count: AtomicU32,
}

impl WorkerProcess {
    /// Spawn a new worker process.
    pub fn spawn(program: impl Into<PathBuf>, args: Vec<String>) -> Result<Self, HostError> {
        let program = program.into();
        let child = spawn_worker(&program, &args)?;

        Ok(WorkerProcess {
            child: Mutex::new(Some(child)),
            program,
            args,
            restart_count: AtomicU32::new(0),
        })
    }

    /// Take the child's stdin handle for writing job lines.
    pub fn take_stdin(&self) -> Option<ChildStdin> {
        self.child
            .lock()
            .ok()
            .and_then(|mut guard| guard.as_mut().and_then(|c| c.stdin.take()))
    }

    /// Take the child's stdout handle for reading result lines.
    pub fn take_stdout(&self) -> Option<ChildStdout> {
        self.child
            .lock()
            .ok()
            .and_then(|mut guard| guard.as_mut().and_then(|c| c.stdout.take()))
    }

    /// Kill the worker immediately. The OS reclaims all of its memory; the
    /// warm state is gone until the next restart.
    pub fn kill(&self) {
        if let Ok(mut guard) = self.child.lock() {
            if let Some(ref mut child) = *guard {
                log_info!("[HOST] killing worker process");
                let _ = child.kill();
                let _ = child.wait(); // Reap
            }
            *guard = None;
        }
    }

    /// Restart the worker (after kill or crash).
    pub fn restart(&self) -> Result<(), HostError> {
        self.kill();

        let child = spawn_worker(&self.program, &self.args)?;
        if let Ok(mut guard) = self.child.lock() {
            *guard = Some(child);
        }
        self.restart_count.fetch_add(1, Ordering::Relaxed);

        log_info!(
            "[HOST] worker restarted (restart #{})",
            self.restart_count.load(Ordering::Relaxed)
        );
        Ok(())
    }

    pub fn restart_count(&self) -> u32 {
        self.restart_count.load(Ordering::Relaxed)
    }

    /// Check whether the worker process is still running.
    pub fn is_alive(&self) -> bool {
        match self.child.lock() {
            Ok(mut guard) => match guard.as_mut() {
                Some(child) => matches!(child.try_wait(), Ok(None)),
                None => false,
            },
            Err(_) => false,
        }
    }
}

impl Drop for WorkerProcess {
    fn drop(&mut self) {
        self.kill();
    }
}

fn spawn_worker(program: &PathBuf, args: &[String]) -> Result<Child, HostError> {
    log_info!("[HOST] spawning worker: {} {}", program.display(), args.join(" "));

    Command::new(program)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit()) // Worker diagnostics flow to parent's stderr
        .spawn()
        .map_err(HostError::Spawn)
}

#[cfg(test)]
mod tests {
    use super::*;

    // Spawning real worker binaries is covered by the integration tests;
    // here only the failure path is cheap to pin down.

    #[test]
    fn test_spawn_missing_program_fails() {
        let err = WorkerProcess::spawn("/nonexistent/worker-binary", vec![]).unwrap_err();
        assert!(matches!(err, HostError::Spawn(_)));
    }
}
