//! Job dispatch: one request in, one outcome out.
//!
//! The dispatcher owns the failure-isolation contract. Engine errors, I/O
//! errors and even panics inside the inference call are caught here and
//! reduced to a `Failure` outcome, so a bad job can never take the warm
//! state down with it. A success writes exactly one audio file; a failure
//! writes none.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::audio;
use crate::config::WorkerConfig;
use crate::engines::SynthesisEngine;
use crate::log_warn;
use crate::worker::error::WorkerError;
use crate::worker::outcome::JobOutcome;
use crate::worker::request::JobRequest;

/// Run one job against the warm engine.
pub fn dispatch<E: SynthesisEngine>(
    engine: &E,
    request: &E::Request,
    config: &WorkerConfig,
) -> JobOutcome {
    let result = catch_unwind(AssertUnwindSafe(|| run_job(engine, request, config)));

    match result {
        Ok(Ok(path)) => JobOutcome::Success { path },
        Ok(Err(err)) => {
            log_warn!("[{}] job failed: {err}", E::NAME);
            JobOutcome::failure(&err)
        }
        Err(panic) => {
            let message = panic_message(panic.as_ref());
            log_warn!("[{}] inference panicked: {message}", E::NAME);
            JobOutcome::Failure {
                message: format!("inference panicked: {message}"),
            }
        }
    }
}

fn run_job<E: SynthesisEngine>(
    engine: &E,
    request: &E::Request,
    config: &WorkerConfig,
) -> Result<PathBuf, WorkerError> {
    let clip = engine.synthesize(request)?;
    let destination = resolve_output_path(request.output_path(), &config.output_dir);
    audio::write_wav_atomic(&destination, &clip, config.overwrite)
}

/// Explicit path if the job supplied one, otherwise a fresh name under the
/// configured output directory.
fn resolve_output_path(explicit: Option<&Path>, output_dir: &Path) -> PathBuf {
    match explicit {
        Some(path) => path.to_path_buf(),
        None => output_dir.join(format!("{}.wav", Uuid::new_v4())),
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
