//! Mode selection and the request loop.
//!
//! A worker attached to a terminal performs the single job described by its
//! command-line flags and exits. A worker attached to a pipe serves jobs
//! line by line until its input closes. The branch is taken once, at
//! startup, and never revisited.
//!
//! Loop invariant: every iteration ends in either no output (blank line) or
//! exactly one outcome line. Nothing a job does escapes its own iteration,
//! malformed input and panics included.

use std::io::{self, BufRead, IsTerminal, Write};

use crate::config::WorkerConfig;
use crate::engines::SynthesisEngine;
use crate::worker::channel::ResultChannel;
use crate::worker::dispatch::dispatch;
use crate::worker::error::WorkerError;
use crate::worker::outcome::{write_outcome, JobOutcome};
use crate::worker::request::{decode_request, JobRequest};
use crate::{log_debug, log_info};

/// True when the worker should take its one job from command-line flags.
pub fn is_interactive() -> bool {
    io::stdin().is_terminal()
}

/// Serve jobs from stdin until end of input. Clean end of input is not an
/// error; the process should exit 0 afterwards.
pub fn serve<E: SynthesisEngine>(
    engine: &E,
    config: &WorkerConfig,
    channel: &mut ResultChannel,
) -> Result<(), WorkerError> {
    log_info!("[{}] ready, waiting for jobs on stdin", E::NAME);
    run_loop(engine, config, io::stdin().lock(), channel)
}

/// The request loop, generic over its streams so tests can drive it with
/// in-memory buffers.
pub fn run_loop<E, R, W>(
    engine: &E,
    config: &WorkerConfig,
    input: R,
    output: &mut W,
) -> Result<(), WorkerError>
where
    E: SynthesisEngine,
    R: BufRead,
    W: Write,
{
    for line in input.lines() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            // Blank lines produce no outcome and no output line.
            continue;
        }

        let outcome = match decode_request::<E::Request>(trimmed) {
            Ok(request) => {
                log_info!("[{}] job: {}", E::NAME, request.describe());
                dispatch(engine, &request, config)
            }
            Err(err) => {
                log_debug!("[{}] undecodable line: {err}", E::NAME);
                JobOutcome::failure(&err)
            }
        };

        write_outcome(output, &outcome)?;
    }

    log_info!("[{}] input closed, shutting down", E::NAME);
    Ok(())
}

/// Interactive mode: run the single flag-described job, emit its outcome
/// line, and return the process exit code.
pub fn run_single<E: SynthesisEngine>(
    engine: &E,
    request: &E::Request,
    config: &WorkerConfig,
    channel: &mut ResultChannel,
) -> i32 {
    log_info!("[{}] single job: {}", E::NAME, request.describe());
    let outcome = dispatch(engine, request, config);
    if write_outcome(channel, &outcome).is_err() {
        return 1;
    }
    i32::from(!outcome.is_success())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OverwritePolicy;
    use crate::worker::outcome::ERROR_SENTINEL;
    use crate::worker::request::JobRequest;
    use serde::Deserialize;
    use std::path::{Path, PathBuf};
    use std::sync::atomic::{AtomicUsize, Ordering};

    static LOADS: AtomicUsize = AtomicUsize::new(0);

    struct CountingEngine {
        sample_rate: u32,
    }

    #[derive(Debug, Deserialize)]
    struct CountingRequest {
        #[serde(default)]
        fail: bool,
        tag: String,
        #[serde(default)]
        output_path: Option<PathBuf>,
    }

    impl JobRequest for CountingRequest {
        fn output_path(&self) -> Option<&Path> {
            self.output_path.as_deref()
        }

        fn describe(&self) -> String {
            format!("tag={}", self.tag)
        }
    }

    impl SynthesisEngine for CountingEngine {
        type Request = CountingRequest;

        const NAME: &'static str = "counting";

        fn load(config: &WorkerConfig) -> Result<Self, WorkerError> {
            config.ensure_output_dir()?;
            LOADS.fetch_add(1, Ordering::SeqCst);
            Ok(CountingEngine {
                sample_rate: config.sample_rate,
            })
        }

        fn synthesize(&self, request: &CountingRequest) -> Result<crate::audio::AudioClip, WorkerError> {
            if request.fail {
                return Err(WorkerError::Inference(format!(
                    "cannot process {}",
                    request.tag
                )));
            }
            Ok(crate::audio::AudioClip {
                sample_rate: self.sample_rate,
                samples: vec![0.2; 32],
            })
        }
    }

    fn setup(dir: &Path) -> (CountingEngine, WorkerConfig) {
        let config = WorkerConfig {
            output_dir: dir.to_path_buf(),
            sample_rate: 8_000,
            overwrite: OverwritePolicy::Overwrite,
        };
        (CountingEngine::load(&config).unwrap(), config)
    }

    fn run(input: &str, dir: &Path) -> Vec<String> {
        let (engine, config) = setup(dir);
        let mut output = Vec::new();
        run_loop(&engine, &config, input.as_bytes(), &mut output).unwrap();
        String::from_utf8(output)
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn test_one_line_in_one_line_out() {
        let dir = tempfile::tempdir().unwrap();
        let lines = run("{\"tag\":\"a\"}\n{\"tag\":\"b\"}\n", dir.path());
        assert_eq!(lines.len(), 2);
        assert!(lines.iter().all(|l| l.ends_with(".wav")));
    }

    #[test]
    fn test_blank_lines_emit_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let lines = run("\n   \n\t\n{\"tag\":\"only\"}\n\n", dir.path());
        assert_eq!(lines.len(), 1);
    }

    #[test]
    fn test_malformed_line_is_isolated_and_ordered() {
        let dir = tempfile::tempdir().unwrap();
        let lines = run(
            "{\"tag\":\"first\"}\nthis is not json\n{\"tag\":\"third\"}\n",
            dir.path(),
        );
        assert_eq!(lines.len(), 3);
        assert!(lines[0].ends_with(".wav"));
        assert!(lines[1].starts_with(ERROR_SENTINEL));
        assert!(lines[2].ends_with(".wav"));
    }

    #[test]
    fn test_failed_job_does_not_end_loop() {
        let dir = tempfile::tempdir().unwrap();
        let lines = run(
            "{\"tag\":\"bad\",\"fail\":true}\n{\"tag\":\"good\"}\n",
            dir.path(),
        );
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], format!("{ERROR_SENTINEL}cannot process bad"));
        assert!(lines[1].ends_with(".wav"));
    }

    #[test]
    fn test_end_of_input_is_clean() {
        let dir = tempfile::tempdir().unwrap();
        let (engine, config) = setup(dir.path());
        let mut output = Vec::new();
        run_loop(&engine, &config, "".as_bytes(), &mut output).unwrap();
        assert!(output.is_empty());
    }

    #[test]
    fn test_engine_loaded_once_for_many_jobs() {
        let dir = tempfile::tempdir().unwrap();
        let before = LOADS.load(Ordering::SeqCst);
        let (engine, config) = setup(dir.path());
        let mut output = Vec::new();
        let input = "{\"tag\":\"a\"}\n{\"tag\":\"b\"}\n{\"tag\":\"c\"}\n";
        run_loop(&engine, &config, input.as_bytes(), &mut output).unwrap();
        assert_eq!(LOADS.load(Ordering::SeqCst), before + 1);
    }

    #[test]
    fn test_run_single_exit_codes() {
        let dir = tempfile::tempdir().unwrap();
        let (engine, config) = setup(dir.path());
        let mut channel = ResultChannel::Passthrough(io::stdout());

        let ok: CountingRequest = serde_json::from_str(r#"{"tag":"ok"}"#).unwrap();
        assert_eq!(run_single(&engine, &ok, &config, &mut channel), 0);

        let bad: CountingRequest =
            serde_json::from_str(r#"{"tag":"bad","fail":true}"#).unwrap();
        assert_eq!(run_single(&engine, &bad, &config, &mut channel), 1);
    }
}
