//! Resident worker processes for generative-audio jobs.
//!
//! Three heavyweight synthesis models (text-to-audio effects, voice
//! conversion, text-to-speech) share one worker convention: a parent
//! keeps a worker process alive with its model warm in memory and feeds it
//! jobs one JSON line at a time over stdin. For every non-blank line the
//! worker answers with exactly one line on its original stdout: the path
//! of the generated file, or `__ERROR__:<message>` when the job failed.
//! Everything else the process prints (its own logs, library chatter)
//! goes to stderr, enforced by rebinding fd 1 before any engine loads.
//!
//! A failed job never costs the warm state: decode errors, inference
//! errors and panics are all reduced to one failure line, and the loop
//! keeps serving.

pub mod audio;
pub mod config;
pub mod engines;
pub mod host;
pub mod logger;
pub mod worker;

pub use audio::AudioClip;
pub use config::{OverwritePolicy, WorkerConfig};
pub use engines::SynthesisEngine;
pub use worker::{ChannelGuard, JobOutcome, ResultChannel, WorkerError, ERROR_SENTINEL};
