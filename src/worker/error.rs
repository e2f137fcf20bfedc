//! Error taxonomy for a worker process.
//!
//! `Init` is fatal and stops the process before the first job. Everything
//! else is scoped to one job: the request loop converts it into a `Failure`
//! outcome and keeps going.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkerError {
    /// Warm-state construction failed. Not retryable per job.
    #[error("initialization failed: {0}")]
    Init(String),

    /// The input line did not parse as this worker's request record.
    #[error("malformed job line: {0}")]
    Decode(#[from] serde_json::Error),

    /// The inference call rejected the job. The message is the line that
    /// ends up after the error sentinel, so it stays human-readable.
    #[error("{0}")]
    Inference(String),

    /// Reading reference audio or writing the result file failed.
    #[error("audio i/o failed: {0}")]
    Io(#[from] std::io::Error),

    /// WAV encode/decode failed.
    #[error("audio i/o failed: {0}")]
    Wav(#[from] hound::Error),
}

impl WorkerError {
    /// True for errors that must abort the process rather than one job.
    pub fn is_fatal(&self) -> bool {
        matches!(self, WorkerError::Init(_))
    }
}
