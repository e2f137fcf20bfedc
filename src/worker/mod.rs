//! The resident-worker protocol core.
//!
//! One long-lived process, one warm engine, one job per input line, one
//! outcome per job. See the crate docs for the channel layout.

pub mod channel;
pub mod dispatch;
pub mod error;
pub mod outcome;
pub mod request;
pub mod runtime;

// Re-export commonly used types
pub use channel::{ChannelGuard, ResultChannel};
pub use dispatch::dispatch;
pub use error::WorkerError;
pub use outcome::{write_outcome, JobOutcome, ERROR_SENTINEL};
pub use request::{decode_request, JobRequest};
pub use runtime::{is_interactive, run_loop, run_single, serve};
