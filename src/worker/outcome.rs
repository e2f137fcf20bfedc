//! Job outcomes and the result encoder.
//!
//! Every non-blank input line produces exactly one of these, and every
//! outcome encodes to exactly one line on the result channel: the output
//! path on success, or the sentinel-prefixed message on failure. The
//! consumer needs nothing but string matching to tell them apart.

use std::io::Write;
use std::path::PathBuf;

use crate::worker::error::WorkerError;

/// Prefix marking a failure line on the result channel.
pub const ERROR_SENTINEL: &str = "__ERROR__:";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Success { path: PathBuf },
    Failure { message: String },
}

impl JobOutcome {
    pub fn failure(err: &WorkerError) -> Self {
        JobOutcome::Failure {
            message: err.to_string(),
        }
    }

    /// Render the single protocol line (without the trailing newline).
    pub fn encode(&self) -> String {
        match self {
            JobOutcome::Success { path } => path.display().to_string(),
            JobOutcome::Failure { message } => {
                format!("{ERROR_SENTINEL}{}", single_line(message))
            }
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, JobOutcome::Success { .. })
    }
}

/// Collapse embedded newlines so a failure can never span protocol lines.
fn single_line(message: &str) -> String {
    if !message.contains(['\n', '\r']) {
        return message.to_string();
    }
    message
        .split(['\n', '\r'])
        .filter(|part| !part.trim().is_empty())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Write one outcome line and flush. The parent blocks on this line, so an
/// unflushed buffer is indistinguishable from a hung worker.
pub fn write_outcome<W: Write>(channel: &mut W, outcome: &JobOutcome) -> std::io::Result<()> {
    writeln!(channel, "{}", outcome.encode())?;
    channel.flush()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_encodes_to_bare_path() {
        let outcome = JobOutcome::Success {
            path: PathBuf::from("/data/output/abc.wav"),
        };
        assert_eq!(outcome.encode(), "/data/output/abc.wav");
    }

    #[test]
    fn test_failure_carries_sentinel() {
        let outcome = JobOutcome::Failure {
            message: "Source audio file not found: missing.wav".into(),
        };
        assert_eq!(
            outcome.encode(),
            "__ERROR__:Source audio file not found: missing.wav"
        );
    }

    #[test]
    fn test_multiline_message_is_flattened() {
        let outcome = JobOutcome::Failure {
            message: "device error\n  at layer 3\n".into(),
        };
        let line = outcome.encode();
        assert!(line.starts_with(ERROR_SENTINEL));
        assert!(!line.contains('\n'));
        assert_eq!(line, "__ERROR__:device error;   at layer 3");
    }

    #[test]
    fn test_write_outcome_emits_one_terminated_line() {
        let mut buf = Vec::new();
        let outcome = JobOutcome::Success {
            path: PathBuf::from("a.wav"),
        };
        write_outcome(&mut buf, &outcome).unwrap();
        assert_eq!(buf, b"a.wav\n");
    }
}
