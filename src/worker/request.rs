//! Job request decoding.
//!
//! One trimmed, non-blank input line is one JSON record. The field set is
//! worker-specific (each engine declares its own request type); decoding is
//! shared. Unknown fields are ignored, optional fields get their documented
//! defaults, and a wrong-typed field fails the whole line with a decode
//! error the loop turns into a failure outcome.

use std::path::Path;

use serde::de::DeserializeOwned;

use crate::worker::error::WorkerError;

/// A decoded, immutable job. Implemented by each engine's request type.
pub trait JobRequest: DeserializeOwned {
    /// Explicit destination supplied by the job, if any.
    fn output_path(&self) -> Option<&Path>;

    /// One-line summary for the diagnostic channel.
    fn describe(&self) -> String;
}

/// Parse one input line into a typed request.
pub fn decode_request<R: JobRequest>(line: &str) -> Result<R, WorkerError> {
    Ok(serde_json::from_str(line.trim())?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::path::PathBuf;

    #[derive(Debug, Deserialize)]
    struct EchoRequest {
        prompt: String,
        #[serde(default = "default_count")]
        count: u32,
        #[serde(default)]
        output_path: Option<PathBuf>,
    }

    fn default_count() -> u32 {
        3
    }

    impl JobRequest for EchoRequest {
        fn output_path(&self) -> Option<&Path> {
            self.output_path.as_deref()
        }

        fn describe(&self) -> String {
            format!("prompt={:?} count={}", self.prompt, self.count)
        }
    }

    #[test]
    fn test_defaults_applied() {
        let req: EchoRequest = decode_request(r#"{"prompt":"hi"}"#).unwrap();
        assert_eq!(req.prompt, "hi");
        assert_eq!(req.count, 3);
        assert!(req.output_path().is_none());
    }

    #[test]
    fn test_unknown_fields_ignored() {
        let req: EchoRequest =
            decode_request(r#"{"prompt":"hi","legacy_flag":true,"nested":{"x":1}}"#).unwrap();
        assert_eq!(req.prompt, "hi");
    }

    #[test]
    fn test_surrounding_whitespace_tolerated() {
        let req: EchoRequest = decode_request("  {\"prompt\":\"hi\"}\t").unwrap();
        assert_eq!(req.prompt, "hi");
    }

    #[test]
    fn test_wrong_type_is_decode_error() {
        let err = decode_request::<EchoRequest>(r#"{"prompt":"hi","count":"many"}"#).unwrap_err();
        assert!(matches!(err, WorkerError::Decode(_)));
    }

    #[test]
    fn test_non_json_is_decode_error() {
        let err = decode_request::<EchoRequest>("generate a bird please").unwrap_err();
        assert!(matches!(err, WorkerError::Decode(_)));
    }

    #[test]
    fn test_missing_required_field_is_decode_error() {
        let err = decode_request::<EchoRequest>(r#"{"count":2}"#).unwrap_err();
        assert!(matches!(err, WorkerError::Decode(_)));
    }
}
