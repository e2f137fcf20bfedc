//! Worker configuration.
//!
//! Everything here is fixed for the lifetime of the process. Values come
//! from command-line flags with environment fallbacks, so a parent can
//! configure a fleet of workers through the environment alone.

use std::path::PathBuf;

use clap::Args;

use crate::worker::error::WorkerError;

/// What to do when a job supplies an `output_path` that already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverwritePolicy {
    /// Replace the existing file (matches the historical behavior).
    Overwrite,
    /// Fail the job and leave the existing file untouched.
    Reject,
}

/// Process-wide settings shared by every job.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Directory for generated files when a job has no explicit output path.
    pub output_dir: PathBuf,
    /// Sample rate of generated audio.
    pub sample_rate: u32,
    /// Policy for explicit output paths that already exist.
    pub overwrite: OverwritePolicy,
}

impl WorkerConfig {
    pub fn new(default_sample_rate: u32) -> Self {
        let output_dir = std::env::var("AUDIOGEN_OUTPUT_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("data/output"));

        let sample_rate = std::env::var("AUDIOGEN_SAMPLE_RATE")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(default_sample_rate);

        let overwrite = match std::env::var("AUDIOGEN_OVERWRITE").as_deref() {
            Ok("0") | Ok("false") | Ok("no") => OverwritePolicy::Reject,
            _ => OverwritePolicy::Overwrite,
        };

        WorkerConfig {
            output_dir,
            sample_rate,
            overwrite,
        }
    }

    /// Create the output directory if it is missing. Called once at warm-up
    /// so per-job writes never race directory creation.
    pub fn ensure_output_dir(&self) -> Result<(), WorkerError> {
        std::fs::create_dir_all(&self.output_dir).map_err(|e| {
            WorkerError::Init(format!(
                "cannot create output directory {}: {e}",
                self.output_dir.display()
            ))
        })
    }
}

/// Flags shared by all worker binaries. Each overrides its environment
/// counterpart when present.
#[derive(Debug, Args)]
pub struct CommonArgs {
    /// Directory for generated audio files
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Sample rate of generated audio
    #[arg(long)]
    pub sample_rate: Option<u32>,

    /// Fail jobs whose explicit output path already exists instead of
    /// overwriting it
    #[arg(long)]
    pub no_overwrite: bool,
}

impl CommonArgs {
    pub fn to_config(&self, default_sample_rate: u32) -> WorkerConfig {
        let mut config = WorkerConfig::new(default_sample_rate);
        if let Some(ref dir) = self.output_dir {
            config.output_dir = dir.clone();
        }
        if let Some(rate) = self.sample_rate {
            config.sample_rate = rate;
        }
        if self.no_overwrite {
            config.overwrite = OverwritePolicy::Reject;
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_overrides() {
        let args = CommonArgs {
            output_dir: Some(PathBuf::from("/tmp/out")),
            sample_rate: Some(48_000),
            no_overwrite: true,
        };
        let config = args.to_config(16_000);
        assert_eq!(config.output_dir, PathBuf::from("/tmp/out"));
        assert_eq!(config.sample_rate, 48_000);
        assert_eq!(config.overwrite, OverwritePolicy::Reject);
    }

    #[test]
    fn test_defaults() {
        let args = CommonArgs {
            output_dir: Some(PathBuf::from("data/output")),
            sample_rate: None,
            no_overwrite: false,
        };
        let config = args.to_config(24_000);
        assert_eq!(config.sample_rate, 24_000);
        assert_eq!(config.overwrite, OverwritePolicy::Overwrite);
    }

    #[test]
    fn test_ensure_output_dir_creates() {
        let dir = tempfile::tempdir().unwrap();
        let config = WorkerConfig {
            output_dir: dir.path().join("nested/output"),
            sample_rate: 16_000,
            overwrite: OverwritePolicy::Overwrite,
        };
        config.ensure_output_dir().unwrap();
        assert!(config.output_dir.is_dir());
    }
}
