//! WAV reading and writing shared by the engines and the dispatcher.
//!
//! Result files are written through a temp-and-rename pair so a failed job
//! never leaves a partial file at the destination path.

use std::path::{Path, PathBuf};

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};

use crate::config::OverwritePolicy;
use crate::worker::error::WorkerError;

/// A rendered mono clip.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioClip {
    pub sample_rate: u32,
    pub samples: Vec<f32>,
}

impl AudioClip {
    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / f64::from(self.sample_rate)
    }
}

/// Read a WAV file into a mono clip, averaging channels.
pub fn read_wav(path: &Path) -> Result<AudioClip, WorkerError> {
    let mut reader = WavReader::open(path)?;
    let spec = reader.spec();

    let interleaved: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader.samples::<f32>().collect::<Result<_, _>>()?,
        SampleFormat::Int => {
            let scale = 1.0 / (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 * scale))
                .collect::<Result<_, _>>()?
        }
    };

    let channels = usize::from(spec.channels.max(1));
    let samples = if channels == 1 {
        interleaved
    } else {
        interleaved
            .chunks(channels)
            .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
            .collect()
    };

    Ok(AudioClip {
        sample_rate: spec.sample_rate,
        samples,
    })
}

/// Write a clip as 16-bit mono PCM.
pub fn write_wav(path: &Path, clip: &AudioClip) -> Result<(), WorkerError> {
    let spec = WavSpec {
        channels: 1,
        sample_rate: clip.sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut writer = WavWriter::create(path, spec)?;
    for &sample in &clip.samples {
        let quantized = (sample.clamp(-1.0, 1.0) * f32::from(i16::MAX)) as i16;
        writer.write_sample(quantized)?;
    }
    writer.finalize()?;
    Ok(())
}

/// Write a clip to `path` atomically, honoring the overwrite policy.
/// Returns the absolute destination path.
pub fn write_wav_atomic(
    path: &Path,
    clip: &AudioClip,
    overwrite: OverwritePolicy,
) -> Result<PathBuf, WorkerError> {
    if overwrite == OverwritePolicy::Reject && path.exists() {
        return Err(WorkerError::Inference(format!(
            "Output file already exists: {}",
            path.display()
        )));
    }

    let tmp = temp_sibling(path);
    if let Err(err) = write_wav(&tmp, clip) {
        let _ = std::fs::remove_file(&tmp);
        return Err(err);
    }

    if let Err(err) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(err.into());
    }

    Ok(std::path::absolute(path)?)
}

/// A temp path in the same directory as `path`, so the final rename never
/// crosses filesystems.
fn temp_sibling(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "out.wav".to_string());
    path.with_file_name(format!(".{name}.{}.tmp", std::process::id()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tone(sample_rate: u32, secs: f32) -> AudioClip {
        let count = (sample_rate as f32 * secs) as usize;
        let samples = (0..count)
            .map(|i| (i as f32 * 0.01).sin() * 0.5)
            .collect();
        AudioClip {
            sample_rate,
            samples,
        }
    }

    #[test]
    fn test_round_trip_preserves_shape() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        let clip = tone(16_000, 0.25);

        write_wav(&path, &clip).unwrap();
        let back = read_wav(&path).unwrap();

        assert_eq!(back.sample_rate, 16_000);
        assert_eq!(back.samples.len(), clip.samples.len());
        assert!((back.duration_secs() - 0.25).abs() < 1e-3);
    }

    #[test]
    fn test_atomic_write_returns_absolute_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.wav");
        let written =
            write_wav_atomic(&path, &tone(16_000, 0.1), OverwritePolicy::Overwrite).unwrap();
        assert!(written.is_absolute());
        assert!(written.exists());
    }

    #[test]
    fn test_atomic_write_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.wav");
        write_wav_atomic(&path, &tone(16_000, 0.1), OverwritePolicy::Overwrite).unwrap();

        let names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["out.wav".to_string()]);
    }

    #[test]
    fn test_reject_policy_keeps_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keep.wav");
        write_wav(&path, &tone(16_000, 0.1)).unwrap();
        let before = std::fs::read(&path).unwrap();

        let err =
            write_wav_atomic(&path, &tone(16_000, 0.2), OverwritePolicy::Reject).unwrap_err();
        assert!(err.to_string().contains("already exists"));
        assert_eq!(std::fs::read(&path).unwrap(), before);
    }

    #[test]
    fn test_overwrite_policy_replaces() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("replace.wav");
        write_wav(&path, &tone(16_000, 0.1)).unwrap();

        write_wav_atomic(&path, &tone(16_000, 0.3), OverwritePolicy::Overwrite).unwrap();
        let back = read_wav(&path).unwrap();
        assert!((back.duration_secs() - 0.3).abs() < 1e-3);
    }

    #[test]
    fn test_stereo_downmix() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stereo.wav");
        let spec = WavSpec {
            channels: 2,
            sample_rate: 8_000,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut writer = WavWriter::create(&path, spec).unwrap();
        for _ in 0..100 {
            writer.write_sample(8_000i16).unwrap();
            writer.write_sample(-8_000i16).unwrap();
        }
        writer.finalize().unwrap();

        let clip = read_wav(&path).unwrap();
        assert_eq!(clip.samples.len(), 100);
        assert!(clip.samples.iter().all(|s| s.abs() < 1e-3));
    }
}
