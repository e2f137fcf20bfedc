//! Voice-conversion engine.
//!
//! Reshapes a source recording toward a target speaker's energy profile.
//! The conversion itself is a lightweight stand-in for the diffusion
//! pipeline, but the job contract is the real one: both reference files
//! must exist and decode, `length_adjust` stretches the result, and the
//! output keeps the source clip's sample rate.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::audio::{self, AudioClip};
use crate::config::WorkerConfig;
use crate::engines::{device, Device, SynthesisEngine};
use crate::log_info;
use crate::worker::error::WorkerError;
use crate::worker::request::JobRequest;

pub const DEFAULT_SAMPLE_RATE: u32 = 22_050;

#[derive(Debug, Clone, Deserialize)]
pub struct VcRequest {
    /// Recording to convert.
    pub source_path: PathBuf,
    /// Reference recording of the target speaker.
    #[serde(rename = "targetedVoicePath")]
    pub target_voice_path: PathBuf,
    #[serde(default = "default_diffusion_steps")]
    pub diffusion_steps: u32,
    /// Output length as a multiple of the source length.
    #[serde(default = "default_length_adjust")]
    pub length_adjust: f32,
    #[serde(default = "default_top_p")]
    pub top_p: f32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_repetition_penalty")]
    pub repetition_penalty: f32,
    /// Carry over the target's style as well as its timbre.
    #[serde(default)]
    pub convert_style: bool,
    /// Strip speaker identity without matching the target.
    #[serde(default)]
    pub anonymization_only: bool,
    #[serde(default)]
    pub output_path: Option<PathBuf>,
}

fn default_diffusion_steps() -> u32 {
    30
}

fn default_length_adjust() -> f32 {
    1.0
}

fn default_top_p() -> f32 {
    0.9
}

fn default_temperature() -> f32 {
    1.0
}

fn default_repetition_penalty() -> f32 {
    1.0
}

impl JobRequest for VcRequest {
    fn output_path(&self) -> Option<&Path> {
        self.output_path.as_deref()
    }

    fn describe(&self) -> String {
        format!(
            "source={} target={} steps={} length_adjust={}",
            self.source_path.display(),
            self.target_voice_path.display(),
            self.diffusion_steps,
            self.length_adjust
        )
    }
}

pub struct VcEngine {
    device: Device,
}

impl SynthesisEngine for VcEngine {
    type Request = VcRequest;

    const NAME: &'static str = "voice-conversion";

    fn load(config: &WorkerConfig) -> Result<Self, WorkerError> {
        config.ensure_output_dir()?;
        let device = device::probe();
        log_info!("[SEEDVC] engine ready on {device}");
        Ok(VcEngine { device })
    }

    fn synthesize(&self, request: &VcRequest) -> Result<AudioClip, WorkerError> {
        if !request.source_path.exists() {
            return Err(WorkerError::Inference(format!(
                "Source audio file not found: {}",
                request.source_path.display()
            )));
        }
        if !request.target_voice_path.exists() {
            return Err(WorkerError::Inference(format!(
                "Target audio file not found: {}",
                request.target_voice_path.display()
            )));
        }
        if !(request.length_adjust.is_finite() && request.length_adjust > 0.0) {
            return Err(WorkerError::Inference(
                "length_adjust must be a positive number".into(),
            ));
        }

        log_info!("[SEEDVC] converting on {}: {}", self.device, request.describe());

        let source = audio::read_wav(&request.source_path)?;
        let target = audio::read_wav(&request.target_voice_path)?;
        if source.samples.is_empty() {
            return Err(WorkerError::Inference(format!(
                "Source audio is empty: {}",
                request.source_path.display()
            )));
        }

        let mut samples = stretch(&source.samples, request.length_adjust);

        // Match the target's loudness; with convert_style also follow its
        // coarse energy contour. Anonymization flattens instead of matching.
        let source_rms = rms(&samples).max(1e-6);
        let target_rms = if request.anonymization_only {
            0.1
        } else {
            rms(&target.samples).max(1e-6)
        };
        let gain = (target_rms / source_rms).clamp(0.05, 20.0);
        for sample in &mut samples {
            *sample = (*sample * gain).clamp(-1.0, 1.0);
        }

        if request.convert_style && !request.anonymization_only && !target.samples.is_empty() {
            apply_energy_contour(&mut samples, &target.samples);
        }

        Ok(AudioClip {
            sample_rate: source.sample_rate,
            samples,
        })
    }
}

/// Linear-interpolation stretch to `factor` times the input length.
fn stretch(input: &[f32], factor: f32) -> Vec<f32> {
    let out_len = ((input.len() as f32 * factor).round() as usize).max(1);
    if input.len() < 2 {
        return vec![input.first().copied().unwrap_or(0.0); out_len];
    }

    let step = (input.len() - 1) as f32 / (out_len.max(2) - 1) as f32;
    (0..out_len)
        .map(|i| {
            let pos = i as f32 * step;
            let idx = pos as usize;
            let frac = pos - idx as f32;
            let a = input[idx.min(input.len() - 1)];
            let b = input[(idx + 1).min(input.len() - 1)];
            a + (b - a) * frac
        })
        .collect()
}

fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    (samples.iter().map(|s| s * s).sum::<f32>() / samples.len() as f32).sqrt()
}

/// Impose the target's coarse amplitude envelope over the output.
fn apply_energy_contour(samples: &mut [f32], target: &[f32]) {
    const BANDS: usize = 16;
    let band_len = (samples.len() / BANDS).max(1);
    let target_band_len = (target.len() / BANDS).max(1);
    let base = rms(target).max(1e-6);

    for band in 0..BANDS {
        let target_start = (band * target_band_len).min(target.len());
        let target_end = ((band + 1) * target_band_len).min(target.len());
        if target_start >= target_end {
            break;
        }
        let weight = (rms(&target[target_start..target_end]) / base).clamp(0.25, 2.0);

        let start = (band * band_len).min(samples.len());
        let end = ((band + 1) * band_len).min(samples.len());
        for sample in &mut samples[start..end] {
            *sample = (*sample * weight).clamp(-1.0, 1.0);
        }
    }
}
