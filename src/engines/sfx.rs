//! Text-to-audio (sound effect) engine.
//!
//! Stands in for the diffusion-sampler + vocoder stack: a deterministic
//! procedural renderer seeded from the prompt, so the same job always
//! produces the same clip. `ddim_steps` and `scale` steer the texture the
//! way the sampler parameters steered the original, and short renders are
//! padded so the clip is always exactly `duration` seconds.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::audio::AudioClip;
use crate::config::WorkerConfig;
use crate::engines::{device, Device, SynthesisEngine};
use crate::log_info;
use crate::worker::error::WorkerError;
use crate::worker::request::JobRequest;

pub const DEFAULT_SAMPLE_RATE: u32 = 16_000;

const MAX_DURATION_SECS: u32 = 3_600;

#[derive(Debug, Clone, Deserialize)]
pub struct SfxRequest {
    /// Text prompt describing the sound.
    #[serde(default = "default_prompt")]
    pub prompt: String,
    /// Clip length in seconds. Hosts historically sent this as a JSON
    /// float; fractional values truncate.
    #[serde(default = "default_duration", deserialize_with = "duration_secs")]
    pub duration: u32,
    /// Sampler step count.
    #[serde(default = "default_ddim_steps")]
    pub ddim_steps: u32,
    /// Guidance scale.
    #[serde(default = "default_scale")]
    pub scale: f32,
    /// Variants to render for the prompt; only the last is kept.
    #[serde(default = "default_n_samples")]
    pub n_samples: u32,
    #[serde(default)]
    pub output_path: Option<PathBuf>,
}

fn default_prompt() -> String {
    "a bird chirps".to_string()
}

fn default_duration() -> u32 {
    10
}

fn default_ddim_steps() -> u32 {
    100
}

fn default_scale() -> f32 {
    3.0
}

fn default_n_samples() -> u32 {
    1
}

fn duration_secs<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = f64::deserialize(deserializer)?;
    Ok(raw as u32)
}

impl JobRequest for SfxRequest {
    fn output_path(&self) -> Option<&Path> {
        self.output_path.as_deref()
    }

    fn describe(&self) -> String {
        format!(
            "prompt={:?} duration={}s steps={} scale={}",
            self.prompt, self.duration, self.ddim_steps, self.scale
        )
    }
}

pub struct SfxEngine {
    sample_rate: u32,
    device: Device,
}

impl SynthesisEngine for SfxEngine {
    type Request = SfxRequest;

    const NAME: &'static str = "sfx";

    fn load(config: &WorkerConfig) -> Result<Self, WorkerError> {
        config.ensure_output_dir()?;
        let device = device::probe();
        log_info!("[SFX] engine ready on {device} at {} Hz", config.sample_rate);
        Ok(SfxEngine {
            sample_rate: config.sample_rate,
            device,
        })
    }

    fn synthesize(&self, request: &SfxRequest) -> Result<AudioClip, WorkerError> {
        if request.duration == 0 {
            return Err(WorkerError::Inference(
                "duration must be at least 1 second".into(),
            ));
        }
        if request.duration > MAX_DURATION_SECS {
            return Err(WorkerError::Inference(format!(
                "duration must be {MAX_DURATION_SECS} seconds or less"
            )));
        }
        if request.n_samples == 0 {
            return Err(WorkerError::Inference("n_samples must be at least 1".into()));
        }

        log_info!("[SFX] rendering on {}: {}", self.device, request.describe());

        // Native inference backends print banners straight to stdout without
        // asking. Reproduce that chatter on demand; the channel guard must
        // keep it off the result channel.
        if std::env::var_os("AUDIOGEN_STDOUT_CHATTER").is_some() {
            println!("[SFX] kernel banner: sampler warmed, {} steps", request.ddim_steps);
        }

        // Render every variant; keep the last, like the upstream sampler
        // that drains its intermediate outputs.
        let mut clip = self.render_variant(request, 0);
        for variant in 1..request.n_samples {
            clip = self.render_variant(request, variant);
        }
        Ok(clip)
    }
}

impl SfxEngine {
    fn render_variant(&self, request: &SfxRequest, variant: u32) -> AudioClip {
        let frames = request.duration as usize * self.sample_rate as usize;
        let mut rng = Lcg::new(seed_for(request, variant));

        // A small bank of partials whose frequencies and decays come from
        // the prompt seed; more sampler steps allow more partials.
        let partials = (request.ddim_steps / 16).clamp(2, 12) as usize;
        let mut bank = Vec::with_capacity(partials);
        for _ in 0..partials {
            let freq = 80.0 + rng.next_f32() * 3_000.0;
            let amp = 0.2 + rng.next_f32() * 0.8;
            let decay = 0.2 + rng.next_f32() * 3.0;
            bank.push((freq, amp, decay));
        }
        let noise_level = (request.scale / 30.0).clamp(0.0, 0.3);

        let mut samples = Vec::with_capacity(frames);
        let dt = 1.0 / self.sample_rate as f32;
        let norm = bank.iter().map(|(_, a, _)| a).sum::<f32>().max(1.0);
        for i in 0..frames {
            let t = i as f32 * dt;
            let mut value = 0.0f32;
            for &(freq, amp, decay) in &bank {
                let phase = t * freq * std::f32::consts::TAU;
                value += amp * phase.sin() * (-t * decay).exp();
            }
            value = value / norm + noise_level * (rng.next_f32() * 2.0 - 1.0);
            samples.push(value * 0.8);
        }

        // Same guarantee as padding a short vocoder render: exactly
        // duration * sample_rate frames.
        samples.resize(frames, 0.0);

        AudioClip {
            sample_rate: self.sample_rate,
            samples,
        }
    }
}

fn seed_for(request: &SfxRequest, variant: u32) -> u64 {
    let mut hasher = DefaultHasher::new();
    request.prompt.hash(&mut hasher);
    request.ddim_steps.hash(&mut hasher);
    request.scale.to_bits().hash(&mut hasher);
    variant.hash(&mut hasher);
    hasher.finish()
}

/// Minimal deterministic generator; audio texture only, not statistics.
struct Lcg {
    state: u64,
}

impl Lcg {
    fn new(seed: u64) -> Self {
        Lcg {
            state: seed | 1,
        }
    }

    fn next_u32(&mut self) -> u32 {
        self.state = self
            .state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        (self.state >> 32) as u32
    }

    fn next_f32(&mut self) -> f32 {
        self.next_u32() as f32 / u32::MAX as f32
    }
}
