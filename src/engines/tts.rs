//! Text-to-speech engine.
//!
//! Renders one syllable-like burst per word, pitched by a signature taken
//! from the reference speaker recording, so the same text and speaker
//! always produce the same clip. The reference file must exist and decode
//! before any audio is rendered.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::audio::{self, AudioClip};
use crate::config::WorkerConfig;
use crate::engines::{device, Device, SynthesisEngine};
use crate::log_info;
use crate::worker::error::WorkerError;
use crate::worker::request::JobRequest;

pub const DEFAULT_SAMPLE_RATE: u32 = 24_000;

#[derive(Debug, Clone, Deserialize)]
pub struct TtsRequest {
    /// Text to speak.
    pub text: String,
    /// Reference speaker recording.
    #[serde(rename = "targetedVoicePath")]
    pub speaker_path: PathBuf,
    #[serde(default = "default_language")]
    pub language: String,
    /// Seconds of reference audio used to condition the voice.
    #[serde(default = "default_gpt_cond_len", alias = "gptCondLen")]
    pub gpt_cond_len: u32,
    #[serde(default)]
    pub output_path: Option<PathBuf>,
}

fn default_language() -> String {
    "en".to_string()
}

fn default_gpt_cond_len() -> u32 {
    10
}

impl JobRequest for TtsRequest {
    fn output_path(&self) -> Option<&Path> {
        self.output_path.as_deref()
    }

    fn describe(&self) -> String {
        let preview: String = self.text.chars().take(50).collect();
        format!(
            "text={preview:?} speaker={} language={}",
            self.speaker_path.display(),
            self.language
        )
    }
}

pub struct TtsEngine {
    sample_rate: u32,
    device: Device,
}

impl SynthesisEngine for TtsEngine {
    type Request = TtsRequest;

    const NAME: &'static str = "tts";

    fn load(config: &WorkerConfig) -> Result<Self, WorkerError> {
        config.ensure_output_dir()?;
        let device = device::probe();
        log_info!("[XTTS] engine ready on {device} at {} Hz", config.sample_rate);
        Ok(TtsEngine {
            sample_rate: config.sample_rate,
            device,
        })
    }

    fn synthesize(&self, request: &TtsRequest) -> Result<AudioClip, WorkerError> {
        if request.text.trim().is_empty() {
            return Err(WorkerError::Inference("text must not be empty".into()));
        }
        if !request.speaker_path.exists() {
            return Err(WorkerError::Inference(format!(
                "Speaker wav file not found: {}",
                request.speaker_path.display()
            )));
        }

        log_info!("[XTTS] synthesizing on {}: {}", self.device, request.describe());

        let speaker = audio::read_wav(&request.speaker_path)?;
        let voice = voice_signature(&speaker, request.gpt_cond_len);

        let words: Vec<&str> = request.text.split_whitespace().collect();
        let word_frames = (self.sample_rate as f32 * 0.28) as usize;
        let gap_frames = (self.sample_rate as f32 * 0.06) as usize;
        let mut samples = Vec::with_capacity(words.len() * (word_frames + gap_frames));

        for word in &words {
            self.render_word(word, &voice, word_frames, &mut samples);
            samples.extend(std::iter::repeat(0.0).take(gap_frames));
        }

        Ok(AudioClip {
            sample_rate: self.sample_rate,
            samples,
        })
    }
}

impl TtsEngine {
    fn render_word(&self, word: &str, voice: &VoiceSignature, frames: usize, out: &mut Vec<f32>) {
        let mut hasher = DefaultHasher::new();
        word.to_lowercase().hash(&mut hasher);
        let word_seed = hasher.finish();

        // Word pitch wanders around the speaker's base pitch.
        let pitch = voice.base_pitch * (0.85 + (word_seed % 32) as f32 / 100.0);
        let dt = 1.0 / self.sample_rate as f32;

        for i in 0..frames {
            let t = i as f32 * dt;
            // Rise-and-fall envelope shaped like one syllable.
            let envelope = (std::f32::consts::PI * i as f32 / frames as f32).sin();
            let fundamental = (t * pitch * std::f32::consts::TAU).sin();
            let formant = (t * pitch * 2.7 * std::f32::consts::TAU).sin() * 0.35;
            out.push((fundamental + formant) * envelope * voice.loudness * 0.6);
        }
    }
}

struct VoiceSignature {
    base_pitch: f32,
    loudness: f32,
}

/// Condense the first `cond_len` seconds of the reference into the two
/// values the renderer conditions on.
fn voice_signature(speaker: &AudioClip, cond_len: u32) -> VoiceSignature {
    let frames = (speaker.sample_rate as usize * cond_len as usize).min(speaker.samples.len());
    let window = &speaker.samples[..frames];

    // Zero crossings per second approximate the speaker's pitch.
    let crossings = window
        .windows(2)
        .filter(|pair| (pair[0] >= 0.0) != (pair[1] >= 0.0))
        .count();
    let seconds = (frames as f32 / speaker.sample_rate as f32).max(1e-3);
    let base_pitch = ((crossings as f32 / 2.0) / seconds).clamp(70.0, 400.0);

    let rms = if window.is_empty() {
        0.0
    } else {
        (window.iter().map(|s| s * s).sum::<f32>() / window.len() as f32).sqrt()
    };
    let loudness = (rms * 4.0).clamp(0.2, 1.0);

    VoiceSignature {
        base_pitch,
        loudness,
    }
}
