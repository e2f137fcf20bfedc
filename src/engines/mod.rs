//! Inference engines.
//!
//! Each worker binary hosts exactly one engine, fixed at build time. The
//! engine is the loop's single collaborator: it is loaded once into warm
//! state and then read by every job. The heavyweight model numerics live
//! behind this trait; the shipped engines are self-contained synthesizers
//! that honor the full request contract (validation, reference audio,
//! duration and sample-rate guarantees) without external checkpoints.

pub mod device;
pub mod sfx;
pub mod tts;
pub mod voice_conversion;

pub use device::Device;
pub use sfx::{SfxEngine, SfxRequest};
pub use tts::{TtsEngine, TtsRequest};
pub use voice_conversion::{VcEngine, VcRequest};

use crate::audio::AudioClip;
use crate::config::WorkerConfig;
use crate::worker::error::WorkerError;
use crate::worker::request::JobRequest;

/// One warm model: loaded once per process, read by every job.
pub trait SynthesisEngine: Sized {
    /// Typed request decoded from one protocol line.
    type Request: JobRequest;

    /// Engine name for the diagnostic channel.
    const NAME: &'static str;

    /// Build the warm state. Called exactly once, before the first job; a
    /// failure here is fatal to the process.
    fn load(config: &WorkerConfig) -> Result<Self, WorkerError>;

    /// Run one inference job against the warm state.
    fn synthesize(&self, request: &Self::Request) -> Result<AudioClip, WorkerError>;
}
