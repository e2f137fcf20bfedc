//! Text-to-audio worker entry point.
//!
//! Piped stdin: serve one JSON job per line until end of input.
//! Interactive terminal: run the single job described by the flags.

use std::process;

use clap::Parser;

use audiogen_workers::config::CommonArgs;
use audiogen_workers::engines::sfx::{SfxEngine, SfxRequest, DEFAULT_SAMPLE_RATE};
use audiogen_workers::engines::SynthesisEngine;
use audiogen_workers::worker::{runtime, ChannelGuard};
use audiogen_workers::{log_error, log_info};

#[derive(Debug, Parser)]
#[command(name = "sfx_worker", about = "Text-to-audio sound effect worker")]
struct Args {
    #[command(flatten)]
    common: CommonArgs,

    /// The prompt to generate audio for (interactive mode)
    #[arg(long, default_value = "a bird chirps")]
    prompt: String,

    /// Audio duration in seconds
    #[arg(long, default_value_t = 10)]
    duration: u32,

    /// Number of sampling steps
    #[arg(long, default_value_t = 100)]
    ddim_steps: u32,

    /// Unconditional guidance scale
    #[arg(long, default_value_t = 3.0)]
    scale: f32,

    /// How many samples to produce for the given prompt
    #[arg(long, default_value_t = 1)]
    n_samples: u32,

    /// Explicit output file path
    #[arg(long)]
    output_path: Option<std::path::PathBuf>,
}

impl Args {
    fn into_request(self) -> SfxRequest {
        SfxRequest {
            prompt: self.prompt,
            duration: self.duration,
            ddim_steps: self.ddim_steps,
            scale: self.scale,
            n_samples: self.n_samples,
            output_path: self.output_path,
        }
    }
}

fn main() {
    // Must run before anything can print to stdout.
    let mut channel = ChannelGuard::install().into_result_channel();

    let args = Args::parse();
    let config = args.common.to_config(DEFAULT_SAMPLE_RATE);

    log_info!("[SFX] worker starting (pid={})", process::id());

    let engine = match SfxEngine::load(&config) {
        Ok(engine) => engine,
        Err(err) => {
            log_error!("[SFX] fatal: {err}");
            process::exit(2);
        }
    };

    if runtime::is_interactive() {
        let request = args.into_request();
        process::exit(runtime::run_single(&engine, &request, &config, &mut channel));
    }

    if let Err(err) = runtime::serve(&engine, &config, &mut channel) {
        log_error!("[SFX] worker loop aborted: {err}");
        process::exit(1);
    }
}
