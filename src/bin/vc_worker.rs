//! Voice-conversion worker entry point.

use std::path::PathBuf;
use std::process;

use clap::Parser;

use audiogen_workers::config::CommonArgs;
use audiogen_workers::engines::voice_conversion::{VcEngine, VcRequest, DEFAULT_SAMPLE_RATE};
use audiogen_workers::engines::SynthesisEngine;
use audiogen_workers::worker::{runtime, ChannelGuard};
use audiogen_workers::{log_error, log_info};

#[derive(Debug, Parser)]
#[command(name = "vc_worker", about = "Voice conversion worker")]
struct Args {
    #[command(flatten)]
    common: CommonArgs,

    /// Source audio to convert (interactive mode)
    #[arg(long)]
    source: Option<PathBuf>,

    /// Reference audio of the target voice (interactive mode)
    #[arg(long)]
    target: Option<PathBuf>,

    /// Number of diffusion steps
    #[arg(long, default_value_t = 30)]
    diffusion_steps: u32,

    /// Output length as a multiple of the source length
    #[arg(long, default_value_t = 1.0)]
    length_adjust: f32,

    /// Top-p sampling parameter
    #[arg(long, default_value_t = 0.9)]
    top_p: f32,

    /// Sampling temperature
    #[arg(long, default_value_t = 1.0)]
    temperature: f32,

    /// Repetition penalty
    #[arg(long, default_value_t = 1.0)]
    repetition_penalty: f32,

    /// Convert style/emotion/accent as well as timbre
    #[arg(long)]
    convert_style: bool,

    /// Anonymization only, without matching the target
    #[arg(long)]
    anonymization_only: bool,

    /// Explicit output file path
    #[arg(long)]
    output_path: Option<PathBuf>,
}

impl Args {
    fn into_request(self) -> Result<VcRequest, String> {
        let source_path = self.source.ok_or("--source is required in interactive mode")?;
        let target_voice_path = self.target.ok_or("--target is required in interactive mode")?;

        Ok(VcRequest {
            source_path,
            target_voice_path,
            diffusion_steps: self.diffusion_steps,
            length_adjust: self.length_adjust,
            top_p: self.top_p,
            temperature: self.temperature,
            repetition_penalty: self.repetition_penalty,
            convert_style: self.convert_style,
            anonymization_only: self.anonymization_only,
            output_path: self.output_path,
        })
    }
}

fn main() {
    // Must run before anything can print to stdout.
    let mut channel = ChannelGuard::install().into_result_channel();

    let args = Args::parse();
    let config = args.common.to_config(DEFAULT_SAMPLE_RATE);

    log_info!("[SEEDVC] worker starting (pid={})", process::id());

    let engine = match VcEngine::load(&config) {
        Ok(engine) => engine,
        Err(err) => {
            log_error!("[SEEDVC] fatal: {err}");
            process::exit(2);
        }
    };

    if runtime::is_interactive() {
        let request = match args.into_request() {
            Ok(request) => request,
            Err(message) => {
                log_error!("[SEEDVC] {message}");
                process::exit(2);
            }
        };
        process::exit(runtime::run_single(&engine, &request, &config, &mut channel));
    }

    if let Err(err) = runtime::serve(&engine, &config, &mut channel) {
        log_error!("[SEEDVC] worker loop aborted: {err}");
        process::exit(1);
    }
}
