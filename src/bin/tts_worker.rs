//! Text-to-speech worker entry point.

use std::path::PathBuf;
use std::process;

use clap::Parser;

use audiogen_workers::config::CommonArgs;
use audiogen_workers::engines::tts::{TtsEngine, TtsRequest, DEFAULT_SAMPLE_RATE};
use audiogen_workers::engines::SynthesisEngine;
use audiogen_workers::worker::{runtime, ChannelGuard};
use audiogen_workers::{log_error, log_info};

#[derive(Debug, Parser)]
#[command(name = "tts_worker", about = "Text-to-speech worker")]
struct Args {
    #[command(flatten)]
    common: CommonArgs,

    /// Text to synthesize (interactive mode)
    #[arg(long)]
    text: Option<String>,

    /// Reference speaker WAV file (interactive mode)
    #[arg(long)]
    speaker: Option<PathBuf>,

    /// Language code
    #[arg(long, default_value = "en")]
    language: String,

    /// Seconds of reference audio used for voice conditioning
    #[arg(long, default_value_t = 10)]
    gpt_cond_len: u32,

    /// Explicit output file path
    #[arg(long)]
    output_path: Option<PathBuf>,
}

impl Args {
    fn into_request(self) -> Result<TtsRequest, String> {
        let text = self.text.ok_or("--text is required in interactive mode")?;
        let speaker_path = self.speaker.ok_or("--speaker is required in interactive mode")?;

        Ok(TtsRequest {
            text,
            speaker_path,
            language: self.language,
            gpt_cond_len: self.gpt_cond_len,
            output_path: self.output_path,
        })
    }
}

fn main() {
    // Must run before anything can print to stdout.
    let mut channel = ChannelGuard::install().into_result_channel();

    let args = Args::parse();
    let config = args.common.to_config(DEFAULT_SAMPLE_RATE);

    log_info!("[XTTS] worker starting (pid={})", process::id());

    let engine = match TtsEngine::load(&config) {
        Ok(engine) => engine,
        Err(err) => {
            log_error!("[XTTS] fatal: {err}");
            process::exit(2);
        }
    };

    if runtime::is_interactive() {
        let request = match args.into_request() {
            Ok(request) => request,
            Err(message) => {
                log_error!("[XTTS] {message}");
                process::exit(2);
            }
        };
        process::exit(runtime::run_single(&engine, &request, &config, &mut channel));
    }

    if let Err(err) = runtime::serve(&engine, &config, &mut channel) {
        log_error!("[XTTS] worker loop aborted: {err}");
        process::exit(1);
    }
}
