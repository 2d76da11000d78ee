//! Command-line entry point.
//!
//! Two modes:
//!
//! ```text
//! moonshine-stt [models_dir] <wav_file>   # transcribe one file
//! moonshine-stt [models_dir] --live       # transcribe the microphone
//! ```
//!
//! The model directory falls back to the settings file, then the platform
//! data directory.
//!
//! File mode reads the WAV, runs one generation call, and prints the token
//! ids followed by the transcript.  Live mode captures microphone audio on
//! a cpal thread, accumulates fixed-duration windows, and transcribes each
//! full window until interrupted.

use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::Instant;

use anyhow::{bail, Context, Result};

use moonshine_stt::audio::{
    read_wav, resample_to_16k, AudioCapture, MonoChunk, WindowBuffer, SAMPLE_RATE,
};
use moonshine_stt::config::AppConfig;
use moonshine_stt::stt::MoonshineEngine;

// ---------------------------------------------------------------------------
// Argument parsing
// ---------------------------------------------------------------------------

enum Mode {
    File(PathBuf),
    Live,
}

struct Args {
    /// Explicit model directory; falls back to settings, then the platform
    /// default.
    models_dir: Option<PathBuf>,
    mode: Mode,
}

fn parse_args() -> Result<Args> {
    let positional: Vec<String> = std::env::args().skip(1).collect();

    let (models_dir, target) = match positional.as_slice() {
        [target] => (None, target.clone()),
        [models_dir, target] => (Some(PathBuf::from(models_dir)), target.clone()),
        _ => bail!(
            "usage: moonshine-stt [models_dir] <wav_file>\n       \
             moonshine-stt [models_dir] --live"
        ),
    };

    let mode = if target == "--live" {
        Mode::Live
    } else {
        Mode::File(PathBuf::from(target))
    };

    Ok(Args { models_dir, mode })
}

// ---------------------------------------------------------------------------
// File mode
// ---------------------------------------------------------------------------

fn run_file(engine: &mut MoonshineEngine, wav_path: &Path, max_tokens: usize) -> Result<()> {
    let samples = read_wav(wav_path)
        .with_context(|| format!("reading {}", wav_path.display()))?;
    log::info!(
        "read {} samples ({:.2} s)",
        samples.len(),
        samples.len() as f32 / SAMPLE_RATE as f32
    );

    let start = Instant::now();
    let tokens = engine.generate(&samples, max_tokens)?;
    log::info!(
        "generated {} tokens in {:.2} s",
        tokens.len(),
        start.elapsed().as_secs_f32()
    );

    let ids: Vec<String> = tokens.iter().map(|t| t.to_string()).collect();
    println!("tokens: {}", ids.join(" "));
    println!("{}", engine.detokenize(&tokens));
    Ok(())
}

// ---------------------------------------------------------------------------
// Live mode
// ---------------------------------------------------------------------------

fn run_live(engine: &mut MoonshineEngine, window_secs: f32, max_tokens: usize) -> Result<()> {
    let capture = AudioCapture::new().context("opening the default input device")?;
    log::info!(
        "audio capture started ({} Hz, {} ch)",
        capture.sample_rate(),
        capture.channels()
    );

    let (tx, rx) = mpsc::channel::<MonoChunk>();
    let _handle = capture.start(tx).context("starting the capture stream")?;

    let window_len = (window_secs * SAMPLE_RATE as f32) as usize;
    let mut windows = WindowBuffer::new(window_len.max(1));

    println!("recording... press Ctrl-C to stop");
    while let Ok(chunk) = rx.recv() {
        let samples = if chunk.sample_rate == SAMPLE_RATE {
            chunk.samples
        } else {
            resample_to_16k(&chunk.samples, chunk.sample_rate)
        };
        windows.push_slice(&samples);

        while let Some(window) = windows.take_window() {
            let start = Instant::now();
            let tokens = engine.generate(&window, max_tokens)?;
            let text = engine.detokenize(&tokens);
            log::debug!(
                "window decoded in {:.2} s ({} tokens)",
                start.elapsed().as_secs_f32(),
                tokens.len()
            );
            if !text.trim().is_empty() {
                println!("{text}");
            }
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = parse_args()?;

    let config = AppConfig::load().unwrap_or_else(|e| {
        log::warn!("failed to load config ({e}); using defaults");
        AppConfig::default()
    });

    let models_dir = config.models_dir(args.models_dir.as_deref());
    let mut engine = MoonshineEngine::load(&models_dir)
        .with_context(|| format!("loading models from {}", models_dir.display()))?;

    match args.mode {
        Mode::File(wav_path) => run_file(&mut engine, &wav_path, config.decode.max_tokens),
        Mode::Live => run_live(&mut engine, config.capture.window_secs, config.decode.max_tokens),
    }
}
