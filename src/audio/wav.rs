//! WAV file reading.
//!
//! [`read_wav`] turns a PCM WAV file into the engine's input format: mono
//! f32 samples in `[-1.0, 1.0]` at 16 kHz.  16-bit integer samples are
//! rescaled by `1 / 32768`; multi-channel files are averaged down to mono;
//! other container rates are resampled.

use std::path::Path;

use thiserror::Error;

use crate::audio::resample::{mix_to_mono, resample_to_16k};
use crate::audio::SAMPLE_RATE;

// ---------------------------------------------------------------------------
// WavError
// ---------------------------------------------------------------------------

/// Errors that can occur while reading a waveform file.
#[derive(Debug, Error)]
pub enum WavError {
    /// The file could not be opened or is not a valid WAV container.
    #[error("failed to read WAV file: {0}")]
    Read(#[from] hound::Error),

    /// The container uses a sample format this reader does not handle.
    #[error("unsupported sample format: {0}")]
    UnsupportedFormat(String),
}

// ---------------------------------------------------------------------------
// read_wav
// ---------------------------------------------------------------------------

/// Read a WAV file into mono 16 kHz f32 samples in `[-1.0, 1.0]`.
///
/// Handles 16-bit integer PCM (rescaled by `1 / 32768`) and 32-bit float
/// PCM.  Multi-channel audio is downmixed by averaging; a container rate
/// other than 16 kHz is linearly resampled.
///
/// # Errors
///
/// [`WavError::Read`] for a missing or malformed file,
/// [`WavError::UnsupportedFormat`] for sample formats other than the two
/// above.
pub fn read_wav(path: impl AsRef<Path>) -> Result<Vec<f32>, WavError> {
    let reader = hound::WavReader::open(path.as_ref())?;
    let spec = reader.spec();

    let samples: Vec<f32> = match (spec.sample_format, spec.bits_per_sample) {
        (hound::SampleFormat::Int, 16) => reader
            .into_samples::<i16>()
            .map(|s| s.map(|v| v as f32 / 32_768.0))
            .collect::<Result<_, _>>()?,
        (hound::SampleFormat::Float, 32) => {
            reader.into_samples::<f32>().collect::<Result<_, _>>()?
        }
        (format, bits) => {
            return Err(WavError::UnsupportedFormat(format!("{format:?}/{bits}-bit")))
        }
    };

    let mono = mix_to_mono(&samples, spec.channels);
    let mono = if spec.sample_rate == SAMPLE_RATE {
        mono
    } else {
        log::debug!(
            "resampling {} Hz WAV input to {} Hz",
            spec.sample_rate,
            SAMPLE_RATE
        );
        resample_to_16k(&mono, spec.sample_rate)
    };

    Ok(mono)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
