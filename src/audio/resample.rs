//! Channel downmix and resampling to the engine rate.
//!
//! The decode pipeline consumes **16 kHz mono f32** audio.  Capture devices
//! and WAV files rarely deliver that directly, so two conversions sit in
//! front of it:
//!
//! 1. [`mix_to_mono`] — average interleaved channels down to one.
//! 2. [`resample_to_16k`] — linear-interpolation resample from any source
//!    rate.

use crate::audio::SAMPLE_RATE;

// ---------------------------------------------------------------------------
// mix_to_mono
// ---------------------------------------------------------------------------

/// Mix interleaved multi-channel audio down to mono by averaging each frame.
///
/// The output length is `samples.len() / channels`.  Mono input is returned
/// as an owned copy without averaging; `channels == 0` yields an empty
/// vector.
pub fn mix_to_mono(samples: &[f32], channels: u16) -> Vec<f32> {
    match channels {
        0 => Vec::new(),
        1 => samples.to_vec(),
        n => {
            let n = n as usize;
            samples
                .chunks_exact(n)
                .map(|frame| frame.iter().sum::<f32>() / n as f32)
                .collect()
        }
    }
}

// ---------------------------------------------------------------------------
// resample_to_16k
// ---------------------------------------------------------------------------

/// Resample `samples` from `source_rate` Hz to 16 000 Hz by linear
/// interpolation.
///
/// Already-16 kHz input is copied through unchanged.  The output length is
/// `ceil(samples.len() * 16_000 / source_rate)`.
pub fn resample_to_16k(samples: &[f32], source_rate: u32) -> Vec<f32> {
    if source_rate == SAMPLE_RATE {
        return samples.to_vec();
    }
    if samples.is_empty() {
        return Vec::new();
    }

    let ratio = SAMPLE_RATE as f64 / source_rate as f64;
    let output_len = (samples.len() as f64 * ratio).ceil() as usize;
    let mut output = Vec::with_capacity(output_len);

    for i in 0..output_len {
        let src_pos = i as f64 / ratio;
        let idx = src_pos as usize;
        let frac = (src_pos - idx as f64) as f32;

        let sample = match samples.get(idx + 1) {
            Some(&next) => samples[idx] * (1.0 - frac) + next * frac,
            None => *samples.get(idx).unwrap_or(&0.0),
        };
        output.push(sample);
    }

    output
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
