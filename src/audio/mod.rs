//! Audio pipeline — WAV reading, microphone capture, resampling, windowing.
//!
//! # Pipeline
//!
//! ```text
//! WAV file ──▶ read_wav ─────────────────────────────┐
//!                                                    ├──▶ 16 kHz mono f32
//! Microphone ──▶ cpal callback ──▶ MonoChunk (mpsc) ──┤    → stt engine
//!             ──▶ resample_to_16k ──▶ WindowBuffer ──┘
//! ```
//!
//! Everything downstream of this module consumes 16 kHz mono `f32` PCM in
//! `[-1.0, 1.0]`.

pub mod capture;
pub mod resample;
pub mod wav;
pub mod window;

// ── Public re-exports ──────────────────────────────────────────────────────

pub use capture::{AudioCapture, CaptureError, MonoChunk, StreamHandle};
pub use resample::{mix_to_mono, resample_to_16k};
pub use wav::{read_wav, WavError};
pub use window::WindowBuffer;

/// Sample rate consumed by the decode pipeline, in Hz.
pub const SAMPLE_RATE: u32 = 16_000;
