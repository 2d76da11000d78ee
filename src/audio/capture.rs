//! Microphone capture via `cpal`.
//!
//! [`AudioCapture`] wraps the cpal host/device/stream lifecycle.  The
//! callback runs on a dedicated audio thread, downmixes each hardware
//! buffer to mono, and forwards it as a [`MonoChunk`] over an mpsc channel.
//! The returned [`StreamHandle`] is a RAII guard — dropping it stops the
//! underlying stream.
//!
//! Chunks still carry the device's native sample rate; resample with
//! [`crate::audio::resample_to_16k`] before handing audio to the engine.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::mpsc;
use thiserror::Error;

use crate::audio::resample::mix_to_mono;

// ---------------------------------------------------------------------------
// MonoChunk
// ---------------------------------------------------------------------------

/// One mono buffer of captured audio.
///
/// Samples are `f32` in `[-1.0, 1.0]` at the device's native rate.
#[derive(Debug, Clone)]
pub struct MonoChunk {
    /// Mono PCM samples in `[-1.0, 1.0]`.
    pub samples: Vec<f32>,
    /// Native sample rate of this chunk in Hz (e.g. 44100, 48000).
    pub sample_rate: u32,
}

// ---------------------------------------------------------------------------
// StreamHandle
// ---------------------------------------------------------------------------

/// RAII guard that keeps the capture stream alive.
///
/// Dropping this value stops the underlying hardware stream.
pub struct StreamHandle {
    _stream: cpal::Stream,
}

// ---------------------------------------------------------------------------
// CaptureError
// ---------------------------------------------------------------------------

/// Errors that can occur while setting up the capture stream.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("no input device found on the default audio host")]
    NoDevice,

    #[error("failed to query default input config: {0}")]
    DefaultConfig(#[from] cpal::DefaultStreamConfigError),

    #[error("failed to build input stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("failed to start audio stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),
}

// ---------------------------------------------------------------------------
// AudioCapture
// ---------------------------------------------------------------------------

/// Microphone capture built on the system default input device.
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::mpsc;
/// use moonshine_stt::audio::{AudioCapture, MonoChunk};
///
/// let (tx, rx) = mpsc::channel::<MonoChunk>();
/// let capture = AudioCapture::new().unwrap();
/// let _handle = capture.start(tx).unwrap();
/// // `_handle` keeps the stream alive; drop it to stop recording.
/// ```
pub struct AudioCapture {
    device: cpal::Device,
    config: cpal::StreamConfig,
    sample_rate: u32,
    channels: u16,
}

impl AudioCapture {
    /// Open the system default input device with its preferred stream
    /// configuration.
    ///
    /// # Errors
    ///
    /// [`CaptureError::NoDevice`] when no input device is available,
    /// [`CaptureError::DefaultConfig`] when the device cannot report a
    /// default configuration.
    pub fn new() -> Result<Self, CaptureError> {
        let host = cpal::default_host();
        let device = host.default_input_device().ok_or(CaptureError::NoDevice)?;

        let supported = device.default_input_config()?;
        let channels = supported.channels();
        let sample_rate = supported.sample_rate().0;
        let config: cpal::StreamConfig = supported.into();

        Ok(Self {
            device,
            config,
            sample_rate,
            channels,
        })
    }

    /// Start recording and send [`MonoChunk`]s to `tx`.
    ///
    /// Each hardware buffer is downmixed to mono on the audio thread before
    /// being forwarded.  Send errors (receiver dropped) are ignored so the
    /// audio thread never panics.
    ///
    /// # Errors
    ///
    /// [`CaptureError::BuildStream`] or [`CaptureError::PlayStream`] when
    /// the platform rejects the stream configuration.
    pub fn start(&self, tx: mpsc::Sender<MonoChunk>) -> Result<StreamHandle, CaptureError> {
        let sample_rate = self.sample_rate;
        let channels = self.channels;

        let stream = self.device.build_input_stream(
            &self.config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                let chunk = MonoChunk {
                    samples: mix_to_mono(data, channels),
                    sample_rate,
                };
                let _ = tx.send(chunk);
            },
            |err: cpal::StreamError| {
                log::error!("cpal stream error: {err}");
            },
            None, // no timeout
        )?;

        stream.play()?;
        Ok(StreamHandle { _stream: stream })
    }

    /// Native sample rate of the capture stream in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of channels the device delivers (before the downmix).
    pub fn channels(&self) -> u16 {
        self.channels
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    /// `MonoChunk` must be `Send` so it can cross the channel.
    #[test]
    fn mono_chunk_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<MonoChunk>();
    }

    #[test]
    fn mono_chunk_fields() {
        let chunk = MonoChunk {
            samples: vec![0.0_f32; 512],
            sample_rate: 48_000,
        };
        assert_eq!(chunk.samples.len(), 512);
        assert_eq!(chunk.sample_rate, 48_000);
    }
}
