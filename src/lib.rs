//! Moonshine speech-to-text over ONNX Runtime.
//!
//! Turns a raw 16 kHz waveform into text through four precompiled graphs:
//! feature extraction, context encoding, and a two-variant greedy decode
//! loop that threads a per-layer cache bundle from one step to the next.
//!
//! # Subsystems
//!
//! | Module | Responsibility |
//! |--------|----------------|
//! | [`audio`]  | WAV reading, microphone capture, resampling, windowing |
//! | [`stt`]    | graph sessions, decode loop, vocabulary, detokenization |
//! | [`config`] | TOML settings and platform paths |
//!
//! # Example
//!
//! ```rust,no_run
//! use moonshine_stt::audio::read_wav;
//! use moonshine_stt::stt::MoonshineEngine;
//!
//! let samples = read_wav("utterance.wav").unwrap();
//! let mut engine = MoonshineEngine::load("models/moonshine-tiny").unwrap();
//! let tokens = engine.generate(&samples, 0).unwrap();
//! println!("{}", engine.detokenize(&tokens));
//! ```

pub mod audio;
pub mod config;
pub mod stt;
