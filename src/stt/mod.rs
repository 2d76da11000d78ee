//! STT (Speech-to-Text) engine module.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                    SttEngine (trait)                        │
//! │                                                            │
//! │   ┌────────────┐     ┌─────────────────┐                   │
//! │   │  session    │     │ MoonshineEngine │                   │
//! │   │ load_graph  │────▶│ 4 × Session     │                   │
//! │   └────────────┘     │ + Vocabulary    │                   │
//! │                       └────────┬────────┘                   │
//! │                                │                            │
//! │              ┌─────────────────┼──────────────────┐         │
//! │              ▼                 ▼                  ▼         │
//! │      preprocess/encode   decode_greedy      detokenize      │
//! │      (one call each)     (loop, cached)     (vocab lookup)  │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Quick start
//!
//! ```rust,no_run
//! use moonshine_stt::stt::{MoonshineEngine, SttEngine};
//!
//! let mut engine = MoonshineEngine::load("models/moonshine-tiny")
//!     .expect("model directory with the four graphs and tokenizer.json");
//!
//! // audio: 16 kHz, mono, f32 PCM from the audio module
//! let audio: Vec<f32> = vec![0.0; 16_000]; // 1 s of silence
//! let text = engine.transcribe(&audio).unwrap();
//! println!("{text}");
//! ```

pub mod decoder;
pub mod engine;
pub mod error;
pub mod session;
pub mod tokenizer;

// ── Public re-exports ──────────────────────────────────────────────────────

pub use decoder::{
    decode_greedy, greedy_argmax, token_budget, DecoderBackend, StepOutput, BOS_TOKEN, EOS_TOKEN,
    TOKENS_PER_SECOND,
};
pub use engine::{MoonshineEngine, SttEngine};
pub use error::SttError;
pub use session::{
    CACHED_DECODE_GRAPH, ENCODE_GRAPH, PREPROCESS_GRAPH, UNCACHED_DECODE_GRAPH, VOCABULARY_FILE,
};
pub use tokenizer::Vocabulary;
