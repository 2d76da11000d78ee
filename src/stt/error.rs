//! Error taxonomy for the STT subsystem.
//!
//! Startup failures (`ModelLoad`, `TokenizerLoad`) and per-request failures
//! (`InvalidInput`, `Inference`) share one enum so every stt API returns the
//! same error type.  Every variant is fatal for the request that produced it:
//! nothing in this crate retries automatically, and a generation call that
//! fails mid-loop returns no partial token sequence.

use thiserror::Error;

// ---------------------------------------------------------------------------
// SttError
// ---------------------------------------------------------------------------

/// All errors that can arise from the STT subsystem.
#[derive(Debug, Clone, Error)]
pub enum SttError {
    /// A graph file is missing, or the inference engine rejected it at load
    /// time.  Fatal at startup.
    #[error("model load failed: {0}")]
    ModelLoad(String),

    /// The vocabulary resource is missing, unreadable, or malformed.
    /// Fatal at startup.
    #[error("vocabulary load failed: {0}")]
    TokenizerLoad(String),

    /// An engine invocation failed.  A failing numeric op indicates a
    /// mismatch between model and orchestration, not a transient condition,
    /// so callers must not retry with the same audio.
    #[error("inference failed: {0}")]
    Inference(String),

    /// The supplied audio was rejected before the first engine call.
    #[error("invalid input audio: {0}")]
    InvalidInput(String),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
