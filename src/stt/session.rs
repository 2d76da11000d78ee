//! ONNX graph loading.
//!
//! Four graphs make up the pipeline, each loaded from a fixed file name
//! inside a caller-supplied model directory.  Sessions run single-threaded
//! (`intra_threads = 1`) with full graph optimization; the decode loop is a
//! sequential dependency chain, so per-op parallelism buys little and keeps
//! latency predictable on small models.

use std::path::Path;

use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;

use super::error::SttError;

// ---------------------------------------------------------------------------
// Graph file names
// ---------------------------------------------------------------------------

/// Waveform → feature tensor.
pub const PREPROCESS_GRAPH: &str = "preprocess.onnx";
/// Feature tensor + frame count → encoded context.
pub const ENCODE_GRAPH: &str = "encode.onnx";
/// First decode step (no cache inputs).
pub const UNCACHED_DECODE_GRAPH: &str = "uncached_decode.onnx";
/// Every subsequent decode step (cache in, cache out).
pub const CACHED_DECODE_GRAPH: &str = "cached_decode.onnx";
/// Vocabulary resource.
pub const VOCABULARY_FILE: &str = "tokenizer.json";

// ---------------------------------------------------------------------------
// Session construction
// ---------------------------------------------------------------------------

/// Load one ONNX graph into a ready-to-run session.
///
/// # Errors
///
/// [`SttError::ModelLoad`] when `path` does not exist or the engine rejects
/// the graph.
pub(crate) fn load_graph(path: &Path) -> Result<Session, SttError> {
    if !path.exists() {
        return Err(SttError::ModelLoad(format!(
            "graph file not found: {}",
            path.display()
        )));
    }

    log::debug!("loading graph {}", path.display());

    Session::builder()
        .map_err(builder_err)?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .map_err(builder_err)?
        .with_intra_threads(1)
        .map_err(builder_err)?
        .commit_from_file(path)
        .map_err(|e| SttError::ModelLoad(format!("{}: {e}", path.display())))
}

fn builder_err(e: ort::Error) -> SttError {
    SttError::ModelLoad(e.to_string())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
