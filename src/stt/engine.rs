//! Four-graph transcription engine.
//!
//! # Overview
//!
//! [`MoonshineEngine`] owns the four ONNX sessions plus the vocabulary and
//! drives one utterance at a time through them:
//!
//! ```text
//! audio ──▶ preprocess ──▶ encode ──▶ uncached_decode ──▶ cached_decode*
//!               │              │             │                  │
//!           features      context +      logits +           logits +
//!                         frame count    cache bundle       cache bundle
//! ```
//!
//! Graph input names and the cache-bundle arity are read from session
//! metadata at load time; the number of cache tensors is a property of the
//! exported model, not of this code.  Decode outputs `[1..]` map
//! positionally onto cached-graph inputs `[3..]`, once, at the
//! uncached→cached boundary; the mapping is then stable for every later
//! step.
//!
//! `ort` sessions run through `&mut self`, so one engine value serves one
//! in-flight generation call.  Independent utterances run concurrently by
//! giving each thread its own engine.

use std::borrow::Cow;
use std::path::Path;

use ort::session::{Session, SessionInputValue, SessionOutputs};
use ort::value::Tensor;

use super::decoder::{self, DecoderBackend, StepOutput};
use super::error::SttError;
use super::session::{
    load_graph, CACHED_DECODE_GRAPH, ENCODE_GRAPH, PREPROCESS_GRAPH, UNCACHED_DECODE_GRAPH,
    VOCABULARY_FILE,
};
use super::tokenizer::Vocabulary;

// ---------------------------------------------------------------------------
// SttEngine trait
// ---------------------------------------------------------------------------

/// Interface for speech-to-text engines, consumed by the CLI and the live
/// loop.
///
/// # Contract
///
/// `audio` must be 16 kHz, mono, `f32` PCM in `[-1.0, 1.0]`.  Empty audio is
/// rejected with [`SttError::InvalidInput`] before any engine call.
pub trait SttEngine {
    /// Transcribe `audio` and return the text transcript.
    fn transcribe(&mut self, audio: &[f32]) -> Result<String, SttError>;
}

// Compile-time assertion: Box<dyn SttEngine> must be constructible.
const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn SttEngine>) {}
};

// ---------------------------------------------------------------------------
// TensorBuf
// ---------------------------------------------------------------------------

/// An owned tensor copied out of an engine output: shape plus row-major data.
///
/// Engine outputs only stay valid until the next invocation of the same
/// session, so anything carried across steps (the encoded context and every
/// cache tensor) is lifted into one of these.
#[derive(Debug, Clone)]
pub(crate) struct TensorBuf {
    shape: Vec<usize>,
    data: Vec<f32>,
}

impl TensorBuf {
    fn from_output(dims: &[i64], data: &[f32]) -> Self {
        Self {
            shape: dims.iter().map(|&d| d as usize).collect(),
            data: data.to_vec(),
        }
    }

    /// Re-upload as an owned input tensor.
    fn to_tensor(&self) -> Result<Tensor<f32>, SttError> {
        Tensor::from_array((self.shape.clone(), self.data.clone().into_boxed_slice()))
            .map_err(|e| SttError::Inference(e.to_string()))
    }

    /// Consume into an owned input tensor without copying the data.
    fn into_tensor(self) -> Result<Tensor<f32>, SttError> {
        Tensor::from_array((self.shape, self.data.into_boxed_slice()))
            .map_err(|e| SttError::Inference(e.to_string()))
    }
}

// ---------------------------------------------------------------------------
// GraphIo
// ---------------------------------------------------------------------------

/// Input-name order and cache arity discovered from graph metadata.
#[derive(Debug, Clone)]
struct GraphIo {
    /// Single audio input of the preprocess graph.
    preprocess_input: String,
    /// Feature tensor, then frame count.
    encode_inputs: Vec<String>,
    /// Token, context, position.
    uncached_inputs: Vec<String>,
    /// Token, context, position, then one name per cache tensor.
    cached_inputs: Vec<String>,
    /// Number of cache tensors in the bundle.
    cache_arity: usize,
}

fn input_names(session: &Session) -> Vec<String> {
    session.inputs.iter().map(|i| i.name.clone()).collect()
}

/// Validate that the two decode graphs agree on the cache bundle size.
///
/// The uncached graph emits logits plus the initial bundle; the cached graph
/// consumes token/context/position plus the bundle and emits logits plus a
/// replacement bundle of the same size.
fn cache_arity(
    uncached_outputs: usize,
    cached_inputs: usize,
    cached_outputs: usize,
) -> Result<usize, SttError> {
    if uncached_outputs < 2 {
        return Err(SttError::ModelLoad(format!(
            "uncached decode graph must emit logits plus cache tensors, got {uncached_outputs} output(s)"
        )));
    }
    let arity = uncached_outputs - 1;
    if cached_inputs != arity + 3 {
        return Err(SttError::ModelLoad(format!(
            "cached decode graph takes {cached_inputs} input(s) but the cache bundle has {arity} tensor(s)"
        )));
    }
    if cached_outputs != arity + 1 {
        return Err(SttError::ModelLoad(format!(
            "cached decode graph emits {cached_outputs} output(s) but the cache bundle has {arity} tensor(s)"
        )));
    }
    Ok(arity)
}

impl GraphIo {
    fn inspect(
        preprocess: &Session,
        encode: &Session,
        uncached: &Session,
        cached: &Session,
    ) -> Result<Self, SttError> {
        let preprocess_inputs = input_names(preprocess);
        if preprocess_inputs.len() != 1 || preprocess.outputs.len() != 1 {
            return Err(SttError::ModelLoad(format!(
                "preprocess graph must have one input and one output, got {}/{}",
                preprocess_inputs.len(),
                preprocess.outputs.len()
            )));
        }

        let encode_inputs = input_names(encode);
        if encode_inputs.len() != 2 || encode.outputs.len() != 1 {
            return Err(SttError::ModelLoad(format!(
                "encode graph must have two inputs and one output, got {}/{}",
                encode_inputs.len(),
                encode.outputs.len()
            )));
        }

        let uncached_inputs = input_names(uncached);
        if uncached_inputs.len() != 3 {
            return Err(SttError::ModelLoad(format!(
                "uncached decode graph must have three inputs, got {}",
                uncached_inputs.len()
            )));
        }

        let cached_inputs = input_names(cached);
        let arity = cache_arity(
            uncached.outputs.len(),
            cached_inputs.len(),
            cached.outputs.len(),
        )?;

        Ok(Self {
            preprocess_input: preprocess_inputs[0].clone(),
            encode_inputs,
            uncached_inputs,
            cached_inputs,
            cache_arity: arity,
        })
    }
}

// ---------------------------------------------------------------------------
// MoonshineEngine
// ---------------------------------------------------------------------------

/// Production engine wrapping the four decode-pipeline sessions.
///
/// Construct with [`MoonshineEngine::load`]; transcribe with
/// [`MoonshineEngine::generate`] + [`MoonshineEngine::detokenize`], or
/// [`SttEngine::transcribe`] for the combined path.
pub struct MoonshineEngine {
    preprocess: Session,
    encode: Session,
    uncached_decode: Session,
    cached_decode: Session,
    io: GraphIo,
    vocab: Vocabulary,
}

impl std::fmt::Debug for MoonshineEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MoonshineEngine")
            .field("cache_arity", &self.io.cache_arity)
            .field("vocab_len", &self.vocab.len())
            .finish_non_exhaustive()
    }
}

impl MoonshineEngine {
    /// Load the four graphs and the vocabulary from `models_dir`.
    ///
    /// # Errors
    ///
    /// - [`SttError::ModelLoad`] — a graph file is missing or malformed, or
    ///   the graphs disagree on the cache-bundle arity.
    /// - [`SttError::TokenizerLoad`] — the vocabulary resource is missing or
    ///   malformed.
    pub fn load(models_dir: impl AsRef<Path>) -> Result<Self, SttError> {
        let dir = models_dir.as_ref();
        log::info!("loading models from {}", dir.display());

        let preprocess = load_graph(&dir.join(PREPROCESS_GRAPH))?;
        let encode = load_graph(&dir.join(ENCODE_GRAPH))?;
        let uncached_decode = load_graph(&dir.join(UNCACHED_DECODE_GRAPH))?;
        let cached_decode = load_graph(&dir.join(CACHED_DECODE_GRAPH))?;

        let io = GraphIo::inspect(&preprocess, &encode, &uncached_decode, &cached_decode)?;
        let vocab = Vocabulary::load(dir.join(VOCABULARY_FILE))?;

        log::info!(
            "engine ready: {} cache tensors per step, {} vocabulary entries",
            io.cache_arity,
            vocab.len()
        );

        Ok(Self {
            preprocess,
            encode,
            uncached_decode,
            cached_decode,
            io,
            vocab,
        })
    }

    /// Generate a token sequence for one utterance.
    ///
    /// `audio` is 16 kHz mono f32 in `[-1.0, 1.0]`.  `max_len = 0` selects
    /// the duration-derived budget (see [`decoder::token_budget`]).
    ///
    /// # Errors
    ///
    /// - [`SttError::InvalidInput`] — `audio` is empty.
    /// - [`SttError::Inference`] — any stage failed; no partial sequence is
    ///   returned.
    pub fn generate(&mut self, audio: &[f32], max_len: usize) -> Result<Vec<i64>, SttError> {
        if audio.is_empty() {
            return Err(SttError::InvalidInput("audio signal is empty".into()));
        }

        let budget = decoder::token_budget(audio.len(), max_len);
        let (features, frames) = self.extract_features(audio)?;
        let context = self.encode_context(features, frames)?;

        log::debug!(
            "decoding {} samples: {frames} context frames, budget {budget}",
            audio.len()
        );

        let mut backend = GraphBackend {
            uncached: &mut self.uncached_decode,
            cached: &mut self.cached_decode,
            io: &self.io,
            context,
        };
        decoder::decode_greedy(&mut backend, frames, budget)
    }

    /// Map a token sequence back to text via the vocabulary table.
    ///
    /// Pure lookup; callable independently of generation.
    pub fn detokenize(&self, tokens: &[i64]) -> String {
        self.vocab.detokenize(tokens)
    }

    /// The loaded vocabulary table.
    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocab
    }

    /// Run the preprocess graph: waveform in, feature tensor + frame count
    /// out.
    fn extract_features(&mut self, audio: &[f32]) -> Result<(TensorBuf, i32), SttError> {
        let audio_tensor =
            Tensor::from_array(([1usize, audio.len()], audio.to_vec().into_boxed_slice()))
                .map_err(|e| SttError::Inference(e.to_string()))?;

        let inputs: Vec<(Cow<'_, str>, SessionInputValue<'_>)> = vec![(
            Cow::Borrowed(self.io.preprocess_input.as_str()),
            audio_tensor.into(),
        )];

        let outputs = self
            .preprocess
            .run(inputs)
            .map_err(|e| SttError::Inference(format!("preprocess: {e}")))?;

        let (shape, data) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| SttError::Inference(format!("preprocess output: {e}")))?;
        let dims: &[i64] = shape;
        if dims.len() < 2 {
            return Err(SttError::Inference(format!(
                "unexpected feature shape {dims:?}"
            )));
        }

        Ok((TensorBuf::from_output(dims, data), dims[1] as i32))
    }

    /// Run the encode graph: feature tensor + frame count in, encoded
    /// context out.
    fn encode_context(&mut self, features: TensorBuf, frames: i32) -> Result<TensorBuf, SttError> {
        let feature_tensor = features.into_tensor()?;
        let frames_tensor = Tensor::from_array(([1usize], vec![frames].into_boxed_slice()))
            .map_err(|e| SttError::Inference(e.to_string()))?;

        let inputs: Vec<(Cow<'_, str>, SessionInputValue<'_>)> = vec![
            (
                Cow::Borrowed(self.io.encode_inputs[0].as_str()),
                feature_tensor.into(),
            ),
            (
                Cow::Borrowed(self.io.encode_inputs[1].as_str()),
                frames_tensor.into(),
            ),
        ];

        let outputs = self
            .encode
            .run(inputs)
            .map_err(|e| SttError::Inference(format!("encode: {e}")))?;

        let (shape, data) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| SttError::Inference(format!("encode output: {e}")))?;
        let dims: &[i64] = shape;

        Ok(TensorBuf::from_output(dims, data))
    }
}

impl SttEngine for MoonshineEngine {
    fn transcribe(&mut self, audio: &[f32]) -> Result<String, SttError> {
        let tokens = self.generate(audio, 0)?;
        Ok(self.vocab.detokenize(&tokens))
    }
}

// ---------------------------------------------------------------------------
// GraphBackend
// ---------------------------------------------------------------------------

/// [`DecoderBackend`] over the two decode sessions for one generation call.
///
/// Holds the encoded context for the whole call and translates each step
/// into one session run.  The cache bundle is a positionally ordered
/// `Vec<TensorBuf>`; its length always equals `io.cache_arity`.
struct GraphBackend<'m> {
    uncached: &'m mut Session,
    cached: &'m mut Session,
    io: &'m GraphIo,
    context: TensorBuf,
}

/// The three leading inputs shared by both decode graphs: current token,
/// encoded context, position counter.
fn leading_inputs<'a>(
    names: &'a [String],
    context: &TensorBuf,
    token: i64,
    position: i32,
) -> Result<Vec<(Cow<'a, str>, SessionInputValue<'a>)>, SttError> {
    let token_tensor = Tensor::from_array(([1usize, 1], vec![token].into_boxed_slice()))
        .map_err(|e| SttError::Inference(e.to_string()))?;
    let position_tensor = Tensor::from_array(([1usize], vec![position].into_boxed_slice()))
        .map_err(|e| SttError::Inference(e.to_string()))?;
    let context_tensor = context.to_tensor()?;

    Ok(vec![
        (Cow::Borrowed(names[0].as_str()), token_tensor.into()),
        (Cow::Borrowed(names[1].as_str()), context_tensor.into()),
        (Cow::Borrowed(names[2].as_str()), position_tensor.into()),
    ])
}

/// Split a decode run's outputs into logits (output 0) and the replacement
/// cache bundle (outputs `1..=cache_arity`, in graph order).
fn split_step_outputs(
    outputs: &SessionOutputs,
    cache_arity: usize,
) -> Result<StepOutput<Vec<TensorBuf>>, SttError> {
    let (_, logits) = outputs[0]
        .try_extract_tensor::<f32>()
        .map_err(|e| SttError::Inference(format!("logits output: {e}")))?;
    let logits = logits.to_vec();

    let mut cache = Vec::with_capacity(cache_arity);
    for i in 1..=cache_arity {
        let (shape, data) = outputs[i]
            .try_extract_tensor::<f32>()
            .map_err(|e| SttError::Inference(format!("cache output {i}: {e}")))?;
        let dims: &[i64] = shape;
        cache.push(TensorBuf::from_output(dims, data));
    }

    Ok(StepOutput { logits, cache })
}

impl DecoderBackend for GraphBackend<'_> {
    type Cache = Vec<TensorBuf>;

    fn first_step(
        &mut self,
        token: i64,
        position: i32,
    ) -> Result<StepOutput<Vec<TensorBuf>>, SttError> {
        let inputs = leading_inputs(&self.io.uncached_inputs, &self.context, token, position)?;
        let outputs = self
            .uncached
            .run(inputs)
            .map_err(|e| SttError::Inference(format!("uncached decode: {e}")))?;
        split_step_outputs(&outputs, self.io.cache_arity)
    }

    fn cached_step(
        &mut self,
        token: i64,
        position: i32,
        cache: Vec<TensorBuf>,
    ) -> Result<StepOutput<Vec<TensorBuf>>, SttError> {
        let mut inputs = leading_inputs(&self.io.cached_inputs, &self.context, token, position)?;
        for (name, tensor) in self.io.cached_inputs[3..].iter().zip(cache) {
            inputs.push((Cow::Borrowed(name.as_str()), tensor.into_tensor()?.into()));
        }

        let outputs = self
            .cached
            .run(inputs)
            .map_err(|e| SttError::Inference(format!("cached decode: {e}")))?;
        split_step_outputs(&outputs, self.io.cache_arity)
    }
}

// ---------------------------------------------------------------------------
// MockSttEngine  (test-only)
// ---------------------------------------------------------------------------

/// A test double that returns a pre-configured response without loading any
/// model files.
#[cfg(test)]
pub struct MockSttEngine {
    response: Result<String, SttError>,
}

#[cfg(test)]
impl MockSttEngine {
    /// Create a mock that always returns `Ok(text)` for non-empty audio.
    pub fn ok(text: impl Into<String>) -> Self {
        Self {
            response: Ok(text.into()),
        }
    }
}

#[cfg(test)]
impl SttEngine for MockSttEngine {
    fn transcribe(&mut self, audio: &[f32]) -> Result<String, SttError> {
        // Enforce the empty-audio contract even in the mock.
        if audio.is_empty() {
            return Err(SttError::InvalidInput("audio signal is empty".into()));
        }
        self.response.clone()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
