//! Greedy autoregressive decode loop.
//!
//! # State machine
//!
//! ```text
//! Init ──▶ first_step ──▶ select ──▶ append ──┬──▶ done (terminal id or budget)
//!                            ▲                │
//!                            │                ▼
//!                        cached_step ◀── advance position,
//!                                         hand over cache
//! ```
//!
//! The first decode invocation is structurally distinct from every later one:
//! the target graph expects no cache inputs.  All subsequent invocations take
//! the cache bundle emitted by the previous step, in order, and emit a full
//! replacement.  [`DecoderBackend`] models that split as two methods; the
//! loop calls [`first_step`] exactly once and then stays on [`cached_step`].
//!
//! The cache bundle is *moved* into each cached step, so a stale bundle can
//! never be replayed: ownership enforces the threading contract.
//!
//! [`first_step`]: DecoderBackend::first_step
//! [`cached_step`]: DecoderBackend::cached_step

use crate::audio::SAMPLE_RATE;

use super::error::SttError;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Beginning-of-sequence token id; every generated sequence starts with it.
pub const BOS_TOKEN: i64 = 1;

/// Terminal token id; generation stops after appending it.
pub const EOS_TOKEN: i64 = 2;

/// Upper bound on tokens produced per second of speech, used to derive the
/// default iteration budget.
pub const TOKENS_PER_SECOND: usize = 6;

// ---------------------------------------------------------------------------
// DecoderBackend
// ---------------------------------------------------------------------------

/// Output of one decode invocation: the score vector for the next token plus
/// the cache bundle to thread into the following step.
pub struct StepOutput<C> {
    /// Flat per-candidate score vector; the next token id is its argmax.
    pub logits: Vec<f32>,
    /// Replacement cache bundle, consumed by the next [`DecoderBackend::cached_step`].
    pub cache: C,
}

/// Executes single decode steps against the two decode graphs.
///
/// `Cache` is opaque to the loop: an ordered bundle of per-layer state whose
/// arity is a property of the loaded model.  The loop only moves it from one
/// step's output into the next step's input.
pub trait DecoderBackend {
    /// Per-layer state carried between steps.
    type Cache;

    /// Run the cache-free first step.
    ///
    /// `token` is always [`BOS_TOKEN`]; `position` is the encoded context
    /// length.
    fn first_step(&mut self, token: i64, position: i32) -> Result<StepOutput<Self::Cache>, SttError>;

    /// Run one cached step with the bundle emitted by the previous step.
    fn cached_step(
        &mut self,
        token: i64,
        position: i32,
        cache: Self::Cache,
    ) -> Result<StepOutput<Self::Cache>, SttError>;
}

// ---------------------------------------------------------------------------
// Greedy selection
// ---------------------------------------------------------------------------

/// Index of the maximum value in `logits`, or `None` when empty.
///
/// Ties break to the *lowest* index: the scan replaces the current best only
/// on a strictly greater score.  Deterministic; no sampling, no temperature.
pub fn greedy_argmax(logits: &[f32]) -> Option<i64> {
    let (&first, rest) = logits.split_first()?;
    let mut best_idx = 0usize;
    let mut best = first;
    for (i, &score) in rest.iter().enumerate() {
        if score > best {
            best = score;
            best_idx = i + 1;
        }
    }
    Some(best_idx as i64)
}

// ---------------------------------------------------------------------------
// Iteration budget
// ---------------------------------------------------------------------------

/// Effective iteration budget for one generation call.
///
/// A non-zero `requested` value is used as-is.  Otherwise the budget is
/// derived from the audio duration: `ceil(seconds * TOKENS_PER_SECOND)`.
/// The heuristic bounds worst-case generation cost on malformed inputs; it
/// is a guard, not an utterance-length estimate.
pub fn token_budget(sample_count: usize, requested: usize) -> usize {
    if requested > 0 {
        return requested;
    }
    let seconds = sample_count as f64 / SAMPLE_RATE as f64;
    (seconds * TOKENS_PER_SECOND as f64).ceil() as usize
}

// ---------------------------------------------------------------------------
// Decode loop
// ---------------------------------------------------------------------------

/// Generate a token sequence by greedy decoding.
///
/// Starts from `[BOS_TOKEN]` with the position counter at `context_frames`
/// and appends exactly one token per completed step.  Stops after appending
/// [`EOS_TOKEN`] (which is retained in the output) or once `budget` tokens
/// have been appended; budget exhaustion is a normal return, not an error.
///
/// # Errors
///
/// [`SttError::Inference`] when a backend invocation fails or returns an
/// empty logits vector.  No partial sequence is returned in that case.
pub fn decode_greedy<B: DecoderBackend>(
    backend: &mut B,
    context_frames: i32,
    budget: usize,
) -> Result<Vec<i64>, SttError> {
    let mut tokens = vec![BOS_TOKEN];
    if budget == 0 {
        return Ok(tokens);
    }

    let mut position = context_frames;
    let mut step = backend.first_step(BOS_TOKEN, position)?;

    loop {
        let next = greedy_argmax(&step.logits)
            .ok_or_else(|| SttError::Inference("decode step returned empty logits".into()))?;
        tokens.push(next);

        if next == EOS_TOKEN || tokens.len() > budget {
            break;
        }

        position += 1;
        step = backend.cached_step(next, position, step.cache)?;
    }

    Ok(tokens)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // ---- Scripted backend --------------------------------------------------

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum StepKind {
        First,
        Cached,
    }

    #[derive(Debug, Clone)]
    struct Call {
        kind: StepKind,
        token: i64,
        position: i32,
        /// Cache value received, for cached steps.
        cache_in: Option<u32>,
    }

    /// Emits a scripted logits vector per step and a step-counter cache so
    /// tests can observe exactly what the loop threads through.
    struct ScriptedBackend {
        script: Vec<Vec<f32>>,
        calls: Vec<Call>,
    }

    impl ScriptedBackend {
        fn new(script: Vec<Vec<f32>>) -> Self {
            Self {
                script,
                calls: Vec::new(),
            }
        }

        fn logits_for_call(&self, index: usize) -> Vec<f32> {
            self.script
                .get(index)
                .cloned()
                .unwrap_or_else(|| self.script.last().expect("script is empty").clone())
        }
    }

    impl DecoderBackend for ScriptedBackend {
        type Cache = u32;

        fn first_step(&mut self, token: i64, position: i32) -> Result<StepOutput<u32>, SttError> {
            let index = self.calls.len();
            self.calls.push(Call {
                kind: StepKind::First,
                token,
                position,
                cache_in: None,
            });
            Ok(StepOutput {
                logits: self.logits_for_call(index),
                cache: index as u32,
            })
        }

        fn cached_step(
            &mut self,
            token: i64,
            position: i32,
            cache: u32,
        ) -> Result<StepOutput<u32>, SttError> {
            let index = self.calls.len();
            self.calls.push(Call {
                kind: StepKind::Cached,
                token,
                position,
                cache_in: Some(cache),
            });
            Ok(StepOutput {
                logits: self.logits_for_call(index),
                cache: index as u32,
            })
        }
    }

    /// Backend whose cached step always fails.
    struct FailingBackend;

    impl DecoderBackend for FailingBackend {
        type Cache = ();

        fn first_step(&mut self, _token: i64, _position: i32) -> Result<StepOutput<()>, SttError> {
            Ok(StepOutput {
                logits: one_hot(3, 8),
                cache: (),
            })
        }

        fn cached_step(
            &mut self,
            _token: i64,
            _position: i32,
            _cache: (),
        ) -> Result<StepOutput<()>, SttError> {
            Err(SttError::Inference("cached graph fault".into()))
        }
    }

    /// Logits vector of `len` zeros with a single 1.0 at `index`.
    fn one_hot(index: usize, len: usize) -> Vec<f32> {
        let mut v = vec![0.0; len];
        v[index] = 1.0;
        v
    }

    // ---- Greedy selection --------------------------------------------------

    #[test]
    fn argmax_picks_the_maximum() {
        assert_eq!(greedy_argmax(&[0.1, 0.2, 0.9, 0.3]), Some(2));
    }

    #[test]
    fn argmax_tie_breaks_to_lowest_index() {
        assert_eq!(greedy_argmax(&[0.1, 0.9, 0.9, 0.2]), Some(1));
    }

    #[test]
    fn argmax_all_equal_picks_index_zero() {
        assert_eq!(greedy_argmax(&[0.5, 0.5, 0.5]), Some(0));
    }

    #[test]
    fn argmax_single_element() {
        assert_eq!(greedy_argmax(&[-3.0]), Some(0));
    }

    #[test]
    fn argmax_empty_is_none() {
        assert_eq!(greedy_argmax(&[]), None);
    }

    // ---- Budget heuristic --------------------------------------------------

    #[test]
    fn explicit_budget_wins() {
        assert_eq!(token_budget(160_000, 10), 10);
    }

    #[test]
    fn heuristic_budget_is_six_tokens_per_second() {
        // 1 s of 16 kHz audio → 6 tokens.
        assert_eq!(token_budget(16_000, 0), 6);
        // 10 s → 60 tokens.
        assert_eq!(token_budget(160_000, 0), 60);
    }

    #[test]
    fn heuristic_budget_rounds_up() {
        // 0.5 s → ceil(3.0) = 3; 8 001 samples → ceil(3.000375) = 4.
        assert_eq!(token_budget(8_000, 0), 3);
        assert_eq!(token_budget(8_001, 0), 4);
    }

    #[test]
    fn heuristic_budget_is_positive_for_any_nonempty_audio() {
        assert_eq!(token_budget(1, 0), 1);
    }

    // ---- Loop structure ----------------------------------------------------

    #[test]
    fn sequence_starts_with_bos_and_first_step_sees_it() {
        let mut backend = ScriptedBackend::new(vec![one_hot(EOS_TOKEN as usize, 8)]);
        let tokens = decode_greedy(&mut backend, 40, 10).unwrap();

        assert_eq!(tokens[0], BOS_TOKEN);
        assert_eq!(backend.calls[0].kind, StepKind::First);
        assert_eq!(backend.calls[0].token, BOS_TOKEN);
        assert_eq!(backend.calls[0].position, 40);
    }

    #[test]
    fn terminal_token_stops_the_loop_and_is_retained() {
        let mut backend = ScriptedBackend::new(vec![
            one_hot(5, 8),
            one_hot(7, 8),
            one_hot(EOS_TOKEN as usize, 8),
        ]);
        let tokens = decode_greedy(&mut backend, 40, 100).unwrap();

        assert_eq!(tokens, vec![BOS_TOKEN, 5, 7, EOS_TOKEN]);
        // Three completed steps, and no engine call after the terminal id.
        assert_eq!(backend.calls.len(), 3);
    }

    #[test]
    fn one_engine_call_per_appended_token() {
        let mut backend = ScriptedBackend::new(vec![
            one_hot(5, 8),
            one_hot(6, 8),
            one_hot(EOS_TOKEN as usize, 8),
        ]);
        let tokens = decode_greedy(&mut backend, 12, 100).unwrap();

        assert_eq!(tokens.len() - 1, backend.calls.len());
    }

    #[test]
    fn only_the_first_call_is_uncached() {
        let mut backend = ScriptedBackend::new(vec![
            one_hot(5, 8),
            one_hot(6, 8),
            one_hot(EOS_TOKEN as usize, 8),
        ]);
        decode_greedy(&mut backend, 12, 100).unwrap();

        assert_eq!(backend.calls[0].kind, StepKind::First);
        assert!(backend.calls[1..]
            .iter()
            .all(|c| c.kind == StepKind::Cached));
    }

    #[test]
    fn each_cached_step_receives_the_newly_selected_token() {
        let mut backend = ScriptedBackend::new(vec![
            one_hot(5, 8),
            one_hot(6, 8),
            one_hot(EOS_TOKEN as usize, 8),
        ]);
        decode_greedy(&mut backend, 12, 100).unwrap();

        assert_eq!(backend.calls[1].token, 5);
        assert_eq!(backend.calls[2].token, 6);
    }

    // ---- Cache threading ---------------------------------------------------

    #[test]
    fn cache_from_each_step_feeds_the_next() {
        // Never emit the terminal id; run to a budget of 5.
        let mut backend = ScriptedBackend::new(vec![one_hot(3, 8)]);
        decode_greedy(&mut backend, 0, 5).unwrap();

        assert_eq!(backend.calls.len(), 5);
        // Step i emits cache value i; step i+1 must receive exactly it.
        for (i, call) in backend.calls.iter().enumerate().skip(1) {
            assert_eq!(call.cache_in, Some((i - 1) as u32), "step {i}");
        }
    }

    #[test]
    fn position_increments_by_one_per_step() {
        let mut backend = ScriptedBackend::new(vec![one_hot(3, 8)]);
        decode_greedy(&mut backend, 100, 4).unwrap();

        let positions: Vec<i32> = backend.calls.iter().map(|c| c.position).collect();
        assert_eq!(positions, vec![100, 101, 102, 103]);
    }

    // ---- Budget exhaustion -------------------------------------------------

    #[test]
    fn budget_exhaustion_stops_at_exactly_max_len_tokens() {
        let mut backend = ScriptedBackend::new(vec![one_hot(3, 8)]);
        let tokens = decode_greedy(&mut backend, 0, 7).unwrap();

        // 7 appended tokens plus BOS, and exactly 7 engine calls.
        assert_eq!(tokens.len(), 8);
        assert_eq!(backend.calls.len(), 7);
        assert!(tokens[1..].iter().all(|&t| t == 3));
    }

    #[test]
    fn terminal_on_the_last_budgeted_step_is_retained() {
        let mut backend = ScriptedBackend::new(vec![
            one_hot(3, 8),
            one_hot(EOS_TOKEN as usize, 8),
        ]);
        let tokens = decode_greedy(&mut backend, 0, 2).unwrap();

        assert_eq!(tokens, vec![BOS_TOKEN, 3, EOS_TOKEN]);
    }

    #[test]
    fn zero_budget_returns_bos_only_without_engine_calls() {
        let mut backend = ScriptedBackend::new(vec![one_hot(3, 8)]);
        let tokens = decode_greedy(&mut backend, 0, 0).unwrap();

        assert_eq!(tokens, vec![BOS_TOKEN]);
        assert!(backend.calls.is_empty());
    }

    // ---- Failure propagation -----------------------------------------------

    #[test]
    fn backend_failure_aborts_with_no_partial_sequence() {
        let mut backend = FailingBackend;
        let err = decode_greedy(&mut backend, 0, 10).unwrap_err();
        assert!(matches!(err, SttError::Inference(_)));
    }

    #[test]
    fn empty_logits_is_an_inference_error() {
        let mut backend = ScriptedBackend::new(vec![Vec::new()]);
        let err = decode_greedy(&mut backend, 0, 10).unwrap_err();
        assert!(matches!(err, SttError::Inference(_)));
    }
}
