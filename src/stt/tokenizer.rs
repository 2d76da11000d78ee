//! Token-id vocabulary and detokenization.
//!
//! The vocabulary resource is a JSON file whose `model.vocab` object maps
//! token text to an integer id.  [`Vocabulary::load`] inverts that once into
//! an id → text table; ids may be sparse.
//!
//! Detokenization is a pure lookup: each known id contributes its fragment
//! followed by a single space, and unknown ids are skipped silently.  The
//! skip is deliberate policy, not error handling: sentinel ids without a
//! printable form simply produce nothing.

use std::collections::HashMap;
use std::path::Path;

use super::error::SttError;

// ---------------------------------------------------------------------------
// Vocabulary
// ---------------------------------------------------------------------------

/// Immutable id → text-fragment table, built once at model load.
#[derive(Debug, Clone)]
pub struct Vocabulary {
    id_to_text: HashMap<i64, String>,
}

impl Vocabulary {
    /// Load the vocabulary from a `tokenizer.json` file.
    ///
    /// # Errors
    ///
    /// [`SttError::TokenizerLoad`] when the file cannot be read or does not
    /// contain a well-formed `model.vocab` object.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SttError> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path)
            .map_err(|e| SttError::TokenizerLoad(format!("{}: {e}", path.display())))?;
        Self::from_json(&data)
    }

    /// Parse a vocabulary from JSON text (see [`Vocabulary::load`]).
    pub fn from_json(data: &str) -> Result<Self, SttError> {
        let root: serde_json::Value = serde_json::from_str(data)
            .map_err(|e| SttError::TokenizerLoad(format!("malformed vocabulary JSON: {e}")))?;

        let vocab = root
            .get("model")
            .and_then(|m| m.get("vocab"))
            .and_then(|v| v.as_object())
            .ok_or_else(|| SttError::TokenizerLoad("missing model.vocab object".into()))?;

        let mut id_to_text = HashMap::with_capacity(vocab.len());
        for (text, id) in vocab {
            let id = id.as_i64().ok_or_else(|| {
                SttError::TokenizerLoad(format!("non-integer id for token {text:?}"))
            })?;
            id_to_text.insert(id, text.clone());
        }

        Ok(Self { id_to_text })
    }

    /// Text fragment for `id`, if the table contains it.
    pub fn get(&self, id: i64) -> Option<&str> {
        self.id_to_text.get(&id).map(String::as_str)
    }

    /// Number of entries in the table.
    pub fn len(&self) -> usize {
        self.id_to_text.len()
    }

    /// Returns `true` when the table has no entries.
    pub fn is_empty(&self) -> bool {
        self.id_to_text.is_empty()
    }

    /// Map a token sequence back to text.
    ///
    /// Each id found in the table appends its fragment plus one space;
    /// ids absent from the table are skipped.  The result therefore carries
    /// a trailing space whenever at least one id was known.
    pub fn detokenize(&self, tokens: &[i64]) -> String {
        let mut out = String::new();
        for &id in tokens {
            if let Some(text) = self.id_to_text.get(&id) {
                out.push_str(text);
                out.push(' ');
            }
        }
        out
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn small_vocab() -> Vocabulary {
        Vocabulary::from_json(
            r#"{"model": {"vocab": {"<s>": 1, "</s>": 2, "hello": 5}}}"#,
        )
        .unwrap()
    }

    // ---- Loading -----------------------------------------------------------

    #[test]
    fn parses_the_nested_vocab_object() {
        let vocab = small_vocab();
        assert_eq!(vocab.len(), 3);
        assert_eq!(vocab.get(5), Some("hello"));
        assert_eq!(vocab.get(1), Some("<s>"));
    }

    #[test]
    fn sparse_ids_are_allowed() {
        let vocab =
            Vocabulary::from_json(r#"{"model": {"vocab": {"a": 3, "b": 4096}}}"#).unwrap();
        assert_eq!(vocab.get(4096), Some("b"));
        assert_eq!(vocab.get(4), None);
    }

    #[test]
    fn missing_nested_key_is_a_load_error() {
        let err = Vocabulary::from_json(r#"{"vocab": {"a": 1}}"#).unwrap_err();
        assert!(matches!(err, SttError::TokenizerLoad(_)));
    }

    #[test]
    fn malformed_json_is_a_load_error() {
        let err = Vocabulary::from_json("not json at all").unwrap_err();
        assert!(matches!(err, SttError::TokenizerLoad(_)));
    }

    #[test]
    fn non_integer_id_is_a_load_error() {
        let err =
            Vocabulary::from_json(r#"{"model": {"vocab": {"a": "one"}}}"#).unwrap_err();
        assert!(matches!(err, SttError::TokenizerLoad(_)));
    }

    #[test]
    fn load_missing_file_is_a_load_error() {
        let err = Vocabulary::load("/nonexistent/tokenizer.json").unwrap_err();
        assert!(matches!(err, SttError::TokenizerLoad(_)));
    }

    #[test]
    fn load_reads_from_disk() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("tokenizer.json");
        let mut f = std::fs::File::create(&path).unwrap();
        write!(f, r#"{{"model": {{"vocab": {{"yes": 9}}}}}}"#).unwrap();

        let vocab = Vocabulary::load(&path).unwrap();
        assert_eq!(vocab.get(9), Some("yes"));
    }

    // ---- Detokenization ----------------------------------------------------

    #[test]
    fn detokenize_joins_fragments_with_trailing_space() {
        let vocab = small_vocab();
        assert_eq!(vocab.detokenize(&[1, 5, 2]), "<s> hello </s> ");
    }

    #[test]
    fn detokenize_empty_sequence_is_empty() {
        let vocab = small_vocab();
        assert_eq!(vocab.detokenize(&[]), "");
    }

    #[test]
    fn unknown_ids_are_skipped_silently() {
        let vocab = small_vocab();
        // 999 has no entry; processing continues with subsequent ids.
        assert_eq!(vocab.detokenize(&[1, 999, 5]), "<s> hello ");
    }

    #[test]
    fn all_unknown_ids_yield_empty_string() {
        let vocab = small_vocab();
        assert_eq!(vocab.detokenize(&[100, 200, 300]), "");
    }

    #[test]
    fn detokenize_is_stateless_and_repeatable() {
        let vocab = small_vocab();
        let first = vocab.detokenize(&[5, 5]);
        let second = vocab.detokenize(&[5, 5]);
        assert_eq!(first, "hello hello ");
        assert_eq!(first, second);
    }
}
