//! Fixed-duration window accumulation for live capture.
//!
//! The live path is a single-producer/single-consumer relationship: the
//! audio callback produces samples, and the transcription consumer takes a
//! fixed-size window whenever enough have accumulated.  [`WindowBuffer`]
//! is the buffer between them, a plain FIFO: a live transcriber must not
//! drop samples mid-utterance.
//!
//! # Example
//!
//! ```rust
//! use moonshine_stt::audio::WindowBuffer;
//!
//! let mut buf = WindowBuffer::new(4);
//! buf.push_slice(&[1.0, 2.0, 3.0]);
//! assert!(buf.take_window().is_none()); // below threshold
//!
//! buf.push_slice(&[4.0, 5.0]);
//! assert_eq!(buf.take_window(), Some(vec![1.0, 2.0, 3.0, 4.0]));
//! assert_eq!(buf.len(), 1); // 5.0 stays queued for the next window
//! ```

// ---------------------------------------------------------------------------
// WindowBuffer
// ---------------------------------------------------------------------------

/// Accumulates `f32` samples and yields them in fixed-size windows.
///
/// Samples arrive in arbitrary chunk sizes and leave in windows of exactly
/// `window_len` samples, in arrival order.  Anything beyond a full window
/// stays queued for the next one.
pub struct WindowBuffer {
    buf: Vec<f32>,
    window_len: usize,
}

impl WindowBuffer {
    /// Create a buffer that yields windows of `window_len` samples.
    ///
    /// # Panics
    ///
    /// Panics if `window_len == 0`.
    pub fn new(window_len: usize) -> Self {
        assert!(window_len > 0, "WindowBuffer window length must be > 0");
        Self {
            buf: Vec::with_capacity(window_len),
            window_len,
        }
    }

    /// Append `samples` to the queue.
    pub fn push_slice(&mut self, samples: &[f32]) {
        self.buf.extend_from_slice(samples);
    }

    /// Take one full window if enough samples have accumulated.
    ///
    /// Returns `None` while fewer than a window's worth are queued.
    pub fn take_window(&mut self) -> Option<Vec<f32>> {
        if self.buf.len() < self.window_len {
            return None;
        }
        let rest = self.buf.split_off(self.window_len);
        Some(std::mem::replace(&mut self.buf, rest))
    }

    /// Drain whatever is queued, full window or not.
    ///
    /// Used at shutdown so a trailing partial window still gets
    /// transcribed.
    pub fn flush(&mut self) -> Vec<f32> {
        std::mem::take(&mut self.buf)
    }

    /// Number of samples currently queued.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Returns `true` when no samples are queued.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Window size in samples.
    pub fn window_len(&self) -> usize {
        self.window_len
    }

    /// Queued duration in seconds, assuming `sample_rate` Hz mono.
    pub fn duration_secs(&self, sample_rate: u32) -> f32 {
        if sample_rate == 0 {
            return 0.0;
        }
        self.buf.len() as f32 / sample_rate as f32
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
