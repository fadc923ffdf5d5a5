//! Request/response contract between the transfer pipeline and a codec.
//!
//! An engine is a stateful session fixed to one [`Direction`]. Each
//! [`TransformEngine::transform`] call receives the unconsumed tail of the
//! current chunk and an empty destination buffer, and reports how much of
//! each it used together with an [`EngineStatus`]. Calls need not consume
//! all input or fill the destination; the caller re-invokes with whatever is
//! left.

use core::fmt;

/// Whether a session compresses or decompresses.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Direction {
    /// Plain input, compressed output.
    Compress,
    /// Compressed input, plain output.
    Decompress,
}

impl Direction {
    /// Returns `true` for [`Direction::Compress`].
    #[must_use]
    pub const fn is_compress(self) -> bool {
        matches!(self, Self::Compress)
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Compress => f.write_str("compress"),
            Self::Decompress => f.write_str("decompress"),
        }
    }
}

/// Outcome class of one engine call.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum EngineStatus {
    /// Progress was made (possibly none if the input was empty).
    Ok,
    /// The destination cannot hold the next unit of output.
    BufferTooSmall,
    /// The input is not a valid stream.
    DataError,
    /// The engine failed internally; the session is unusable.
    Fatal,
}

/// Byte counts and status reported by one engine call.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct TransformResult {
    /// Source bytes consumed by this call.
    pub consumed: usize,
    /// Destination bytes written by this call.
    pub produced: usize,
    /// Outcome class.
    pub status: EngineStatus,
}

impl TransformResult {
    /// Builds a result from its parts.
    #[must_use]
    pub const fn new(consumed: usize, produced: usize, status: EngineStatus) -> Self {
        Self {
            consumed,
            produced,
            status,
        }
    }

    /// Successful call.
    #[must_use]
    pub const fn ok(consumed: usize, produced: usize) -> Self {
        Self::new(consumed, produced, EngineStatus::Ok)
    }

    /// Destination too small; nothing was consumed or produced.
    #[must_use]
    pub const fn too_small() -> Self {
        Self::new(0, 0, EngineStatus::BufferTooSmall)
    }

    /// Returns `true` when the call consumed or produced anything.
    #[must_use]
    pub const fn made_progress(&self) -> bool {
        self.consumed != 0 || self.produced != 0
    }
}

/// A stateful compression or decompression session.
pub trait TransformEngine {
    /// Direction fixed when the session was opened.
    fn direction(&self) -> Direction;

    /// Processes a prefix of `src` into a prefix of `dst`.
    fn transform(&mut self, src: &[u8], dst: &mut [u8]) -> TransformResult;

    /// Emits output held back inside the session once the input has ended.
    ///
    /// Returns [`EngineStatus::Ok`] with `produced == 0` when nothing remains,
    /// and [`EngineStatus::DataError`] when the input stopped inside a member
    /// or frame.
    fn finish(&mut self, _dst: &mut [u8]) -> TransformResult {
        TransformResult::ok(0, 0)
    }

    /// Returns the session to its freshly opened state.
    ///
    /// Called before each new input so a stream abandoned halfway cannot
    /// leak into the next one.
    fn reset(&mut self) {}

    /// Upper bound on the output of one call given `src_len` input bytes.
    ///
    /// `None` means the output size cannot be bounded from the input alone
    /// (decompression), and the caller should size the destination from its
    /// escalation ladder.
    fn max_output_size(&self, src_len: usize) -> Option<usize>;

    /// Short codec name for diagnostics.
    fn name(&self) -> &'static str;
}

impl<E: TransformEngine + ?Sized> TransformEngine for Box<E> {
    fn direction(&self) -> Direction {
        (**self).direction()
    }

    fn transform(&mut self, src: &[u8], dst: &mut [u8]) -> TransformResult {
        (**self).transform(src, dst)
    }

    fn finish(&mut self, dst: &mut [u8]) -> TransformResult {
        (**self).finish(dst)
    }

    fn reset(&mut self) {
        (**self).reset();
    }

    fn max_output_size(&self, src_len: usize) -> Option<usize> {
        (**self).max_output_size(src_len)
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_detection() {
        assert!(!TransformResult::ok(0, 0).made_progress());
        assert!(TransformResult::ok(1, 0).made_progress());
        assert!(TransformResult::ok(0, 1).made_progress());
        assert!(!TransformResult::too_small().made_progress());
    }

    #[test]
    fn direction_display() {
        assert_eq!(Direction::Compress.to_string(), "compress");
        assert_eq!(Direction::Decompress.to_string(), "decompress");
        assert!(Direction::Compress.is_compress());
        assert!(!Direction::Decompress.is_compress());
    }
}
