//! Per-file source/destination scratch buffers with destination escalation.
//!
//! The pool owns exactly two [`AlignedBuffer`]s for the lifetime of one file:
//! the source chunk buffer, which is sized once, and the destination buffer
//! handed to the transform engine, which may be replaced by a larger one when
//! the engine reports that its output does not fit.
//!
//! Growth follows an *escalation ladder*: an ordered list of multipliers
//! applied to the (block-rounded) source buffer length. Each growth consumes one ladder step.
//! Replacing the destination frees the old allocation before requesting the
//! new one, so the previous contents are never preserved.
//!
//! # Example
//!
//! ```
//! use fast_io::buffer_pool::{BufferPool, Growth};
//!
//! let mut pool = BufferPool::new(4096, &[5, 20]).unwrap();
//! pool.seed_from_ladder().unwrap();
//! assert_eq!(pool.destination_len(), 5 * 4096);
//! assert_eq!(pool.grow_destination().unwrap(), Growth::Grown(20 * 4096));
//! assert_eq!(pool.grow_destination().unwrap(), Growth::Exhausted);
//! ```

use crate::aligned::{AlignedBuffer, AllocError, block_len_at_least_one};

/// Default destination multipliers, applied to the source chunk length.
pub const DEFAULT_EXPANSION_LADDER: [usize; 4] = [5, 20, 50, 100];

/// Outcome of [`BufferPool::grow_destination`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Growth {
    /// The destination was replaced by a buffer of the given length.
    Grown(usize),
    /// Every ladder step has been used; the destination is unchanged.
    Exhausted,
}

/// Source and destination buffers for one file run.
#[derive(Debug)]
pub struct BufferPool {
    source: AlignedBuffer,
    destination: AlignedBuffer,
    ladder: Vec<usize>,
    next_step: usize,
}

impl BufferPool {
    /// Allocates the source buffer for chunks of `chunk_len` bytes.
    ///
    /// The source length is rounded up to whole blocks (at least one). The
    /// destination starts empty; call [`seed_destination`](Self::seed_destination)
    /// or [`seed_from_ladder`](Self::seed_from_ladder) before driving the engine.
    pub fn new(chunk_len: usize, ladder: &[usize]) -> Result<Self, AllocError> {
        let source = AlignedBuffer::new(block_len_at_least_one(chunk_len))?;
        Ok(Self {
            source,
            destination: AlignedBuffer::empty(),
            ladder: ladder.to_vec(),
            next_step: 0,
        })
    }

    /// Sizes the destination to hold `len` bytes without consuming a ladder step.
    pub fn seed_destination(&mut self, len: usize) -> Result<usize, AllocError> {
        self.replace_destination(block_len_at_least_one(len))
    }

    /// Sizes the destination from the first ladder step, consuming it.
    ///
    /// Returns [`Growth::Exhausted`] when the ladder is empty.
    pub fn seed_from_ladder(&mut self) -> Result<Growth, AllocError> {
        self.grow_destination()
    }

    /// Replaces the destination with the next ladder size.
    ///
    /// Steps whose size would not exceed the current destination are skipped,
    /// so the destination never shrinks.
    pub fn grow_destination(&mut self) -> Result<Growth, AllocError> {
        while let Some(&multiplier) = self.ladder.get(self.next_step) {
            self.next_step += 1;
            let target = block_len_at_least_one(self.source.len().saturating_mul(multiplier));
            if target > self.destination.len() {
                let len = self.replace_destination(target)?;
                return Ok(Growth::Grown(len));
            }
        }
        Ok(Growth::Exhausted)
    }

    /// Returns `true` when no further growth step remains.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.next_step >= self.ladder.len()
    }

    /// Number of ladder steps consumed so far.
    #[must_use]
    pub const fn steps_taken(&self) -> usize {
        self.next_step
    }

    /// Source buffer length in bytes.
    #[must_use]
    pub const fn source_len(&self) -> usize {
        self.source.len()
    }

    /// Destination buffer length in bytes.
    #[must_use]
    pub const fn destination_len(&self) -> usize {
        self.destination.len()
    }

    /// Mutable access to the source buffer.
    pub fn source_mut(&mut self) -> &mut [u8] {
        self.source.as_mut_slice()
    }

    /// Borrows the source immutably and the destination mutably at the same time.
    pub fn split_mut(&mut self) -> (&[u8], &mut [u8]) {
        (self.source.as_slice(), self.destination.as_mut_slice())
    }

    fn replace_destination(&mut self, len: usize) -> Result<usize, AllocError> {
        // Free first: the old contents are never carried over.
        self.destination = AlignedBuffer::empty();
        self.destination = AlignedBuffer::new(len)?;
        Ok(len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aligned::BLOCK_SIZE;

    #[test]
    fn source_rounds_up_to_blocks() {
        let pool = BufferPool::new(5000, &DEFAULT_EXPANSION_LADDER).expect("pool");
        assert_eq!(pool.source_len(), 2 * BLOCK_SIZE);
        assert_eq!(pool.destination_len(), 0);
    }

    #[test]
    fn empty_chunk_still_gets_one_block() {
        let pool = BufferPool::new(0, &DEFAULT_EXPANSION_LADDER).expect("pool");
        assert_eq!(pool.source_len(), BLOCK_SIZE);
    }

    #[test]
    fn seed_destination_does_not_consume_ladder() {
        let mut pool = BufferPool::new(BLOCK_SIZE, &DEFAULT_EXPANSION_LADDER).expect("pool");
        assert_eq!(pool.seed_destination(100).expect("seed"), BLOCK_SIZE);
        assert_eq!(pool.steps_taken(), 0);
        assert_eq!(
            pool.grow_destination().expect("grow"),
            Growth::Grown(5 * BLOCK_SIZE)
        );
    }

    #[test]
    fn ladder_walks_every_step_then_exhausts() {
        let mut pool = BufferPool::new(BLOCK_SIZE, &DEFAULT_EXPANSION_LADDER).expect("pool");
        assert_eq!(
            pool.seed_from_ladder().expect("seed"),
            Growth::Grown(5 * BLOCK_SIZE)
        );
        for multiplier in [20, 50, 100] {
            assert_eq!(
                pool.grow_destination().expect("grow"),
                Growth::Grown(multiplier * BLOCK_SIZE)
            );
        }
        assert!(pool.is_exhausted());
        assert_eq!(pool.grow_destination().expect("grow"), Growth::Exhausted);
        assert_eq!(pool.destination_len(), 100 * BLOCK_SIZE);
    }

    #[test]
    fn steps_that_would_shrink_are_skipped() {
        let mut pool = BufferPool::new(BLOCK_SIZE, &[2, 3]).expect("pool");
        pool.seed_destination(10 * BLOCK_SIZE).expect("seed");
        assert_eq!(pool.grow_destination().expect("grow"), Growth::Exhausted);
        assert_eq!(pool.destination_len(), 10 * BLOCK_SIZE);
    }

    #[test]
    fn ladder_scales_the_rounded_source() {
        let mut pool = BufferPool::new(600, &[5]).expect("pool");
        assert_eq!(
            pool.seed_from_ladder().expect("seed"),
            Growth::Grown(5 * BLOCK_SIZE)
        );
    }

    #[test]
    fn empty_ladder_is_immediately_exhausted() {
        let mut pool = BufferPool::new(BLOCK_SIZE, &[]).expect("pool");
        assert!(pool.is_exhausted());
        assert_eq!(pool.seed_from_ladder().expect("seed"), Growth::Exhausted);
    }

    #[test]
    fn split_mut_exposes_both_buffers() {
        let mut pool = BufferPool::new(BLOCK_SIZE, &[1]).expect("pool");
        pool.seed_from_ladder().expect("seed");
        pool.source_mut()[0] = 7;
        let (src, dst) = pool.split_mut();
        dst[0] = src[0];
        assert_eq!(dst[0], 7);
    }
}
