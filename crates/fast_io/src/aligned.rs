//! Block-aligned heap buffers for direct I/O.
//!
//! Buffers handed to an `O_DIRECT` descriptor must start on a block boundary
//! and span a whole number of blocks. [`AlignedBuffer`] owns such a region and
//! reports allocation failure as a value instead of aborting through the
//! global allocation error handler.

use std::alloc::{self, Layout};
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::ptr::NonNull;
use std::slice;

/// Block granularity used for buffer sizes, offsets, and lengths.
pub const BLOCK_SIZE: usize = 4096;

/// Rounds `len` up to the next multiple of [`BLOCK_SIZE`].
///
/// Zero stays zero; callers that need at least one block use
/// [`block_len_at_least_one`].
#[must_use]
pub const fn round_up_to_block(len: usize) -> usize {
    let rem = len % BLOCK_SIZE;
    if rem == 0 { len } else { len + (BLOCK_SIZE - rem) }
}

/// Rounds `len` up to a multiple of [`BLOCK_SIZE`], never returning less than one block.
#[must_use]
pub const fn block_len_at_least_one(len: usize) -> usize {
    if len == 0 {
        BLOCK_SIZE
    } else {
        round_up_to_block(len)
    }
}

/// Returns `true` when `len` is a whole number of blocks.
#[must_use]
pub const fn is_block_aligned(len: usize) -> bool {
    len % BLOCK_SIZE == 0
}

/// Failure to obtain an aligned buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AllocError {
    /// The allocator returned no memory for the requested layout.
    #[error("cannot allocate {size} bytes aligned to {align}")]
    OutOfMemory {
        /// Requested size in bytes.
        size: usize,
        /// Requested alignment in bytes.
        align: usize,
    },
    /// The size/alignment pair does not form a valid layout.
    #[error("invalid buffer layout: {size} bytes aligned to {align}")]
    InvalidLayout {
        /// Requested size in bytes.
        size: usize,
        /// Requested alignment in bytes.
        align: usize,
    },
}

/// Owned, zero-initialised, block-aligned byte buffer.
pub struct AlignedBuffer {
    ptr: NonNull<u8>,
    len: usize,
    align: usize,
}

// SAFETY: the buffer exclusively owns its allocation, like `Vec<u8>`.
unsafe impl Send for AlignedBuffer {}
// SAFETY: shared access only hands out `&[u8]`.
unsafe impl Sync for AlignedBuffer {}

impl AlignedBuffer {
    /// Allocates `len` bytes aligned to [`BLOCK_SIZE`].
    pub fn new(len: usize) -> Result<Self, AllocError> {
        Self::with_alignment(len, BLOCK_SIZE)
    }

    /// Allocates `len` bytes aligned to `align` (a power of two).
    pub fn with_alignment(len: usize, align: usize) -> Result<Self, AllocError> {
        if len == 0 {
            return Ok(Self::empty_with_alignment(align));
        }

        let layout = Layout::from_size_align(len, align)
            .map_err(|_| AllocError::InvalidLayout { size: len, align })?;

        // SAFETY: `layout` has a non-zero size.
        let raw = unsafe { alloc::alloc_zeroed(layout) };
        let ptr = NonNull::new(raw).ok_or(AllocError::OutOfMemory { size: len, align })?;

        Ok(Self { ptr, len, align })
    }

    /// Returns a buffer that owns no memory.
    #[must_use]
    pub fn empty() -> Self {
        Self::empty_with_alignment(BLOCK_SIZE)
    }

    fn empty_with_alignment(align: usize) -> Self {
        Self {
            ptr: NonNull::dangling(),
            len: 0,
            align,
        }
    }

    /// Returns the buffer length in bytes.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` when the buffer owns no bytes.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the alignment the buffer was allocated with.
    #[must_use]
    pub const fn alignment(&self) -> usize {
        self.align
    }

    /// Returns the buffer contents.
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        if self.len == 0 {
            return &[];
        }
        // SAFETY: `ptr` points to `len` initialised bytes owned by `self`.
        unsafe { slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }

    /// Returns the buffer contents mutably.
    #[must_use]
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        if self.len == 0 {
            return &mut [];
        }
        // SAFETY: `ptr` points to `len` initialised bytes exclusively owned by `self`.
        unsafe { slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }
}

impl Drop for AlignedBuffer {
    fn drop(&mut self) {
        if self.len == 0 {
            return;
        }
        // SAFETY: the layout was validated at allocation time.
        unsafe {
            let layout = Layout::from_size_align_unchecked(self.len, self.align);
            alloc::dealloc(self.ptr.as_ptr(), layout);
        }
    }
}

impl Deref for AlignedBuffer {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        self.as_slice()
    }
}

impl DerefMut for AlignedBuffer {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.as_mut_slice()
    }
}

impl fmt::Debug for AlignedBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AlignedBuffer")
            .field("len", &self.len)
            .field("align", &self.align)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_up_keeps_aligned_lengths() {
        assert_eq!(round_up_to_block(0), 0);
        assert_eq!(round_up_to_block(4096), 4096);
        assert_eq!(round_up_to_block(8192), 8192);
    }

    #[test]
    fn round_up_extends_partial_blocks() {
        assert_eq!(round_up_to_block(1), 4096);
        assert_eq!(round_up_to_block(4095), 4096);
        assert_eq!(round_up_to_block(4097), 8192);
    }

    #[test]
    fn at_least_one_block_for_empty_inputs() {
        assert_eq!(block_len_at_least_one(0), BLOCK_SIZE);
        assert_eq!(block_len_at_least_one(10), BLOCK_SIZE);
        assert_eq!(block_len_at_least_one(BLOCK_SIZE + 1), 2 * BLOCK_SIZE);
    }

    #[test]
    fn buffer_is_aligned_and_zeroed() {
        let buffer = AlignedBuffer::new(3 * BLOCK_SIZE).expect("allocate");
        assert_eq!(buffer.len(), 3 * BLOCK_SIZE);
        assert_eq!(buffer.as_ptr() as usize % BLOCK_SIZE, 0);
        assert!(buffer.iter().all(|&b| b == 0));
    }

    #[test]
    fn buffer_is_writable() {
        let mut buffer = AlignedBuffer::new(BLOCK_SIZE).expect("allocate");
        buffer[0] = 0xAB;
        buffer[BLOCK_SIZE - 1] = 0xCD;
        assert_eq!(buffer.as_slice()[0], 0xAB);
        assert_eq!(buffer.as_slice()[BLOCK_SIZE - 1], 0xCD);
    }

    #[test]
    fn empty_buffer_owns_nothing() {
        let mut buffer = AlignedBuffer::empty();
        assert!(buffer.is_empty());
        assert!(buffer.as_slice().is_empty());
        assert!(buffer.as_mut_slice().is_empty());
    }

    #[test]
    fn zero_length_request_yields_empty_buffer() {
        let buffer = AlignedBuffer::new(0).expect("allocate");
        assert!(buffer.is_empty());
    }

    #[test]
    fn invalid_alignment_is_reported() {
        let err = AlignedBuffer::with_alignment(16, 3).expect_err("non power of two");
        assert_eq!(err, AllocError::InvalidLayout { size: 16, align: 3 });
    }
}
