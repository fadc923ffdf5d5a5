//! Block-aligned accumulator batching engine output into full-capacity writes.
//!
//! Engine calls produce output of arbitrary length. The [`StagingBuffer`]
//! copies it into an aligned buffer and only writes once the buffer is full,
//! so every write but the last has the same block-multiple length and lands
//! at a block-multiple offset. That keeps an `O_DIRECT` destination valid
//! until the final flush, which may downgrade it.

use std::path::Path;

use fast_io::{AlignedBuffer, FileHandle, IoBackend, is_block_aligned, round_up_to_block};

use crate::error::{IoResultExt, TransferError};

/// Destination of staged writes.
pub trait BlockSink {
    /// Writes `buf` in one request and returns the byte count the
    /// destination confirmed.
    fn write_block(&mut self, buf: &[u8]) -> Result<usize, TransferError>;

    /// Returns `true` while writes must stay block-aligned.
    fn is_direct(&self) -> bool;

    /// Switches the destination to buffered writes for the rest of the run.
    fn downgrade(&mut self) -> Result<(), TransferError>;

    /// Path used in diagnostics.
    fn path(&self) -> &Path;
}

/// Destination file written through an [`IoBackend`].
///
/// Alignment is tracked separately from the descriptor: the sink starts
/// direct when the run asked for direct I/O even if the filesystem refused
/// `O_DIRECT` at open time.
pub struct FileSink<'a> {
    backend: &'a mut dyn IoBackend,
    handle: FileHandle,
    direct: bool,
    downgrades: u32,
}

impl<'a> FileSink<'a> {
    /// Wraps an open destination.
    pub fn new(backend: &'a mut dyn IoBackend, handle: FileHandle, direct: bool) -> Self {
        Self {
            backend,
            handle,
            direct,
            downgrades: 0,
        }
    }

    /// Number of times the sink switched to buffered writes.
    pub const fn downgrades(&self) -> u32 {
        self.downgrades
    }

    /// Backend shared with the source reads of the same run.
    pub fn backend(&mut self) -> &mut (dyn IoBackend + 'a) {
        &mut *self.backend
    }

    /// Closes the sink and returns the handle.
    pub fn into_handle(self) -> FileHandle {
        self.handle
    }
}

impl BlockSink for FileSink<'_> {
    fn write_block(&mut self, buf: &[u8]) -> Result<usize, TransferError> {
        self.backend
            .submit_write(&mut self.handle, buf)
            .map_err(|source| TransferError::Write {
                path: self.handle.path().to_path_buf(),
                source,
            })
    }

    fn is_direct(&self) -> bool {
        self.direct
    }

    fn downgrade(&mut self) -> Result<(), TransferError> {
        if !self.direct {
            return Ok(());
        }
        let path = self.handle.path().to_path_buf();
        self.handle.set_buffered().with_path(path)?;
        self.direct = false;
        self.downgrades += 1;
        Ok(())
    }

    fn path(&self) -> &Path {
        self.handle.path()
    }
}

/// Fixed-capacity, block-aligned output accumulator.
#[derive(Debug)]
pub struct StagingBuffer {
    buffer: AlignedBuffer,
    offset: usize,
    flushed: u64,
}

impl StagingBuffer {
    /// Allocates a staging buffer of `capacity` bytes rounded up to whole blocks.
    pub fn new(capacity: usize) -> Result<Self, TransferError> {
        let buffer = AlignedBuffer::new(round_up_to_block(capacity.max(1)))?;
        Ok(Self {
            buffer,
            offset: 0,
            flushed: 0,
        })
    }

    /// Buffer capacity in bytes.
    pub const fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Bytes waiting for the next flush.
    pub const fn pending(&self) -> usize {
        self.offset
    }

    /// Bytes written to the sink so far.
    pub const fn flushed(&self) -> u64 {
        self.flushed
    }

    /// Copies `bytes` in, writing exactly `capacity` bytes each time the
    /// buffer fills.
    pub fn append(&mut self, mut bytes: &[u8], sink: &mut dyn BlockSink) -> Result<(), TransferError> {
        while !bytes.is_empty() {
            let room = self.capacity() - self.offset;
            let take = room.min(bytes.len());
            self.buffer[self.offset..self.offset + take].copy_from_slice(&bytes[..take]);
            self.offset += take;
            bytes = &bytes[take..];

            if self.offset == self.capacity() {
                self.write_pending(sink)?;
            }
        }
        Ok(())
    }

    /// Writes whatever is pending as the final write of the run.
    ///
    /// A length that is not block-aligned switches a direct sink to buffered
    /// first.
    pub fn finish(&mut self, sink: &mut dyn BlockSink) -> Result<(), TransferError> {
        if self.offset == 0 {
            return Ok(());
        }
        if sink.is_direct() && !is_block_aligned(self.offset) {
            tracing::debug!(
                path = %sink.path().display(),
                len = self.offset,
                "final write is unaligned, switching destination to buffered"
            );
            sink.downgrade()?;
        }
        self.write_pending(sink)
    }

    fn write_pending(&mut self, sink: &mut dyn BlockSink) -> Result<(), TransferError> {
        let expected = self.offset;
        let written = sink.write_block(&self.buffer[..expected])?;
        if written != expected {
            return Err(TransferError::ShortWrite {
                path: sink.path().to_path_buf(),
                expected,
                written,
            });
        }
        self.flushed += written as u64;
        self.offset = 0;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use fast_io::BLOCK_SIZE;

    use super::*;

    #[derive(Default)]
    struct RecordingSink {
        writes: Vec<Vec<u8>>,
        direct: bool,
        downgrades: u32,
        limit: Option<usize>,
        path: PathBuf,
    }

    impl BlockSink for RecordingSink {
        fn write_block(&mut self, buf: &[u8]) -> Result<usize, TransferError> {
            let n = self.limit.map_or(buf.len(), |limit| limit.min(buf.len()));
            self.writes.push(buf[..n].to_vec());
            Ok(n)
        }

        fn is_direct(&self) -> bool {
            self.direct
        }

        fn downgrade(&mut self) -> Result<(), TransferError> {
            self.direct = false;
            self.downgrades += 1;
            Ok(())
        }

        fn path(&self) -> &Path {
            &self.path
        }
    }

    #[test]
    fn capacity_rounds_up_to_blocks() {
        assert_eq!(StagingBuffer::new(1).unwrap().capacity(), BLOCK_SIZE);
        assert_eq!(
            StagingBuffer::new(BLOCK_SIZE + 1).unwrap().capacity(),
            2 * BLOCK_SIZE
        );
    }

    #[test]
    fn full_buffers_flush_exactly_capacity() {
        let mut staging = StagingBuffer::new(BLOCK_SIZE).unwrap();
        let mut sink = RecordingSink::default();
        let data: Vec<u8> = (0..10_000u32).map(|i| i as u8).collect();

        for piece in data.chunks(777) {
            staging.append(piece, &mut sink).unwrap();
            assert!(staging.pending() < staging.capacity());
        }
        assert_eq!(sink.writes.len(), 2);
        assert!(sink.writes.iter().all(|w| w.len() == BLOCK_SIZE));
        assert_eq!(staging.pending(), 10_000 - 2 * BLOCK_SIZE);

        staging.finish(&mut sink).unwrap();
        assert_eq!(staging.pending(), 0);
        assert_eq!(sink.writes.concat(), data);
        assert_eq!(staging.flushed(), 10_000);
    }

    #[test]
    fn unaligned_final_write_downgrades_direct_sink() {
        let mut staging = StagingBuffer::new(BLOCK_SIZE).unwrap();
        let mut sink = RecordingSink {
            direct: true,
            ..RecordingSink::default()
        };
        staging.append(&[1; 100], &mut sink).unwrap();
        staging.finish(&mut sink).unwrap();
        assert_eq!(sink.downgrades, 1);
        assert!(!sink.direct);
    }

    #[test]
    fn aligned_final_write_keeps_direct_sink() {
        let mut staging = StagingBuffer::new(2 * BLOCK_SIZE).unwrap();
        let mut sink = RecordingSink {
            direct: true,
            ..RecordingSink::default()
        };
        staging.append(&[1; BLOCK_SIZE], &mut sink).unwrap();
        staging.finish(&mut sink).unwrap();
        assert_eq!(sink.downgrades, 0);
        assert_eq!(sink.writes.len(), 1);
    }

    #[test]
    fn empty_finish_writes_nothing() {
        let mut staging = StagingBuffer::new(BLOCK_SIZE).unwrap();
        let mut sink = RecordingSink::default();
        staging.finish(&mut sink).unwrap();
        assert!(sink.writes.is_empty());
    }

    #[test]
    fn short_write_is_fatal() {
        let mut staging = StagingBuffer::new(BLOCK_SIZE).unwrap();
        let mut sink = RecordingSink {
            limit: Some(10),
            path: PathBuf::from("/out"),
            ..RecordingSink::default()
        };
        let error = staging.append(&[0; BLOCK_SIZE], &mut sink).unwrap_err();
        assert!(matches!(
            error,
            TransferError::ShortWrite {
                expected: BLOCK_SIZE,
                written: 10,
                ..
            }
        ));
        assert_eq!(sink.writes.len(), 1);
    }
}
