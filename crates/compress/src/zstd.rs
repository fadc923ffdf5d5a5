//! Zstandard frame engines.
//!
//! The compressor emits one complete frame per call with the content size
//! recorded in the frame header. The decompressor is a plain streaming
//! decoder and accepts any sequence of frames.

use std::io;

use zstd::stream::raw::{Decoder, Operation};

use crate::engine::{Direction, EngineStatus, TransformEngine, TransformResult};

/// Worst-case size of one frame holding `len` input bytes.
#[must_use]
pub fn frame_bound(len: usize) -> usize {
    zstd::zstd_safe::compress_bound(len)
}

/// Compress-side session: one zstd frame per call.
pub struct ZstdFrameCompressor {
    compressor: zstd::bulk::Compressor<'static>,
    member_size: usize,
}

impl ZstdFrameCompressor {
    /// Creates a session at `level` emitting frames of at most `member_size` input bytes.
    pub fn new(level: u32, member_size: usize) -> io::Result<Self> {
        let level = i32::try_from(level)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "zstd level too large"))?;
        Ok(Self {
            compressor: zstd::bulk::Compressor::new(level)?,
            member_size: member_size.max(1),
        })
    }
}

impl TransformEngine for ZstdFrameCompressor {
    fn direction(&self) -> Direction {
        Direction::Compress
    }

    fn transform(&mut self, src: &[u8], dst: &mut [u8]) -> TransformResult {
        let take = src.len().min(self.member_size);
        if dst.len() < frame_bound(take) {
            return TransformResult::too_small();
        }
        match self.compressor.compress_to_buffer(&src[..take], dst) {
            Ok(written) => TransformResult::ok(take, written),
            Err(_) => TransformResult::new(0, 0, EngineStatus::Fatal),
        }
    }

    fn max_output_size(&self, src_len: usize) -> Option<usize> {
        Some(frame_bound(src_len.min(self.member_size)))
    }

    fn name(&self) -> &'static str {
        "zstd"
    }
}

/// Decompress-side session accepting concatenated frames.
pub struct ZstdFrameDecompressor {
    decoder: Decoder<'static>,
    /// A frame has started and not yet been fully decoded and flushed.
    in_frame: bool,
    failed: bool,
}

impl ZstdFrameDecompressor {
    /// Creates a streaming decoder.
    pub fn new() -> io::Result<Self> {
        Ok(Self {
            decoder: Decoder::new()?,
            in_frame: false,
            failed: false,
        })
    }

    fn run(&mut self, src: &[u8], dst: &mut [u8]) -> TransformResult {
        if self.failed {
            return TransformResult::new(0, 0, EngineStatus::DataError);
        }

        let mut consumed = 0;
        let mut produced = 0;
        loop {
            match self
                .decoder
                .run_on_buffers(&src[consumed..], &mut dst[produced..])
            {
                Ok(status) => {
                    consumed += status.bytes_read;
                    produced += status.bytes_written;
                    if status.bytes_read == 0 && status.bytes_written == 0 {
                        break;
                    }
                    self.in_frame = status.remaining != 0;
                }
                Err(_) => {
                    self.failed = true;
                    return TransformResult::new(consumed, produced, EngineStatus::DataError);
                }
            }
        }
        TransformResult::ok(consumed, produced)
    }
}

impl TransformEngine for ZstdFrameDecompressor {
    fn direction(&self) -> Direction {
        Direction::Decompress
    }

    fn transform(&mut self, src: &[u8], dst: &mut [u8]) -> TransformResult {
        let result = self.run(src, dst);
        if result.status == EngineStatus::Ok && !result.made_progress() && !src.is_empty() {
            return TransformResult::too_small();
        }
        result
    }

    fn finish(&mut self, dst: &mut [u8]) -> TransformResult {
        let result = self.run(&[], dst);
        if result.status == EngineStatus::Ok && result.produced == 0 && self.in_frame {
            self.failed = true;
            return TransformResult::new(0, 0, EngineStatus::DataError);
        }
        result
    }

    fn reset(&mut self) {
        self.in_frame = false;
        self.failed = self.decoder.reinit().is_err();
    }

    fn max_output_size(&self, _src_len: usize) -> Option<usize> {
        None
    }

    fn name(&self) -> &'static str {
        "zstd"
    }
}
