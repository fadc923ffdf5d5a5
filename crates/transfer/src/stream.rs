//! Stream mode: the file pipeline over plain readers and writers.
//!
//! Used for stdin to stdout. The source buffer is a fixed `max_chunk`, there
//! is no direct I/O and no backend, and nothing is deleted afterwards.

use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use compress::TransformEngine;
use fast_io::BufferPool;

use crate::config::TransferConfig;
use crate::driver::{ChunkStatus, TransformDriver};
use crate::error::{IoResultExt, TransferError};
use crate::pipeline::{grow_destination, rate_limiter, seed_destination, throttle};
use crate::staging::{BlockSink, StagingBuffer};
use crate::stats::TransferStats;

/// Name used for the input side in diagnostics.
pub const STDIN_NAME: &str = "<stdin>";
/// Name used for the output side in diagnostics.
pub const STDOUT_NAME: &str = "<stdout>";

/// [`BlockSink`] over any writer.
struct WriterSink<'a> {
    writer: &'a mut dyn Write,
    path: PathBuf,
}

impl BlockSink for WriterSink<'_> {
    fn write_block(&mut self, buf: &[u8]) -> Result<usize, TransferError> {
        self.writer
            .write_all(buf)
            .map_err(|source| TransferError::Write {
                path: self.path.clone(),
                source,
            })?;
        Ok(buf.len())
    }

    fn is_direct(&self) -> bool {
        false
    }

    fn downgrade(&mut self) -> Result<(), TransferError> {
        Ok(())
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

/// Reads until `buf` is full or the reader is exhausted.
fn read_full(reader: &mut dyn Read, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(error) if error.kind() == io::ErrorKind::Interrupted => {}
            Err(error) => return Err(error),
        }
    }
    Ok(filled)
}

/// Transforms everything `reader` yields into `writer`.
///
/// Honors the chunk size, staging capacity, escalation ladder and rate
/// limit of `config`; direct I/O, backend choice and source deletion do not
/// apply to streams.
pub fn process_stream(
    engine: &mut dyn TransformEngine,
    reader: &mut dyn Read,
    writer: &mut dyn Write,
    config: &TransferConfig,
) -> Result<TransferStats, TransferError> {
    let input_name = Path::new(STDIN_NAME);
    let mut pool = BufferPool::new(config.max_chunk(), config.expansion_ladder())?;
    seed_destination(&mut pool, engine, input_name)?;
    let mut staging = StagingBuffer::new(pool.destination_len().min(config.staging_capacity()))?;
    let mut sink = WriterSink {
        writer,
        path: PathBuf::from(STDOUT_NAME),
    };
    let mut limiter = rate_limiter(config);
    let mut driver = TransformDriver::new(engine);

    let mut consumed_total: u64 = 0;
    let mut chunk_offset: u64 = 0;
    let mut filled = 0usize;
    let mut pos = 0usize;
    let mut read_more = true;
    let mut first = true;
    let mut eof = false;

    loop {
        throttle(&mut limiter);

        if read_more {
            let n = read_full(reader, pool.source_mut()).with_path(input_name)?;
            eof = n < pool.source_len();
            if n == 0 && !first {
                break;
            }
            first = false;
            chunk_offset += filled as u64;
            filled = n;
            pos = 0;
        }

        let (src_buf, dst_buf) = pool.split_mut();
        let outcome = driver.run_chunk(
            &src_buf[pos..filled],
            chunk_offset + pos as u64,
            dst_buf,
            &mut staging,
            &mut sink,
        )?;
        pos += outcome.consumed;
        consumed_total += outcome.consumed as u64;
        limiter.record(outcome.consumed as u64);

        if outcome.status == ChunkStatus::NeedLargerDest {
            grow_destination(&mut pool, input_name)?;
            read_more = false;
            continue;
        }

        read_more = true;
        if eof {
            break;
        }
    }

    let (_, dst_buf) = pool.split_mut();
    driver.drain(consumed_total, dst_buf, &mut staging, &mut sink)?;
    staging.finish(&mut sink)?;
    sink.writer.flush().map_err(|source| TransferError::Write {
        path: PathBuf::from(STDOUT_NAME),
        source,
    })?;

    TransferStats::new(
        config.direction(),
        consumed_total,
        staging.flushed(),
        driver.timings().elapsed(),
    )
}

#[cfg(test)]
mod tests {
    use compress::{Algorithm, Direction, EngineOptions, open_session};

    use super::*;

    fn config(direction: Direction) -> TransferConfig {
        TransferConfig::builder(direction)
            .max_chunk(4096)
            .staging_capacity(4096)
            .build()
            .unwrap()
    }

    fn round_trip(options: &EngineOptions, data: &[u8]) -> Vec<u8> {
        let mut compressor = open_session(options, Direction::Compress).unwrap();
        let mut packed = Vec::new();
        let stats = process_stream(
            &mut *compressor,
            &mut &data[..],
            &mut packed,
            &config(Direction::Compress),
        )
        .unwrap();
        assert_eq!(stats.input_bytes(), data.len() as u64);
        assert_eq!(stats.output_bytes(), packed.len() as u64);

        let mut decompressor = open_session(options, Direction::Decompress).unwrap();
        let mut restored = Vec::new();
        process_stream(
            &mut *decompressor,
            &mut packed.as_slice(),
            &mut restored,
            &config(Direction::Decompress),
        )
        .unwrap();
        restored
    }

    #[test]
    fn streams_round_trip() {
        let data: Vec<u8> = (0..50_000u32).map(|i| (i % 251) as u8).collect();
        for &algorithm in Algorithm::available() {
            let options = EngineOptions::new(algorithm).with_member_size(4096);
            assert_eq!(round_trip(&options, &data), data, "{algorithm}");
        }
    }

    #[test]
    fn empty_stream_compresses_to_a_valid_stream() {
        let options = EngineOptions::default();
        let mut compressor = open_session(&options, Direction::Compress).unwrap();
        let mut packed = Vec::new();
        process_stream(
            &mut *compressor,
            &mut io::empty(),
            &mut packed,
            &config(Direction::Compress),
        )
        .unwrap();
        assert!(!packed.is_empty());
        assert!(round_trip(&options, &[]).is_empty());
    }

    #[test]
    fn short_reads_are_filled() {
        struct Trickle<'a>(&'a [u8]);
        impl Read for Trickle<'_> {
            fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
                let n = buf.len().min(3).min(self.0.len());
                buf[..n].copy_from_slice(&self.0[..n]);
                self.0 = &self.0[n..];
                Ok(n)
            }
        }
        let data = [7u8; 10];
        let mut buf = [0u8; 8];
        assert_eq!(read_full(&mut Trickle(&data), &mut buf).unwrap(), 8);
    }

    #[test]
    fn garbage_input_is_corrupt() {
        let mut decompressor = open_session(&EngineOptions::default(), Direction::Decompress).unwrap();
        let garbage = vec![0x55u8; 10_000];
        let error = process_stream(
            &mut *decompressor,
            &mut garbage.as_slice(),
            &mut Vec::new(),
            &config(Direction::Decompress),
        )
        .unwrap_err();
        assert!(matches!(error, TransferError::DataCorrupt { .. }));
    }
}
