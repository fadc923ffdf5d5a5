//! Per-file orchestration: sizing, opening, streaming, draining, reporting.
//!
//! A file run moves through
//! `Sizing -> Opening -> Streaming -> Draining -> Reporting -> Closed`;
//! any error aborts it and is returned to the caller unchanged.
//!
//! While streaming, each iteration throttles, then either reads a fresh
//! chunk or re-drives the unconsumed tail of the current one after a
//! destination growth. The source is never re-read.

use std::fs;
use std::path::{Path, PathBuf};

use bandwidth::RateLimiter;
use compress::TransformEngine;
use fast_io::{
    BufferPool, FileHandle, Growth, IoBackend, is_block_aligned, round_up_to_block, source_size,
};

use crate::config::TransferConfig;
use crate::driver::{ChunkStatus, TransformDriver};
use crate::error::{IoResultExt, TransferError};
use crate::staging::{FileSink, StagingBuffer};
use crate::stats::TransferStats;

/// Summary of one completed file run.
#[derive(Clone, Debug)]
pub struct FileReport {
    /// Source path.
    pub source: PathBuf,
    /// Destination path.
    pub destination: PathBuf,
    /// Sizes and engine time.
    pub stats: TransferStats,
    /// Times the source switched from direct to buffered reads (0 or 1).
    pub read_downgrades: u32,
    /// Times the destination switched from direct to buffered writes (0 or 1).
    pub write_downgrades: u32,
    /// Destination buffer growths after the initial sizing.
    pub destination_growths: usize,
    /// Engine calls, including drain calls.
    pub engine_calls: usize,
    /// Whether the source was read to its reported size. A read error or an
    /// early end of file stops the run short, and the source is then kept.
    pub input_complete: bool,
    /// Whether the source was deleted.
    pub source_removed: bool,
}

/// Per-file alignment state.
///
/// Starts from the configured direct-I/O request, independent of whether
/// the filesystem accepted `O_DIRECT`, so downgrade accounting is the same
/// everywhere.
#[derive(Debug)]
struct RunContext {
    read_direct: bool,
    read_downgrades: u32,
    growths: usize,
}

impl RunContext {
    const fn new(direct: bool) -> Self {
        Self {
            read_direct: direct,
            read_downgrades: 0,
            growths: 0,
        }
    }

    /// Flips the source to buffered after a read whose length is not block-aligned.
    fn observe_read(&mut self, source: &mut FileHandle, len: usize) -> Result<(), TransferError> {
        if !self.read_direct || is_block_aligned(len) {
            return Ok(());
        }
        tracing::debug!(
            path = %source.path().display(),
            len,
            "unaligned read, switching source to buffered"
        );
        let path = source.path().to_path_buf();
        source.set_buffered().with_path(path)?;
        self.read_direct = false;
        self.read_downgrades += 1;
        Ok(())
    }
}

/// Sizes the destination before the first engine call.
///
/// Engines that bound their output get exactly that bound; the others start
/// at the first ladder step.
pub(crate) fn seed_destination(
    pool: &mut BufferPool,
    engine: &dyn TransformEngine,
    path: &Path,
) -> Result<(), TransferError> {
    match engine.max_output_size(pool.source_len()) {
        Some(bound) => {
            pool.seed_destination(bound)?;
        }
        None => {
            if pool.seed_from_ladder()? == Growth::Exhausted {
                return Err(TransferError::ExpansionExhausted {
                    path: path.to_path_buf(),
                    capacity: pool.destination_len(),
                });
            }
        }
    }
    Ok(())
}

/// Takes the next ladder step or fails with [`TransferError::ExpansionExhausted`].
pub(crate) fn grow_destination(pool: &mut BufferPool, path: &Path) -> Result<usize, TransferError> {
    match pool.grow_destination()? {
        Growth::Grown(len) => {
            tracing::debug!(path = %path.display(), len, step = pool.steps_taken(), "grew destination buffer");
            Ok(len)
        }
        Growth::Exhausted => Err(TransferError::ExpansionExhausted {
            path: path.to_path_buf(),
            capacity: pool.destination_len(),
        }),
    }
}

/// Builds the limiter for one run.
pub(crate) fn rate_limiter(config: &TransferConfig) -> RateLimiter {
    if config.rate_limit() == 0 {
        RateLimiter::disabled()
    } else {
        RateLimiter::new(config.rate_limit())
    }
}

/// Applies the rate limit before the next read.
pub(crate) fn throttle(limiter: &mut RateLimiter) {
    let sleep = limiter.throttle();
    if !sleep.is_noop() {
        tracing::trace!(
            requested_us = sleep.requested().as_micros() as u64,
            slept_us = sleep.actual().as_micros() as u64,
            "throttled"
        );
    }
}

/// Size of the open source in bytes; block devices are asked for their capacity.
fn size_source(source: &FileHandle) -> Result<u64, TransferError> {
    source_size(source.file()).map_err(|error| TransferError::Stat {
        path: source.path().to_path_buf(),
        source: error,
    })
}

/// Transforms `source` into `destination` with `engine`.
///
/// The destination is created or truncated. The source is removed once the
/// run succeeds with the whole source read, unless
/// [`TransferConfig::keep_source`] is set.
pub fn process_file(
    engine: &mut dyn TransformEngine,
    source: &Path,
    destination: &Path,
    config: &TransferConfig,
    backend: &mut dyn IoBackend,
) -> Result<FileReport, TransferError> {
    // Sizing, from the descriptor the data is read through
    let mut src = FileHandle::open_read(source, config.direct_io()).open_context(source)?;
    let file_size = size_source(&src)?;
    let chunk_len = usize::try_from(file_size)
        .unwrap_or(usize::MAX)
        .min(config.max_chunk());
    let mut pool = BufferPool::new(chunk_len, config.expansion_ladder())?;
    seed_destination(&mut pool, engine, source)?;
    let mut staging = StagingBuffer::new(round_up_to_block(
        pool.destination_len().min(config.staging_capacity()),
    ))?;
    tracing::debug!(
        path = %source.display(),
        file_size,
        source_buffer = pool.source_len(),
        destination_buffer = pool.destination_len(),
        staging = staging.capacity(),
        "sized buffers"
    );

    // Opening
    let dst = FileHandle::create_write(destination, config.direct_io()).open_context(destination)?;
    let mut sink = FileSink::new(backend, dst, config.direct_io());
    let mut ctx = RunContext::new(config.direct_io());
    let mut limiter = rate_limiter(config);
    let mut driver = TransformDriver::new(engine);

    // Streaming
    let mut remaining = file_size;
    let mut consumed_total: u64 = 0;
    let mut chunk_offset: u64 = 0;
    let mut filled = 0usize;
    let mut pos = 0usize;
    let mut read_more = true;
    let mut input_complete = true;

    loop {
        throttle(&mut limiter);

        if read_more {
            let n = match sink.backend().submit_read(&mut src, pool.source_mut()) {
                Ok(n) => n,
                Err(error) => {
                    tracing::warn!(path = %source.display(), %error, "read failed, treating as end of input");
                    0
                }
            };
            chunk_offset += filled as u64;
            filled = n;
            pos = 0;
            if n == 0 && remaining > 0 {
                tracing::warn!(
                    path = %source.display(),
                    remaining,
                    "source ended before its reported size"
                );
                input_complete = false;
                break;
            }
            ctx.observe_read(&mut src, n)?;
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
        remaining = remaining.saturating_sub(outcome.consumed as u64);
        limiter.record(outcome.consumed as u64);

        if outcome.status == ChunkStatus::NeedLargerDest {
            grow_destination(&mut pool, source)?;
            ctx.growths += 1;
            read_more = false;
            continue;
        }

        read_more = true;
        if remaining == 0 {
            break;
        }
    }

    // Draining
    let (_, dst_buf) = pool.split_mut();
    driver.drain(consumed_total, dst_buf, &mut staging, &mut sink)?;
    staging.finish(&mut sink)?;

    // Reporting
    let write_downgrades = sink.downgrades();
    let timings = driver.into_timings();
    let stats = TransferStats::new(
        config.direction(),
        consumed_total,
        staging.flushed(),
        timings.elapsed(),
    )?;

    // Closed
    drop(sink.into_handle());
    drop(src);
    drop(pool);

    let source_removed = if config.keep_source() {
        false
    } else if !input_complete {
        tracing::warn!(path = %source.display(), "input incomplete, keeping source");
        false
    } else {
        match fs::remove_file(source) {
            Ok(()) => true,
            Err(error) => {
                tracing::warn!(path = %source.display(), %error, "could not remove source");
                false
            }
        }
    };

    tracing::info!(
        source = %source.display(),
        destination = %destination.display(),
        input = stats.input_bytes(),
        output = stats.output_bytes(),
        "processed file"
    );

    Ok(FileReport {
        source: source.to_path_buf(),
        destination: destination.to_path_buf(),
        stats,
        read_downgrades: ctx.read_downgrades,
        write_downgrades,
        destination_growths: ctx.growths,
        engine_calls: timings.len(),
        input_complete,
        source_removed,
    })
}
