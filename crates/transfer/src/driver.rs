//! Drives the transform engine over one source chunk.
//!
//! An engine call may consume only part of the chunk and fill only part of
//! the destination, so a chunk usually takes several calls. After each call
//! the produced bytes go through the [`StagingBuffer`] before the destination
//! is handed back to the engine.
//!
//! Statuses are classified as follows:
//!
//! | Engine status      | Input left | Outcome                          |
//! |--------------------|------------|----------------------------------|
//! | `Ok`               | none       | [`ChunkStatus::Exhausted`]       |
//! | `Ok`, no progress  | some       | [`ChunkStatus::NeedLargerDest`]  |
//! | `BufferTooSmall`   | none       | [`ChunkStatus::EndOfStream`]     |
//! | `BufferTooSmall`, no progress | some | [`ChunkStatus::NeedLargerDest`] |
//! | `DataError`        | none       | [`ChunkStatus::EndOfStream`]     |
//! | `DataError`        | some       | [`TransferError::DataCorrupt`]   |
//! | `Fatal`            | any        | [`TransferError::EngineFatal`]   |
//!
//! [`TransformDriver::drain`] treats a `DataError` from the engine's final
//! flush as truncated input and fails with [`TransferError::DataCorrupt`].

use compress::{EngineStatus, TransformEngine};

use crate::error::TransferError;
use crate::staging::{BlockSink, StagingBuffer};
use crate::stats::TimingLog;

/// How a chunk run ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChunkStatus {
    /// Every input byte was consumed.
    Exhausted,
    /// The engine signalled a benign end with no input left.
    EndOfStream,
    /// The engine could not progress with the current destination.
    NeedLargerDest,
}

/// Result of [`TransformDriver::run_chunk`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChunkOutcome {
    /// Source bytes consumed; the caller resumes at this offset.
    pub consumed: usize,
    /// Bytes appended to staging.
    pub produced: usize,
    /// Classification of the final call.
    pub status: ChunkStatus,
}

/// Per-run engine driver owning the timing log.
pub struct TransformDriver<'e> {
    engine: &'e mut dyn TransformEngine,
    timings: TimingLog,
}

impl<'e> TransformDriver<'e> {
    /// Wraps `engine` for one run, discarding whatever an earlier run left
    /// inside the session.
    pub fn new(engine: &'e mut dyn TransformEngine) -> Self {
        engine.reset();
        Self {
            engine,
            timings: TimingLog::new(),
        }
    }

    /// Samples recorded so far.
    pub const fn timings(&self) -> &TimingLog {
        &self.timings
    }

    /// Ends the run and returns its samples.
    pub fn into_timings(self) -> TimingLog {
        self.timings
    }

    /// Feeds `chunk` to the engine until it is consumed or the engine stops.
    ///
    /// The engine is called at least once, so an empty chunk still reaches
    /// it. `base_offset` is the input position of `chunk[0]` and only feeds
    /// diagnostics.
    pub fn run_chunk(
        &mut self,
        chunk: &[u8],
        base_offset: u64,
        dst: &mut [u8],
        staging: &mut StagingBuffer,
        sink: &mut dyn BlockSink,
    ) -> Result<ChunkOutcome, TransferError> {
        let mut consumed = 0;
        let mut produced = 0;

        loop {
            let remaining = &chunk[consumed..];
            let engine = &mut *self.engine;
            let result = self.timings.time(|| engine.transform(remaining, dst));

            let input_left = consumed + result.consumed < chunk.len();
            let status = match result.status {
                EngineStatus::Fatal => {
                    return Err(TransferError::EngineFatal {
                        engine: self.engine.name(),
                    });
                }
                EngineStatus::DataError if input_left => {
                    return Err(TransferError::DataCorrupt {
                        offset: base_offset + (consumed + result.consumed) as u64,
                    });
                }
                EngineStatus::Ok if !input_left => Some(ChunkStatus::Exhausted),
                EngineStatus::BufferTooSmall | EngineStatus::DataError if !input_left => {
                    Some(ChunkStatus::EndOfStream)
                }
                EngineStatus::Ok | EngineStatus::BufferTooSmall if !result.made_progress() => {
                    if result.status == EngineStatus::Ok {
                        tracing::debug!(
                            engine = self.engine.name(),
                            "engine returned without progress, treating as full destination"
                        );
                    }
                    Some(ChunkStatus::NeedLargerDest)
                }
                _ => None,
            };

            staging.append(&dst[..result.produced], sink)?;
            consumed += result.consumed;
            produced += result.produced;

            if let Some(status) = status {
                return Ok(ChunkOutcome {
                    consumed,
                    produced,
                    status,
                });
            }
        }
    }

    /// Drains output the engine still holds after the last chunk.
    ///
    /// `input_end` is the total input length and only feeds diagnostics.
    /// Input that stopped inside a member or frame fails with
    /// [`TransferError::DataCorrupt`]. Returns the number of bytes appended
    /// to staging.
    pub fn drain(
        &mut self,
        input_end: u64,
        dst: &mut [u8],
        staging: &mut StagingBuffer,
        sink: &mut dyn BlockSink,
    ) -> Result<usize, TransferError> {
        let mut produced = 0;
        loop {
            let engine = &mut *self.engine;
            let result = self.timings.time(|| engine.finish(dst));
            match result.status {
                EngineStatus::Fatal => {
                    return Err(TransferError::EngineFatal {
                        engine: self.engine.name(),
                    });
                }
                EngineStatus::DataError => {
                    tracing::debug!(engine = self.engine.name(), input_end, "input ended inside a member");
                    return Err(TransferError::DataCorrupt { offset: input_end });
                }
                EngineStatus::Ok | EngineStatus::BufferTooSmall => {}
            }

            staging.append(&dst[..result.produced], sink)?;
            produced += result.produced;
            if result.produced == 0 || result.status != EngineStatus::Ok {
                return Ok(produced);
            }
        }
    }
}
