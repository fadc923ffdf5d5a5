//! Engine options and session construction.

use std::io;

use crate::algorithm::Algorithm;
use crate::engine::{Direction, TransformEngine};
use crate::gzip::{GzipMemberCompressor, GzipMemberDecompressor};

/// Input bytes covered by one member when no size is requested.
pub const DEFAULT_MEMBER_SIZE: usize = 64 * 1024;
/// Smallest accepted member size.
pub const MIN_MEMBER_SIZE: usize = 1024;
/// Largest accepted member size (member lengths are stored as `u32`).
pub const MAX_MEMBER_SIZE: usize = 1 << 30;

/// Codec parameters for one invocation.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct EngineOptions {
    /// Codec.
    pub algorithm: Algorithm,
    /// Compression level; ignored when decompressing.
    pub level: u32,
    /// Maximum input bytes per emitted member or frame.
    pub member_size: usize,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self::new(Algorithm::default())
    }
}

impl EngineOptions {
    /// Options for `algorithm` at its default level and member size.
    #[must_use]
    pub const fn new(algorithm: Algorithm) -> Self {
        Self {
            algorithm,
            level: algorithm.default_level(),
            member_size: DEFAULT_MEMBER_SIZE,
        }
    }

    /// Replaces the compression level.
    #[must_use]
    pub const fn with_level(mut self, level: u32) -> Self {
        self.level = level;
        self
    }

    /// Replaces the member size.
    #[must_use]
    pub const fn with_member_size(mut self, member_size: usize) -> Self {
        self.member_size = member_size;
        self
    }

    /// Checks the level against the codec's range and the member size bounds.
    pub fn validate(&self) -> Result<(), EngineError> {
        let range = self.algorithm.level_range();
        if !range.contains(&self.level) {
            return Err(EngineError::InvalidLevel {
                algorithm: self.algorithm,
                level: self.level,
                min: *range.start(),
                max: *range.end(),
            });
        }
        if !(MIN_MEMBER_SIZE..=MAX_MEMBER_SIZE).contains(&self.member_size) {
            return Err(EngineError::InvalidMemberSize {
                size: self.member_size,
                min: MIN_MEMBER_SIZE,
                max: MAX_MEMBER_SIZE,
            });
        }
        Ok(())
    }
}

/// Failure to set up a session.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Level outside the codec's range.
    #[error("compression level {level} is out of range for {algorithm} (expected {min}-{max})")]
    InvalidLevel {
        /// Codec.
        algorithm: Algorithm,
        /// Requested level.
        level: u32,
        /// Lowest accepted level.
        min: u32,
        /// Highest accepted level.
        max: u32,
    },
    /// Member size outside the accepted bounds.
    #[error("member size {size} is out of range (expected {min}-{max} bytes)")]
    InvalidMemberSize {
        /// Requested size.
        size: usize,
        /// Smallest accepted size.
        min: usize,
        /// Largest accepted size.
        max: usize,
    },
    /// The codec library refused to create a context.
    #[error("failed to start {algorithm} session: {source}")]
    Init {
        /// Codec.
        algorithm: Algorithm,
        /// Library error.
        #[source]
        source: io::Error,
    },
}

/// Opens a session for `direction` with the given options.
///
/// # Examples
///
/// ```
/// use compress::{Direction, EngineOptions, EngineStatus, open_session};
///
/// let options = EngineOptions::default();
/// let mut engine = open_session(&options, Direction::Compress).unwrap();
/// let bound = engine.max_output_size(5).unwrap();
/// let mut dst = vec![0u8; bound];
/// let result = engine.transform(b"hello", &mut dst);
/// assert_eq!(result.status, EngineStatus::Ok);
/// assert_eq!(result.consumed, 5);
/// ```
pub fn open_session(
    options: &EngineOptions,
    direction: Direction,
) -> Result<Box<dyn TransformEngine>, EngineError> {
    options.validate()?;
    match (options.algorithm, direction) {
        (Algorithm::Deflate, Direction::Compress) => Ok(Box::new(GzipMemberCompressor::new(
            options.level,
            options.member_size,
        ))),
        (Algorithm::Deflate, Direction::Decompress) => Ok(Box::new(GzipMemberDecompressor::new())),
        #[cfg(feature = "zstd")]
        (Algorithm::Zstd, Direction::Compress) => {
            crate::zstd::ZstdFrameCompressor::new(options.level, options.member_size)
                .map(|engine| Box::new(engine) as Box<dyn TransformEngine>)
                .map_err(|source| EngineError::Init {
                    algorithm: Algorithm::Zstd,
                    source,
                })
        }
        #[cfg(feature = "zstd")]
        (Algorithm::Zstd, Direction::Decompress) => crate::zstd::ZstdFrameDecompressor::new()
            .map(|engine| Box::new(engine) as Box<dyn TransformEngine>)
            .map_err(|source| EngineError::Init {
                algorithm: Algorithm::Zstd,
                source,
            }),
    }
}
