//! Per-invocation transfer configuration.
//!
//! [`TransferConfig`] carries every knob the pipeline reads; nothing is
//! global. Build one with [`TransferConfig::builder`]:
//!
//! ```
//! use compress::Direction;
//! use transfer::{BackendChoice, TransferConfig};
//!
//! let config = TransferConfig::builder(Direction::Compress)
//!     .keep_source(true)
//!     .direct_io(false)
//!     .backend(BackendChoice::Sync)
//!     .rate_limit(8 * 1024 * 1024)
//!     .build()
//!     .expect("valid config");
//! assert!(config.keep_source());
//! assert_eq!(config.rate_limit(), 8 * 1024 * 1024);
//! ```

use compress::Direction;
use fast_io::{BLOCK_SIZE, DEFAULT_EXPANSION_LADDER, IoBackend, select_backend};
use thiserror::Error;

/// Default upper bound on one source chunk (4 MiB).
pub const DEFAULT_MAX_CHUNK: usize = 4 * 1024 * 1024;

/// Default upper bound on the staging buffer (8 MiB).
pub const DEFAULT_STAGING_CAPACITY: usize = 8 * 1024 * 1024;

/// I/O strategy requested for file runs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BackendChoice {
    /// Positioned `pread`/`pwrite`.
    Sync,
    /// io_uring at depth one, falling back to [`BackendChoice::Sync`] when
    /// the kernel refuses to create a ring.
    #[default]
    IoUring,
}

impl BackendChoice {
    /// Creates the backend for one invocation.
    ///
    /// The ring is set up once here and reused for every file.
    pub fn open(self) -> Box<dyn IoBackend> {
        select_backend(self == Self::IoUring)
    }
}

/// Rejected builder values.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// `max_chunk` must be at least one byte.
    #[error("maximum chunk size must be non-zero")]
    ZeroChunk,
    /// The staging buffer must hold at least one block.
    #[error("staging capacity must be at least {BLOCK_SIZE} bytes, got {0}")]
    StagingTooSmall(usize),
    /// The escalation ladder needs at least one step.
    #[error("expansion ladder must not be empty")]
    EmptyLadder,
    /// Ladder multipliers must be positive.
    #[error("expansion ladder step {index} is zero")]
    ZeroLadderStep {
        /// Position of the offending step.
        index: usize,
    },
}

/// Settings for one qzip invocation, shared by every file it processes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransferConfig {
    direction: Direction,
    keep_source: bool,
    direct_io: bool,
    backend: BackendChoice,
    rate_limit: u64,
    max_chunk: usize,
    staging_capacity: usize,
    expansion_ladder: Vec<usize>,
}

impl TransferConfig {
    /// Starts a builder for `direction` with default settings.
    pub fn builder(direction: Direction) -> TransferConfigBuilder {
        TransferConfigBuilder::new(direction)
    }

    /// Direction of every file run.
    pub const fn direction(&self) -> Direction {
        self.direction
    }

    /// Keep the source after a successful run.
    pub const fn keep_source(&self) -> bool {
        self.keep_source
    }

    /// Open source and destination with `O_DIRECT`.
    pub const fn direct_io(&self) -> bool {
        self.direct_io
    }

    /// Requested I/O strategy.
    pub const fn backend(&self) -> BackendChoice {
        self.backend
    }

    /// Source bytes per second; zero disables throttling.
    pub const fn rate_limit(&self) -> u64 {
        self.rate_limit
    }

    /// Upper bound on one source chunk.
    pub const fn max_chunk(&self) -> usize {
        self.max_chunk
    }

    /// Upper bound on the staging buffer.
    pub const fn staging_capacity(&self) -> usize {
        self.staging_capacity
    }

    /// Destination multipliers applied to the source chunk length.
    pub fn expansion_ladder(&self) -> &[usize] {
        &self.expansion_ladder
    }
}

/// Builder for [`TransferConfig`] with validation at build time.
#[derive(Clone, Debug)]
pub struct TransferConfigBuilder {
    direction: Direction,
    keep_source: bool,
    direct_io: bool,
    backend: BackendChoice,
    rate_limit: u64,
    max_chunk: usize,
    staging_capacity: usize,
    expansion_ladder: Vec<usize>,
}

impl TransferConfigBuilder {
    fn new(direction: Direction) -> Self {
        Self {
            direction,
            keep_source: false,
            direct_io: true,
            backend: BackendChoice::default(),
            rate_limit: 0,
            max_chunk: DEFAULT_MAX_CHUNK,
            staging_capacity: DEFAULT_STAGING_CAPACITY,
            expansion_ladder: DEFAULT_EXPANSION_LADDER.to_vec(),
        }
    }

    /// Keep the source file after success (default: delete it).
    pub fn keep_source(mut self, keep: bool) -> Self {
        self.keep_source = keep;
        self
    }

    /// Request `O_DIRECT` on source and destination (default: on).
    pub fn direct_io(mut self, direct: bool) -> Self {
        self.direct_io = direct;
        self
    }

    /// Select the I/O strategy (default: io_uring with fallback).
    pub fn backend(mut self, backend: BackendChoice) -> Self {
        self.backend = backend;
        self
    }

    /// Cap source throughput in bytes per second; zero disables the cap.
    pub fn rate_limit(mut self, bytes_per_sec: u64) -> Self {
        self.rate_limit = bytes_per_sec;
        self
    }

    /// Upper bound on one source chunk.
    pub fn max_chunk(mut self, bytes: usize) -> Self {
        self.max_chunk = bytes;
        self
    }

    /// Upper bound on the staging buffer; rounded up to whole blocks.
    pub fn staging_capacity(mut self, bytes: usize) -> Self {
        self.staging_capacity = bytes;
        self
    }

    /// Replace the destination escalation ladder.
    pub fn expansion_ladder(mut self, ladder: impl Into<Vec<usize>>) -> Self {
        self.expansion_ladder = ladder.into();
        self
    }

    /// Validates and builds the configuration.
    pub fn build(self) -> Result<TransferConfig, ConfigError> {
        if self.max_chunk == 0 {
            return Err(ConfigError::ZeroChunk);
        }
        if self.staging_capacity < BLOCK_SIZE {
            return Err(ConfigError::StagingTooSmall(self.staging_capacity));
        }
        if self.expansion_ladder.is_empty() {
            return Err(ConfigError::EmptyLadder);
        }
        if let Some(index) = self.expansion_ladder.iter().position(|&step| step == 0) {
            return Err(ConfigError::ZeroLadderStep { index });
        }

        Ok(TransferConfig {
            direction: self.direction,
            keep_source: self.keep_source,
            direct_io: self.direct_io,
            backend: self.backend,
            rate_limit: self.rate_limit,
            max_chunk: self.max_chunk,
            staging_capacity: self.staging_capacity,
            expansion_ladder: self.expansion_ladder,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = TransferConfig::builder(Direction::Decompress)
            .build()
            .unwrap();
        assert_eq!(config.direction(), Direction::Decompress);
        assert!(!config.keep_source());
        assert!(config.direct_io());
        assert_eq!(config.backend(), BackendChoice::IoUring);
        assert_eq!(config.rate_limit(), 0);
        assert_eq!(config.max_chunk(), DEFAULT_MAX_CHUNK);
        assert_eq!(config.staging_capacity(), DEFAULT_STAGING_CAPACITY);
        assert_eq!(config.expansion_ladder(), &DEFAULT_EXPANSION_LADDER);
    }

    #[test]
    fn setters_apply() {
        let config = TransferConfig::builder(Direction::Compress)
            .keep_source(true)
            .direct_io(false)
            .backend(BackendChoice::Sync)
            .rate_limit(1024)
            .max_chunk(8192)
            .staging_capacity(BLOCK_SIZE)
            .expansion_ladder([2, 3])
            .build()
            .unwrap();
        assert!(config.keep_source());
        assert!(!config.direct_io());
        assert_eq!(config.backend(), BackendChoice::Sync);
        assert_eq!(config.rate_limit(), 1024);
        assert_eq!(config.max_chunk(), 8192);
        assert_eq!(config.staging_capacity(), BLOCK_SIZE);
        assert_eq!(config.expansion_ladder(), &[2, 3]);
    }

    #[test]
    fn sync_choice_opens_sync_backend() {
        assert_eq!(BackendChoice::Sync.open().kind(), fast_io::BackendKind::Sync);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let builder = || TransferConfig::builder(Direction::Compress);
        assert_eq!(
            builder().max_chunk(0).build().unwrap_err(),
            ConfigError::ZeroChunk
        );
        assert_eq!(
            builder().staging_capacity(512).build().unwrap_err(),
            ConfigError::StagingTooSmall(512)
        );
        assert_eq!(
            builder().expansion_ladder(Vec::new()).build().unwrap_err(),
            ConfigError::EmptyLadder
        );
        assert_eq!(
            builder().expansion_ladder([5, 0]).build().unwrap_err(),
            ConfigError::ZeroLadderStep { index: 1 }
        );
    }
}
