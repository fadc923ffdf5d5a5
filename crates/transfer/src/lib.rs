#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![cfg_attr(docsrs, feature(doc_cfg))]
//! crates/transfer/src/lib.rs
//!
//! Streaming transform pipeline for qzip.
//!
//! This crate moves bytes from a source file (or stream) through a
//! [`TransformEngine`](compress::TransformEngine) into a destination while
//! keeping direct I/O valid, growing the engine's destination buffer on
//! demand, and throttling throughput.
//!
//! # Architecture
//!
//! ```text
//! process_file
//!   ├─ BufferPool (fast_io)          source chunk + destination, ladder growth
//!   ├─ IoBackend (fast_io)           positioned or io_uring reads and writes
//!   ├─ RateLimiter (bandwidth)       fixed one-second window
//!   └─ TransformDriver (driver)      engine calls over one chunk
//!        └─ StagingBuffer (staging)  full-capacity aligned writes
//! ```
//!
//! - [`config`]: [`TransferConfig`] and its builder
//! - [`driver`]: engine call loop and status classification
//! - [`staging`]: aligned output accumulator and the [`BlockSink`] seam
//! - [`pipeline`]: per-file state machine ([`process_file`])
//! - [`stream`]: the same loop over readers and writers ([`process_stream`])
//! - [`stats`]: timing samples and the throughput report
//! - [`error`] / [`exit_code`]: failure taxonomy and process exit codes
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//!
//! use compress::{Direction, EngineOptions, open_session};
//! use fast_io::select_backend;
//! use transfer::{TransferConfig, process_file};
//!
//! let config = TransferConfig::builder(Direction::Compress)
//!     .keep_source(true)
//!     .build()
//!     .expect("valid config");
//! let mut engine = open_session(&EngineOptions::default(), Direction::Compress)?;
//! let mut backend = select_backend(true);
//! let report = process_file(
//!     &mut *engine,
//!     Path::new("data.bin"),
//!     Path::new("data.bin.gz"),
//!     &config,
//!     &mut *backend,
//! )?;
//! if let Some(text) = report.stats.report() {
//!     print!("{text}");
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod config;
pub mod driver;
pub mod error;
pub mod exit_code;
pub mod pipeline;
pub mod staging;
pub mod stats;
pub mod stream;

pub use config::{
    BackendChoice, ConfigError, DEFAULT_MAX_CHUNK, DEFAULT_STAGING_CAPACITY, TransferConfig,
    TransferConfigBuilder,
};
pub use driver::{ChunkOutcome, ChunkStatus, TransformDriver};
pub use error::TransferError;
pub use exit_code::ExitCode;
pub use pipeline::{FileReport, process_file};
pub use staging::{BlockSink, FileSink, StagingBuffer};
pub use stats::{StatsReport, TimingLog, TimingSample, TransferStats};
pub use stream::{STDIN_NAME, STDOUT_NAME, process_stream};
