#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `compress` defines the contract between qzip's streaming pipeline and a
//! compression codec, and ships the software codecs that implement it.
//!
//! # Design
//!
//! A session implements [`TransformEngine`]: it is fixed to one
//! [`Direction`], consumes a prefix of each source slice, writes a prefix of
//! each destination slice, and classifies the call with an
//! [`EngineStatus`]. Sessions own all codec state between calls, so callers
//! only manage plain byte buffers.
//!
//! - [`gzip`] emits one gzip member per compress call (deflate via
//!   [`flate2`](https://docs.rs/flate2)) and decodes any concatenation of gzip
//!   members.
//! - [`zstd`](crate::zstd) emits one Zstandard frame per compress call via
//!   [`zstd`](https://docs.rs/zstd) (feature `zstd`).
//!
//! # Invariants
//!
//! - A compress call never splits a member: either a whole member fits the
//!   destination or the call reports [`EngineStatus::BufferTooSmall`] with
//!   nothing consumed.
//! - [`TransformEngine::max_output_size`] bounds one compress call; it is
//!   `None` for decompressors.
//! - Once a decompressor reports [`EngineStatus::DataError`] every later
//!   call does too.
//!
//! # Errors
//!
//! Per-call outcomes are statuses, not errors. Only session setup fails,
//! with [`EngineError`].
//!
//! # Examples
//!
//! ```
//! use compress::{Direction, EngineOptions, EngineStatus, open_session};
//!
//! let options = EngineOptions::default();
//! let mut compressor = open_session(&options, Direction::Compress).unwrap();
//! let mut member = vec![0u8; compressor.max_output_size(11).unwrap()];
//! let packed = compressor.transform(b"hello world", &mut member);
//!
//! let mut decompressor = open_session(&options, Direction::Decompress).unwrap();
//! let mut plain = vec![0u8; 64];
//! let unpacked = decompressor.transform(&member[..packed.produced], &mut plain);
//! assert_eq!(unpacked.status, EngineStatus::Ok);
//! assert_eq!(&plain[..unpacked.produced], b"hello world");
//! ```

pub mod algorithm;
pub mod engine;
pub mod gzip;
mod session;
#[cfg(feature = "zstd")]
pub mod zstd;

pub use algorithm::{Algorithm, AlgorithmParseError};
pub use engine::{Direction, EngineStatus, TransformEngine, TransformResult};
pub use session::{
    DEFAULT_MEMBER_SIZE, EngineError, EngineOptions, MAX_MEMBER_SIZE, MIN_MEMBER_SIZE,
    open_session,
};
