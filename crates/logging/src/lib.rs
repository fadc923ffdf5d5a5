#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `logging` turns the `-v`/`-q` flags of the qzip command line into a
//! process-wide [`tracing`] subscriber. Library crates only emit events with
//! the `tracing` macros; this crate is the single place that decides where
//! those events go and which of them are shown.
//!
//! # Design
//!
//! - [`VerbosityConfig`] holds the raw flags and maps them to a level
//! - [`build_filter`] combines that level with `RUST_LOG`
//! - [`init_tracing`] installs a stderr `fmt` subscriber once per process
//!
//! Standard output is reserved for per-file reports, so diagnostics always
//! go to stderr.
//!
//! # Examples
//!
//! ```
//! use logging::VerbosityConfig;
//! use tracing::level_filters::LevelFilter;
//!
//! assert_eq!(VerbosityConfig::from_verbose_level(0).level(), LevelFilter::WARN);
//! assert_eq!(VerbosityConfig::from_verbose_level(2).level(), LevelFilter::DEBUG);
//! assert_eq!(VerbosityConfig::quiet().level(), LevelFilter::ERROR);
//! ```

mod config;
mod tracing_bridge;

pub use config::{MAX_VERBOSE_LEVEL, VerbosityConfig};
pub use tracing_bridge::{ENV_FILTER_VAR, build_filter, init_tracing, subscriber_with_writer};
