#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! Throughput pacing for qzip transfers.
//!
//! [`RateLimiter`] caps the bytes read per one-second window and sleeps out
//! the remainder of a window once the cap is reached. [`parse_speed`] turns a
//! `--speed` argument such as `200M` into the bytes-per-second value the
//! limiter expects.
//!
//! Enabling the `test-support` feature exposes [`recorded_sleep_session`],
//! which captures the durations the limiter asked to sleep so pacing can be
//! asserted deterministically.

mod limiter;
mod parse;

pub use crate::limiter::{LimiterSleep, RateLimiter};
#[cfg(any(test, feature = "test-support"))]
#[cfg_attr(docsrs, doc(cfg(feature = "test-support")))]
pub use crate::limiter::{RecordedSleepSession, recorded_sleep_session};
pub use crate::parse::{DEFAULT_SPEED_UNIT, SpeedParseError, parse_speed};
