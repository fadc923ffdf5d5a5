//! Engine timing samples and the per-file throughput report.
//!
//! Only time spent inside engine calls is measured: every call is bracketed
//! by one [`TimingSample`], and the elapsed time of a run is the sum of its
//! samples. I/O, throttling and buffer growth are excluded.

use std::fmt;
use std::time::{Duration, Instant};

use compress::Direction;

use crate::error::TransferError;

/// Start and end of one engine call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimingSample {
    /// Instant before the call.
    pub start: Instant,
    /// Instant after the call returned.
    pub end: Instant,
}

impl TimingSample {
    /// Duration of the call.
    pub fn duration(&self) -> Duration {
        self.end.saturating_duration_since(self.start)
    }
}

/// Append-only list of engine call samples for one run.
#[derive(Clone, Debug, Default)]
pub struct TimingLog {
    samples: Vec<TimingSample>,
}

impl TimingLog {
    /// Creates an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `call` and records a sample bracketing exactly that call.
    pub fn time<T>(&mut self, call: impl FnOnce() -> T) -> T {
        let start = Instant::now();
        let result = call();
        let end = Instant::now();
        self.samples.push(TimingSample { start, end });
        result
    }

    /// Recorded samples in call order.
    pub fn samples(&self) -> &[TimingSample] {
        &self.samples
    }

    /// Number of engine calls recorded.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Returns `true` when no call has been recorded.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Sum of all sample durations.
    pub fn elapsed(&self) -> Duration {
        self.samples.iter().map(TimingSample::duration).sum()
    }
}

/// Sizes and engine time of one completed run.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TransferStats {
    direction: Direction,
    input_bytes: u64,
    output_bytes: u64,
    elapsed: Duration,
}

impl TransferStats {
    /// Validates the measurement and builds the stats.
    ///
    /// Non-empty input with zero elapsed engine time is a
    /// [`TransferError::Measurement`].
    pub fn new(
        direction: Direction,
        input_bytes: u64,
        output_bytes: u64,
        elapsed: Duration,
    ) -> Result<Self, TransferError> {
        if input_bytes != 0 && elapsed.is_zero() {
            return Err(TransferError::Measurement { input_bytes });
        }
        Ok(Self {
            direction,
            input_bytes,
            output_bytes,
            elapsed,
        })
    }

    /// Direction of the run.
    pub const fn direction(&self) -> Direction {
        self.direction
    }

    /// Bytes read from the source.
    pub const fn input_bytes(&self) -> u64 {
        self.input_bytes
    }

    /// Bytes written to the destination.
    pub const fn output_bytes(&self) -> u64 {
        self.output_bytes
    }

    /// Summed engine time.
    pub const fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Engine time in milliseconds.
    pub fn elapsed_ms(&self) -> f64 {
        self.elapsed_us() / 1000.0
    }

    fn elapsed_us(&self) -> f64 {
        self.elapsed.as_secs_f64() * 1_000_000.0
    }

    /// Uncompressed bytes per engine microsecond, in Mbit/s.
    ///
    /// The uncompressed side is the input when compressing and the output
    /// when decompressing. Zero when nothing was measured.
    pub fn throughput_mbps(&self) -> f64 {
        let us = self.elapsed_us();
        if us == 0.0 {
            return 0.0;
        }
        let bytes = if self.direction.is_compress() {
            self.input_bytes
        } else {
            self.output_bytes
        };
        (bytes as f64 * 8.0) / us
    }

    /// Input size over output size.
    pub fn compression_ratio(&self) -> f64 {
        self.input_bytes as f64 / self.output_bytes as f64
    }

    /// Fraction of the input saved, `1 - output / input`.
    pub fn space_savings(&self) -> f64 {
        1.0 - self.output_bytes as f64 / self.input_bytes as f64
    }

    /// Human-readable report, or `None` for empty input.
    pub fn report(&self) -> Option<StatsReport<'_>> {
        (self.input_bytes != 0).then_some(StatsReport { stats: self })
    }
}

/// Multi-line throughput report for a non-empty run.
///
/// ```text
/// Time taken:       12.345 ms
/// Throughput:      678.901 Mbit/s
/// Space Savings:    50.000 %
/// Compression ratio: 2.000 : 1
/// ```
///
/// Savings and ratio are only shown for compression.
#[derive(Clone, Copy, Debug)]
pub struct StatsReport<'a> {
    stats: &'a TransferStats,
}

impl fmt::Display for StatsReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stats = self.stats;
        writeln!(f, "Time taken:    {:9.3} ms", stats.elapsed_ms())?;
        writeln!(f, "Throughput:    {:9.3} Mbit/s", stats.throughput_mbps())?;
        if stats.direction.is_compress() {
            writeln!(f, "Space Savings: {:9.3} %", stats.space_savings() * 100.0)?;
            writeln!(f, "Compression ratio: {:.3} : 1", stats.compression_ratio())?;
        }
        Ok(())
    }
}
