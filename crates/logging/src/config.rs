//! crates/logging/src/config.rs
//! Verbosity configuration derived from `-v` and `-q`.

use tracing::level_filters::LevelFilter;

/// Highest `-v` count with its own level; more flags change nothing.
pub const MAX_VERBOSE_LEVEL: u8 = 3;

/// Console verbosity requested on the command line.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct VerbosityConfig {
    /// Number of `-v` flags, capped at [`MAX_VERBOSE_LEVEL`].
    pub verbose: u8,
    /// `-q`: only errors are shown, whatever else is requested.
    pub quiet: bool,
}

impl VerbosityConfig {
    /// Configuration for a `-v` count.
    ///
    /// | count | level |
    /// |-------|-------|
    /// | 0     | WARN  |
    /// | 1     | INFO  |
    /// | 2     | DEBUG |
    /// | 3+    | TRACE |
    pub fn from_verbose_level(level: u8) -> Self {
        Self {
            verbose: level.min(MAX_VERBOSE_LEVEL),
            quiet: false,
        }
    }

    /// Configuration for `-q`.
    pub const fn quiet() -> Self {
        Self {
            verbose: 0,
            quiet: true,
        }
    }

    /// Level filter implied by the flags alone.
    pub const fn level(&self) -> LevelFilter {
        if self.quiet {
            return LevelFilter::ERROR;
        }
        match self.verbose {
            0 => LevelFilter::WARN,
            1 => LevelFilter::INFO,
            2 => LevelFilter::DEBUG,
            _ => LevelFilter::TRACE,
        }
    }

    /// Returns `true` if `RUST_LOG` may replace the flag-derived level.
    pub const fn allows_env_override(&self) -> bool {
        !self.quiet
    }
}
