//! Process exit codes for qzip invocations.
//!
//! Every fatal [`TransferError`](crate::TransferError) maps to exactly one
//! [`ExitCode`]; the CLI returns [`ExitCode::as_i32`] to the shell.
//!
//! # Examples
//!
//! ```
//! use transfer::ExitCode;
//!
//! let code = ExitCode::ShortWrite;
//! assert_eq!(code.as_i32(), 4);
//! assert_eq!(code.description(), "short write");
//! ```

use std::fmt;

/// Exit codes returned by qzip.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ExitCode {
    /// Successful completion.
    Ok = 0,

    /// Generic failure.
    ///
    /// Usage errors, sizing and stream I/O failures, corrupt input and engine
    /// faults all land here.
    Error = 1,

    /// A buffer could not be allocated.
    Malloc = 2,

    /// The source or destination could not be opened.
    Open = 3,

    /// A flush moved fewer bytes than requested, or the write syscall failed.
    ShortWrite = 4,

    /// Non-empty input was processed with no measurable engine time.
    InvalidSize = 5,

    /// Every destination growth step was used and the output still did not fit.
    ExpansionExhausted = 6,
}

impl ExitCode {
    /// Returns the numeric exit code value.
    ///
    /// # Examples
    ///
    /// ```
    /// use transfer::ExitCode;
    ///
    /// assert_eq!(ExitCode::Ok.as_i32(), 0);
    /// assert_eq!(ExitCode::ExpansionExhausted.as_i32(), 6);
    /// ```
    #[must_use]
    pub const fn as_i32(self) -> i32 {
        self as i32
    }

    /// Returns a short human-readable description of this exit code.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Ok => "success",
            Self::Error => "error",
            Self::Malloc => "error allocating buffers",
            Self::Open => "error opening file",
            Self::ShortWrite => "short write",
            Self::InvalidSize => "invalid size or measurement",
            Self::ExpansionExhausted => "destination buffer could not be expanded",
        }
    }

    /// Returns `true` if this represents a successful exit.
    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Ok)
    }

    /// Creates an exit code from an i32 value.
    ///
    /// Returns `None` if the value doesn't correspond to a known exit code.
    #[must_use]
    pub const fn from_i32(value: i32) -> Option<Self> {
        match value {
            0 => Some(Self::Ok),
            1 => Some(Self::Error),
            2 => Some(Self::Malloc),
            3 => Some(Self::Open),
            4 => Some(Self::ShortWrite),
            5 => Some(Self::InvalidSize),
            6 => Some(Self::ExpansionExhausted),
            _ => None,
        }
    }
}

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code {})", self.description(), self.as_i32())
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code.as_i32()
    }
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> Self {
        // Every variant fits in a u8.
        Self::from(code.as_i32() as u8)
    }
}
