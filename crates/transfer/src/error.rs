//! Error taxonomy for one qzip invocation.
//!
//! Each variant is fatal for the whole invocation and maps to one
//! [`ExitCode`]. Conditions the pipeline absorbs (a direct-I/O downgrade, a
//! benign end of input) never surface here.

use std::io;
use std::path::PathBuf;

use compress::EngineError;
use fast_io::AllocError;
use thiserror::Error;

use crate::exit_code::ExitCode;

/// Fatal failure while transforming a file or stream.
#[derive(Debug, Error)]
pub enum TransferError {
    /// A source, destination, or staging buffer could not be allocated.
    #[error("failed to allocate buffer: {0}")]
    Allocation(#[from] AllocError),

    /// The source or destination could not be opened.
    #[error("cannot open {}: {source}", path.display())]
    Open {
        /// Path that failed to open.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The source could not be sized.
    #[error("cannot stat {}: {source}", path.display())]
    Stat {
        /// Path that failed to stat.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// A stream read or a descriptor mode change failed.
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        /// Path where the error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The write syscall itself failed.
    #[error("write to {} failed: {source}", path.display())]
    Write {
        /// Destination path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// A flush moved fewer bytes than requested.
    #[error("short write to {}: wrote {written} of {expected} bytes", path.display())]
    ShortWrite {
        /// Destination path.
        path: PathBuf,
        /// Bytes handed to the backend.
        expected: usize,
        /// Bytes the backend confirmed.
        written: usize,
    },

    /// The engine still reported a full destination after the last growth step.
    #[error("could not expand destination buffer for {} beyond {capacity} bytes", path.display())]
    ExpansionExhausted {
        /// Source path.
        path: PathBuf,
        /// Destination capacity at the time of failure.
        capacity: usize,
    },

    /// Non-empty input was processed with no measurable engine time.
    #[error("no engine time measured for {input_bytes} input bytes")]
    Measurement {
        /// Input size that was processed.
        input_bytes: u64,
    },

    /// The engine reported an unrecoverable fault.
    #[error("{engine} engine failed")]
    EngineFatal {
        /// Engine name.
        engine: &'static str,
    },

    /// The engine rejected its input while more input was pending, or the
    /// input ended inside a member or frame.
    #[error("corrupt input near byte {offset}")]
    DataCorrupt {
        /// Input offset where decoding stopped.
        offset: u64,
    },

    /// The engine session could not be opened.
    #[error(transparent)]
    Session(#[from] EngineError),
}

impl TransferError {
    /// Creates an open error with path context.
    pub fn open(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Open {
            path: path.into(),
            source,
        }
    }

    /// Creates an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Exit code the process reports for this error.
    #[must_use]
    pub const fn exit_code(&self) -> ExitCode {
        match self {
            Self::Allocation(_) => ExitCode::Malloc,
            Self::Open { .. } => ExitCode::Open,
            Self::Write { .. } | Self::ShortWrite { .. } => ExitCode::ShortWrite,
            Self::ExpansionExhausted { .. } => ExitCode::ExpansionExhausted,
            Self::Measurement { .. } => ExitCode::InvalidSize,
            Self::Stat { .. }
            | Self::Io { .. }
            | Self::EngineFatal { .. }
            | Self::DataCorrupt { .. }
            | Self::Session(_) => ExitCode::Error,
        }
    }
}

/// Extension trait for mapping I/O results to [`TransferError`] with path context.
pub(crate) trait IoResultExt<T> {
    /// Maps an I/O error to [`TransferError::Io`].
    fn with_path(self, path: impl Into<PathBuf>) -> Result<T, TransferError>;

    /// Maps an I/O error to [`TransferError::Open`].
    fn open_context(self, path: impl Into<PathBuf>) -> Result<T, TransferError>;
}

impl<T> IoResultExt<T> for io::Result<T> {
    fn with_path(self, path: impl Into<PathBuf>) -> Result<T, TransferError> {
        self.map_err(|e| TransferError::io(path, e))
    }

    fn open_context(self, path: impl Into<PathBuf>) -> Result<T, TransferError> {
        self.map_err(|e| TransferError::open(path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn io_error() -> io::Error {
        io::Error::new(io::ErrorKind::NotFound, "not found")
    }

    #[test]
    fn every_variant_has_its_exit_code() {
        let cases = [
            (
                TransferError::Allocation(AllocError::OutOfMemory {
                    size: 1,
                    align: 4096,
                }),
                ExitCode::Malloc,
            ),
            (TransferError::open("/a", io_error()), ExitCode::Open),
            (
                TransferError::Stat {
                    path: "/a".into(),
                    source: io_error(),
                },
                ExitCode::Error,
            ),
            (TransferError::io("/a", io_error()), ExitCode::Error),
            (
                TransferError::Write {
                    path: "/a".into(),
                    source: io_error(),
                },
                ExitCode::ShortWrite,
            ),
            (
                TransferError::ShortWrite {
                    path: "/a".into(),
                    expected: 4096,
                    written: 10,
                },
                ExitCode::ShortWrite,
            ),
            (
                TransferError::ExpansionExhausted {
                    path: "/a".into(),
                    capacity: 1,
                },
                ExitCode::ExpansionExhausted,
            ),
            (
                TransferError::Measurement { input_bytes: 1 },
                ExitCode::InvalidSize,
            ),
            (
                TransferError::EngineFatal { engine: "deflate" },
                ExitCode::Error,
            ),
            (TransferError::DataCorrupt { offset: 9 }, ExitCode::Error),
        ];
        for (error, code) in cases {
            assert_eq!(error.exit_code(), code, "{error}");
        }
    }

    #[test]
    fn messages_carry_path_context() {
        let error = TransferError::open("/path/to/file", io_error());
        let display = error.to_string();
        assert!(display.contains("/path/to/file"));
        assert!(display.contains("not found"));
    }

    #[test]
    fn short_write_reports_both_counts() {
        let error = TransferError::ShortWrite {
            path: "/out.gz".into(),
            expected: 8192,
            written: 100,
        };
        assert_eq!(
            error.to_string(),
            "short write to /out.gz: wrote 100 of 8192 bytes"
        );
    }

    #[test]
    fn result_ext_attaches_paths() {
        let result: io::Result<()> = Err(io_error());
        let error = result.open_context("/missing").unwrap_err();
        assert!(matches!(error, TransferError::Open { ref path, .. } if path.as_os_str() == "/missing"));

        let result: io::Result<()> = Err(io_error());
        assert!(matches!(
            result.with_path("/x").unwrap_err(),
            TransferError::Io { .. }
        ));
    }
}
